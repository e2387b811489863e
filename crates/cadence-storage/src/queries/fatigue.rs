// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-lead fatigue state queries.

use cadence_core::{CadenceError, FatigueState, LeadId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::sql;

pub async fn get(db: &Database, lead_id: &LeadId) -> Result<Option<FatigueState>, CadenceError> {
    let lead_id = lead_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<FatigueState>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT lead_id, contact_log, last_contact_at, cooldown_until, cooldown_reason \
                 FROM fatigue_state WHERE lead_id = ?1",
                params![lead_id],
                |row| {
                    Ok(FatigueState {
                        lead_id: LeadId(row.get(0)?),
                        contact_log: sql::get_json(row, 1)?,
                        last_contact_at: sql::get_opt_ts(row, 2)?,
                        cooldown_until: sql::get_opt_ts(row, 3)?,
                        cooldown_reason: row.get(4)?,
                    })
                },
            );
            match result {
                Ok(state) => Ok(Some(state)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace the lead's fatigue state.
pub async fn put(db: &Database, state: &FatigueState) -> Result<(), CadenceError> {
    let state = state.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO fatigue_state (lead_id, contact_log, last_contact_at, cooldown_until, cooldown_reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(lead_id) DO UPDATE SET contact_log = excluded.contact_log, \
                 last_contact_at = excluded.last_contact_at, cooldown_until = excluded.cooldown_until, \
                 cooldown_reason = excluded.cooldown_reason",
                params![
                    state.lead_id.0,
                    sql::to_json(&state.contact_log)?,
                    sql::opt_ts(&state.last_contact_at),
                    sql::opt_ts(&state.cooldown_until),
                    state.cooldown_reason,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips_contact_log() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("f.db").to_str().unwrap(), true)
            .await
            .unwrap();
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();

        let mut state = FatigueState::new(LeadId::from("lead-1"));
        state.contact_log = vec![t, t + Duration::hours(1)];
        state.last_contact_at = Some(t + Duration::hours(1));
        put(&db, &state).await.unwrap();

        state.cooldown_until = Some(t + Duration::hours(12));
        state.cooldown_reason = Some("negative-sentiment-backoff".into());
        put(&db, &state).await.unwrap();

        let loaded = get(&db, &state.lead_id).await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert!(get(&db, &LeadId::from("other")).await.unwrap().is_none());
    }
}
