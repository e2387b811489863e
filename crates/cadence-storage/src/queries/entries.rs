// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up entry queries, including the atomic due-entry claim.

use cadence_core::{CadenceError, EntryId, EntryStatus, FollowUpEntry, LeadId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::database::{map_tr_err, Database};
use crate::sql;

const COLUMNS: &str = "id, lead_id, conversation_type, scheduled_at, status, attempts, \
                       reschedule_count, reason, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FollowUpEntry> {
    Ok(FollowUpEntry {
        id: EntryId(row.get(0)?),
        lead_id: LeadId(row.get(1)?),
        conversation_type: sql::get_enum(row, 2)?,
        scheduled_at: sql::get_ts(row, 3)?,
        status: sql::get_enum(row, 4)?,
        attempts: row.get(5)?,
        reschedule_count: row.get(6)?,
        reason: row.get(7)?,
        created_at: sql::get_ts(row, 8)?,
        updated_at: sql::get_ts(row, 9)?,
    })
}

pub async fn insert(db: &Database, entry: &FollowUpEntry) -> Result<(), CadenceError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!("INSERT INTO follow_up_entries ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                params![
                    entry.id.0,
                    entry.lead_id.0,
                    entry.conversation_type.to_string(),
                    sql::ts(&entry.scheduled_at),
                    entry.status.to_string(),
                    entry.attempts,
                    entry.reschedule_count,
                    entry.reason,
                    sql::ts(&entry.created_at),
                    sql::ts(&entry.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &EntryId) -> Result<Option<FollowUpEntry>, CadenceError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<FollowUpEntry>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM follow_up_entries WHERE id = ?1"))?;
            match stmt.query_row(params![id], from_row) {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite every mutable column. Returns `NotFound` for unknown ids.
pub async fn update(db: &Database, entry: &FollowUpEntry) -> Result<(), CadenceError> {
    let entry = entry.clone();
    let id = entry.id.clone();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE follow_up_entries SET conversation_type = ?2, scheduled_at = ?3, \
                 status = ?4, attempts = ?5, reschedule_count = ?6, reason = ?7, updated_at = ?8 \
                 WHERE id = ?1",
                params![
                    entry.id.0,
                    entry.conversation_type.to_string(),
                    sql::ts(&entry.scheduled_at),
                    entry.status.to_string(),
                    entry.attempts,
                    entry.reschedule_count,
                    entry.reason,
                    sql::ts(&entry.updated_at),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CadenceError::not_found("entry", id));
    }
    Ok(())
}

pub async fn open_for_lead(
    db: &Database,
    lead_id: &LeadId,
) -> Result<Vec<FollowUpEntry>, CadenceError> {
    let lead_id = lead_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<FollowUpEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM follow_up_entries \
                 WHERE lead_id = ?1 AND status IN ('pending', 'ready') \
                 ORDER BY scheduled_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![lead_id], from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Select due pending entries and mark them ready in one transaction.
///
/// `lead_id` narrows the claim to one lead; `limit` caps the batch.
pub async fn claim_due(
    db: &Database,
    now: DateTime<Utc>,
    lead_id: Option<&LeadId>,
    limit: Option<usize>,
) -> Result<Vec<FollowUpEntry>, CadenceError> {
    let lead_id = lead_id.map(|l| l.0.clone());
    let limit = limit.map_or(-1, |l| l as i64);
    db.connection()
        .call(move |conn| -> Result<Vec<FollowUpEntry>, rusqlite::Error> {
            let now_str = sql::ts(&now);
            let tx = conn.transaction()?;

            let claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COLUMNS} FROM follow_up_entries \
                     WHERE status = 'pending' AND scheduled_at <= ?1 \
                       AND (?2 IS NULL OR lead_id = ?2) \
                     ORDER BY scheduled_at ASC, id ASC \
                     LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![now_str, lead_id, limit], from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            for entry in &claimed {
                tx.execute(
                    "UPDATE follow_up_entries SET status = 'ready', updated_at = ?2 \
                     WHERE id = ?1 AND status = 'pending'",
                    params![entry.id.0, now_str],
                )?;
            }
            tx.commit()?;

            Ok(claimed
                .into_iter()
                .map(|entry| FollowUpEntry {
                    status: EntryStatus::Ready,
                    updated_at: now,
                    ..entry
                })
                .collect())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ConversationType;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("entries.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_preserves_fields() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let entry = FollowUpEntry::new(
            LeadId::from("lead-1"),
            ConversationType::Casual,
            t0() + Duration::hours(3),
            t0(),
        );
        insert(&db, &entry).await.unwrap();

        let loaded = get(&db, &entry.id).await.unwrap().unwrap();
        assert_eq!(loaded, entry);
    }

    #[tokio::test]
    async fn claim_due_marks_ready_exactly_once() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let due = FollowUpEntry::new(LeadId::from("lead-1"), ConversationType::Business, t0(), t0());
        let future = FollowUpEntry::new(
            LeadId::from("lead-2"),
            ConversationType::Business,
            t0() + Duration::hours(1),
            t0(),
        );
        insert(&db, &due).await.unwrap();
        insert(&db, &future).await.unwrap();

        let first = claim_due(&db, t0(), None, None).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, due.id);
        assert_eq!(first[0].status, EntryStatus::Ready);

        let second = claim_due(&db, t0(), None, None).await.unwrap();
        assert!(second.is_empty());

        let stored = get(&db, &due.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EntryStatus::Ready);
    }

    #[tokio::test]
    async fn claim_due_respects_limit_and_order() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        for offset in [3, 1, 2] {
            let entry = FollowUpEntry::new(
                LeadId(format!("lead-{offset}")),
                ConversationType::Casual,
                t0() - Duration::minutes(offset),
                t0(),
            );
            insert(&db, &entry).await.unwrap();
        }

        let claimed = claim_due(&db, t0(), None, Some(2)).await.unwrap();
        let leads: Vec<_> = claimed.iter().map(|e| e.lead_id.0.as_str()).collect();
        assert_eq!(leads, vec!["lead-3", "lead-2"]);
    }

    #[tokio::test]
    async fn update_unknown_entry_is_not_found() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let entry = FollowUpEntry::new(LeadId::from("lead-1"), ConversationType::Casual, t0(), t0());
        let err = update(&db, &entry).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound { kind: "entry", .. }));
    }
}
