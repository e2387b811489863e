// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-lead conversation state queries.

use cadence_core::{CadenceError, ConversationState, LeadId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::sql;

pub async fn get(
    db: &Database,
    lead_id: &LeadId,
) -> Result<Option<ConversationState>, CadenceError> {
    let lead_id = lead_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationState>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT lead_id, current_strategy, last_business_attempt_at, last_casual_attempt_at, \
                 consecutive_no_reply_count, sentiment_trend, unhandled_purchase_signal, \
                 last_reply_at, halted_reason \
                 FROM conversation_state WHERE lead_id = ?1",
                params![lead_id],
                |row| {
                    Ok(ConversationState {
                        lead_id: LeadId(row.get(0)?),
                        current_strategy: sql::get_opt_enum(row, 1)?,
                        last_business_attempt_at: sql::get_opt_ts(row, 2)?,
                        last_casual_attempt_at: sql::get_opt_ts(row, 3)?,
                        consecutive_no_reply_count: row.get(4)?,
                        sentiment_trend: row.get(5)?,
                        unhandled_purchase_signal: row.get(6)?,
                        last_reply_at: sql::get_opt_ts(row, 7)?,
                        halted_reason: row.get(8)?,
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

/// Insert or replace the lead's conversation state.
pub async fn put(db: &Database, state: &ConversationState) -> Result<(), CadenceError> {
    let state = state.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO conversation_state (lead_id, current_strategy, \
                 last_business_attempt_at, last_casual_attempt_at, consecutive_no_reply_count, \
                 sentiment_trend, unhandled_purchase_signal, last_reply_at, halted_reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    state.lead_id.0,
                    state.current_strategy.map(|s| s.to_string()),
                    sql::opt_ts(&state.last_business_attempt_at),
                    sql::opt_ts(&state.last_casual_attempt_at),
                    state.consecutive_no_reply_count,
                    state.sentiment_trend,
                    state.unhandled_purchase_signal,
                    sql::opt_ts(&state.last_reply_at),
                    state.halted_reason,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
