// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outreach task queries.

use cadence_core::{CadenceError, EntryId, GeneratedContent, LeadId, Task, TaskId, TaskStatus};
use rusqlite::{params, params_from_iter, Row};

use crate::database::{map_tr_err, Database};
use crate::sql;

const COLUMNS: &str = "id, lead_id, entry_id, conversation_type, topic_hint, urgent, status, \
                       created_at, updated_at, awaiting_since, content, message_id, reason";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let content: Option<String> = row.get(10)?;
    Ok(Task {
        id: TaskId(row.get(0)?),
        lead_id: LeadId(row.get(1)?),
        entry_id: EntryId(row.get(2)?),
        conversation_type: sql::get_enum(row, 3)?,
        topic_hint: row.get(4)?,
        urgent: row.get(5)?,
        status: sql::get_enum(row, 6)?,
        created_at: sql::get_ts(row, 7)?,
        updated_at: sql::get_ts(row, 8)?,
        awaiting_since: sql::get_opt_ts(row, 9)?,
        content: content.map(|text| GeneratedContent { text }),
        message_id: row.get(11)?,
        reason: row.get(12)?,
    })
}

pub async fn insert(db: &Database, task: &Task) -> Result<(), CadenceError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                &format!(
                    "INSERT INTO tasks ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    task.id.0,
                    task.lead_id.0,
                    task.entry_id.0,
                    task.conversation_type.to_string(),
                    task.topic_hint,
                    task.urgent,
                    task.status.to_string(),
                    sql::ts(&task.created_at),
                    sql::ts(&task.updated_at),
                    sql::opt_ts(&task.awaiting_since),
                    task.content.as_ref().map(|c| c.text.clone()),
                    task.message_id,
                    task.reason,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &TaskId) -> Result<Option<Task>, CadenceError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Task>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"))?;
            match stmt.query_row(params![id], from_row) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update(db: &Database, task: &Task) -> Result<(), CadenceError> {
    let task = task.clone();
    let id = task.id.clone();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE tasks SET status = ?2, updated_at = ?3, awaiting_since = ?4, \
                 content = ?5, message_id = ?6, reason = ?7 WHERE id = ?1",
                params![
                    task.id.0,
                    task.status.to_string(),
                    sql::ts(&task.updated_at),
                    sql::opt_ts(&task.awaiting_since),
                    task.content.as_ref().map(|c| c.text.clone()),
                    task.message_id,
                    task.reason,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CadenceError::not_found("task", id));
    }
    Ok(())
}

pub async fn active_for_lead(db: &Database, lead_id: &LeadId) -> Result<Option<Task>, CadenceError> {
    let lead_id = lead_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Task>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM tasks \
                 WHERE lead_id = ?1 AND status NOT IN ('completed', 'skipped', 'failed') \
                 ORDER BY created_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![lead_id], from_row) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_by_status(
    db: &Database,
    statuses: &[TaskStatus],
) -> Result<Vec<Task>, CadenceError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    db.connection()
        .call(move |conn| -> Result<Vec<Task>, rusqlite::Error> {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM tasks WHERE status IN ({placeholders}) \
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params_from_iter(statuses.iter()), from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
