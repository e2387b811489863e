// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence status` command implementation.
//!
//! Reads the persisted engine state directly from storage: the task queue
//! by default, or one lead's fatigue, conversation, and schedule.

use std::io::IsTerminal;

use cadence_config::model::CadenceConfig;
use cadence_core::{
    CadenceError, ConversationState, FatigueState, FollowUpEntry, LeadId, NurtureStore, TaskStatus,
};
use cadence_orchestrator::snapshot::ALL_STATUSES;
use cadence_orchestrator::QueueSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Structured per-lead output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct LeadStatus {
    pub lead_id: LeadId,
    pub fatigue: FatigueState,
    pub conversation: ConversationState,
    pub open_entries: Vec<FollowUpEntry>,
}

/// Run the `cadence status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &CadenceConfig,
    lead: Option<&str>,
    json: bool,
    plain: bool,
) -> Result<(), CadenceError> {
    let store = cadence_storage::open_store(&config.storage).await?;
    let use_color = !plain && std::io::stdout().is_terminal();

    let rendered = match lead {
        Some(lead) => {
            let status = lead_status(store.as_ref(), LeadId::from(lead)).await?;
            if json {
                to_json(&status)?
            } else {
                render_lead(&status, use_color)
            }
        }
        None => {
            let tasks = store.list_tasks(&ALL_STATUSES).await?;
            let snapshot = QueueSnapshot::from_tasks(config.orchestrator.mode, tasks);
            if json {
                to_json(&snapshot)?
            } else {
                render_queue(&snapshot, use_color)
            }
        }
    };

    println!("{rendered}");
    store.close().await
}

async fn lead_status(store: &dyn NurtureStore, lead_id: LeadId) -> Result<LeadStatus, CadenceError> {
    let fatigue = store
        .get_fatigue(&lead_id)
        .await?
        .unwrap_or_else(|| FatigueState::new(lead_id.clone()));
    let conversation = store
        .get_conversation(&lead_id)
        .await?
        .unwrap_or_else(|| ConversationState::new(lead_id.clone()));
    let open_entries = store.open_entries_for_lead(&lead_id).await?;
    Ok(LeadStatus {
        lead_id,
        fatigue,
        conversation,
        open_entries,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CadenceError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CadenceError::Internal(format!("failed to render status: {e}")))
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_queue(snapshot: &QueueSnapshot, use_color: bool) -> String {
    use colored::Colorize;

    let mut out = String::new();
    out.push_str("\n  cadence status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));
    out.push_str(&format!("    Mode:     {}\n", snapshot.mode));

    for status in ALL_STATUSES {
        let count = snapshot.count(status);
        let label = format!("{status}:");
        let value = if use_color && count > 0 {
            match status {
                TaskStatus::AwaitingConfirmation => count.to_string().yellow().to_string(),
                TaskStatus::Failed => count.to_string().red().to_string(),
                TaskStatus::Completed => count.to_string().green().to_string(),
                _ => count.to_string(),
            }
        } else {
            count.to_string()
        };
        out.push_str(&format!("    {label:<24}{value}\n"));
    }

    if !snapshot.open_tasks.is_empty() {
        out.push_str("\n  Open tasks\n");
        for task in &snapshot.open_tasks {
            out.push_str(&format!(
                "    {}  {}  {} {}{}  [{}]\n",
                task.id,
                task.lead_id,
                task.conversation_type,
                task.topic_hint,
                if task.urgent { " (urgent)" } else { "" },
                task.status,
            ));
        }
    }
    out
}

fn render_lead(status: &LeadStatus, use_color: bool) -> String {
    use colored::Colorize;

    let fatigue = &status.fatigue;
    let conversation = &status.conversation;

    let mut out = String::new();
    out.push_str(&format!("\n  cadence status: {}\n", status.lead_id));
    out.push_str(&format!("  {}\n", "-".repeat(35)));

    match &conversation.halted_reason {
        Some(reason) if use_color => {
            out.push_str(&format!("    State:    {} {}\n", "✗".red(), reason.red()));
        }
        Some(reason) => out.push_str(&format!("    State:    [HALTED] {reason}\n")),
        None if use_color => out.push_str(&format!("    State:    {}\n", "active".green())),
        None => out.push_str("    State:    [OK] active\n"),
    }

    out.push_str(&format!(
        "    Contacts: {} in window, last {}\n",
        fatigue.contact_log.len(),
        fmt_time(fatigue.last_contact_at)
    ));
    if let Some(until) = fatigue.cooldown_until {
        out.push_str(&format!(
            "    Cooldown: until {} ({})\n",
            fmt_time(Some(until)),
            fatigue.cooldown_reason.as_deref().unwrap_or("-")
        ));
    }
    out.push_str(&format!(
        "    Strategy: {} (no-reply streak {}, sentiment {:+.2})\n",
        conversation
            .current_strategy
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string()),
        conversation.consecutive_no_reply_count,
        conversation.sentiment_trend
    ));
    if conversation.unhandled_purchase_signal {
        let flag = "purchase signal pending";
        if use_color {
            out.push_str(&format!("    Signal:   {}\n", flag.yellow()));
        } else {
            out.push_str(&format!("    Signal:   {flag}\n"));
        }
    }

    if status.open_entries.is_empty() {
        out.push_str("    Next:     nothing scheduled\n");
    } else {
        for entry in &status.open_entries {
            out.push_str(&format!(
                "    Next:     {} {} [{}] attempts {}\n",
                fmt_time(Some(entry.scheduled_at)),
                entry.conversation_type,
                entry.status,
                entry.attempts
            ));
        }
    }
    out
}
