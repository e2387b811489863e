// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only views for reporting.

use std::collections::BTreeMap;

use cadence_core::{
    CadenceError, ConversationState, EntryStatus, FatigueState, FollowUpEntry, LeadId,
    OperatingMode, Task, TaskId, TaskStatus,
};
use serde::Serialize;

use crate::orchestrator::Orchestrator;

/// Every task status, in lifecycle order.
pub const ALL_STATUSES: [TaskStatus; 7] = [
    TaskStatus::Pending,
    TaskStatus::Ready,
    TaskStatus::AwaitingConfirmation,
    TaskStatus::Executing,
    TaskStatus::Completed,
    TaskStatus::Skipped,
    TaskStatus::Failed,
];

/// The task queue as seen at one moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub mode: OperatingMode,
    /// Non-terminal tasks, oldest first.
    pub open_tasks: Vec<Task>,
    /// Task count per status, keyed by status name.
    pub counts: BTreeMap<String, usize>,
}

impl QueueSnapshot {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status.to_string()).copied().unwrap_or(0)
    }

    /// Build a snapshot from an unordered task list.
    pub fn from_tasks(mode: OperatingMode, tasks: Vec<Task>) -> Self {
        let mut counts: BTreeMap<String, usize> =
            ALL_STATUSES.iter().map(|s| (s.to_string(), 0)).collect();
        for task in &tasks {
            *counts.entry(task.status.to_string()).or_default() += 1;
        }

        let mut open_tasks: Vec<Task> = tasks
            .into_iter()
            .filter(|t| !t.status.is_terminal())
            .collect();
        open_tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Self {
            mode,
            open_tasks,
            counts,
        }
    }
}

impl Orchestrator {
    pub async fn snapshot(&self) -> Result<QueueSnapshot, CadenceError> {
        let tasks = self.inner.store.list_tasks(&ALL_STATUSES).await?;
        Ok(QueueSnapshot::from_tasks(self.mode(), tasks))
    }

    pub async fn fatigue_state(&self, lead_id: &LeadId) -> Result<FatigueState, CadenceError> {
        self.inner.fatigue.state(lead_id).await
    }

    pub async fn conversation_state(
        &self,
        lead_id: &LeadId,
    ) -> Result<ConversationState, CadenceError> {
        self.conversation(lead_id).await
    }

    /// The lead's earliest pending follow-up.
    pub async fn next_follow_up(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<FollowUpEntry>, CadenceError> {
        Ok(self
            .inner
            .store
            .open_entries_for_lead(lead_id)
            .await?
            .into_iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .min_by_key(|e| e.scheduled_at))
    }

    pub async fn task(&self, task_id: &TaskId) -> Result<Option<Task>, CadenceError> {
        self.inner.store.get_task(task_id).await
    }
}
