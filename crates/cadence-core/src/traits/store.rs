// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for engine-owned state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ConversationState, EntryId, FatigueState, FollowUpEntry, LeadId, Task, TaskId, TaskStatus,
};

/// Durable storage for follow-up entries, fatigue state, conversation state,
/// and tasks.
///
/// All writes are atomic per call. [`claim_due_entries`](Self::claim_due_entries)
/// must transition each returned entry from `pending` to `ready` in the same
/// atomic step that selects it, so that no entry is ever returned twice.
#[async_trait]
pub trait NurtureStore: PluginAdapter {
    /// Insert a new entry.
    async fn insert_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError>;

    async fn get_entry(&self, id: &EntryId) -> Result<Option<FollowUpEntry>, CadenceError>;

    /// Overwrite an existing entry. Fails with `NotFound` if it does not exist.
    async fn update_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError>;

    /// Pending and ready entries for a lead, ordered by `scheduled_at`.
    async fn open_entries_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<FollowUpEntry>, CadenceError>;

    /// Atomically claim up to `limit` pending entries with `scheduled_at <= now`,
    /// oldest first, marking them ready.
    async fn claim_due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpEntry>, CadenceError>;

    /// Claim due entries for a single lead only.
    async fn claim_due_entries_for_lead(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpEntry>, CadenceError>;

    async fn get_fatigue(&self, lead_id: &LeadId) -> Result<Option<FatigueState>, CadenceError>;

    async fn put_fatigue(&self, state: &FatigueState) -> Result<(), CadenceError>;

    async fn get_conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<ConversationState>, CadenceError>;

    async fn put_conversation(&self, state: &ConversationState) -> Result<(), CadenceError>;

    async fn insert_task(&self, task: &Task) -> Result<(), CadenceError>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, CadenceError>;

    /// Overwrite an existing task. Fails with `NotFound` if it does not exist.
    async fn update_task(&self, task: &Task) -> Result<(), CadenceError>;

    /// The lead's non-terminal task, if any.
    async fn active_task_for_lead(&self, lead_id: &LeadId) -> Result<Option<Task>, CadenceError>;

    /// Tasks in any of the given statuses, oldest first.
    async fn list_tasks(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, CadenceError>;

    /// Flush pending writes and release resources.
    async fn close(&self) -> Result<(), CadenceError>;
}
