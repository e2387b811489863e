// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`NurtureStore`] for tests and `backend = "memory"`.
//!
//! State lives behind one async mutex, so every call is atomic with respect
//! to every other call, matching the SQLite store's transaction guarantees.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use cadence_core::{
    AdapterType, CadenceError, ConversationState, EntryId, EntryStatus, FatigueState,
    FollowUpEntry, LeadId, NurtureStore, PluginAdapter, Task, TaskId, TaskStatus,
};

#[derive(Default)]
struct State {
    entries: HashMap<EntryId, FollowUpEntry>,
    fatigue: HashMap<LeadId, FatigueState>,
    conversations: HashMap<LeadId, ConversationState>,
    tasks: HashMap<TaskId, Task>,
}

impl State {
    fn claim(
        &mut self,
        now: DateTime<Utc>,
        lead_id: Option<&LeadId>,
        limit: usize,
    ) -> Vec<FollowUpEntry> {
        let mut due: Vec<&mut FollowUpEntry> = self
            .entries
            .values_mut()
            .filter(|e| e.is_due(now) && lead_id.is_none_or(|l| *l == e.lead_id))
            .collect();
        due.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        due.into_iter()
            .take(limit)
            .map(|entry| {
                entry.status = EntryStatus::Ready;
                entry.updated_at = now;
                entry.clone()
            })
            .collect()
    }
}

/// Process-local store. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }
}

#[async_trait]
impl NurtureStore for MemoryStore {
    async fn insert_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        if state.entries.contains_key(&entry.id) {
            return Err(CadenceError::Storage {
                source: format!("entry {} already exists", entry.id).into(),
            });
        }
        state.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: &EntryId) -> Result<Option<FollowUpEntry>, CadenceError> {
        Ok(self.state.lock().await.entries.get(id).cloned())
    }

    async fn update_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        match state.entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(())
            }
            None => Err(CadenceError::not_found("entry", &entry.id)),
        }
    }

    async fn open_entries_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        let state = self.state.lock().await;
        let mut open: Vec<FollowUpEntry> = state
            .entries
            .values()
            .filter(|e| e.lead_id == *lead_id && !e.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(open)
    }

    async fn claim_due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        Ok(self.state.lock().await.claim(now, None, limit))
    }

    async fn claim_due_entries_for_lead(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        Ok(self.state.lock().await.claim(now, Some(lead_id), usize::MAX))
    }

    async fn get_fatigue(&self, lead_id: &LeadId) -> Result<Option<FatigueState>, CadenceError> {
        Ok(self.state.lock().await.fatigue.get(lead_id).cloned())
    }

    async fn put_fatigue(&self, fatigue: &FatigueState) -> Result<(), CadenceError> {
        self.state
            .lock()
            .await
            .fatigue
            .insert(fatigue.lead_id.clone(), fatigue.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<ConversationState>, CadenceError> {
        Ok(self.state.lock().await.conversations.get(lead_id).cloned())
    }

    async fn put_conversation(&self, conversation: &ConversationState) -> Result<(), CadenceError> {
        self.state
            .lock()
            .await
            .conversations
            .insert(conversation.lead_id.clone(), conversation.clone());
        Ok(())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CadenceError> {
        self.state
            .lock()
            .await
            .tasks
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, CadenceError> {
        Ok(self.state.lock().await.tasks.get(id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<(), CadenceError> {
        let mut state = self.state.lock().await;
        match state.tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(CadenceError::not_found("task", &task.id)),
        }
    }

    async fn active_task_for_lead(&self, lead_id: &LeadId) -> Result<Option<Task>, CadenceError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| t.lead_id == *lead_id && !t.status.is_terminal())
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn list_tasks(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, CadenceError> {
        let state = self.state.lock().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn close(&self) -> Result<(), CadenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ConversationType;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn claim_is_exclusive_and_ordered() {
        let store = MemoryStore::new();
        let late = FollowUpEntry::new(
            LeadId::from("a"),
            ConversationType::Casual,
            t0() - Duration::minutes(1),
            t0(),
        );
        let early = FollowUpEntry::new(
            LeadId::from("b"),
            ConversationType::Casual,
            t0() - Duration::minutes(5),
            t0(),
        );
        store.insert_entry(&late).await.unwrap();
        store.insert_entry(&early).await.unwrap();

        let claimed = store.claim_due_entries(t0(), 10).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].id, early.id);
        assert!(store.claim_due_entries(t0(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_for_lead_leaves_other_leads_pending() {
        let store = MemoryStore::new();
        let a = FollowUpEntry::new(LeadId::from("a"), ConversationType::Casual, t0(), t0());
        let b = FollowUpEntry::new(LeadId::from("b"), ConversationType::Casual, t0(), t0());
        store.insert_entry(&a).await.unwrap();
        store.insert_entry(&b).await.unwrap();

        let claimed = store
            .claim_due_entries_for_lead(&LeadId::from("a"), t0())
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        let b_stored = store.get_entry(&b.id).await.unwrap().unwrap();
        assert_eq!(b_stored.status, EntryStatus::Pending);
    }

    #[tokio::test]
    async fn update_missing_task_is_not_found() {
        let store = MemoryStore::new();
        let entry = FollowUpEntry::new(LeadId::from("a"), ConversationType::Casual, t0(), t0());
        let task = Task::new(&entry, ConversationType::Casual, "rapport", false, t0());
        assert!(matches!(
            store.update_task(&task).await,
            Err(CadenceError::NotFound { kind: "task", .. })
        ));
    }
}
