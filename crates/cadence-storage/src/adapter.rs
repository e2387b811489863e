// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`NurtureStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cadence_config::model::StorageConfig;
use cadence_core::{
    AdapterType, CadenceError, ConversationState, EntryId, FatigueState, FollowUpEntry,
    HealthStatus, LeadId, NurtureStore, PluginAdapter, Task, TaskId, TaskStatus,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed engine store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, CadenceError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl NurtureStore for SqliteStore {
    async fn insert_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError> {
        queries::entries::insert(&self.db, entry).await
    }

    async fn get_entry(&self, id: &EntryId) -> Result<Option<FollowUpEntry>, CadenceError> {
        queries::entries::get(&self.db, id).await
    }

    async fn update_entry(&self, entry: &FollowUpEntry) -> Result<(), CadenceError> {
        queries::entries::update(&self.db, entry).await
    }

    async fn open_entries_for_lead(
        &self,
        lead_id: &LeadId,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        queries::entries::open_for_lead(&self.db, lead_id).await
    }

    async fn claim_due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        queries::entries::claim_due(&self.db, now, None, Some(limit)).await
    }

    async fn claim_due_entries_for_lead(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        queries::entries::claim_due(&self.db, now, Some(lead_id), None).await
    }

    async fn get_fatigue(&self, lead_id: &LeadId) -> Result<Option<FatigueState>, CadenceError> {
        queries::fatigue::get(&self.db, lead_id).await
    }

    async fn put_fatigue(&self, state: &FatigueState) -> Result<(), CadenceError> {
        queries::fatigue::put(&self.db, state).await
    }

    async fn get_conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<ConversationState>, CadenceError> {
        queries::conversations::get(&self.db, lead_id).await
    }

    async fn put_conversation(&self, state: &ConversationState) -> Result<(), CadenceError> {
        queries::conversations::put(&self.db, state).await
    }

    async fn insert_task(&self, task: &Task) -> Result<(), CadenceError> {
        queries::tasks::insert(&self.db, task).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, CadenceError> {
        queries::tasks::get(&self.db, id).await
    }

    async fn update_task(&self, task: &Task) -> Result<(), CadenceError> {
        queries::tasks::update(&self.db, task).await
    }

    async fn active_task_for_lead(&self, lead_id: &LeadId) -> Result<Option<Task>, CadenceError> {
        queries::tasks::active_for_lead(&self.db, lead_id).await
    }

    async fn list_tasks(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, CadenceError> {
        queries::tasks::list_by_status(&self.db, statuses).await
    }

    async fn close(&self) -> Result<(), CadenceError> {
        self.db.checkpoint().await
    }
}
