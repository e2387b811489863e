// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavior shared by every `NurtureStore` backend.

use std::sync::Arc;

use cadence_config::model::{StorageBackend, StorageConfig};
use cadence_core::{
    ConversationType, EntryStatus, FollowUpEntry, LeadId, NurtureStore, Task, TaskStatus,
};
use cadence_storage::open_store;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

async fn stores(dir: &tempfile::TempDir) -> Vec<Arc<dyn NurtureStore>> {
    let sqlite = StorageConfig {
        backend: StorageBackend::Sqlite,
        database_path: dir.path().join("contract.db").display().to_string(),
        wal_mode: true,
    };
    let memory = StorageConfig {
        backend: StorageBackend::Memory,
        ..sqlite.clone()
    };
    vec![
        open_store(&sqlite).await.unwrap(),
        open_store(&memory).await.unwrap(),
    ]
}

#[tokio::test]
async fn open_entries_exclude_terminal_ones() {
    let dir = tempfile::tempdir().unwrap();
    for store in stores(&dir).await {
        let lead = LeadId::from("lead-1");
        let open = FollowUpEntry::new(lead.clone(), ConversationType::Business, t0(), t0());
        let mut done = FollowUpEntry::new(
            lead.clone(),
            ConversationType::Casual,
            t0() - Duration::hours(1),
            t0(),
        );
        done.status = EntryStatus::Completed;
        store.insert_entry(&open).await.unwrap();
        store.insert_entry(&done).await.unwrap();

        let entries = store.open_entries_for_lead(&lead).await.unwrap();
        assert_eq!(entries.len(), 1, "store {}", store.name());
        assert_eq!(entries[0].id, open.id);
    }
}

#[tokio::test]
async fn concurrent_claims_never_return_an_entry_twice() {
    let dir = tempfile::tempdir().unwrap();
    for store in stores(&dir).await {
        for i in 0..20 {
            let entry = FollowUpEntry::new(
                LeadId(format!("lead-{i}")),
                ConversationType::Casual,
                t0() - Duration::minutes(i),
                t0(),
            );
            store.insert_entry(&entry).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.claim_due_entries(t0(), 7).await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.await.unwrap().into_iter().map(|e| e.id));
        }
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(total, 20, "store {}", store.name());
        assert_eq!(ids.len(), 20, "store {}", store.name());
    }
}

#[tokio::test]
async fn listing_tasks_filters_by_status() {
    let dir = tempfile::tempdir().unwrap();
    for store in stores(&dir).await {
        let entry = FollowUpEntry::new(LeadId::from("lead-1"), ConversationType::Casual, t0(), t0());
        let mut executing = Task::new(&entry, ConversationType::Casual, "rapport", false, t0());
        executing.status = TaskStatus::Executing;
        store.insert_task(&executing).await.unwrap();

        let found = store.list_tasks(&[TaskStatus::Executing]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(store
            .list_tasks(&[TaskStatus::AwaitingConfirmation])
            .await
            .unwrap()
            .is_empty());
        store.close().await.unwrap();
    }
}
