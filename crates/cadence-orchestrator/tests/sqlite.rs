// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine state survives a restart on the SQLite store.

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use cadence_config::model::{StorageBackend, StorageConfig};
use cadence_core::{FunnelStage, NurtureStore, OperatingMode, TaskStatus};
use cadence_orchestrator::{Collaborators, Orchestrator};
use cadence_storage::SqliteStore;
use cadence_test_utils::{
    lead, MockGenerator, MockLeadStore, MockNotifier, MockSentiment, MockTransport,
};
use chrono::Duration;
use common::{assert_close, config, id, t0};

fn collaborators(leads: Arc<MockLeadStore>, transport: Arc<MockTransport>) -> Collaborators {
    Collaborators {
        leads,
        generator: Arc::new(MockGenerator::new()),
        transport,
        notifier: Arc::new(MockNotifier::new()),
        sentiment: Arc::new(MockSentiment::new()),
    }
}

async fn open(path: &str) -> Arc<dyn NurtureStore> {
    let storage = StorageConfig {
        backend: StorageBackend::Sqlite,
        database_path: path.to_string(),
        wal_mode: true,
    };
    Arc::new(SqliteStore::open(&storage).await.unwrap())
}

#[tokio::test]
async fn test_schedule_and_fatigue_persist_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.db");
    let path = path.to_str().unwrap();
    let cfg = config(OperatingMode::Auto);
    let leads = Arc::new(MockLeadStore::with_leads(vec![lead("lead-1", FunnelStage::Lead)]));
    let transport = Arc::new(MockTransport::new());

    {
        let store = open(path).await;
        let orchestrator =
            Orchestrator::new(&cfg, store, collaborators(leads.clone(), transport.clone()));
        orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
        let report = orchestrator.tick(t0()).await.unwrap();
        assert_eq!(report.dispatched, 1);
        orchestrator
            .shutdown(StdDuration::from_secs(5))
            .await
            .unwrap();
    }
    assert_eq!(transport.sent_count().await, 1);

    let store = open(path).await;
    let orchestrator = Orchestrator::new(&cfg, store, collaborators(leads, transport));

    let next = orchestrator.next_follow_up(&id("lead-1")).await.unwrap().unwrap();
    assert_close(Some(next.scheduled_at), t0() + Duration::hours(48));
    let fatigue = orchestrator.fatigue_state(&id("lead-1")).await.unwrap();
    assert_eq!(fatigue.contact_log.len(), 1);

    let snapshot = orchestrator.snapshot().await.unwrap();
    assert_eq!(snapshot.count(TaskStatus::Completed), 1);
    assert!(snapshot.open_tasks.is_empty());

    assert_eq!(orchestrator.recover(t0() + Duration::hours(1)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_awaiting_confirmation_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cadence.db");
    let path = path.to_str().unwrap();
    let cfg = config(OperatingMode::SemiAuto);
    let leads = Arc::new(MockLeadStore::with_leads(vec![lead("lead-1", FunnelStage::Lead)]));
    let transport = Arc::new(MockTransport::new());

    {
        let store = open(path).await;
        let orchestrator =
            Orchestrator::new(&cfg, store, collaborators(leads.clone(), transport.clone()));
        orchestrator.start_nurturing(&id("lead-1"), t0()).await.unwrap();
        orchestrator.tick(t0()).await.unwrap();
        orchestrator.shutdown(StdDuration::from_secs(5)).await.unwrap();
    }

    let store = open(path).await;
    let orchestrator = Orchestrator::new(&cfg, store, collaborators(leads, transport.clone()));
    assert_eq!(orchestrator.recover(t0()).await.unwrap(), 0);

    let task = orchestrator.snapshot().await.unwrap().open_tasks[0].clone();
    assert_eq!(task.status, TaskStatus::AwaitingConfirmation);
    orchestrator
        .confirm(&task.id, t0() + Duration::minutes(5))
        .await
        .unwrap();
    orchestrator.drain().await;
    assert_eq!(transport.sent_count().await, 1);
}
