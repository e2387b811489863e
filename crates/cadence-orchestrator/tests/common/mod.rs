// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared harness for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use cadence_config::model::{CadenceConfig, StorageBackend};
use cadence_core::{Lead, LeadId, NurtureStore, OperatingMode};
use cadence_orchestrator::{Collaborators, Orchestrator};
use cadence_storage::MemoryStore;
use cadence_test_utils::{
    MockGenerator, MockLeadStore, MockNotifier, MockSentiment, MockTransport,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Monday 10:00 UTC, inside default business hours.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

pub fn id(s: &str) -> LeadId {
    LeadId::from(s)
}

pub fn config(mode: OperatingMode) -> CadenceConfig {
    let mut config = CadenceConfig::default();
    config.storage.backend = StorageBackend::Memory;
    config.orchestrator.mode = mode;
    config
}

/// Assert two instants are within a second of each other.
pub fn assert_close(actual: Option<DateTime<Utc>>, expected: DateTime<Utc>) {
    let actual = actual.unwrap_or_else(|| panic!("expected a time near {expected}, got none"));
    assert!(
        (actual - expected).abs() < Duration::seconds(1),
        "expected {expected}, got {actual}"
    );
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<MemoryStore>,
    pub leads: Arc<MockLeadStore>,
    pub generator: Arc<MockGenerator>,
    pub transport: Arc<MockTransport>,
    pub notifier: Arc<MockNotifier>,
    pub sentiment: Arc<MockSentiment>,
}

impl Harness {
    pub fn new(mode: OperatingMode, leads: Vec<Lead>) -> Self {
        Self::with_parts(config(mode), leads, MockGenerator::new(), MockTransport::new())
    }

    pub fn with_config(config: CadenceConfig, leads: Vec<Lead>) -> Self {
        Self::with_parts(config, leads, MockGenerator::new(), MockTransport::new())
    }

    pub fn with_parts(
        config: CadenceConfig,
        leads: Vec<Lead>,
        generator: MockGenerator,
        transport: MockTransport,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(config, store, leads, generator, transport)
    }

    pub fn with_store(
        config: CadenceConfig,
        store: Arc<MemoryStore>,
        leads: Vec<Lead>,
        generator: MockGenerator,
        transport: MockTransport,
    ) -> Self {
        let leads = Arc::new(MockLeadStore::with_leads(leads));
        let generator = Arc::new(generator);
        let transport = Arc::new(transport);
        let notifier = Arc::new(MockNotifier::new());
        let sentiment = Arc::new(MockSentiment::new());

        let collaborators = Collaborators {
            leads: leads.clone(),
            generator: generator.clone(),
            transport: transport.clone(),
            notifier: notifier.clone(),
            sentiment: sentiment.clone(),
        };
        let orchestrator = Orchestrator::new(
            &config,
            store.clone() as Arc<dyn NurtureStore>,
            collaborators,
        );

        Self {
            orchestrator,
            store,
            leads,
            generator,
            transport,
            notifier,
            sentiment,
        }
    }
}
