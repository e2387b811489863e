// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock lead store for deterministic testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::{
    AdapterType, CadenceError, Lead, LeadFilter, LeadId, LeadPatch, LeadStore, PluginAdapter,
};

/// In-memory lead records.
///
/// Every patch passed to `update()` is captured for assertion.
pub struct MockLeadStore {
    leads: Arc<Mutex<HashMap<LeadId, Lead>>>,
    patches: Arc<Mutex<Vec<(LeadId, LeadPatch)>>>,
}

impl MockLeadStore {
    pub fn new() -> Self {
        Self {
            leads: Arc::new(Mutex::new(HashMap::new())),
            patches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_leads(leads: impl IntoIterator<Item = Lead>) -> Self {
        let map = leads.into_iter().map(|l| (l.id.clone(), l)).collect();
        Self {
            leads: Arc::new(Mutex::new(map)),
            patches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Insert or replace a lead record.
    pub async fn insert(&self, lead: Lead) {
        self.leads.lock().await.insert(lead.id.clone(), lead);
    }

    /// Current record for a lead.
    pub async fn lead(&self, id: &str) -> Option<Lead> {
        self.leads.lock().await.get(&LeadId::from(id)).cloned()
    }

    /// Mutate a stored record directly, bypassing patch capture.
    pub async fn modify(&self, id: &str, f: impl FnOnce(&mut Lead)) {
        if let Some(lead) = self.leads.lock().await.get_mut(&LeadId::from(id)) {
            f(lead);
        }
    }

    /// All patches applied so far, oldest first.
    pub async fn patches(&self) -> Vec<(LeadId, LeadPatch)> {
        self.patches.lock().await.clone()
    }
}

impl Default for MockLeadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockLeadStore {
    fn name(&self) -> &str {
        "mock-leads"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LeadStore
    }
}

#[async_trait]
impl LeadStore for MockLeadStore {
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, CadenceError> {
        Ok(self.leads.lock().await.get(id).cloned())
    }

    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead, CadenceError> {
        let mut leads = self.leads.lock().await;
        let lead = leads
            .get_mut(id)
            .ok_or_else(|| CadenceError::not_found("lead", id))?;
        patch.apply(lead);
        let updated = lead.clone();
        drop(leads);

        self.patches.lock().await.push((id.clone(), patch));
        Ok(updated)
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, CadenceError> {
        let mut matched: Vec<Lead> = self
            .leads
            .lock()
            .await
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }
}
