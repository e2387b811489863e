// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead store trait. The store owns canonical lead records.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Lead, LeadFilter, LeadId, LeadPatch};

/// Access to the external CRM lead records.
///
/// Updates are last-write-wins; the engine never caches a [`Lead`] across
/// ticks.
#[async_trait]
pub trait LeadStore: PluginAdapter {
    /// Fetch a lead by id. Returns `Ok(None)` for unknown leads.
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, CadenceError>;

    /// Apply a partial update and return the updated record.
    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead, CadenceError>;

    /// List leads matching the filter.
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, CadenceError>;
}
