// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all collaborators implement.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for every Cadence collaborator.
///
/// Provides identity and a health check used by `cadence serve` at startup.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the kind of collaborator this adapter implements.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        Ok(HealthStatus::Healthy)
    }
}
