// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External collaborators the orchestrator drives.

use std::sync::Arc;

use cadence_core::{
    AdapterType, ContentGenerator, HealthStatus, LeadStore, Notifier, PluginAdapter,
    SentimentAnalyzer, Transport,
};

/// Handles to every external collaborator.
#[derive(Clone)]
pub struct Collaborators {
    pub leads: Arc<dyn LeadStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub transport: Arc<dyn Transport>,
    pub notifier: Arc<dyn Notifier>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
}

/// Result of one adapter health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterHealth {
    pub name: String,
    pub adapter_type: AdapterType,
    pub status: HealthStatus,
}

impl Collaborators {
    /// Health-check every collaborator. A failing check reports `Unhealthy`.
    pub async fn health_check(&self) -> Vec<AdapterHealth> {
        let adapters: [&dyn PluginAdapter; 5] = [
            self.leads.as_ref(),
            self.generator.as_ref(),
            self.transport.as_ref(),
            self.notifier.as_ref(),
            self.sentiment.as_ref(),
        ];

        let mut report = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let status = match adapter.health_check().await {
                Ok(status) => status,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            };
            report.push(AdapterHealth {
                name: adapter.name().to_string(),
                adapter_type: adapter.adapter_type(),
                status,
            });
        }
        report
    }
}
