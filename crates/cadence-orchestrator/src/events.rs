// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events fed into the orchestrator loop alongside the tick.

use cadence_config::model::OrchestratorConfig;
use cadence_core::{LeadId, OperatingMode, PresenceSample, TaskId};
use tokio::sync::mpsc;

/// Something that happened outside the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// A presence observation from the messaging network.
    Presence(PresenceSample),
    /// A reply received from a lead.
    Inbound { lead_id: LeadId, message: String },
    /// A human approved an awaiting task.
    Confirm(TaskId),
    /// A human rejected a task.
    SkipTask { task_id: TaskId, reason: String },
    SetMode(OperatingMode),
    StartNurturing(LeadId),
    DisableNurturing(LeadId),
    ClearHalt(LeadId),
}

/// Bounded channel sized by `orchestrator.event_buffer`.
pub fn event_channel(
    config: &OrchestratorConfig,
) -> (
    mpsc::Sender<OrchestratorEvent>,
    mpsc::Receiver<OrchestratorEvent>,
) {
    mpsc::channel(config.event_buffer.max(1))
}
