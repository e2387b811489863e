// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrator for the Cadence nurturing engine.
//!
//! The [`Orchestrator`] is the single coordinator that:
//! - Claims due follow-ups on a fixed tick and on presence changes
//! - Gates each contact through the fatigue controller
//! - Defers contacts the timing recommender can place better
//! - Builds tasks from the strategy selector's decision
//! - Executes them in a bounded worker pool (auto) or waits for a human (semi-auto)
//! - Records outcomes and re-arms the next follow-up
//!
//! Every per-lead mutation happens under that lead's lock. Only content
//! generation and sending run outside it.

pub mod collaborators;
mod confirmation;
pub mod events;
mod execution;
mod inbound;
mod lifecycle;
mod locks;
mod orchestrator;
mod outcome;
pub mod shutdown;
pub mod snapshot;

pub use collaborators::{AdapterHealth, Collaborators};
pub use events::{event_channel, OrchestratorEvent};
pub use inbound::InboundOutcome;
pub use lifecycle::DisableReport;
pub use orchestrator::{EntryOutcome, Orchestrator, TickReport};
pub use snapshot::QueueSnapshot;

/// Reasons recorded on skipped entries and tasks.
pub mod reasons {
    pub const LEAD_NOT_FOUND: &str = "lead-not-found";
    pub const NURTURING_DISABLED: &str = "nurturing-disabled";
    pub const LEAD_HALTED: &str = "lead-halted";
    pub const TASK_IN_FLIGHT: &str = "task-in-flight";
    pub const NOT_CONTACTABLE: &str = "not-contactable";
    pub const CHANNEL_NOT_ALLOWED: &str = "channel-not-allowed";
    pub const INTERRUPTED: &str = "interrupted";
    pub const OPERATOR_SKIPPED: &str = "operator-skipped";
    pub const SENT: &str = "sent";
}
