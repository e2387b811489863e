// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fatigue control: rolling-window contact ceilings, minimum spacing between
//! contacts, and sentiment-driven cooldowns.
//!
//! [`policy`] holds the pure rules; [`FatigueController`] loads and persists
//! per-lead [`FatigueState`](cadence_core::FatigueState) around them.

pub mod controller;
pub mod policy;

pub use controller::FatigueController;
pub use policy::{FatigueDecision, FatiguePolicy};
