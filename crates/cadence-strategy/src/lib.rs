// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation strategy selection.
//!
//! [`StrategySelector`] is a deterministic, priority-ordered rule set that
//! picks the next conversation type and topic for a lead. [`signals`] holds
//! the reply-side inputs it depends on: purchase-signal detection and the
//! sentiment trend.

pub mod selector;
pub mod signals;

pub use selector::{StrategyDecision, StrategyRule, StrategySelector};
pub use signals::{detect_purchase_signal, update_sentiment_trend};
