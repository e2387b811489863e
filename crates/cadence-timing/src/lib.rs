// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence monitoring and timing recommendation.
//!
//! The [`PresenceMonitor`] keeps a bounded, per-peer history of presence
//! samples and derives a time-decayed hour-of-day [`ActivityPattern`]. The
//! [`TimingRecommender`] turns a pattern into ranked send-time candidates.

pub mod presence;
pub mod recommender;

pub use presence::{ActivityPattern, PresenceMonitor, PresenceTransition};
pub use recommender::{Candidate, TimingRecommender};
