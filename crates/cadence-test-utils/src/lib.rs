// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cadence integration tests.
//!
//! Provides mock collaborators and lead fixtures for fast, deterministic
//! tests without a CRM, a messaging network or a text generator.
//!
//! # Components
//!
//! - [`MockLeadStore`] - in-memory lead records with captured patches
//! - [`MockGenerator`] - scripted content generation results
//! - [`MockTransport`] - scripted send results with captured messages
//! - [`MockNotifier`] - captured operator notifications
//! - [`MockSentiment`] - scripted sentiment results

pub mod fixtures;
pub mod mock_generator;
pub mod mock_leads;
pub mod mock_notifier;
pub mod mock_sentiment;
pub mod mock_transport;

pub use fixtures::{lead, lead_with_offset};
pub use mock_generator::MockGenerator;
pub use mock_leads::MockLeadStore;
pub use mock_notifier::{MockNotifier, Notification};
pub use mock_sentiment::MockSentiment;
pub use mock_transport::MockTransport;
