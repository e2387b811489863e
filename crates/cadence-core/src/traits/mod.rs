// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! External collaborators (lead store, generator, transport, notifier,
//! sentiment) and the engine's own persistence all extend the
//! [`PluginAdapter`] base trait and use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod adapter;
pub mod content;
pub mod lead_store;
pub mod notifier;
pub mod sentiment;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use content::ContentGenerator;
pub use lead_store::LeadStore;
pub use notifier::Notifier;
pub use sentiment::SentimentAnalyzer;
pub use store::NurtureStore;
pub use transport::Transport;
