// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentiment signal trait.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Lead, Sentiment};

/// Classifies an inbound message from a lead.
#[async_trait]
pub trait SentimentAnalyzer: PluginAdapter {
    async fn analyze(&self, lead: &Lead, message: &str) -> Result<Sentiment, CadenceError>;
}
