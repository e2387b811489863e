// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock sentiment signal. Neutral unless a result was queued.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::{
    AdapterType, CadenceError, Lead, PluginAdapter, Sentiment, SentimentAnalyzer, SentimentLabel,
};

pub struct MockSentiment {
    queued: Arc<Mutex<VecDeque<Sentiment>>>,
}

impl MockSentiment {
    pub fn new() -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub async fn push(&self, label: SentimentLabel, score: f64) {
        self.queued.lock().await.push_back(Sentiment { label, score });
    }
}

impl Default for MockSentiment {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSentiment {
    fn name(&self) -> &str {
        "mock-sentiment"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sentiment
    }
}

#[async_trait]
impl SentimentAnalyzer for MockSentiment {
    async fn analyze(&self, _lead: &Lead, _message: &str) -> Result<Sentiment, CadenceError> {
        Ok(self.queued.lock().await.pop_front().unwrap_or(Sentiment {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }))
    }
}
