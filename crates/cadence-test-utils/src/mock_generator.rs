// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock content generator for deterministic testing.
//!
//! Results are popped from a FIFO queue. When the queue is empty the
//! generator succeeds with a message naming the topic hint.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::{
    AdapterType, ContentGenerator, ConversationType, GeneratedContent, GenerationError, Lead,
    LeadId, PluginAdapter,
};

type Call = (LeadId, ConversationType, String);

pub struct MockGenerator {
    results: Arc<Mutex<VecDeque<Result<GeneratedContent, GenerationError>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleep this long before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_result(&self, result: Result<GeneratedContent, GenerationError>) {
        self.results.lock().await.push_back(result);
    }

    pub async fn push_transient(&self, message: &str) {
        self.push_result(Err(GenerationError::Transient(message.to_string())))
            .await;
    }

    /// Every call made so far: lead, conversation type, topic hint.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ContentGenerator
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(
        &self,
        lead: &Lead,
        conversation_type: ConversationType,
        topic_hint: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        self.calls
            .lock()
            .await
            .push((lead.id.clone(), conversation_type, topic_hint.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results.lock().await.pop_front().unwrap_or_else(|| {
            Ok(GeneratedContent {
                text: format!("{conversation_type} message: {topic_hint}"),
            })
        })
    }
}
