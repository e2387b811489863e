// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! Successful sends are captured and retrievable via `sent_messages()`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::{
    AdapterType, GeneratedContent, Lead, LeadId, PluginAdapter, SendError, SendReceipt, Transport,
};

pub struct MockTransport {
    failures: Arc<Mutex<VecDeque<SendError>>>,
    sent: Arc<Mutex<Vec<(LeadId, GeneratedContent)>>>,
    attempts: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            failures: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next send with `error`. Queued failures are used in order.
    pub async fn fail_next(&self, error: SendError) {
        self.failures.lock().await.push_back(error);
    }

    pub async fn sent_messages(&self) -> Vec<(LeadId, GeneratedContent)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Sends attempted, including failed ones.
    pub async fn attempt_count(&self) -> usize {
        *self.attempts.lock().await
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        lead: &Lead,
        content: &GeneratedContent,
    ) -> Result<SendReceipt, SendError> {
        *self.attempts.lock().await += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().await.pop_front() {
            return Err(err);
        }
        self.sent.lock().await.push((lead.id.clone(), content.clone()));
        Ok(SendReceipt {
            message_id: format!("mock-msg-{}", uuid::Uuid::new_v4()),
        })
    }
}
