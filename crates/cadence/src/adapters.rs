// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dry-run collaborators for running the engine without external services.
//!
//! Leads come from a JSON file that is rewritten on every update. Messages
//! are rendered from templates and logged instead of sent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cadence_core::{
    AdapterType, CadenceError, ContentGenerator, ConversationType, GeneratedContent,
    GenerationError, HealthStatus, Lead, LeadFilter, LeadId, LeadPatch, LeadStore,
    NotificationKind, NotificationPriority, Notifier, PluginAdapter, SendError, SendReceipt,
    Sentiment, SentimentAnalyzer, SentimentLabel, Transport,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

fn storage_error(e: impl std::error::Error + Send + Sync + 'static) -> CadenceError {
    CadenceError::Storage {
        source: Box::new(e),
    }
}

/// Lead store backed by a JSON array of lead records.
pub struct JsonLeadStore {
    path: PathBuf,
    leads: Mutex<HashMap<LeadId, Lead>>,
}

impl JsonLeadStore {
    /// Load the file. A missing file starts an empty store.
    pub async fn open(path: &Path) -> Result<Self, CadenceError> {
        let leads: Vec<Lead> = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(storage_error)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "lead file not found, starting empty");
                Vec::new()
            }
            Err(e) => return Err(storage_error(e)),
        };
        info!(path = %path.display(), count = leads.len(), "leads loaded");

        Ok(Self {
            path: path.to_path_buf(),
            leads: Mutex::new(leads.into_iter().map(|l| (l.id.clone(), l)).collect()),
        })
    }

    async fn persist(&self, leads: &HashMap<LeadId, Lead>) -> Result<(), CadenceError> {
        let mut records: Vec<&Lead> = leads.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let content = serde_json::to_string_pretty(&records).map_err(storage_error)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(storage_error)
    }
}

#[async_trait]
impl PluginAdapter for JsonLeadStore {
    fn name(&self) -> &str {
        "json-lead-store"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LeadStore
    }

    async fn health_check(&self) -> Result<HealthStatus, CadenceError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => Ok(
                HealthStatus::Unhealthy(format!("directory {} does not exist", dir.display())),
            ),
            _ => Ok(HealthStatus::Healthy),
        }
    }
}

#[async_trait]
impl LeadStore for JsonLeadStore {
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, CadenceError> {
        Ok(self.leads.lock().await.get(id).cloned())
    }

    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead, CadenceError> {
        let mut leads = self.leads.lock().await;
        let lead = leads
            .get_mut(id)
            .ok_or_else(|| CadenceError::not_found("lead", id))?;
        patch.apply(lead);
        let updated = lead.clone();
        self.persist(&leads).await?;
        Ok(updated)
    }

    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, CadenceError> {
        let leads = self.leads.lock().await;
        let mut matching: Vec<Lead> = leads.values().filter(|l| filter.matches(l)).cloned().collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }
}

/// Renders a fixed message per conversation type and topic hint.
pub struct TemplateGenerator;

#[async_trait]
impl PluginAdapter for TemplateGenerator {
    fn name(&self) -> &str {
        "template-generator"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ContentGenerator
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(
        &self,
        lead: &Lead,
        conversation_type: ConversationType,
        topic_hint: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        let text = match (conversation_type, topic_hint) {
            (ConversationType::Business, "purchase-follow-up") => {
                "Thanks for asking! Here are the details you were looking for.".to_string()
            }
            (ConversationType::Business, topic) => {
                format!("Hi! Following up with something useful ({topic}).")
            }
            (ConversationType::Casual, "empathy-check-in") => {
                "Hope things are going better. No agenda, just checking in.".to_string()
            }
            (ConversationType::Casual, _) => "Hey, how has your week been?".to_string(),
        };
        debug!(lead_id = %lead.id, %conversation_type, topic_hint, "content rendered");
        Ok(GeneratedContent { text })
    }
}

/// Logs every message and reports it delivered.
pub struct DryRunTransport;

#[async_trait]
impl PluginAdapter for DryRunTransport {
    fn name(&self) -> &str {
        "dry-run-transport"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn send(
        &self,
        lead: &Lead,
        content: &GeneratedContent,
    ) -> Result<SendReceipt, SendError> {
        let message_id = format!("dry-run-{}", uuid::Uuid::new_v4());
        info!(
            lead_id = %lead.id,
            peer_id = lead.peer_id.as_str(),
            message_id = message_id.as_str(),
            text = content.text.as_str(),
            "dry-run send"
        );
        Ok(SendReceipt { message_id })
    }
}

/// Writes notifications to the log at a level matching their priority.
pub struct LogNotifier;

#[async_trait]
impl PluginAdapter for LogNotifier {
    fn name(&self) -> &str {
        "log-notifier"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }
}

impl Notifier for LogNotifier {
    fn notify(
        &self,
        kind: NotificationKind,
        priority: NotificationPriority,
        payload: serde_json::Value,
    ) {
        if priority >= NotificationPriority::High {
            warn!(%kind, %priority, %payload, "operator notification");
        } else {
            info!(%kind, %priority, %payload, "operator notification");
        }
    }
}

const NEGATIVE_WORDS: &[&str] = &[
    "stop", "unsubscribe", "annoying", "spam", "not interested", "leave me", "angry", "terrible",
];
const POSITIVE_WORDS: &[&str] = &[
    "thanks", "thank you", "great", "love", "awesome", "interested", "perfect", "sounds good",
];

/// Keyword-count sentiment. Crude, but enough to exercise cooldowns.
pub struct KeywordSentiment;

impl KeywordSentiment {
    fn score(message: &str) -> f64 {
        let lower = message.to_lowercase();
        let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
        if negative + positive == 0.0 {
            return 0.0;
        }
        (positive - negative) / (positive + negative)
    }
}

#[async_trait]
impl PluginAdapter for KeywordSentiment {
    fn name(&self) -> &str {
        "keyword-sentiment"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sentiment
    }
}

#[async_trait]
impl SentimentAnalyzer for KeywordSentiment {
    async fn analyze(&self, _lead: &Lead, message: &str) -> Result<Sentiment, CadenceError> {
        let score = Self::score(message);
        let label = if score <= -0.3 {
            SentimentLabel::Negative
        } else if score >= 0.3 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        };
        Ok(Sentiment { label, score })
    }
}
