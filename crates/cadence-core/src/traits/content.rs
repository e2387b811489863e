// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content generator trait.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConversationType, GeneratedContent, Lead};

/// Produces message text for an outreach task.
#[async_trait]
pub trait ContentGenerator: PluginAdapter {
    async fn generate(
        &self,
        lead: &Lead,
        conversation_type: ConversationType,
        topic_hint: &str,
    ) -> Result<GeneratedContent, GenerationError>;
}
