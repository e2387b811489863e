// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait.

use async_trait::async_trait;

use crate::error::SendError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GeneratedContent, Lead, SendReceipt};

/// Delivers a generated message to a lead's messaging peer.
///
/// Rate limiting at the transport level is the transport's concern; the
/// engine reports [`SendError::RateLimited`] as a transient failure and does
/// not retry within the tick.
#[async_trait]
pub trait Transport: PluginAdapter {
    async fn send(&self, lead: &Lead, content: &GeneratedContent)
    -> Result<SendReceipt, SendError>;
}
