// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cadence nurturing engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::{ConversationType, LeadId};

/// The primary error type used across all Cadence components and collaborator traits.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Bad input rejected synchronously (e.g. scheduling in the distant past).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown lead, entry, or task, or an entry that is already terminal.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An equivalent open follow-up entry already exists for the lead.
    #[error("duplicate follow-up entry for lead {lead_id} ({conversation_type})")]
    DuplicateEntry {
        lead_id: LeadId,
        conversation_type: ConversationType,
    },

    /// Generator or transport failure that may succeed on a later attempt.
    #[error("transient error: {message}")]
    Transient { message: String },

    /// Permanent failure (banned lead or channel). Scheduling halts until manual clear.
    #[error("fatal error: {message}")]
    Fatal { message: String },

    /// A confirmation TTL or generation/send deadline was exceeded.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CadenceError {
    /// Shorthand for a [`CadenceError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the orchestrator may retry the operation once within the tick.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Whether the error halts scheduling for the lead.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Short machine-readable reason recorded on terminal entries and tasks.
    pub fn reason(&self) -> String {
        match self {
            Self::Validation(_) => "validation".into(),
            Self::NotFound { kind, .. } => format!("{kind}-not-found"),
            Self::DuplicateEntry { .. } => "duplicate-entry".into(),
            Self::Transient { message } => format!("transient: {message}"),
            Self::Fatal { message } => format!("fatal: {message}"),
            Self::Timeout { operation, .. } => format!("{operation}-timeout"),
            Self::Storage { .. } => "storage".into(),
            Self::Config(_) => "config".into(),
            Self::Internal(_) => "internal".into(),
        }
    }
}

/// Failure reported by the external content generator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Temporary failure; retried at most once.
    #[error("generator unavailable: {0}")]
    Transient(String),

    /// The generator refused to produce content for this request.
    #[error("generation rejected: {0}")]
    Rejected(String),
}

impl From<GenerationError> for CadenceError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Transient(message) => CadenceError::Transient { message },
            GenerationError::Rejected(message) => {
                CadenceError::Internal(format!("generation rejected: {message}"))
            }
        }
    }
}

/// Failure reported by the messaging transport.
///
/// None of these are retried within the tick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("rate limited by transport")]
    RateLimited,

    #[error("peer unreachable: {0}")]
    Unreachable(String),

    #[error("banned: {0}")]
    Banned(String),
}

impl From<SendError> for CadenceError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::RateLimited => CadenceError::Transient {
                message: "rate limited".into(),
            },
            SendError::Unreachable(detail) => CadenceError::Transient {
                message: format!("unreachable: {detail}"),
            },
            SendError::Banned(detail) => CadenceError::Fatal { message: detail },
        }
    }
}
