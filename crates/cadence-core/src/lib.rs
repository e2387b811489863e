// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence lead nurturing engine.
//!
//! This crate provides the collaborator trait definitions, error types, and
//! domain types shared by every other crate in the workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CadenceError, GenerationError, SendError};
pub use types::{
    AdapterType, ConversationState, ConversationType, EntryId, EntryStatus, FatigueState,
    FollowUpEntry, FunnelStage, GeneratedContent, HealthStatus, Lead, LeadFilter, LeadId,
    LeadPatch, LeadScores, LeadStats, NotificationKind, NotificationPriority, NurturingConfig,
    OperatingMode, PresenceSample, PresenceStatus, SendReceipt, Sentiment, SentimentLabel, Task,
    TaskId, TaskStatus,
};

pub use traits::{
    ContentGenerator, LeadStore, Notifier, NurtureStore, PluginAdapter, SentimentAnalyzer,
    Transport,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::LeadStore,
            AdapterType::Storage,
            AdapterType::ContentGenerator,
            AdapterType::Transport,
            AdapterType::Notifier,
            AdapterType::Sentiment,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin<T: PluginAdapter>() {}
        fn _assert_lead_store<T: LeadStore>() {}
        fn _assert_generator<T: ContentGenerator>() {}
        fn _assert_transport<T: Transport>() {}
        fn _assert_notifier<T: Notifier>() {}
        fn _assert_sentiment<T: SentimentAnalyzer>() {}
        fn _assert_store<T: NurtureStore>() {}
    }

    #[test]
    fn traits_are_object_safe() {
        fn _lead_store(_: &dyn LeadStore) {}
        fn _store(_: &dyn NurtureStore) {}
        fn _notifier(_: &dyn Notifier) {}
    }
}
