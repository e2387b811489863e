// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority-ordered conversation strategy rules.
//!
//! Rules, first match wins:
//! 1. An unhandled purchase signal forces an urgent business contact.
//! 2. Too many unanswered contacts forces a casual contact.
//! 3. A negative sentiment trend forces a casual contact.
//! 4. Otherwise alternate to whichever channel was used longer ago, with
//!    biased funnel stages crediting the business channel extra age.

use cadence_config::model::StrategyConfig;
use cadence_core::{ConversationState, ConversationType, FunnelStage, Lead};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::Display;

use crate::signals::NEGATIVE_TREND_THRESHOLD;

/// The rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StrategyRule {
    PurchaseSignal,
    NoReply,
    NegativeTrend,
    Alternation,
}

/// Task parameters for the next contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    pub conversation_type: ConversationType,
    pub topic_hint: String,
    pub urgent: bool,
    pub rule: StrategyRule,
}

pub struct StrategySelector {
    no_reply_threshold: u32,
    business_bias: Duration,
    biased_stages: Vec<FunnelStage>,
    business_cadence: Duration,
    casual_cadence: Duration,
    urgent_cadence: Duration,
}

impl StrategySelector {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            no_reply_threshold: config.no_reply_threshold,
            business_bias: Duration::hours(config.business_bias_hours as i64),
            biased_stages: config.biased_stages.clone(),
            business_cadence: Duration::hours(config.business_cadence_hours as i64),
            casual_cadence: Duration::hours(config.casual_cadence_hours as i64),
            urgent_cadence: Duration::hours(config.urgent_cadence_hours as i64),
        }
    }

    fn is_biased(&self, stage: FunnelStage) -> bool {
        self.biased_stages.contains(&stage)
    }

    /// Pick the next conversation. Pure and deterministic.
    pub fn select(
        &self,
        stage: FunnelStage,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> StrategyDecision {
        if state.unhandled_purchase_signal {
            return StrategyDecision {
                conversation_type: ConversationType::Business,
                topic_hint: "purchase-follow-up".into(),
                urgent: true,
                rule: StrategyRule::PurchaseSignal,
            };
        }

        if state.consecutive_no_reply_count > self.no_reply_threshold {
            return StrategyDecision {
                conversation_type: ConversationType::Casual,
                topic_hint: "light-reconnect".into(),
                urgent: false,
                rule: StrategyRule::NoReply,
            };
        }

        if state.sentiment_trend < NEGATIVE_TREND_THRESHOLD {
            return StrategyDecision {
                conversation_type: ConversationType::Casual,
                topic_hint: "empathy-check-in".into(),
                urgent: false,
                rule: StrategyRule::NegativeTrend,
            };
        }

        let conversation_type = self.alternate(stage, state, now);
        StrategyDecision {
            conversation_type,
            topic_hint: default_topic(stage, conversation_type).into(),
            urgent: false,
            rule: StrategyRule::Alternation,
        }
    }

    fn alternate(
        &self,
        stage: FunnelStage,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> ConversationType {
        let biased = self.is_biased(stage);
        let (business, casual) = (state.last_business_attempt_at, state.last_casual_attempt_at);

        match (business, casual) {
            (None, None) if biased => ConversationType::Business,
            (None, None) => ConversationType::Casual,
            (None, Some(_)) => ConversationType::Business,
            (Some(_), None) => ConversationType::Casual,
            (Some(b), Some(c)) => {
                let mut business_age = now - b;
                if biased {
                    business_age += self.business_bias;
                }
                if business_age >= now - c {
                    ConversationType::Business
                } else {
                    ConversationType::Casual
                }
            }
        }
    }

    /// Like [`select`](Self::select), then applies the lead's channel
    /// allow-list. Returns `None` when no channel is allowed.
    pub fn select_for_lead(
        &self,
        lead: &Lead,
        state: &ConversationState,
        now: DateTime<Utc>,
    ) -> Option<StrategyDecision> {
        let decision = self.select(lead.stage, state, now);
        if lead.nurturing.allows(decision.conversation_type) {
            return Some(decision);
        }

        let other = decision.conversation_type.other();
        if !lead.nurturing.allows(other) {
            return None;
        }
        Some(StrategyDecision {
            conversation_type: other,
            topic_hint: default_topic(lead.stage, other).into(),
            ..decision
        })
    }

    /// Delay before the next follow-up after a contact on `conversation_type`.
    pub fn cadence(&self, conversation_type: ConversationType, urgent: bool) -> Duration {
        if urgent {
            return self.urgent_cadence;
        }
        match conversation_type {
            ConversationType::Business => self.business_cadence,
            ConversationType::Casual => self.casual_cadence,
        }
    }
}

fn default_topic(stage: FunnelStage, conversation_type: ConversationType) -> &'static str {
    match (conversation_type, stage) {
        (ConversationType::Business, FunnelStage::Qualified) => "proposal-check-in",
        (ConversationType::Business, FunnelStage::Customer) => "account-review",
        (ConversationType::Business, FunnelStage::Advocate) => "referral-ask",
        (ConversationType::Business, FunnelStage::Dormant) => "win-back-offer",
        (ConversationType::Business, _) => "value-offer",
        (ConversationType::Casual, FunnelStage::Dormant) => "reconnect",
        (ConversationType::Casual, _) => "rapport",
    }
}
