// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-backed fatigue controller.
//!
//! Callers are expected to hold the lead's lock across a read-modify-write
//! (`record_contact`, `apply_negative_sentiment`).

use std::sync::Arc;

use cadence_config::model::FatigueConfig;
use cadence_core::{CadenceError, FatigueState, Lead, LeadId, NurtureStore};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::policy::{FatigueDecision, FatiguePolicy};

pub struct FatigueController {
    policy: FatiguePolicy,
    store: Arc<dyn NurtureStore>,
}

impl FatigueController {
    pub fn new(config: &FatigueConfig, store: Arc<dyn NurtureStore>) -> Self {
        Self {
            policy: FatiguePolicy::from_config(config),
            store,
        }
    }

    /// Current persisted state, or a fresh one for leads never contacted.
    pub async fn state(&self, lead_id: &LeadId) -> Result<FatigueState, CadenceError> {
        Ok(self
            .store
            .get_fatigue(lead_id)
            .await?
            .unwrap_or_else(|| FatigueState::new(lead_id.clone())))
    }

    /// Whether `lead` may be contacted at `now`. Read-only.
    pub async fn evaluate(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<FatigueDecision, CadenceError> {
        let state = self.state(&lead.id).await?;
        let ceiling = self.policy.ceiling(lead.nurturing.max_contacts_per_window);
        Ok(self.policy.evaluate(&state, ceiling, now))
    }

    /// Count a confirmed send. Only successful sends reach this.
    pub async fn record_contact(
        &self,
        lead: &Lead,
        at: DateTime<Utc>,
    ) -> Result<FatigueState, CadenceError> {
        let mut state = self.state(&lead.id).await?;
        let ceiling = self.policy.ceiling(lead.nurturing.max_contacts_per_window);
        self.policy.record(&mut state, ceiling, at);

        let in_window = state.contacts_in_window(self.policy.window, at);
        if in_window >= ceiling {
            warn!(
                lead_id = %lead.id,
                contacts = in_window,
                ceiling,
                cooldown_until = ?state.cooldown_until,
                "contact ceiling reached"
            );
        }

        self.store.put_fatigue(&state).await?;
        Ok(state)
    }

    /// Extend the lead's cooldown after a negative reply.
    pub async fn apply_negative_sentiment(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<FatigueState, CadenceError> {
        let mut state = self.state(lead_id).await?;
        self.policy.negative_backoff(&mut state, now);
        info!(
            lead_id = %lead_id,
            cooldown_until = ?state.cooldown_until,
            "negative sentiment backoff applied"
        );
        self.store.put_fatigue(&state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{FunnelStage, LeadScores, LeadStats, NurturingConfig};
    use cadence_storage::MemoryStore;
    use chrono::{Duration, TimeZone};

    use crate::policy::{NEGATIVE_SENTIMENT, RATE_CEILING};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn lead(limit: Option<u32>) -> Lead {
        Lead {
            id: LeadId::from("lead-1"),
            peer_id: "peer-1".into(),
            stage: FunnelStage::Lead,
            scores: LeadScores::default(),
            is_nurturing: true,
            nurturing: NurturingConfig {
                max_contacts_per_window: limit,
                ..NurturingConfig::default()
            },
            utc_offset_minutes: None,
            last_interaction_at: None,
            next_follow_up_at: None,
            stats: LeadStats::default(),
            flagged_reason: None,
        }
    }

    fn controller() -> FatigueController {
        let config = FatigueConfig {
            min_gap_minutes: 0,
            ..FatigueConfig::default()
        };
        FatigueController::new(&config, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn unknown_lead_is_contactable() {
        let c = controller();
        let decision = c.evaluate(&lead(None), t0()).await.unwrap();
        assert!(decision.contactable);
    }

    #[tokio::test]
    async fn per_lead_limit_applies_before_global_ceiling() {
        let c = controller();
        let l = lead(Some(2));
        c.record_contact(&l, t0()).await.unwrap();
        c.record_contact(&l, t0() + Duration::hours(1)).await.unwrap();

        let decision = c.evaluate(&l, t0() + Duration::hours(2)).await.unwrap();
        assert!(!decision.contactable);
        assert_eq!(decision.reason.as_deref(), Some(RATE_CEILING));
    }

    #[tokio::test]
    async fn negative_sentiment_persists_cooldown() {
        let c = controller();
        let l = lead(None);
        c.apply_negative_sentiment(&l.id, t0()).await.unwrap();

        let decision = c.evaluate(&l, t0()).await.unwrap();
        assert_eq!(decision.reason.as_deref(), Some(NEGATIVE_SENTIMENT));
        assert_eq!(decision.next_allowed_at, Some(t0() + Duration::hours(12)));
        assert!(c.evaluate(&l, t0() + Duration::hours(12)).await.unwrap().contactable);
    }
}
