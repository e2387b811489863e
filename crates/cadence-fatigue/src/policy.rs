// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure fatigue rules. Nothing here reads the clock or touches storage.

use cadence_config::model::FatigueConfig;
use cadence_core::FatigueState;
use chrono::{DateTime, Duration, Utc};

/// Reason recorded when the rolling-window ceiling blocks a contact.
pub const RATE_CEILING: &str = "rate-ceiling";
pub const MIN_GAP: &str = "min-gap";
pub const NEGATIVE_SENTIMENT: &str = "negative-sentiment-backoff";
/// Fallback reason for a cooldown set without one.
pub const COOLDOWN: &str = "cooldown";

/// Outcome of a fatigue check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatigueDecision {
    pub contactable: bool,
    /// Why the lead is not contactable. `None` when contactable.
    pub reason: Option<String>,
    /// Earliest moment a contact is allowed. Equals `now` when contactable;
    /// `None` when no contact is possible under the current ceiling.
    pub next_allowed_at: Option<DateTime<Utc>>,
}

impl FatigueDecision {
    fn allowed(now: DateTime<Utc>) -> Self {
        Self {
            contactable: true,
            reason: None,
            next_allowed_at: Some(now),
        }
    }

    fn blocked(reason: impl Into<String>, next: Option<DateTime<Utc>>) -> Self {
        Self {
            contactable: false,
            reason: Some(reason.into()),
            next_allowed_at: next,
        }
    }
}

/// Fatigue limits resolved from `[fatigue]` configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FatiguePolicy {
    pub window: Duration,
    pub max_contacts: u32,
    pub min_gap: Duration,
    pub base_cooldown: Duration,
    pub backoff_factor: f64,
    /// No cooldown, however extended, reaches past `now + max_cooldown`.
    pub max_cooldown: Duration,
}

impl FatiguePolicy {
    pub fn from_config(config: &FatigueConfig) -> Self {
        Self {
            window: config.window(),
            max_contacts: config.max_contacts,
            min_gap: config.min_gap(),
            base_cooldown: config.base_cooldown(),
            backoff_factor: config.negative_backoff_factor,
            max_cooldown: config.max_cooldown(),
        }
    }

    /// Effective ceiling for a lead. A per-lead limit can only lower the global one.
    pub fn ceiling(&self, lead_limit: Option<u32>) -> u32 {
        lead_limit.map_or(self.max_contacts, |limit| limit.min(self.max_contacts))
    }

    /// Decide whether the lead may be contacted at `now`.
    ///
    /// Checks, in order: an active cooldown, the rolling-window ceiling, and
    /// the minimum gap since the last contact.
    pub fn evaluate(
        &self,
        state: &FatigueState,
        ceiling: u32,
        now: DateTime<Utc>,
    ) -> FatigueDecision {
        if let Some(until) = state.cooldown_until
            && until > now
        {
            let reason = state.cooldown_reason.as_deref().unwrap_or(COOLDOWN);
            return FatigueDecision::blocked(reason, Some(until));
        }

        if state.contacts_in_window(self.window, now) >= ceiling {
            let next = state
                .earliest_in_window(self.window, now)
                .map(|earliest| earliest + self.window);
            return FatigueDecision::blocked(RATE_CEILING, next);
        }

        if self.min_gap > Duration::zero()
            && let Some(last) = state.last_contact_at
            && last + self.min_gap > now
        {
            return FatigueDecision::blocked(MIN_GAP, Some(last + self.min_gap));
        }

        FatigueDecision::allowed(now)
    }

    /// Record a confirmed send at `at`.
    ///
    /// Evicts contacts that aged out of the window. When the ceiling is
    /// reached, a cooldown is set until the earliest contact ages out.
    pub fn record(&self, state: &mut FatigueState, ceiling: u32, at: DateTime<Utc>) {
        let window_start = at - self.window;
        state.contact_log.retain(|t| *t > window_start);
        state.contact_log.push(at);
        state.contact_log.sort();
        state.last_contact_at = Some(state.last_contact_at.map_or(at, |last| last.max(at)));

        if state.contacts_in_window(self.window, at) >= ceiling
            && let Some(earliest) = state.earliest_in_window(self.window, at)
        {
            let until = earliest + self.window;
            if state.cooldown_until.is_none_or(|current| current < until) {
                state.cooldown_until = Some(until);
                state.cooldown_reason = Some(RATE_CEILING.to_string());
            }
        }
    }

    /// Extend the cooldown after negative sentiment at `now`.
    ///
    /// The remaining cooldown (at least the base cooldown) is multiplied by
    /// the backoff factor and counted from `now`, capped at `max_cooldown`.
    pub fn negative_backoff(&self, state: &mut FatigueState, now: DateTime<Utc>) {
        let cap = self.max_cooldown.max(Duration::zero());
        let remaining = state
            .cooldown_until
            .map(|until| until.signed_duration_since(now))
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(Duration::zero)
            .min(cap);
        let base = remaining.max(self.base_cooldown).min(cap);

        let scaled = base.num_milliseconds() as f64 * self.backoff_factor;
        let extension = if scaled.is_finite() && scaled < cap.num_milliseconds() as f64 {
            Duration::milliseconds(scaled.round().max(0.0) as i64)
        } else {
            cap
        };

        state.cooldown_until = Some(
            now.checked_add_signed(extension)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        state.cooldown_reason = Some(NEGATIVE_SENTIMENT.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::LeadId;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn policy() -> FatiguePolicy {
        FatiguePolicy::from_config(&FatigueConfig::default())
    }

    fn no_gap() -> FatiguePolicy {
        FatiguePolicy {
            min_gap: Duration::zero(),
            ..policy()
        }
    }

    #[test]
    fn five_contacts_hit_rate_ceiling_until_earliest_ages_out() {
        let p = no_gap();
        let mut state = FatigueState::new(LeadId::from("l1"));
        for h in 0..5 {
            p.record(&mut state, 5, t0() + Duration::hours(h));
        }
        let now = t0() + Duration::hours(6);
        // Clear the ceiling cooldown so the window count alone decides.
        state.cooldown_until = None;
        state.cooldown_reason = None;

        let decision = p.evaluate(&state, 5, now);
        assert!(!decision.contactable);
        assert_eq!(decision.reason.as_deref(), Some(RATE_CEILING));
        assert_eq!(decision.next_allowed_at, Some(t0() + Duration::hours(24)));
    }

    #[test]
    fn reaching_ceiling_sets_cooldown() {
        let p = no_gap();
        let mut state = FatigueState::new(LeadId::from("l1"));
        for h in 0..5 {
            p.record(&mut state, 5, t0() + Duration::hours(h));
        }
        assert_eq!(state.cooldown_until, Some(t0() + Duration::hours(24)));
        assert_eq!(state.cooldown_reason.as_deref(), Some(RATE_CEILING));
    }

    #[test]
    fn negative_sentiment_doubles_base_cooldown() {
        let p = policy();
        let mut state = FatigueState::new(LeadId::from("l1"));
        p.negative_backoff(&mut state, t0());

        let decision = p.evaluate(&state, 5, t0() + Duration::hours(1));
        assert!(!decision.contactable);
        assert_eq!(decision.reason.as_deref(), Some(NEGATIVE_SENTIMENT));
        assert_eq!(decision.next_allowed_at, Some(t0() + Duration::hours(12)));
    }

    #[test]
    fn negative_sentiment_multiplies_longer_remaining_cooldown() {
        let p = policy();
        let mut state = FatigueState::new(LeadId::from("l1"));
        state.cooldown_until = Some(t0() + Duration::hours(10));
        p.negative_backoff(&mut state, t0());
        assert_eq!(state.cooldown_until, Some(t0() + Duration::hours(20)));
    }

    #[test]
    fn repeated_negative_replies_stay_under_cap() {
        let p = policy();
        let mut state = FatigueState::new(LeadId::from("l1"));
        for _ in 0..60 {
            p.negative_backoff(&mut state, t0());
        }
        assert_eq!(state.cooldown_until, Some(t0() + Duration::days(7)));

        // The cap is measured from each reply, not stacked onto the old cooldown.
        let later = t0() + Duration::days(3);
        p.negative_backoff(&mut state, later);
        assert_eq!(state.cooldown_until, Some(later + Duration::days(7)));
    }

    #[test]
    fn extreme_factor_saturates_at_cap() {
        let p = FatiguePolicy {
            backoff_factor: f64::MAX,
            ..policy()
        };
        let mut state = FatigueState::new(LeadId::from("l1"));
        state.cooldown_until = Some(DateTime::<Utc>::MAX_UTC);
        p.negative_backoff(&mut state, t0());
        assert_eq!(state.cooldown_until, Some(t0() + p.max_cooldown));
    }

    #[test]
    fn min_gap_blocks_back_to_back_contacts() {
        let p = policy();
        let mut state = FatigueState::new(LeadId::from("l1"));
        p.record(&mut state, 5, t0());

        let decision = p.evaluate(&state, 5, t0() + Duration::minutes(20));
        assert_eq!(decision.reason.as_deref(), Some(MIN_GAP));
        assert_eq!(decision.next_allowed_at, Some(t0() + Duration::minutes(60)));
        assert!(p.evaluate(&state, 5, t0() + Duration::minutes(60)).contactable);
    }

    #[test]
    fn lead_limit_only_lowers_ceiling() {
        let p = policy();
        assert_eq!(p.ceiling(None), 5);
        assert_eq!(p.ceiling(Some(2)), 2);
        assert_eq!(p.ceiling(Some(50)), 5);
    }

    #[test]
    fn expired_cooldown_is_ignored() {
        let p = policy();
        let mut state = FatigueState::new(LeadId::from("l1"));
        state.cooldown_until = Some(t0());
        state.cooldown_reason = Some(NEGATIVE_SENTIMENT.into());
        assert!(p.evaluate(&state, 5, t0() + Duration::seconds(1)).contactable);
    }

    proptest! {
        #[test]
        fn window_count_tracks_recorded_contacts(offsets in prop::collection::vec(0i64..1_380, 0..20)) {
            // All contacts within 23h of t0, so none age out before the last one.
            let p = no_gap();
            let mut state = FatigueState::new(LeadId::from("l1"));
            let mut sorted = offsets.clone();
            sorted.sort();
            for m in &sorted {
                p.record(&mut state, u32::MAX, t0() + Duration::minutes(*m));
            }
            let last = t0() + Duration::minutes(*sorted.last().unwrap_or(&0));
            prop_assert_eq!(state.contacts_in_window(p.window, last) as usize, sorted.len());

            let aged_out = last + p.window + Duration::minutes(1);
            prop_assert_eq!(state.contacts_in_window(p.window, aged_out), 0);
        }

        #[test]
        fn evaluate_is_repeatable(
            contacts in prop::collection::vec(0i64..2_880, 0..10),
            cooldown in prop::option::of(0i64..2_880),
            at_minute in 0i64..2_880,
        ) {
            let p = policy();
            let mut state = FatigueState::new(LeadId::from("l1"));
            for m in contacts {
                p.record(&mut state, 5, t0() + Duration::minutes(m));
            }
            state.cooldown_until = cooldown.map(|m| t0() + Duration::minutes(m));
            let snapshot = state.clone();
            let now = t0() + Duration::minutes(at_minute);

            let first = p.evaluate(&state, 5, now);
            let second = p.evaluate(&state, 5, now);
            prop_assert_eq!(first, second);
            prop_assert_eq!(state, snapshot);
        }
    }
}
