// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranked send-time recommendations.
//!
//! Each candidate time is scored from three signals: how active the lead
//! usually is in that local hour, how fresh the last presence observation
//! is, and how long the funnel stage can tolerate waiting. Candidates outside
//! the business-hours window in the lead's timezone are damped.

use cadence_config::model::TimingConfig;
use cadence_core::Lead;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::presence::ActivityPattern;

const HOUR_WEIGHT: f64 = 0.45;
const PRESENCE_WEIGHT: f64 = 0.35;
const URGENCY_WEIGHT: f64 = 0.20;

/// Multiplier for candidates outside business hours.
const OFF_HOURS_FACTOR: f64 = 0.2;

/// Confidence reported for "now" when there is no presence history.
pub const NO_HISTORY_CONFIDENCE: f64 = 0.1;

/// A possible send time and how confident the recommender is in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub at: DateTime<Utc>,
    /// In `[0, 1]`.
    pub confidence: f64,
}

pub struct TimingRecommender {
    business_hours: (u32, u32),
    default_utc_offset_minutes: i32,
    horizon: Duration,
    step: Duration,
    presence_recency: Duration,
}

impl TimingRecommender {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            business_hours: (config.business_hours_start, config.business_hours_end),
            default_utc_offset_minutes: config.default_utc_offset_minutes,
            horizon: Duration::hours(config.horizon_hours as i64),
            step: Duration::minutes(config.candidate_step_minutes.max(1) as i64),
            presence_recency: Duration::minutes(config.presence_recency_minutes.max(1) as i64),
        }
    }

    /// The lead's UTC offset, falling back to the configured default.
    pub fn utc_offset_minutes(&self, lead: &Lead) -> i32 {
        lead.utc_offset_minutes
            .unwrap_or(self.default_utc_offset_minutes)
    }

    pub fn in_business_hours(&self, at: DateTime<Utc>, utc_offset_minutes: i32) -> bool {
        let hour = (at + Duration::minutes(utc_offset_minutes as i64)).hour();
        hour >= self.business_hours.0 && hour < self.business_hours.1
    }

    /// Ranked candidates, best first. Ties resolve to the earliest time.
    ///
    /// Without presence history the only candidate is `now` at
    /// [`NO_HISTORY_CONFIDENCE`].
    pub fn recommend(
        &self,
        lead: &Lead,
        pattern: &ActivityPattern,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        if !pattern.has_history() {
            return vec![Candidate {
                at: now,
                confidence: NO_HISTORY_CONFIDENCE,
            }];
        }

        let offset = self.utc_offset_minutes(lead);
        let urgency = lead.stage.urgency();
        let recency = self.recency_score(pattern, now);

        let mut candidates = Vec::new();
        let mut at = now;
        while at <= now + self.horizon {
            candidates.push(Candidate {
                at,
                confidence: self.score(pattern, recency, urgency, offset, now, at),
            });
            at += self.step;
        }

        rank(&mut candidates);
        candidates
    }

    /// Confidence of contacting at exactly `now`.
    pub fn now_confidence(&self, lead: &Lead, pattern: &ActivityPattern, now: DateTime<Utc>) -> f64 {
        if !pattern.has_history() {
            return NO_HISTORY_CONFIDENCE;
        }
        let recency = self.recency_score(pattern, now);
        self.score(
            pattern,
            recency,
            lead.stage.urgency(),
            self.utc_offset_minutes(lead),
            now,
            now,
        )
    }

    /// 1.0 while online, fading with time since the peer was last seen.
    fn recency_score(&self, pattern: &ActivityPattern, now: DateTime<Utc>) -> f64 {
        if pattern.last_status == cadence_core::PresenceStatus::Online {
            return 1.0;
        }
        match pattern.last_seen_at {
            Some(seen) => {
                let since = (now - seen).max(Duration::zero());
                let ratio = since.num_seconds() as f64 / self.presence_recency.num_seconds() as f64;
                0.8 * (-ratio).exp()
            }
            None => 0.0,
        }
    }

    fn score(
        &self,
        pattern: &ActivityPattern,
        recency: f64,
        urgency: f64,
        offset: i32,
        now: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> f64 {
        let delay = at - now;
        let local_hour = (at + Duration::minutes(offset as i64)).hour() as usize;

        let hour_term = pattern.hourly[local_hour];
        // Presence predicts the near term only.
        let presence_term = recency
            * (-(delay.num_seconds() as f64) / self.presence_recency.num_seconds() as f64).exp();
        let wait_ratio = delay.num_seconds() as f64 / self.horizon.num_seconds().max(1) as f64;
        let urgency_term = 1.0 - urgency * wait_ratio;

        let mut score =
            HOUR_WEIGHT * hour_term + PRESENCE_WEIGHT * presence_term + URGENCY_WEIGHT * urgency_term;
        if !self.in_business_hours(at, offset) {
            score *= OFF_HOURS_FACTOR;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Sort best first; equal confidence goes to the earlier time.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.at.cmp(&b.at))
    });
}
