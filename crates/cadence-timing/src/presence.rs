// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded presence history and activity histograms.

use std::collections::{HashMap, VecDeque};

use cadence_config::model::TimingConfig;
use cadence_core::{PresenceSample, PresenceStatus};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use tracing::trace;

/// Weight of an observation toward the hour-of-day histogram.
fn activity_weight(status: PresenceStatus) -> f64 {
    match status {
        PresenceStatus::Online => 1.0,
        PresenceStatus::RecentlySeen => 0.5,
        PresenceStatus::Offline | PresenceStatus::Unknown => 0.0,
    }
}

/// Status change worth reacting to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    /// The peer went from any other status to online.
    CameOnline,
    WentOffline,
}

/// Derived hour-of-day activity for one peer, in the peer's local time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPattern {
    /// Decayed activity per local hour, normalised so the busiest hour is 1.0.
    pub hourly: [f64; 24],
    /// Latest observation of the peer being online or recently seen.
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_status: PresenceStatus,
    pub sample_count: usize,
}

impl ActivityPattern {
    pub fn empty() -> Self {
        Self {
            hourly: [0.0; 24],
            last_seen_at: None,
            last_status: PresenceStatus::Unknown,
            sample_count: 0,
        }
    }

    pub fn has_history(&self) -> bool {
        self.sample_count > 0
    }
}

/// Half-lives after which a silent peer's history is dropped. By then its
/// samples weigh under half a percent.
const RETENTION_HALF_LIVES: f64 = 8.0;

/// Keeps the latest presence samples per peer.
///
/// Owned by the orchestrator; not internally synchronised.
pub struct PresenceMonitor {
    capacity: usize,
    half_life_days: f64,
    retention: Duration,
    histories: HashMap<String, VecDeque<PresenceSample>>,
}

impl PresenceMonitor {
    pub fn new(config: &TimingConfig) -> Self {
        let retention_secs = config.decay_half_life_days * RETENTION_HALF_LIVES * 86_400.0;
        Self {
            capacity: config.history_capacity.max(1),
            half_life_days: config.decay_half_life_days,
            retention: Duration::seconds(retention_secs as i64),
            histories: HashMap::new(),
        }
    }

    /// Forget peers whose newest sample is older than the retention period.
    /// Returns how many were dropped.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.histories.len();
        let retention = self.retention;
        self.histories.retain(|_, history| {
            history
                .back()
                .is_some_and(|newest| now.signed_duration_since(newest.observed_at) <= retention)
        });
        let dropped = before - self.histories.len();
        if dropped > 0 {
            trace!(dropped, peers = self.histories.len(), "stale presence histories dropped");
        }
        dropped
    }

    /// Number of peers with any history.
    pub fn peer_count(&self) -> usize {
        self.histories.len()
    }

    /// Append a sample and report a status transition, if any.
    ///
    /// Samples older than the newest one already held are stored but never
    /// produce a transition.
    pub fn ingest(&mut self, sample: PresenceSample) -> Option<PresenceTransition> {
        let history = self.histories.entry(sample.peer_id.clone()).or_default();
        let previous = history.back().cloned();

        let transition = match &previous {
            Some(prev) if sample.observed_at < prev.observed_at => None,
            Some(prev) if prev.status == sample.status => None,
            _ => match sample.status {
                PresenceStatus::Online => Some(PresenceTransition::CameOnline),
                PresenceStatus::Offline if previous.is_some() => {
                    Some(PresenceTransition::WentOffline)
                }
                _ => None,
            },
        };

        if previous
            .as_ref()
            .is_some_and(|prev| sample.observed_at < prev.observed_at)
        {
            let pos = history
                .iter()
                .position(|s| s.observed_at > sample.observed_at)
                .unwrap_or(history.len());
            history.insert(pos, sample);
        } else {
            history.push_back(sample);
        }
        while history.len() > self.capacity {
            history.pop_front();
        }

        trace!(len = history.len(), ?transition, "presence sample ingested");
        transition
    }

    /// Build the decayed activity histogram for `peer_id` as seen at `now`.
    pub fn pattern(
        &self,
        peer_id: &str,
        utc_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> ActivityPattern {
        let Some(history) = self.histories.get(peer_id).filter(|h| !h.is_empty()) else {
            return ActivityPattern::empty();
        };

        let offset = Duration::minutes(utc_offset_minutes as i64);
        let mut hourly = [0.0_f64; 24];
        let mut last_seen_at = None;

        for sample in history {
            let weight = activity_weight(sample.status);
            if weight == 0.0 {
                continue;
            }
            let age_days = (now - sample.observed_at).num_seconds().max(0) as f64 / 86_400.0;
            let decay = 0.5_f64.powf(age_days / self.half_life_days);
            let hour = (sample.observed_at + offset).hour() as usize;
            hourly[hour] += weight * decay;
            last_seen_at = last_seen_at.max(Some(sample.observed_at));
        }

        let peak = hourly.iter().copied().fold(0.0_f64, f64::max);
        if peak > 0.0 {
            for slot in &mut hourly {
                *slot /= peak;
            }
        }

        ActivityPattern {
            hourly,
            last_seen_at,
            last_status: history
                .back()
                .map_or(PresenceStatus::Unknown, |s| s.status),
            sample_count: history.len(),
        }
    }
}
