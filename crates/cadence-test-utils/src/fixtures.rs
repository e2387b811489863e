// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead fixtures.

use cadence_core::{FunnelStage, Lead, LeadId, LeadScores, LeadStats, NurturingConfig};

/// A nurturing lead at the given stage with default scores, in UTC.
pub fn lead(id: &str, stage: FunnelStage) -> Lead {
    Lead {
        id: LeadId::from(id),
        peer_id: format!("peer-{id}"),
        stage,
        scores: LeadScores::default(),
        is_nurturing: true,
        nurturing: NurturingConfig::default(),
        utc_offset_minutes: Some(0),
        last_interaction_at: None,
        next_follow_up_at: None,
        stats: LeadStats::default(),
        flagged_reason: None,
    }
}

pub fn lead_with_offset(id: &str, stage: FunnelStage, utc_offset_minutes: i32) -> Lead {
    Lead {
        utc_offset_minutes: Some(utc_offset_minutes),
        ..lead(id, stage)
    }
}
