// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound replies and presence changes.

use cadence_core::{
    CadenceError, ConversationType, EntryStatus, Lead, LeadFilter, LeadId, LeadPatch,
    PresenceSample, Sentiment, SentimentLabel,
};
use cadence_strategy::{detect_purchase_signal, update_sentiment_trend};
use cadence_timing::PresenceTransition;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::orchestrator::Orchestrator;

/// Reach of a purchase signal: every pending follow-up moves to now.
const PURCHASE_PROMOTION_WINDOW: Duration = Duration::days(365);

/// What an inbound reply changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundOutcome {
    pub sentiment: Sentiment,
    pub purchase_signal: bool,
    /// Follow-ups pulled forward (or created) because of a purchase signal.
    pub promoted: usize,
}

impl Orchestrator {
    /// Record a reply from a lead.
    ///
    /// Resets the no-reply streak and folds the sentiment score into the
    /// trend. A negative reply extends the fatigue cooldown. A purchase
    /// signal marks the conversation and brings the next follow-up to now.
    pub async fn handle_inbound(
        &self,
        lead_id: &LeadId,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<InboundOutcome, CadenceError> {
        let inner = &self.inner;
        let lead = inner
            .collaborators
            .leads
            .get(lead_id)
            .await?
            .ok_or_else(|| CadenceError::not_found("lead", lead_id))?;

        let sentiment = inner.collaborators.sentiment.analyze(&lead, message).await?;
        let purchase_signal = detect_purchase_signal(message);

        let _guard = inner.locks.lock(lead_id).await;
        let mut conversation = self.conversation(lead_id).await?;
        conversation.consecutive_no_reply_count = 0;
        conversation.last_reply_at = Some(now);
        conversation.sentiment_trend =
            update_sentiment_trend(conversation.sentiment_trend, sentiment.score);
        if purchase_signal {
            conversation.unhandled_purchase_signal = true;
        }
        inner.store.put_conversation(&conversation).await?;

        if sentiment.label == SentimentLabel::Negative {
            inner.fatigue.apply_negative_sentiment(lead_id, now).await?;
        }

        let mut promoted = 0;
        if purchase_signal && lead.nurturing_active() && conversation.halted_reason.is_none() {
            promoted = self.promote_for_purchase(&lead, now).await?;
        }

        let mut stats = lead.stats.clone();
        stats.replies_received += 1;
        let patch = LeadPatch {
            last_interaction_at: Some(now),
            stats: Some(stats),
            next_follow_up_at: Some(inner.scheduler.next_follow_up(lead_id).await?),
            ..LeadPatch::default()
        };
        inner.collaborators.leads.update(lead_id, patch).await?;

        info!(
            lead_id = %lead_id,
            sentiment = %sentiment.label,
            score = sentiment.score,
            trend = conversation.sentiment_trend,
            purchase_signal,
            promoted,
            "inbound reply recorded"
        );
        Ok(InboundOutcome {
            sentiment,
            purchase_signal,
            promoted,
        })
    }

    async fn promote_for_purchase(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<usize, CadenceError> {
        let inner = &self.inner;
        let promoted = inner
            .scheduler
            .promote(&lead.id, now, PURCHASE_PROMOTION_WINDOW)
            .await?
            .len();
        if promoted > 0 {
            return Ok(promoted);
        }

        let has_pending = inner
            .store
            .open_entries_for_lead(&lead.id)
            .await?
            .iter()
            .any(|e| e.status == EntryStatus::Pending);
        let busy = inner.store.active_task_for_lead(&lead.id).await?.is_some();
        if has_pending || busy {
            return Ok(0);
        }

        inner
            .scheduler
            .re_arm(&lead.id, ConversationType::Business, now, now)
            .await?;
        Ok(1)
    }

    /// Ingest a presence sample. When a peer comes online, its leads'
    /// follow-ups due within the promotion window are pulled forward and
    /// processed immediately. Returns how many entries were processed.
    pub async fn handle_presence(
        &self,
        sample: PresenceSample,
        now: DateTime<Utc>,
    ) -> Result<usize, CadenceError> {
        let inner = &self.inner;
        let peer_id = sample.peer_id.clone();
        let transition = inner.presence.lock().await.ingest(sample);
        if !matches!(transition, Some(PresenceTransition::CameOnline)) {
            return Ok(0);
        }
        debug!(peer_id = peer_id.as_str(), "peer came online");

        let window = inner.config.presence_promotion_window();
        let leads = inner
            .collaborators
            .leads
            .list(&LeadFilter::by_peer(peer_id.as_str()))
            .await?;

        let mut processed = 0;
        for lead in leads.into_iter().filter(Lead::nurturing_active) {
            let promoted = {
                let _guard = inner.locks.lock(&lead.id).await;
                inner.scheduler.promote(&lead.id, now, window).await?
            };
            if promoted.is_empty() {
                continue;
            }

            for entry in inner.scheduler.due_entries_for_lead(&lead.id, now).await? {
                match self.process_entry(&entry, now).await {
                    Ok(_) => processed += 1,
                    Err(err) => self.abandon_entry(&entry, &err, now).await,
                }
            }
        }
        Ok(processed)
    }
}
