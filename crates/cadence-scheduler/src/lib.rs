// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up scheduler: a durable per-lead queue of scheduled contacts.
//!
//! Entries move `pending -> ready -> {completed | skipped | failed}`. The
//! pending-to-ready step happens only inside [`FollowUpScheduler::due_entries`]
//! and its per-lead variant, which claim atomically through the store, so an
//! entry is handed out at most once. Every terminal entry records a reason.

use std::sync::Arc;

use cadence_core::{
    CadenceError, ConversationType, EntryId, EntryStatus, FollowUpEntry, LeadId, NurtureStore,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Entries may not be scheduled further back than this.
const MAX_PAST: Duration = Duration::days(1);
/// Entries may not be scheduled further ahead than this.
const MAX_FUTURE: Duration = Duration::days(365);

pub const REASON_COMPLETED: &str = "completed";
pub const REASON_RESCHEDULED: &str = "rescheduled";

pub struct FollowUpScheduler {
    store: Arc<dyn NurtureStore>,
}

impl FollowUpScheduler {
    pub fn new(store: Arc<dyn NurtureStore>) -> Self {
        Self { store }
    }

    fn validate(lead_id: &LeadId, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if lead_id.as_str().trim().is_empty() {
            return Err(CadenceError::Validation("lead id must not be empty".into()));
        }
        if at < now - MAX_PAST {
            return Err(CadenceError::Validation(format!(
                "scheduled time {at} is more than a day in the past"
            )));
        }
        if at > now + MAX_FUTURE {
            return Err(CadenceError::Validation(format!(
                "scheduled time {at} is more than a year ahead"
            )));
        }
        Ok(())
    }

    async fn pending_of_type(
        &self,
        lead_id: &LeadId,
        conversation_type: ConversationType,
    ) -> Result<Option<FollowUpEntry>, CadenceError> {
        Ok(self
            .store
            .open_entries_for_lead(lead_id)
            .await?
            .into_iter()
            .find(|e| e.status == EntryStatus::Pending && e.conversation_type == conversation_type))
    }

    /// Enqueue a new entry.
    ///
    /// Fails with `DuplicateEntry` if the lead already has a pending entry of
    /// the same conversation type.
    pub async fn schedule(
        &self,
        lead_id: &LeadId,
        conversation_type: ConversationType,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        Self::validate(lead_id, at, now)?;
        if self.pending_of_type(lead_id, conversation_type).await?.is_some() {
            return Err(CadenceError::DuplicateEntry {
                lead_id: lead_id.clone(),
                conversation_type,
            });
        }

        let entry = FollowUpEntry::new(lead_id.clone(), conversation_type, at, now);
        self.store.insert_entry(&entry).await?;
        info!(
            lead_id = %lead_id,
            entry_id = %entry.id,
            conversation_type = %conversation_type,
            scheduled_at = %at,
            "follow-up scheduled"
        );
        Ok(entry)
    }

    /// Schedule the next entry after a contact or a skip.
    ///
    /// Idempotent: an existing pending entry of the same type is kept and
    /// only moved earlier, never duplicated.
    pub async fn re_arm(
        &self,
        lead_id: &LeadId,
        conversation_type: ConversationType,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        match self.pending_of_type(lead_id, conversation_type).await? {
            Some(mut existing) => {
                if at < existing.scheduled_at {
                    existing.scheduled_at = at;
                    existing.updated_at = now;
                    self.store.update_entry(&existing).await?;
                }
                Ok(existing)
            }
            None => self.schedule(lead_id, conversation_type, at, now).await,
        }
    }

    /// Schedule a retry of a failed entry, carrying its attempt count.
    pub async fn schedule_retry(
        &self,
        failed: &FollowUpEntry,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        let mut retry = self
            .re_arm(&failed.lead_id, failed.conversation_type, at, now)
            .await?;
        if retry.attempts < failed.attempts {
            retry.attempts = failed.attempts;
            retry.updated_at = now;
            self.store.update_entry(&retry).await?;
        }
        Ok(retry)
    }

    /// Claim up to `limit` due entries, marking them ready.
    ///
    /// Repeated calls at the same instant never return an entry twice.
    pub async fn due_entries(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        let claimed = self.store.claim_due_entries(now, limit).await?;
        if !claimed.is_empty() {
            debug!(count = claimed.len(), "claimed due follow-ups");
        }
        Ok(claimed)
    }

    pub async fn due_entries_for_lead(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        self.store.claim_due_entries_for_lead(lead_id, now).await
    }

    async fn open_entry(&self, id: &EntryId) -> Result<FollowUpEntry, CadenceError> {
        match self.store.get_entry(id).await? {
            Some(entry) if !entry.status.is_terminal() => Ok(entry),
            _ => Err(CadenceError::not_found("entry", id)),
        }
    }

    /// Move an open entry to `new_time`.
    ///
    /// A pending entry is updated in place. A ready entry cannot go back to
    /// pending, so it is skipped as `rescheduled` and replaced by a new
    /// pending entry. Terminal or unknown entries fail with `NotFound`.
    pub async fn reschedule(
        &self,
        id: &EntryId,
        new_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        let mut entry = self.open_entry(id).await?;
        Self::validate(&entry.lead_id, new_time, now)?;

        let updated = match entry.status {
            EntryStatus::Pending => {
                entry.scheduled_at = new_time;
                entry.reschedule_count += 1;
                entry.updated_at = now;
                self.store.update_entry(&entry).await?;
                entry
            }
            _ => {
                let mut replacement =
                    FollowUpEntry::new(entry.lead_id.clone(), entry.conversation_type, new_time, now);
                replacement.attempts = entry.attempts;
                replacement.reschedule_count = entry.reschedule_count + 1;

                transition(&mut entry, EntryStatus::Skipped, REASON_RESCHEDULED, now)?;
                self.store.update_entry(&entry).await?;
                self.store.insert_entry(&replacement).await?;
                replacement
            }
        };

        debug!(
            entry_id = %updated.id,
            scheduled_at = %new_time,
            reschedules = updated.reschedule_count,
            "follow-up rescheduled"
        );
        Ok(updated)
    }

    /// Skip an open entry. Pending entries pass through `ready` first.
    pub async fn skip(
        &self,
        id: &EntryId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        self.finish(id, EntryStatus::Skipped, reason, now).await
    }

    pub async fn complete(
        &self,
        id: &EntryId,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        self.finish(id, EntryStatus::Completed, REASON_COMPLETED, now)
            .await
    }

    /// Fail an open entry, counting the attempt.
    pub async fn fail(
        &self,
        id: &EntryId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        self.finish(id, EntryStatus::Failed, reason, now).await
    }

    async fn finish(
        &self,
        id: &EntryId,
        status: EntryStatus,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        let mut entry = self.open_entry(id).await?;
        if entry.status == EntryStatus::Pending {
            transition(&mut entry, EntryStatus::Ready, reason, now)?;
        }
        if status != EntryStatus::Skipped {
            entry.attempts += 1;
        }
        transition(&mut entry, status, reason, now)?;
        self.store.update_entry(&entry).await?;

        info!(
            lead_id = %entry.lead_id,
            entry_id = %entry.id,
            status = %status,
            reason,
            "follow-up closed"
        );
        Ok(entry)
    }

    /// Pull the lead's pending entries due within `window` forward to `now`.
    pub async fn promote(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<FollowUpEntry>, CadenceError> {
        let mut promoted = Vec::new();
        for mut entry in self.store.open_entries_for_lead(lead_id).await? {
            if entry.status == EntryStatus::Pending
                && entry.scheduled_at > now
                && entry.scheduled_at <= now + window
            {
                entry.scheduled_at = now;
                entry.updated_at = now;
                self.store.update_entry(&entry).await?;
                promoted.push(entry);
            }
        }
        if !promoted.is_empty() {
            info!(lead_id = %lead_id, count = promoted.len(), "follow-ups promoted");
        }
        Ok(promoted)
    }

    /// Skip every open entry of a lead. Returns how many were cleared.
    pub async fn clear_for_lead(
        &self,
        lead_id: &LeadId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, CadenceError> {
        let open = self.store.open_entries_for_lead(lead_id).await?;
        for entry in &open {
            self.skip(&entry.id, reason, now).await?;
        }
        Ok(open.len())
    }

    /// Earliest pending follow-up time for a lead.
    pub async fn next_follow_up(
        &self,
        lead_id: &LeadId,
    ) -> Result<Option<DateTime<Utc>>, CadenceError> {
        Ok(self
            .store
            .open_entries_for_lead(lead_id)
            .await?
            .into_iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .map(|e| e.scheduled_at)
            .min())
    }

    pub async fn get(&self, id: &EntryId) -> Result<Option<FollowUpEntry>, CadenceError> {
        self.store.get_entry(id).await
    }
}

fn transition(
    entry: &mut FollowUpEntry,
    next: EntryStatus,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), CadenceError> {
    if !entry.status.can_transition_to(next) {
        return Err(CadenceError::Internal(format!(
            "illegal entry transition {} -> {next} for {}",
            entry.status, entry.id
        )));
    }
    entry.status = next;
    entry.updated_at = now;
    if next.is_terminal() {
        entry.reason = Some(reason.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_storage::MemoryStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn scheduler() -> FollowUpScheduler {
        FollowUpScheduler::new(Arc::new(MemoryStore::new()))
    }

    fn lead() -> LeadId {
        LeadId::from("lead-1")
    }

    #[tokio::test]
    async fn entry_becomes_ready_exactly_once_at_scheduled_time() {
        let s = scheduler();
        let at = t0() + Duration::hours(1);
        let entry = s.schedule(&lead(), ConversationType::Business, at, t0()).await.unwrap();

        assert!(s.due_entries(t0(), 10).await.unwrap().is_empty());
        let stored = s.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EntryStatus::Pending);

        let due = s.due_entries(at, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].status, EntryStatus::Ready);
        assert!(s.due_entries(at, 10).await.unwrap().is_empty());
        assert!(s.due_entries(at + Duration::hours(1), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_pending_entry_is_rejected() {
        let s = scheduler();
        s.schedule(&lead(), ConversationType::Casual, t0(), t0()).await.unwrap();
        let err = s
            .schedule(&lead(), ConversationType::Casual, t0() + Duration::hours(2), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::DuplicateEntry { .. }));

        // A different conversation type is not a duplicate.
        s.schedule(&lead(), ConversationType::Business, t0(), t0()).await.unwrap();
    }

    #[tokio::test]
    async fn bad_times_are_validation_errors() {
        let s = scheduler();
        for at in [t0() - Duration::days(3), t0() + Duration::days(400)] {
            let err = s.schedule(&lead(), ConversationType::Casual, at, t0()).await.unwrap_err();
            assert!(matches!(err, CadenceError::Validation(_)));
        }
        let err = s
            .schedule(&LeadId::from(" "), ConversationType::Casual, t0(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, CadenceError::Validation(_)));
    }

    #[tokio::test]
    async fn terminal_entries_cannot_be_rescheduled_or_skipped() {
        let s = scheduler();
        let entry = s.schedule(&lead(), ConversationType::Casual, t0(), t0()).await.unwrap();
        s.due_entries(t0(), 10).await.unwrap();
        s.complete(&entry.id, t0()).await.unwrap();

        let err = s.reschedule(&entry.id, t0() + Duration::hours(1), t0()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound { kind: "entry", .. }));
        let err = s.skip(&entry.id, "manual", t0()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound { .. }));
        let err = s.skip(&EntryId::from("entry-missing"), "manual", t0()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rescheduling_a_ready_entry_replaces_it() {
        let s = scheduler();
        let entry = s.schedule(&lead(), ConversationType::Casual, t0(), t0()).await.unwrap();
        s.due_entries(t0(), 10).await.unwrap();

        let later = t0() + Duration::hours(5);
        let replacement = s.reschedule(&entry.id, later, t0()).await.unwrap();
        assert_ne!(replacement.id, entry.id);
        assert_eq!(replacement.status, EntryStatus::Pending);
        assert_eq!(replacement.reschedule_count, 1);

        let old = s.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(old.status, EntryStatus::Skipped);
        assert_eq!(old.reason.as_deref(), Some(REASON_RESCHEDULED));
        assert_eq!(s.next_follow_up(&lead()).await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn skipping_pending_entry_records_reason() {
        let s = scheduler();
        let entry = s.schedule(&lead(), ConversationType::Casual, t0(), t0()).await.unwrap();
        let skipped = s.skip(&entry.id, "nurturing-disabled", t0()).await.unwrap();
        assert_eq!(skipped.status, EntryStatus::Skipped);
        assert_eq!(skipped.reason.as_deref(), Some("nurturing-disabled"));
        assert_eq!(skipped.attempts, 0);
    }

    #[tokio::test]
    async fn promote_pulls_near_entries_forward() {
        let s = scheduler();
        let near = s
            .schedule(&lead(), ConversationType::Casual, t0() + Duration::hours(2), t0())
            .await
            .unwrap();
        let far = s
            .schedule(&lead(), ConversationType::Business, t0() + Duration::hours(30), t0())
            .await
            .unwrap();

        let promoted = s.promote(&lead(), t0(), Duration::hours(6)).await.unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].id, near.id);

        let due = s.due_entries_for_lead(&lead(), t0()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(s.get(&far.id).await.unwrap().unwrap().status, EntryStatus::Pending);
    }

    #[tokio::test]
    async fn re_arm_moves_existing_entry_earlier() {
        let s = scheduler();
        let first = s
            .schedule(&lead(), ConversationType::Casual, t0() + Duration::hours(10), t0())
            .await
            .unwrap();
        let again = s
            .re_arm(&lead(), ConversationType::Casual, t0() + Duration::hours(3), t0())
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.scheduled_at, t0() + Duration::hours(3));
    }

    #[tokio::test]
    async fn clear_for_lead_skips_all_open_entries() {
        let s = scheduler();
        s.schedule(&lead(), ConversationType::Casual, t0(), t0()).await.unwrap();
        s.schedule(&lead(), ConversationType::Business, t0() + Duration::hours(1), t0())
            .await
            .unwrap();
        s.due_entries(t0(), 10).await.unwrap();

        assert_eq!(s.clear_for_lead(&lead(), "nurturing-disabled", t0()).await.unwrap(), 2);
        assert_eq!(s.next_follow_up(&lead()).await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn every_entry_is_claimed_once_and_never_early(
            offsets in prop::collection::vec(0i64..600, 1..12),
            ticks in prop::collection::vec(0i64..720, 1..20),
            limit in 1usize..5,
        ) {
            let mut ticks = ticks;
            ticks.sort();
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let s = scheduler();
                let mut scheduled = std::collections::HashMap::new();
                for (i, minutes) in offsets.iter().enumerate() {
                    let lead_id = LeadId::from(format!("lead-{i}"));
                    let at = t0() + Duration::minutes(*minutes);
                    let entry = s.schedule(&lead_id, ConversationType::Casual, at, t0()).await.unwrap();
                    scheduled.insert(entry.id, at);
                }

                let mut claimed = std::collections::HashSet::new();
                for minutes in &ticks {
                    let now = t0() + Duration::minutes(*minutes);
                    let due = s.due_entries(now, limit).await.unwrap();
                    prop_assert!(due.len() <= limit);
                    for entry in due {
                        prop_assert!(scheduled[&entry.id] <= now, "claimed before due");
                        prop_assert!(claimed.insert(entry.id.clone()), "claimed twice");
                    }
                }

                // Whatever the ticks left behind is still claimable, once.
                let end = t0() + Duration::hours(12);
                while claimed.len() < scheduled.len() {
                    let due = s.due_entries(end, limit).await.unwrap();
                    prop_assert!(!due.is_empty());
                    for entry in due {
                        prop_assert!(claimed.insert(entry.id.clone()), "claimed twice");
                    }
                }
                prop_assert!(s.due_entries(end, limit).await.unwrap().is_empty());
                Ok(())
            })?;
        }
    }
}
