// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applying task results to engine state. Callers hold the lead lock.

use cadence_core::{
    CadenceError, ConversationState, ConversationType, EntryId, EntryStatus, FollowUpEntry,
    GeneratedContent, Lead, LeadPatch, NotificationKind, NotificationPriority, SendReceipt, Task,
    TaskStatus,
};
use cadence_fatigue::FatigueDecision;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::orchestrator::Orchestrator;
use crate::reasons;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// Transient or timed out. A retry entry is scheduled while attempts remain.
    Retryable,
    /// Banned. The lead is halted until cleared by hand.
    Fatal,
    /// Anything else. Nurturing continues at the normal cadence.
    Permanent,
    /// Confirmation TTL passed. Already warned; continues at the normal cadence.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) reason: String,
    pub(crate) kind: FailureKind,
}

impl Failure {
    pub(crate) fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            kind: FailureKind::Permanent,
        }
    }

    pub(crate) fn retryable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            kind: FailureKind::Retryable,
        }
    }

    pub(crate) fn expired(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            kind: FailureKind::Expired,
        }
    }
}

impl From<&CadenceError> for Failure {
    fn from(err: &CadenceError) -> Self {
        let kind = match err {
            CadenceError::Transient { .. } | CadenceError::Timeout { .. } => FailureKind::Retryable,
            CadenceError::Fatal { .. } => FailureKind::Fatal,
            _ => FailureKind::Permanent,
        };
        Self {
            reason: err.reason(),
            kind,
        }
    }
}

impl Orchestrator {
    /// Record a confirmed send. The only path that touches fatigue.
    pub(crate) async fn apply_success(
        &self,
        mut task: Task,
        lead: Lead,
        content: GeneratedContent,
        receipt: SendReceipt,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        let inner = &self.inner;
        let lead = inner
            .collaborators
            .leads
            .get(&lead.id)
            .await?
            .unwrap_or(lead);

        inner.fatigue.record_contact(&lead, at).await?;

        let mut conversation = self.conversation(&lead.id).await?;
        conversation.record_attempt(task.conversation_type, at);
        conversation.consecutive_no_reply_count += 1;
        if task.conversation_type == ConversationType::Business {
            conversation.unhandled_purchase_signal = false;
        }
        inner.store.put_conversation(&conversation).await?;

        task.status = TaskStatus::Completed;
        task.content = Some(content);
        task.message_id = Some(receipt.message_id.clone());
        task.reason = Some(reasons::SENT.into());
        task.updated_at = at;
        inner.store.update_task(&task).await?;
        self.close_entry(&task.entry_id, EntryStatus::Completed, reasons::SENT, at)
            .await?;

        if lead.nurturing_active() && conversation.halted_reason.is_none() {
            self.re_arm_after(&lead, &conversation, task.conversation_type, task.urgent, at)
                .await?;
        }

        let mut stats = lead.stats.clone();
        stats.contacts_sent += 1;
        stats.last_contact_at = Some(at);
        self.patch_after_outcome(&lead, stats).await?;

        info!(
            lead_id = %lead.id,
            task_id = %task.id,
            message_id = receipt.message_id.as_str(),
            conversation_type = %task.conversation_type,
            "contact sent"
        );
        Ok(())
    }

    /// Record a failed task. Fatigue is never touched here.
    pub(crate) async fn apply_failure(
        &self,
        mut task: Task,
        lead: Option<Lead>,
        failure: Failure,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        let inner = &self.inner;
        task.status = TaskStatus::Failed;
        task.reason = Some(failure.reason.clone());
        task.updated_at = at;
        inner.store.update_task(&task).await?;
        let entry = self
            .close_entry(&task.entry_id, EntryStatus::Failed, &failure.reason, at)
            .await?;

        warn!(
            lead_id = %task.lead_id,
            task_id = %task.id,
            reason = failure.reason.as_str(),
            "task failed"
        );

        let Some(lead) = lead else {
            return Ok(());
        };
        let mut stats = lead.stats.clone();
        if failure.kind != FailureKind::Expired {
            stats.failed_contacts += 1;
        }

        if failure.kind == FailureKind::Fatal {
            self.halt(&lead, &failure.reason, at).await?;
            let patch = LeadPatch {
                stats: Some(stats),
                ..LeadPatch::default()
            };
            inner.collaborators.leads.update(&lead.id, patch).await?;
            return Ok(());
        }

        let conversation = self.conversation(&lead.id).await?;
        if lead.nurturing_active() && conversation.halted_reason.is_none() {
            match entry {
                Some(entry)
                    if failure.kind == FailureKind::Retryable
                        && entry.attempts < inner.config.max_attempts =>
                {
                    let retry_at = at + inner.config.retry_delay();
                    inner.scheduler.schedule_retry(&entry, retry_at, at).await?;
                    info!(
                        lead_id = %lead.id,
                        attempts = entry.attempts,
                        retry_at = %retry_at,
                        "retry scheduled"
                    );
                }
                _ => {
                    if failure.kind != FailureKind::Expired {
                        inner.collaborators.notifier.notify(
                            NotificationKind::Warning,
                            NotificationPriority::Normal,
                            serde_json::json!({
                                "event": "follow-up-failed",
                                "lead_id": lead.id,
                                "task_id": task.id,
                                "reason": failure.reason,
                            }),
                        );
                    }
                    self.re_arm_after(&lead, &conversation, task.conversation_type, false, at)
                        .await?;
                }
            }
        }

        self.patch_after_outcome(&lead, stats).await
    }

    /// Hold back a task whose lead stopped being contactable after the task
    /// was built. Nothing is sent and fatigue is untouched; the follow-up
    /// comes back once the lead is allowed again.
    pub(crate) async fn hold_for_fatigue(
        &self,
        mut task: Task,
        lead: &Lead,
        decision: FatigueDecision,
        at: DateTime<Utc>,
    ) -> Result<Task, CadenceError> {
        let inner = &self.inner;
        let reason = decision
            .reason
            .unwrap_or_else(|| reasons::NOT_CONTACTABLE.into());
        task.status = TaskStatus::Skipped;
        task.reason = Some(reason.clone());
        task.updated_at = at;
        inner.store.update_task(&task).await?;
        self.close_entry(&task.entry_id, EntryStatus::Skipped, &reason, at)
            .await?;

        let conversation = self.conversation(&lead.id).await?;
        if lead.nurturing_active() && conversation.halted_reason.is_none() {
            match decision.next_allowed_at {
                Some(next) => {
                    inner
                        .scheduler
                        .re_arm(&lead.id, task.conversation_type, next, at)
                        .await?;
                }
                None => {
                    self.re_arm_after(lead, &conversation, task.conversation_type, false, at)
                        .await?;
                }
            }
        }
        self.sync_next_follow_up(&lead.id).await?;

        warn!(
            lead_id = %lead.id,
            task_id = %task.id,
            reason = reason.as_str(),
            next_allowed_at = ?decision.next_allowed_at,
            "task held back, lead no longer contactable"
        );
        Ok(task)
    }

    /// Stop all scheduling for a lead after a fatal transport error.
    async fn halt(&self, lead: &Lead, reason: &str, at: DateTime<Utc>) -> Result<(), CadenceError> {
        let inner = &self.inner;
        let mut conversation = self.conversation(&lead.id).await?;
        conversation.halted_reason = Some(reason.to_string());
        inner.store.put_conversation(&conversation).await?;

        let cleared = inner
            .scheduler
            .clear_for_lead(&lead.id, reasons::LEAD_HALTED, at)
            .await?;

        let patch = LeadPatch {
            is_nurturing: Some(false),
            next_follow_up_at: Some(None),
            flagged_reason: Some(Some(reason.to_string())),
            ..LeadPatch::default()
        };
        inner.collaborators.leads.update(&lead.id, patch).await?;

        inner.collaborators.notifier.notify(
            NotificationKind::Warning,
            NotificationPriority::High,
            serde_json::json!({
                "event": "lead-halted",
                "lead_id": lead.id,
                "reason": reason,
            }),
        );
        error!(
            lead_id = %lead.id,
            reason,
            cleared_entries = cleared,
            "lead halted, scheduling stopped until cleared"
        );
        Ok(())
    }

    /// Schedule the next follow-up one cadence after `at`.
    pub(crate) async fn re_arm_after(
        &self,
        lead: &Lead,
        conversation: &ConversationState,
        last_type: ConversationType,
        urgent: bool,
        at: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        let inner = &self.inner;
        let next_at = at + inner.selector.cadence(last_type, urgent);
        let Some(decision) = inner.selector.select_for_lead(lead, conversation, next_at) else {
            warn!(lead_id = %lead.id, "no allowed channel, follow-up not re-armed");
            return Ok(());
        };
        let entry = inner
            .scheduler
            .re_arm(&lead.id, decision.conversation_type, next_at, at)
            .await?;
        debug!(
            lead_id = %lead.id,
            entry_id = %entry.id,
            scheduled_at = %entry.scheduled_at,
            "next follow-up armed"
        );
        Ok(())
    }

    /// Close an entry if it is still open. Entries cleared in the meantime
    /// (nurturing disabled, lead halted) yield `None`.
    pub(crate) async fn close_entry(
        &self,
        entry_id: &EntryId,
        status: EntryStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<FollowUpEntry>, CadenceError> {
        let scheduler = &self.inner.scheduler;
        let result = match status {
            EntryStatus::Completed => scheduler.complete(entry_id, at).await,
            EntryStatus::Skipped => scheduler.skip(entry_id, reason, at).await,
            EntryStatus::Failed => scheduler.fail(entry_id, reason, at).await,
            EntryStatus::Pending | EntryStatus::Ready => {
                return Err(CadenceError::Internal(format!(
                    "cannot close entry {entry_id} as {status}"
                )));
            }
        };
        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(CadenceError::NotFound { .. }) => {
                debug!(entry_id = %entry_id, "entry already closed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn patch_after_outcome(
        &self,
        lead: &Lead,
        stats: cadence_core::LeadStats,
    ) -> Result<(), CadenceError> {
        let next = self.inner.scheduler.next_follow_up(&lead.id).await?;
        let patch = LeadPatch {
            stats: Some(stats),
            next_follow_up_at: Some(next),
            ..LeadPatch::default()
        };
        self.inner.collaborators.leads.update(&lead.id, patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::SendError;

    #[test]
    fn failure_kinds_follow_error_taxonomy() {
        let banned: CadenceError = SendError::Banned("spam".into()).into();
        assert_eq!(Failure::from(&banned).kind, FailureKind::Fatal);

        let limited: CadenceError = SendError::RateLimited.into();
        assert_eq!(Failure::from(&limited).kind, FailureKind::Retryable);

        let timeout = CadenceError::Timeout {
            operation: "send",
            duration: std::time::Duration::from_secs(15),
        };
        let failure = Failure::from(&timeout);
        assert_eq!(failure.kind, FailureKind::Retryable);
        assert_eq!(failure.reason, "send-timeout");

        let rejected = CadenceError::Internal("generation rejected: policy".into());
        assert_eq!(Failure::from(&rejected).kind, FailureKind::Permanent);
    }
}
