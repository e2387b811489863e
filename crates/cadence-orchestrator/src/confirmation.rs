// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human confirmation flow for semi-auto mode.

use cadence_core::{
    CadenceError, EntryStatus, NotificationKind, NotificationPriority, Task, TaskId, TaskStatus,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::execution::Job;
use crate::orchestrator::Orchestrator;
use crate::outcome::Failure;
use crate::reasons;

impl Orchestrator {
    async fn require_task(&self, task_id: &TaskId) -> Result<Task, CadenceError> {
        self.inner
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| CadenceError::not_found("task", task_id))
    }

    fn is_expired(&self, task: &Task, now: DateTime<Utc>) -> bool {
        task.awaiting_since
            .is_some_and(|since| since + self.inner.config.confirmation_ttl() <= now)
    }

    /// Approve an awaiting task. Its content is sent by the worker pool.
    ///
    /// Fatigue is checked again here: a lead that turned negative or hit
    /// its ceiling while the task waited gets the task skipped, not sent.
    pub async fn confirm(&self, task_id: &TaskId, now: DateTime<Utc>) -> Result<Task, CadenceError> {
        let lead_id = self.require_task(task_id).await?.lead_id;
        let _guard = self.inner.locks.lock(&lead_id).await;

        let mut task = self.require_task(task_id).await?;
        if task.status != TaskStatus::AwaitingConfirmation {
            return Err(CadenceError::Validation(format!(
                "task {task_id} is {} and cannot be confirmed",
                task.status
            )));
        }
        if self.is_expired(&task, now) {
            self.expire_locked(task, now).await?;
            return Err(CadenceError::Timeout {
                operation: "confirmation",
                duration: self.inner.config.confirmation_ttl().to_std().unwrap_or_default(),
            });
        }

        if let Some(lead) = self.inner.collaborators.leads.get(&lead_id).await? {
            let decision = self.inner.fatigue.evaluate(&lead, now).await?;
            if !decision.contactable {
                return self.hold_for_fatigue(task, &lead, decision, now).await;
            }
        }

        task.status = TaskStatus::Ready;
        task.updated_at = now;
        self.inner.store.update_task(&task).await?;
        info!(lead_id = %task.lead_id, task_id = %task.id, "task confirmed");

        self.dispatch(task.id.clone(), Job::Send, now);
        Ok(task)
    }

    /// Reject an awaiting (or not yet started) task. The follow-up is
    /// skipped and the next one armed at the normal cadence.
    pub async fn skip_task(
        &self,
        task_id: &TaskId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, CadenceError> {
        let lead_id = self.require_task(task_id).await?.lead_id;
        let _guard = self.inner.locks.lock(&lead_id).await;

        let mut task = self.require_task(task_id).await?;
        if task.status.is_terminal() || task.status == TaskStatus::Executing {
            return Err(CadenceError::Validation(format!(
                "task {task_id} is {} and cannot be skipped",
                task.status
            )));
        }

        let recorded = format!("{}: {reason}", reasons::OPERATOR_SKIPPED);
        task.status = TaskStatus::Skipped;
        task.reason = Some(recorded.clone());
        task.updated_at = now;
        self.inner.store.update_task(&task).await?;
        self.close_entry(&task.entry_id, EntryStatus::Skipped, &recorded, now)
            .await?;

        if let Some(lead) = self.inner.collaborators.leads.get(&lead_id).await?
            && lead.nurturing_active()
        {
            let conversation = self.conversation(&lead_id).await?;
            if conversation.halted_reason.is_none() {
                self.re_arm_after(&lead, &conversation, task.conversation_type, false, now)
                    .await?;
            }
        }
        self.sync_next_follow_up(&lead_id).await?;

        info!(lead_id = %task.lead_id, task_id = %task.id, reason, "task skipped by operator");
        Ok(task)
    }

    /// Fail every task left awaiting confirmation past the TTL.
    ///
    /// Each expiry emits exactly one warning.
    pub(crate) async fn expire_confirmations(&self, now: DateTime<Utc>) -> Result<usize, CadenceError> {
        let awaiting = self
            .inner
            .store
            .list_tasks(&[TaskStatus::AwaitingConfirmation])
            .await?;

        let mut expired = 0;
        for candidate in awaiting.into_iter().filter(|t| self.is_expired(t, now)) {
            let _guard = self.inner.locks.lock(&candidate.lead_id).await;
            // Re-read under the lock; a confirm may have won the race.
            let Some(task) = self.inner.store.get_task(&candidate.id).await? else {
                continue;
            };
            if task.status == TaskStatus::AwaitingConfirmation && self.is_expired(&task, now) {
                self.expire_locked(task, now).await?;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn expire_locked(&self, task: Task, now: DateTime<Utc>) -> Result<(), CadenceError> {
        let ttl = self.inner.config.confirmation_ttl();
        let timeout = CadenceError::Timeout {
            operation: "confirmation",
            duration: ttl.to_std().unwrap_or_default(),
        };
        let reason = timeout.reason();

        warn!(
            lead_id = %task.lead_id,
            task_id = %task.id,
            awaiting_since = ?task.awaiting_since,
            "confirmation expired"
        );
        self.inner.collaborators.notifier.notify(
            NotificationKind::Warning,
            NotificationPriority::Normal,
            serde_json::json!({
                "event": "confirmation-expired",
                "task_id": task.id,
                "lead_id": task.lead_id,
                "reason": reason,
            }),
        );

        let lead = self.inner.collaborators.leads.get(&task.lead_id).await?;
        self.apply_failure(task, lead, Failure::expired(reason), now)
            .await
    }
}
