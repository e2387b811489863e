// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Starting, stopping and recovering nurturing.

use cadence_core::{
    CadenceError, ConversationState, FollowUpEntry, LeadId, LeadPatch, TaskStatus,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::orchestrator::Orchestrator;
use crate::outcome::Failure;
use crate::reasons;

/// What disabling nurturing cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisableReport {
    pub cancelled_tasks: usize,
    pub cleared_entries: usize,
}

impl Orchestrator {
    /// Begin nurturing a lead and arm its first follow-up at `now`.
    ///
    /// Idempotent: a lead that already has an open follow-up keeps it.
    pub async fn start_nurturing(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(lead_id).await;

        let lead = inner
            .collaborators
            .leads
            .get(lead_id)
            .await?
            .ok_or_else(|| CadenceError::not_found("lead", lead_id))?;
        if !lead.nurturing.enabled {
            return Err(CadenceError::Validation(format!(
                "nurturing is disabled in the configuration of lead {lead_id}"
            )));
        }

        let conversation = match inner.store.get_conversation(lead_id).await? {
            Some(state) => state,
            None => {
                let state = ConversationState::new(lead_id.clone());
                inner.store.put_conversation(&state).await?;
                state
            }
        };
        if let Some(reason) = &conversation.halted_reason {
            return Err(CadenceError::Validation(format!(
                "lead {lead_id} is halted ({reason}); clear the halt first"
            )));
        }

        let open = inner.store.open_entries_for_lead(lead_id).await?;
        let entry = match open.into_iter().next() {
            Some(existing) => existing,
            None => {
                let decision = inner
                    .selector
                    .select_for_lead(&lead, &conversation, now)
                    .ok_or_else(|| {
                        CadenceError::Validation(format!(
                            "lead {lead_id} allows no conversation channel"
                        ))
                    })?;
                inner
                    .scheduler
                    .schedule(lead_id, decision.conversation_type, now, now)
                    .await?
            }
        };

        let patch = LeadPatch {
            is_nurturing: Some(true),
            next_follow_up_at: Some(inner.scheduler.next_follow_up(lead_id).await?),
            ..LeadPatch::default()
        };
        inner.collaborators.leads.update(lead_id, patch).await?;

        info!(
            lead_id = %lead_id,
            entry_id = %entry.id,
            conversation_type = %entry.conversation_type,
            "nurturing started"
        );
        Ok(entry)
    }

    /// Stop nurturing a lead.
    ///
    /// Cancels a task that has not started executing and clears every open
    /// follow-up. Fatigue state is left as is.
    pub async fn disable_nurturing(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<DisableReport, CadenceError> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(lead_id).await;
        let mut report = DisableReport::default();

        if let Some(mut task) = inner.store.active_task_for_lead(lead_id).await?
            && task.status != TaskStatus::Executing
        {
            task.status = TaskStatus::Skipped;
            task.reason = Some(reasons::NURTURING_DISABLED.into());
            task.updated_at = now;
            inner.store.update_task(&task).await?;
            report.cancelled_tasks = 1;
        }

        report.cleared_entries = inner
            .scheduler
            .clear_for_lead(lead_id, reasons::NURTURING_DISABLED, now)
            .await?;

        let patch = LeadPatch {
            is_nurturing: Some(false),
            next_follow_up_at: Some(None),
            ..LeadPatch::default()
        };
        match inner.collaborators.leads.update(lead_id, patch).await {
            Ok(_) | Err(CadenceError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        info!(
            lead_id = %lead_id,
            cancelled_tasks = report.cancelled_tasks,
            cleared_entries = report.cleared_entries,
            "nurturing disabled"
        );
        Ok(report)
    }

    /// Lift a fatal halt and restart nurturing.
    pub async fn clear_halt(
        &self,
        lead_id: &LeadId,
        now: DateTime<Utc>,
    ) -> Result<FollowUpEntry, CadenceError> {
        let inner = &self.inner;
        {
            let _guard = inner.locks.lock(lead_id).await;
            let mut conversation = self.conversation(lead_id).await?;
            let Some(reason) = conversation.halted_reason.take() else {
                return Err(CadenceError::Validation(format!(
                    "lead {lead_id} is not halted"
                )));
            };
            inner.store.put_conversation(&conversation).await?;

            let patch = LeadPatch {
                flagged_reason: Some(None),
                ..LeadPatch::default()
            };
            inner.collaborators.leads.update(lead_id, patch).await?;
            info!(lead_id = %lead_id, previous_reason = reason.as_str(), "halt cleared");
        }

        self.start_nurturing(lead_id, now).await
    }

    /// Fail tasks a previous run left mid-flight and schedule their retries.
    ///
    /// Tasks awaiting confirmation survive a restart and keep waiting.
    pub async fn recover(&self, now: DateTime<Utc>) -> Result<usize, CadenceError> {
        let inner = &self.inner;
        let stranded = inner
            .store
            .list_tasks(&[TaskStatus::Pending, TaskStatus::Ready, TaskStatus::Executing])
            .await?;

        let count = stranded.len();
        for task in stranded {
            let _guard = inner.locks.lock(&task.lead_id).await;
            warn!(
                lead_id = %task.lead_id,
                task_id = %task.id,
                status = %task.status,
                "recovering interrupted task"
            );
            let lead = inner.collaborators.leads.get(&task.lead_id).await?;
            self.apply_failure(task, lead, Failure::retryable(reasons::INTERRUPTED), now)
                .await?;
        }

        if count > 0 {
            info!(count, "interrupted tasks recovered");
        }
        Ok(count)
    }
}
