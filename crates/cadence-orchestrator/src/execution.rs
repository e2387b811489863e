// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded worker pool for content generation and sending.
//!
//! Workers take a semaphore permit, mark the task executing under the lead
//! lock, then call the generator and transport without holding it. Results
//! are applied under the lock again.

use std::time::Duration as StdDuration;

use cadence_core::{
    CadenceError, GeneratedContent, Lead, NotificationKind, NotificationPriority, SendReceipt,
    Task, TaskId, TaskStatus,
};
use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::orchestrator::Orchestrator;
use crate::outcome::Failure;
use crate::reasons;

/// What a worker does with a ready task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Job {
    /// Generate content, then wait for a human to confirm.
    Prepare,
    /// Send the task's content, generating it first if it has none.
    Send,
}

/// Wall-clock time `started` has advanced past `base`.
fn clock(base: DateTime<Utc>, started: Instant) -> DateTime<Utc> {
    base + Duration::from_std(started.elapsed()).unwrap_or_else(|_| Duration::zero())
}

impl Orchestrator {
    pub(crate) fn dispatch(&self, task_id: TaskId, job: Job, now: DateTime<Utc>) {
        let this = self.clone();
        let started = Instant::now();
        self.inner.tracker.spawn(async move {
            let Ok(_permit) = this.inner.workers.clone().acquire_owned().await else {
                return;
            };
            if let Err(e) = this.execute(&task_id, job, now, started).await {
                error!(task_id = %task_id, error = %e, "task execution failed");
            }
        });
    }

    async fn execute(
        &self,
        task_id: &TaskId,
        job: Job,
        base: DateTime<Utc>,
        started: Instant,
    ) -> Result<(), CadenceError> {
        let inner = &self.inner;
        let lead_id = match inner.store.get_task(task_id).await? {
            Some(task) => task.lead_id,
            None => return Err(CadenceError::not_found("task", task_id)),
        };

        let (task, lead) = {
            let _guard = inner.locks.lock(&lead_id).await;
            let Some(mut task) = inner.store.get_task(task_id).await? else {
                return Err(CadenceError::not_found("task", task_id));
            };
            if task.status != TaskStatus::Ready {
                debug!(task_id = %task_id, status = %task.status, "task no longer ready, dropping");
                return Ok(());
            }

            let now = clock(base, started);
            let Some(lead) = inner.collaborators.leads.get(&lead_id).await? else {
                return self
                    .apply_failure(task, None, Failure::permanent(reasons::LEAD_NOT_FOUND), now)
                    .await;
            };

            task.status = TaskStatus::Executing;
            task.updated_at = now;
            inner.store.update_task(&task).await?;
            (task, lead)
        };

        let content = match (&task.content, job) {
            (Some(content), Job::Send) => content.clone(),
            _ => match self.generate(&lead, &task).await {
                Ok(content) => content,
                Err(err) => {
                    let _guard = inner.locks.lock(&lead_id).await;
                    let now = clock(base, started);
                    return self
                        .apply_failure(task, Some(lead), Failure::from(&err), now)
                        .await;
                }
            },
        };

        if job == Job::Prepare {
            let _guard = inner.locks.lock(&lead_id).await;
            return self
                .await_confirmation(task, content, clock(base, started))
                .await;
        }

        // Last look before anything leaves: an inbound reply may have set a
        // cooldown while content was being generated.
        {
            let _guard = inner.locks.lock(&lead_id).await;
            let now = clock(base, started);
            let Some(mut task) = inner.store.get_task(task_id).await? else {
                return Ok(());
            };
            if task.status != TaskStatus::Executing {
                debug!(task_id = %task_id, status = %task.status, "task changed during generation, dropping");
                return Ok(());
            }
            let decision = inner.fatigue.evaluate(&lead, now).await?;
            if !decision.contactable {
                task.content = Some(content);
                self.hold_for_fatigue(task, &lead, decision, now).await?;
                return Ok(());
            }
        }

        let sent = self.send(&lead, &content).await;
        let _guard = inner.locks.lock(&lead_id).await;
        let now = clock(base, started);
        match sent {
            Ok(receipt) => self.apply_success(task, lead, content, receipt, now).await,
            Err(err) => {
                let mut task = task;
                task.content = Some(content);
                self.apply_failure(task, Some(lead), Failure::from(&err), now)
                    .await
            }
        }
    }

    /// Generate content, retrying once after the backoff on a transient failure.
    async fn generate(&self, lead: &Lead, task: &Task) -> Result<GeneratedContent, CadenceError> {
        match self.generate_once(lead, task).await {
            Err(err) if err.is_retryable() => {
                warn!(
                    lead_id = %lead.id,
                    task_id = %task.id,
                    error = %err,
                    "transient generation failure, retrying once"
                );
                let backoff = StdDuration::from_millis(self.inner.config.retry_backoff_ms);
                tokio::time::sleep(backoff).await;
                self.generate_once(lead, task).await
            }
            other => other,
        }
    }

    async fn generate_once(
        &self,
        lead: &Lead,
        task: &Task,
    ) -> Result<GeneratedContent, CadenceError> {
        let limit = StdDuration::from_secs(self.inner.config.generation_timeout_secs);
        let call = self.inner.collaborators.generator.generate(
            lead,
            task.conversation_type,
            &task.topic_hint,
        );
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(CadenceError::from),
            Err(_) => Err(CadenceError::Timeout {
                operation: "generation",
                duration: limit,
            }),
        }
    }

    /// Send once. Transport failures are never retried within the tick.
    async fn send(
        &self,
        lead: &Lead,
        content: &GeneratedContent,
    ) -> Result<SendReceipt, CadenceError> {
        let limit = StdDuration::from_secs(self.inner.config.send_timeout_secs);
        let call = self.inner.collaborators.transport.send(lead, content);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(CadenceError::from),
            Err(_) => Err(CadenceError::Timeout {
                operation: "send",
                duration: limit,
            }),
        }
    }

    /// Park a prepared task for human confirmation. Caller holds the lead lock.
    async fn await_confirmation(
        &self,
        task: Task,
        content: GeneratedContent,
        now: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        let inner = &self.inner;
        let Some(mut task) = inner.store.get_task(&task.id).await? else {
            return Ok(());
        };
        if task.status != TaskStatus::Executing {
            return Ok(());
        }

        let lead = inner.collaborators.leads.get(&task.lead_id).await?;
        if !lead.as_ref().is_some_and(Lead::nurturing_active) {
            task.status = TaskStatus::Skipped;
            task.reason = Some(reasons::NURTURING_DISABLED.into());
            task.updated_at = now;
            inner.store.update_task(&task).await?;
            return Ok(());
        }

        task.content = Some(content);
        task.status = TaskStatus::AwaitingConfirmation;
        task.awaiting_since = Some(now);
        task.updated_at = now;
        inner.store.update_task(&task).await?;

        let priority = if task.urgent {
            NotificationPriority::High
        } else {
            NotificationPriority::Normal
        };
        inner.collaborators.notifier.notify(
            NotificationKind::Confirmation,
            priority,
            serde_json::json!({
                "event": "confirmation-requested",
                "task_id": task.id,
                "lead_id": task.lead_id,
                "conversation_type": task.conversation_type,
                "topic_hint": task.topic_hint,
                "urgent": task.urgent,
                "content": task.content.as_ref().map(|c| c.text.as_str()),
                "expires_at": now + inner.config.confirmation_ttl(),
            }),
        );
        info!(
            lead_id = %task.lead_id,
            task_id = %task.id,
            "task awaiting confirmation"
        );
        Ok(())
    }
}
