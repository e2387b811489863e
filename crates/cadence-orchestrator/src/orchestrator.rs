// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coordination loop: tick processing and the run loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use arc_swap::ArcSwap;
use cadence_config::model::{CadenceConfig, OrchestratorConfig};
use cadence_core::{
    CadenceError, ConversationState, FollowUpEntry, Lead, LeadId, LeadPatch, NurtureStore,
    OperatingMode, Task, TaskId, TaskStatus,
};
use cadence_fatigue::FatigueController;
use cadence_scheduler::FollowUpScheduler;
use cadence_strategy::StrategySelector;
use cadence_timing::{Candidate, PresenceMonitor, TimingRecommender};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::collaborators::Collaborators;
use crate::events::OrchestratorEvent;
use crate::execution::Job;
use crate::locks::LeadLocks;
use crate::reasons;
use crate::shutdown::DRAIN_TIMEOUT;

pub(crate) struct Inner {
    pub(crate) config: OrchestratorConfig,
    pub(crate) store: Arc<dyn NurtureStore>,
    pub(crate) collaborators: Collaborators,
    pub(crate) scheduler: FollowUpScheduler,
    pub(crate) fatigue: FatigueController,
    pub(crate) recommender: TimingRecommender,
    pub(crate) selector: StrategySelector,
    pub(crate) presence: Mutex<PresenceMonitor>,
    pub(crate) locks: LeadLocks,
    pub(crate) mode: ArcSwap<OperatingMode>,
    pub(crate) workers: Arc<Semaphore>,
    pub(crate) tracker: TaskTracker,
}

/// Drives every lead's follow-up lifecycle.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) inner: Arc<Inner>,
}

/// What happened to one claimed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A task was created and handed to the worker pool.
    Dispatched(TaskId),
    /// The entry was skipped with a reason.
    Skipped(String),
    /// Timing moved the follow-up to a better moment.
    Rescheduled(DateTime<Utc>),
}

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub expired: usize,
    pub claimed: usize,
    pub dispatched: usize,
    pub skipped: usize,
    pub rescheduled: usize,
    pub errors: usize,
}

impl Orchestrator {
    pub fn new(
        config: &CadenceConfig,
        store: Arc<dyn NurtureStore>,
        collaborators: Collaborators,
    ) -> Self {
        let orchestrator = &config.orchestrator;
        info!(
            agent_name = config.agent.name.as_str(),
            mode = %orchestrator.mode,
            workers = orchestrator.worker_concurrency,
            "orchestrator initialized"
        );

        Self {
            inner: Arc::new(Inner {
                config: orchestrator.clone(),
                scheduler: FollowUpScheduler::new(Arc::clone(&store)),
                fatigue: FatigueController::new(&config.fatigue, Arc::clone(&store)),
                recommender: TimingRecommender::new(&config.timing),
                selector: StrategySelector::new(&config.strategy),
                presence: Mutex::new(PresenceMonitor::new(&config.timing)),
                locks: LeadLocks::default(),
                mode: ArcSwap::from_pointee(orchestrator.mode),
                workers: Arc::new(Semaphore::new(orchestrator.worker_concurrency.max(1))),
                tracker: TaskTracker::new(),
                store,
                collaborators,
            }),
        }
    }

    /// Run one scheduling pass at `now`.
    ///
    /// Expires stale confirmations, then claims at most
    /// `max_entries_per_tick` due entries. The rest wait for the next tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, CadenceError> {
        let mut report = TickReport {
            expired: self.expire_confirmations(now).await?,
            ..TickReport::default()
        };

        let entries = self
            .inner
            .scheduler
            .due_entries(now, self.inner.config.max_entries_per_tick)
            .await?;
        report.claimed = entries.len();

        for entry in entries {
            match self.process_entry(&entry, now).await {
                Ok(EntryOutcome::Dispatched(_)) => report.dispatched += 1,
                Ok(EntryOutcome::Skipped(_)) => report.skipped += 1,
                Ok(EntryOutcome::Rescheduled(_)) => report.rescheduled += 1,
                Err(err) => {
                    report.errors += 1;
                    self.abandon_entry(&entry, &err, now).await;
                }
            }
        }

        let held_locks = self.inner.locks.prune();
        let (dropped_peers, peers) = {
            let mut presence = self.inner.presence.lock().await;
            (presence.prune(now), presence.peer_count())
        };
        trace!(held_locks, dropped_peers, peers, "idle per-lead state pruned");

        if report.claimed > 0 || report.expired > 0 {
            info!(
                claimed = report.claimed,
                dispatched = report.dispatched,
                skipped = report.skipped,
                rescheduled = report.rescheduled,
                expired = report.expired,
                errors = report.errors,
                "tick complete"
            );
        } else {
            debug!("tick complete, nothing due");
        }
        Ok(report)
    }

    /// Decide what to do with one claimed (ready) entry.
    pub(crate) async fn process_entry(
        &self,
        entry: &FollowUpEntry,
        now: DateTime<Utc>,
    ) -> Result<EntryOutcome, CadenceError> {
        let inner = &self.inner;
        let _guard = inner.locks.lock(&entry.lead_id).await;

        let Some(lead) = inner.collaborators.leads.get(&entry.lead_id).await? else {
            return self.skip_entry(entry, reasons::LEAD_NOT_FOUND, now).await;
        };
        if !lead.nurturing_active() {
            return self.skip_entry(entry, reasons::NURTURING_DISABLED, now).await;
        }
        let conversation = self.conversation(&lead.id).await?;
        if conversation.halted_reason.is_some() {
            return self.skip_entry(entry, reasons::LEAD_HALTED, now).await;
        }
        if inner.store.active_task_for_lead(&lead.id).await?.is_some() {
            return self.skip_entry(entry, reasons::TASK_IN_FLIGHT, now).await;
        }

        let fatigue = inner.fatigue.evaluate(&lead, now).await?;
        if !fatigue.contactable {
            let reason = fatigue
                .reason
                .unwrap_or_else(|| reasons::NOT_CONTACTABLE.into());
            let outcome = self.skip_entry(entry, &reason, now).await?;
            // Paused, not dropped: the follow-up comes back once allowed.
            if let Some(next) = fatigue.next_allowed_at {
                inner
                    .scheduler
                    .re_arm(&lead.id, entry.conversation_type, next, now)
                    .await?;
                self.sync_next_follow_up(&lead.id).await?;
            }
            return Ok(outcome);
        }

        let Some(decision) = inner.selector.select_for_lead(&lead, &conversation, now) else {
            return self.skip_entry(entry, reasons::CHANNEL_NOT_ALLOWED, now).await;
        };

        if !decision.urgent
            && entry.reschedule_count < inner.config.max_reschedules
            && let Some(better) = self.better_time(&lead, now).await
        {
            inner.scheduler.reschedule(&entry.id, better.at, now).await?;
            self.sync_next_follow_up(&lead.id).await?;
            info!(
                lead_id = %lead.id,
                entry_id = %entry.id,
                rescheduled_to = %better.at,
                confidence = better.confidence,
                "follow-up deferred to a better time"
            );
            return Ok(EntryOutcome::Rescheduled(better.at));
        }

        let mut task = Task::new(
            entry,
            decision.conversation_type,
            decision.topic_hint,
            decision.urgent,
            now,
        );
        task.status = TaskStatus::Ready;
        inner.store.insert_task(&task).await?;

        let job = match self.mode() {
            OperatingMode::Auto => Job::Send,
            OperatingMode::SemiAuto => Job::Prepare,
        };
        info!(
            lead_id = %lead.id,
            task_id = %task.id,
            conversation_type = %task.conversation_type,
            topic = task.topic_hint.as_str(),
            urgent = task.urgent,
            rule = %decision.rule,
            "task created"
        );
        self.dispatch(task.id.clone(), job, now);
        Ok(EntryOutcome::Dispatched(task.id))
    }

    /// The recommender's best slot, if it beats "now" by enough to wait for.
    async fn better_time(&self, lead: &Lead, now: DateTime<Utc>) -> Option<Candidate> {
        let inner = &self.inner;
        let offset = inner.recommender.utc_offset_minutes(lead);
        let pattern = inner
            .presence
            .lock()
            .await
            .pattern(&lead.peer_id, offset, now);

        let now_confidence = inner.recommender.now_confidence(lead, &pattern, now);
        let best = inner
            .recommender
            .recommend(lead, &pattern, now)
            .into_iter()
            .next()?;

        (best.at > now && best.confidence - now_confidence >= inner.config.min_confidence_gain)
            .then_some(best)
    }

    async fn skip_entry(
        &self,
        entry: &FollowUpEntry,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<EntryOutcome, CadenceError> {
        self.inner.scheduler.skip(&entry.id, reason, now).await?;
        warn!(
            lead_id = %entry.lead_id,
            entry_id = %entry.id,
            reason,
            "follow-up skipped"
        );
        Ok(EntryOutcome::Skipped(reason.to_string()))
    }

    /// Best-effort close of an entry whose processing errored.
    pub(crate) async fn abandon_entry(&self, entry: &FollowUpEntry, err: &CadenceError, now: DateTime<Utc>) {
        error!(
            lead_id = %entry.lead_id,
            entry_id = %entry.id,
            error = %err,
            "failed to process follow-up"
        );
        if let Err(close_err) = self.inner.scheduler.fail(&entry.id, &err.reason(), now).await {
            debug!(entry_id = %entry.id, error = %close_err, "could not close abandoned entry");
        }
    }

    /// Persisted conversation state, or a fresh one.
    pub(crate) async fn conversation(
        &self,
        lead_id: &LeadId,
    ) -> Result<ConversationState, CadenceError> {
        Ok(self
            .inner
            .store
            .get_conversation(lead_id)
            .await?
            .unwrap_or_else(|| ConversationState::new(lead_id.clone())))
    }

    /// Mirror the earliest pending follow-up onto the lead record.
    pub(crate) async fn sync_next_follow_up(&self, lead_id: &LeadId) -> Result<(), CadenceError> {
        let next = self.inner.scheduler.next_follow_up(lead_id).await?;
        let patch = LeadPatch {
            next_follow_up_at: Some(next),
            ..LeadPatch::default()
        };
        match self.inner.collaborators.leads.update(lead_id, patch).await {
            Ok(_) | Err(CadenceError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn mode(&self) -> OperatingMode {
        **self.inner.mode.load()
    }

    /// Switch between auto and semi-auto.
    ///
    /// Applies to tasks created afterwards. Tasks already awaiting
    /// confirmation keep waiting.
    pub fn set_mode(&self, mode: OperatingMode) {
        let previous = self.inner.mode.swap(Arc::new(mode));
        if *previous != mode {
            info!(from = %previous, to = %mode, "operating mode changed");
        }
    }

    /// Apply one event from the event channel.
    pub async fn handle_event(
        &self,
        event: OrchestratorEvent,
        now: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        match event {
            OrchestratorEvent::Presence(sample) => {
                self.handle_presence(sample, now).await?;
            }
            OrchestratorEvent::Inbound { lead_id, message } => {
                self.handle_inbound(&lead_id, &message, now).await?;
            }
            OrchestratorEvent::Confirm(task_id) => {
                self.confirm(&task_id, now).await?;
            }
            OrchestratorEvent::SkipTask { task_id, reason } => {
                self.skip_task(&task_id, &reason, now).await?;
            }
            OrchestratorEvent::SetMode(mode) => self.set_mode(mode),
            OrchestratorEvent::StartNurturing(lead_id) => {
                self.start_nurturing(&lead_id, now).await?;
            }
            OrchestratorEvent::DisableNurturing(lead_id) => {
                self.disable_nurturing(&lead_id, now).await?;
            }
            OrchestratorEvent::ClearHalt(lead_id) => {
                self.clear_halt(&lead_id, now).await?;
            }
        }
        Ok(())
    }

    /// Run until `cancel` fires: recover, then tick on the configured
    /// interval and apply events as they arrive.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<OrchestratorEvent>,
        cancel: CancellationToken,
    ) -> Result<(), CadenceError> {
        let recovered = self.recover(Utc::now()).await?;
        let tick_secs = self.inner.config.tick_interval_secs.max(1);
        let mut interval = tokio::time::interval(StdDuration::from_secs(tick_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(mode = %self.mode(), tick_secs, recovered, "orchestrator running");

        let mut events_open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping orchestrator");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        error!(error = %e, "tick failed");
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event, Utc::now()).await {
                            warn!(error = %e, "event rejected");
                        }
                    }
                    None => {
                        debug!("event channel closed, ticking only");
                        events_open = false;
                    }
                },
            }
        }

        self.shutdown(DRAIN_TIMEOUT).await
    }

    /// Wait for every in-flight worker to finish.
    pub async fn drain(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    /// Stop accepting work, wait up to `timeout` for workers, close the store.
    pub async fn shutdown(&self, timeout: StdDuration) -> Result<(), CadenceError> {
        let tracker = &self.inner.tracker;
        tracker.close();
        if tracker.is_empty() {
            info!("no in-flight tasks to drain");
        } else {
            info!(count = tracker.len(), "waiting for in-flight tasks to complete");
            if tokio::time::timeout(timeout, tracker.wait()).await.is_err() {
                warn!(
                    remaining = tracker.len(),
                    "timeout reached, in-flight tasks interrupted"
                );
            }
        }

        self.inner.store.close().await?;
        info!("orchestrator stopped");
        Ok(())
    }
}
