// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cadence serve` command implementation.
//!
//! Wires the dry-run adapters into the orchestrator, seeds every lead
//! marked for nurturing, and runs until SIGINT/SIGTERM. Operator commands
//! are read from a line editor on stdin; Ctrl+C at the prompt also shuts
//! the engine down.

use std::path::Path;
use std::sync::Arc;

use cadence_config::model::CadenceConfig;
use cadence_core::{
    CadenceError, HealthStatus, LeadFilter, LeadId, LeadStore, OperatingMode, TaskId,
};
use cadence_orchestrator::shutdown::install_signal_handler;
use cadence_orchestrator::{event_channel, Collaborators, Orchestrator, OrchestratorEvent};
use clap::error::ErrorKind;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::{
    DryRunTransport, JsonLeadStore, KeywordSentiment, LogNotifier, TemplateGenerator,
};

/// Runs the `cadence serve` command.
pub async fn run_serve(config: CadenceConfig, leads_path: &Path) -> Result<(), CadenceError> {
    init_tracing(&config.agent.log_level);

    info!(
        agent_name = config.agent.name.as_str(),
        leads = %leads_path.display(),
        "starting cadence serve"
    );

    let leads: Arc<dyn LeadStore> = Arc::new(JsonLeadStore::open(leads_path).await?);
    let collaborators = Collaborators {
        leads: Arc::clone(&leads),
        generator: Arc::new(TemplateGenerator),
        transport: Arc::new(DryRunTransport),
        notifier: Arc::new(LogNotifier),
        sentiment: Arc::new(KeywordSentiment),
    };

    for health in collaborators.health_check().await {
        match &health.status {
            HealthStatus::Healthy => {
                debug!(adapter = health.name.as_str(), kind = %health.adapter_type, "adapter healthy");
            }
            HealthStatus::Degraded(reason) => {
                warn!(adapter = health.name.as_str(), reason = reason.as_str(), "adapter degraded");
            }
            HealthStatus::Unhealthy(reason) => {
                error!(adapter = health.name.as_str(), reason = reason.as_str(), "adapter unhealthy");
                return Err(CadenceError::Internal(format!(
                    "adapter {} is unhealthy: {reason}",
                    health.name
                )));
            }
        }
    }

    let store = cadence_storage::open_store(&config.storage).await?;
    info!(backend = ?config.storage.backend, "storage opened");

    let orchestrator = Orchestrator::new(&config, store, collaborators);
    let (tx, rx) = event_channel(&config.orchestrator);
    let cancel = install_signal_handler();

    // The loop must be draining the channel before seeding can fill it.
    let runner = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(rx, cancel).await })
    };

    let seeded = seed_nurturing(leads.as_ref(), &tx).await?;
    info!(leads = seeded, "nurturing leads queued");

    // The editor blocks on stdin, so it gets its own thread. It is left
    // running at exit; the process ending reclaims it.
    std::thread::Builder::new()
        .name("cadence-console".into())
        .spawn(move || read_operator_commands(tx, cancel))
        .map_err(|e| CadenceError::Internal(format!("failed to start operator console: {e}")))?;

    match runner.await {
        Ok(result) => result,
        Err(e) => Err(CadenceError::Internal(format!("orchestrator task panicked: {e}"))),
    }
}

/// Queue a `StartNurturing` event for every lead flagged for nurturing.
async fn seed_nurturing(
    leads: &dyn LeadStore,
    tx: &mpsc::Sender<OrchestratorEvent>,
) -> Result<usize, CadenceError> {
    let filter = LeadFilter {
        nurturing: Some(true),
        ..LeadFilter::default()
    };
    let active = leads.list(&filter).await?;
    let count = active.len();
    for lead in active {
        if tx.send(OrchestratorEvent::StartNurturing(lead.id)).await.is_err() {
            break;
        }
    }
    Ok(count)
}

fn read_operator_commands(tx: mpsc::Sender<OrchestratorEvent>, cancel: CancellationToken) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            warn!(error = %e, "failed to initialize line editor, operator commands disabled");
            return;
        }
    };

    while !cancel.is_cancelled() {
        match rl.readline("cadence> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match parse_command(trimmed) {
                    Ok(event) => {
                        if tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::DisplayHelp => println!("{e}"),
                    Err(e) => warn!(input = trimmed, error = %e.kind(), "invalid operator command"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("interrupted at the prompt, shutting down");
                cancel.cancel();
                break;
            }
            Err(ReadlineError::Eof) => {
                debug!("stdin closed, operator commands disabled");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read operator command");
                break;
            }
        }
    }
}

/// One operator command line.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
enum OperatorCommand {
    /// Approve a task awaiting confirmation.
    Confirm { task_id: String },
    /// Reject a task that has not been sent.
    Skip {
        task_id: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        reason: Vec<String>,
    },
    /// Record a reply from a lead.
    Inbound {
        lead_id: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    /// Switch between auto and semi_auto.
    Mode { mode: OperatingMode },
    /// Start nurturing a lead.
    Start { lead_id: String },
    /// Stop nurturing a lead.
    Disable { lead_id: String },
    /// Resume a lead halted by a fatal send error.
    ClearHalt { lead_id: String },
}

impl From<OperatorCommand> for OrchestratorEvent {
    fn from(command: OperatorCommand) -> Self {
        match command {
            OperatorCommand::Confirm { task_id } => Self::Confirm(TaskId::from(task_id)),
            OperatorCommand::Skip { task_id, reason } => Self::SkipTask {
                task_id: TaskId::from(task_id),
                reason: if reason.is_empty() {
                    "operator".into()
                } else {
                    reason.join(" ")
                },
            },
            OperatorCommand::Inbound { lead_id, message } => Self::Inbound {
                lead_id: LeadId::from(lead_id),
                message: message.join(" "),
            },
            OperatorCommand::Mode { mode } => Self::SetMode(mode),
            OperatorCommand::Start { lead_id } => Self::StartNurturing(LeadId::from(lead_id)),
            OperatorCommand::Disable { lead_id } => Self::DisableNurturing(LeadId::from(lead_id)),
            OperatorCommand::ClearHalt { lead_id } => Self::ClearHalt(LeadId::from(lead_id)),
        }
    }
}

/// Parse one operator command line.
///
/// ```text
/// confirm <task-id>
/// skip <task-id> [reason...]
/// inbound <lead-id> <message...>
/// mode auto|semi_auto
/// start <lead-id>
/// disable <lead-id>
/// clear-halt <lead-id>
/// ```
fn parse_command(line: &str) -> Result<OrchestratorEvent, clap::Error> {
    OperatorCommand::try_parse_from(line.split_whitespace()).map(OrchestratorEvent::from)
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cadence={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
