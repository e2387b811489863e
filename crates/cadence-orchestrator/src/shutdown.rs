// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal-driven shutdown.
//!
//! SIGINT or SIGTERM cancels the token handed to `Orchestrator::run`. The
//! loop then stops claiming follow-ups and gives workers up to
//! [`DRAIN_TIMEOUT`] to finish.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long shutdown waits for in-flight generation and sends.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns a token cancelled on the first SIGINT or SIGTERM.
///
/// Cancelling the token by other means (the operator console) also retires
/// the listener.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(cancel_on(token.clone(), wait_for_signal()));
    token
}

async fn cancel_on(token: CancellationToken, signal: impl Future<Output = &'static str>) {
    tokio::select! {
        name = signal => {
            info!(signal = name, "stop requested, no new follow-ups will be claimed");
            token.cancel();
        }
        _ = token.cancelled() => debug!("stopped before any signal arrived"),
    }
}

async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(e) => {
                warn!(error = %e, "SIGTERM unavailable, listening for SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    }
}
