//! # Cross-platform OS signal handling and close deadlines.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when
//! the process receives a termination signal, and [`deadline_token`], which
//! turns the configured grace period into the token handed to closers.
//!
//! ## Signals
//! **Unix platforms:** `SIGINT` (Ctrl-C in terminal), `SIGTERM` (systemd/Kubernetes stop)
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Returns a token that cancels itself after `deadline` (never when `None`).
///
/// The guard cancels the token when dropped, which also ends the timer task.
pub fn deadline_token(deadline: Option<Duration>) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    if let Some(d) = deadline {
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(d) => timer.cancel(),
                _ = timer.cancelled() => {}
            }
        });
    }
    let guard = token.clone().drop_guard();
    (token, guard)
}
