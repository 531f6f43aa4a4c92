//! Orderly termination.  Both server loops wait on their sockets
//! with a bounded timeout and poll the flag in between, so a signal
//! is observed within a second and in-flight requests drain rather
//! than being aborted.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};

/// How long a server loop will wait on its socket before checking
/// the shutdown flag again.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A process-wide cancellation flag: false until a termination
/// signal arrives, then true forever.  Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Set the flag when SIGINT or SIGTERM arrives.  No other signals
/// are handled.
pub async fn watch_for_signals(shutdown: ShutdownFlag) {
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not subscribe to SIGINT");
            process::exit(1);
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(error) => {
            tracing::error!(?error, "could not subscribe to SIGTERM");
            process::exit(1);
        }
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
    }

    shutdown.set();
}
