//! Session-wide shutdown around a single cancellation token.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use strum::Display;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Signal that ended the session.
///
/// SIGINT is deliberately absent: at the prompt it is an interrupt, not a
/// request to quit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum ShutdownSignal {
    #[strum(to_string = "SIGTERM")]
    Terminate = 1,
    #[strum(to_string = "SIGHUP")]
    Hangup = 2,
}

impl ShutdownSignal {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ShutdownSignal::Terminate),
            2 => Some(ShutdownSignal::Hangup),
            _ => None,
        }
    }
}

/// Session-wide cancellation.
pub struct Shutdown {
    token: CancellationToken,
    last_signal: AtomicU8,
}

impl std::fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shutdown")
            .field("token", &self.token)
            .field("last_signal", &self.last_signal())
            .finish()
    }
}

impl Shutdown {
    /// Create a new Shutdown instance wrapped in Arc
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            token: CancellationToken::new(),
            last_signal: AtomicU8::new(0),
        })
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Check if shutdown has been triggered
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for shutdown to be requested
    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }

    /// Token that is cancelled with the session but can also be cancelled on
    /// its own, without affecting anything else.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// The signal that triggered shutdown, if any.
    pub fn last_signal(&self) -> Option<ShutdownSignal> {
        ShutdownSignal::from_raw(self.last_signal.load(Ordering::Relaxed))
    }

    /// Trigger shutdown on SIGTERM or SIGHUP.
    ///
    /// Handlers are registered before this returns, so a signal delivered right
    /// afterwards is not lost.
    pub fn install_signals(self: &Arc<Self>) -> io::Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let shutdown = Arc::clone(self);

        tokio::spawn(async move {
            let received = tokio::select! {
                _ = sigterm.recv() => ShutdownSignal::Terminate,
                _ = sighup.recv() => ShutdownSignal::Hangup,
                _ = shutdown.wait_for_shutdown() => {
                    debug!("signal listener stopped");
                    return;
                }
            };
            info!("Received {received}, shutting down gracefully...");
            shutdown.last_signal.store(received as u8, Ordering::Relaxed);
            shutdown.shutdown();
        });

        Ok(())
    }
}
