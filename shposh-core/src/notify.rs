//! Notification queue between background producers and the renderer.
//!
//! Producers hold a cloneable [`Notifier`] and never block. A single
//! [`NotificationConsumer`] task delivers messages in arrival order until it
//! sees the sentinel, which can only be sent once through [`QueueCloser`].

use crate::renderer::RendererHandle;
use std::io;
use std::time::Duration;
use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// Presentation category of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    ConfigUpdate,
    Task,
    Input,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, text)
    }

    /// Error notification for failures that have no dedicated wording.
    pub fn unknown_error(error: &dyn std::fmt::Display) -> Self {
        Self::error(format!("An unknown error occurred.\n\n{error}"))
    }

    pub fn config_update(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::ConfigUpdate, text)
    }

    pub fn task(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Task, text)
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Input, text)
    }
}

#[derive(Debug)]
enum Envelope {
    Message(Notification),
    Sentinel,
}

/// Destination the consumer delivers into.
pub trait Deliver: Send + 'static {
    fn deliver(&self, notification: &Notification) -> io::Result<()>;
}

impl Deliver for RendererHandle {
    fn deliver(&self, notification: &Notification) -> io::Result<()> {
        // Resolve the renderer per message so a reconfiguration takes effect
        // from the next notification on.
        self.current().render(notification)
    }
}

/// Create a queue whose consumer waits at most `poll_timeout` per receive.
pub fn queue(poll_timeout: Duration) -> (Notifier, QueueCloser, NotificationConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Notifier { tx: tx.clone() },
        QueueCloser { tx },
        NotificationConsumer { rx, poll_timeout },
    )
}

/// Producer side of the queue.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Notifier {
    /// Enqueue a notification. Returns `false` if the consumer is gone.
    pub fn notify(&self, notification: Notification) -> bool {
        match self.tx.send(Envelope::Message(notification)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(envelope)) => {
                debug!(?envelope, "notification dropped, consumer has stopped");
                false
            }
        }
    }
}

/// Single-use handle that enqueues the shutdown sentinel.
#[derive(Debug)]
pub struct QueueCloser {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl QueueCloser {
    /// Enqueue the sentinel. Everything enqueued before this call is still
    /// delivered; anything after it is not.
    pub fn close(self) {
        if self.tx.send(Envelope::Sentinel).is_err() {
            debug!("notification consumer already stopped");
        }
    }
}

pub struct NotificationConsumer {
    rx: mpsc::UnboundedReceiver<Envelope>,
    poll_timeout: Duration,
}

impl NotificationConsumer {
    pub fn spawn<D: Deliver>(self, target: D) -> JoinHandle<usize> {
        tokio::spawn(self.run(target))
    }

    /// Deliver notifications until the sentinel arrives or every producer is
    /// gone. Returns the number of notifications delivered.
    pub async fn run<D: Deliver>(mut self, target: D) -> usize {
        let mut delivered = 0;
        loop {
            match tokio::time::timeout(self.poll_timeout, self.rx.recv()).await {
                Ok(Some(Envelope::Message(notification))) => {
                    if let Err(e) = target.deliver(&notification) {
                        error!(kind = %notification.kind, "failed to deliver notification: {e}");
                        continue;
                    }
                    delivered += 1;
                }
                Ok(Some(Envelope::Sentinel)) => {
                    debug!(delivered, "notification queue closed");
                    break;
                }
                Ok(None) => {
                    debug!(delivered, "all notification producers dropped");
                    break;
                }
                Err(_elapsed) => trace!("notification queue idle"),
            }
        }
        delivered
    }
}
