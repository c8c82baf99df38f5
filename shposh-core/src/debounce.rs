//! Trailing-edge debounce for submitted input lines.
//!
//! One task owns the pending text and its deadline. Submissions reach it over a
//! channel and push the deadline back; when the deadline passes with nothing
//! new, the text is persisted once. Since only that task persists, a reset and
//! a fire can never both win.

use crate::config::ConfigStore;
use crate::notify::{Notification, Notifier};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle used by the prompt loop to submit lines.
#[derive(Clone, Debug)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<String>,
}

impl Debouncer {
    /// Record `text` as pending and restart the inactivity timer.
    pub fn submit(&self, text: impl Into<String>) {
        if self.tx.send(text.into()).is_err() {
            warn!("input debouncer is not running, submission dropped");
        }
    }
}

/// The debounce task.
pub struct DebounceTask {
    token: CancellationToken,
    handle: JoinHandle<usize>,
}

impl DebounceTask {
    /// Stop the task, discarding anything still pending. Returns the number of
    /// values persisted over its lifetime.
    pub async fn shutdown(self) -> usize {
        self.token.cancel();
        match self.handle.await {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("input debouncer task failed: {e}");
                0
            }
        }
    }
}

pub fn spawn(
    delay: Duration,
    store: ConfigStore,
    notifier: Notifier,
    token: CancellationToken,
) -> (Debouncer, DebounceTask) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(rx, delay, store, notifier, token.clone()));
    (Debouncer { tx }, DebounceTask { token, handle })
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<String>,
    delay: Duration,
    store: ConfigStore,
    notifier: Notifier,
    token: CancellationToken,
) -> usize {
    let mut pending: Option<String> = None;
    let mut persisted = 0;
    let mut open = true;
    let timer = sleep(delay);
    tokio::pin!(timer);

    loop {
        // Every Debouncer is gone and nothing is left to flush.
        if !open && pending.is_none() {
            break;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            submitted = rx.recv(), if open => match submitted {
                Some(text) => {
                    pending = Some(text);
                    timer.as_mut().reset(Instant::now() + delay);
                }
                None => open = false,
            },
            _ = &mut timer, if pending.is_some() => {
                if let Some(text) = pending.take() {
                    persist(&store, &notifier, text);
                    persisted += 1;
                }
            }
        }
    }

    if let Some(text) = pending {
        debug!(%text, "discarding pending input on shutdown");
    }
    debug!(persisted, "input debouncer stopped");
    persisted
}

fn persist(store: &ConfigStore, notifier: &Notifier, text: String) {
    debug!(%text, "persisting input");
    store.persist_user_input(text.as_str());
    notifier.notify(Notification::input(format!("Saved input: {text}")));
}
