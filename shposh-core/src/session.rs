//! Session wiring.
//!
//! A [`Session`] starts the watcher, the debounce task and the notification
//! consumer around the prompt loop, then stops them in order once the prompt
//! exits.

use crate::config::ConfigStore;
use crate::debounce;
use crate::input::LineSource;
use crate::notify;
use crate::prompt::{PromptExit, PromptLoop};
use crate::renderer::{ColorMode, Renderer, RendererHandle, Sink};
use crate::settings::{Settings, WatcherPolicy};
use crate::shutdown::Shutdown;
use crate::simulator::TaskSimulator;
use crate::watcher::ConfigWatcher;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Summary of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub exit: PromptExit,
    /// Notifications rendered by the consumer.
    pub delivered: usize,
    /// Input values persisted by the debouncer.
    pub persisted: usize,
    /// Config changes applied by the watcher after startup. `None` when the
    /// watcher was left running.
    pub config_changes: Option<usize>,
}

/// Owns every component for one shell run.
pub struct Session {
    settings: Settings,
    renderer: RendererHandle,
    store: ConfigStore,
    shutdown: Arc<Shutdown>,
}

impl Session {
    pub fn new(settings: Settings, sink: Sink, shutdown: Arc<Shutdown>) -> Self {
        Self {
            settings,
            renderer: RendererHandle::new(Renderer::new(ColorMode::Auto, sink)),
            store: ConfigStore::default(),
            shutdown,
        }
    }

    pub fn renderer(&self) -> &RendererHandle {
        &self.renderer
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Run the prompt until it exits, then stop everything in order: watcher,
    /// debouncer, the sentinel, and finally the consumer.
    pub async fn run<I: LineSource + ?Sized>(self, input: &mut I) -> SessionReport {
        let settings = &self.settings;
        let (notifier, closer, consumer) = notify::queue(settings.consumer_poll_timeout);
        let consumer = consumer.spawn(self.renderer.clone());

        let mut watcher = ConfigWatcher::new(
            settings.config_path.clone(),
            settings.poll_interval,
            self.renderer.clone(),
            self.store.clone(),
            notifier.clone(),
        );
        if let Err(err) = watcher.bootstrap().await {
            debug!("starting without a config file: {err}");
        }
        let watcher_token = match settings.watcher_policy {
            WatcherPolicy::StopWithPrompt => self.shutdown.child_token(),
            WatcherPolicy::UntilExit => CancellationToken::new(),
        };
        let watcher = watcher.spawn(watcher_token.clone());

        let (debouncer, debounce_task) = debounce::spawn(
            settings.debounce_delay,
            self.store.clone(),
            notifier.clone(),
            self.shutdown.child_token(),
        );
        let simulator = TaskSimulator::from_settings(settings, notifier.clone());

        let mut prompt = PromptLoop::new(
            self.renderer.clone(),
            debouncer,
            simulator,
            Arc::clone(&self.shutdown),
            settings.max_input_failures,
        );
        let exit = prompt.run(input).await;
        drop(prompt);
        debug!(%exit, "shutting down session");

        let config_changes = match settings.watcher_policy {
            WatcherPolicy::StopWithPrompt => {
                watcher_token.cancel();
                match watcher.await {
                    Ok(applied) => Some(applied),
                    Err(e) => {
                        warn!("config watcher task failed: {e}");
                        Some(0)
                    }
                }
            }
            WatcherPolicy::UntilExit => {
                debug!("config watcher left running until exit");
                None
            }
        };

        let persisted = debounce_task.shutdown().await;
        self.shutdown.shutdown();

        drop(notifier);
        closer.close();
        let delivered = consumer.await.unwrap_or_else(|e| {
            warn!("notification consumer failed: {e}");
            0
        });

        SessionReport {
            exit,
            delivered,
            persisted,
            config_changes,
        }
    }
}
