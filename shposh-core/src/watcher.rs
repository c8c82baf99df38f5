//! Polling config watcher.
//!
//! The watcher re-reads the config file on a fixed interval and compares the
//! result with the last snapshot it applied. Only a structurally different,
//! successfully parsed file reaches the renderer and the notification queue.

use crate::config::{Config, ConfigError, ConfigErrorKind, ConfigStore};
use crate::notify::{Notification, Notifier};
use crate::renderer::{Reconfigured, RendererHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of a single [`ConfigWatcher::poll`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The file matches the last applied snapshot.
    Unchanged,
    /// A new snapshot was applied and announced.
    Applied,
    /// The file changed, but nothing visible did: an unusable or repeated
    /// `colorScheme` with the same `userInput`. The snapshot is recorded
    /// without a notification.
    Absorbed,
    /// Loading failed. `reported` is false when the same failure was already
    /// shown to the user.
    Failed { reported: bool },
}

pub struct ConfigWatcher {
    path: PathBuf,
    interval: Duration,
    renderer: RendererHandle,
    store: ConfigStore,
    notifier: Notifier,
    last_applied: Option<Config>,
    last_failure: Option<(ConfigErrorKind, String)>,
}

impl ConfigWatcher {
    pub fn new(
        path: impl Into<PathBuf>,
        interval: Duration,
        renderer: RendererHandle,
        store: ConfigStore,
        notifier: Notifier,
    ) -> Self {
        Self {
            path: path.into(),
            interval,
            renderer,
            store,
            notifier,
            last_applied: None,
            last_failure: None,
        }
    }

    /// Initial load. A good file is applied without a notification.
    pub async fn bootstrap(&mut self) -> Result<(), ConfigError> {
        match Config::load(&self.path).await {
            Ok(config) => {
                self.apply(&config);
                debug!(path = %self.path.display(), ?config, "initial config applied");
                self.last_applied = Some(config);
                Ok(())
            }
            Err(err) => {
                if err.kind() == ConfigErrorKind::NotFound {
                    // Defaults are already in effect.
                    self.last_applied = Some(Config::default());
                }
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Load the file once and act on the difference.
    pub async fn poll(&mut self) -> PollOutcome {
        let config = match Config::load(&self.path).await {
            Ok(config) => config,
            Err(err) => {
                if err.kind() == ConfigErrorKind::NotFound && self.last_applied.is_none() {
                    self.last_applied = Some(Config::default());
                }
                let reported = self.report(&err);
                return PollOutcome::Failed { reported };
            }
        };
        self.last_failure = None;

        if self.last_applied.as_ref() == Some(&config) {
            return PollOutcome::Unchanged;
        }

        // Nothing applied yet counts as a change.
        let input_changed = self
            .last_applied
            .as_ref()
            .is_none_or(|last| last.user_input() != config.user_input());
        let text = match self.apply(&config) {
            Reconfigured::Changed { to, .. } => Some(format!("color scheme set to {to}")),
            Reconfigured::Unchanged(_) | Reconfigured::Ignored if input_changed => {
                Some("configuration reloaded".to_string())
            }
            Reconfigured::Unchanged(_) | Reconfigured::Ignored => None,
        };
        self.last_applied = Some(config);

        match text {
            Some(text) => {
                debug!(path = %self.path.display(), "config changed: {text}");
                self.notifier.notify(Notification::config_update(text));
                PollOutcome::Applied
            }
            None => {
                debug!(path = %self.path.display(), "config changed without visible effect");
                PollOutcome::Absorbed
            }
        }
    }

    /// Poll every interval until `token` is cancelled. Returns the number of
    /// applied changes.
    pub async fn run(mut self, token: CancellationToken) -> usize {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; bootstrap already covered it.
        interval.tick().await;

        let mut applied = 0;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if self.poll().await == PollOutcome::Applied {
                        applied += 1;
                    }
                }
            }
        }
        debug!(applied, "config watcher stopped");
        applied
    }

    pub fn spawn(self, token: CancellationToken) -> JoinHandle<usize> {
        tokio::spawn(self.run(token))
    }

    fn apply(&self, config: &Config) -> Reconfigured {
        self.store.publish_file(config.clone());
        match config.color_scheme() {
            Some(scheme) => self.renderer.reconfigure(scheme),
            None => Reconfigured::Unchanged(self.renderer.mode()),
        }
    }

    /// Show `err` unless it is the failure shown last. Returns whether it was
    /// shown.
    fn report(&mut self, err: &ConfigError) -> bool {
        let key = (err.kind(), err.to_string());
        if self.last_failure.as_ref() == Some(&key) {
            debug!(path = %self.path.display(), "config still failing: {err}");
            return false;
        }
        debug!(path = %self.path.display(), "config load failed: {err}");

        let notification = match err.kind() {
            ConfigErrorKind::NotFound => Notification::warning(format!(
                "Configuration file not found at {}, using defaults",
                self.path.display()
            )),
            ConfigErrorKind::Decode => Notification::error(key.1.clone()),
            ConfigErrorKind::Unknown => Notification::unknown_error(err),
        };
        self.notifier.notify(notification);
        self.last_failure = Some(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{self, Deliver, NotificationKind};
    use crate::renderer::{ColorMode, Renderer, Sink};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Notification>>>);

    impl Deliver for Recorder {
        fn deliver(&self, notification: &Notification) -> io::Result<()> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        renderer: RendererHandle,
        store: ConfigStore,
        watcher: ConfigWatcher,
        closer: notify::QueueCloser,
        consumer: notify::NotificationConsumer,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let sink = Sink::new(io::sink());
            let renderer = RendererHandle::new(Renderer::new(ColorMode::Auto, sink));
            let store = ConfigStore::default();
            let (notifier, closer, consumer) = notify::queue(Duration::from_millis(10));
            let watcher = ConfigWatcher::new(
                dir.path().join(".shposh"),
                Duration::from_secs(1),
                renderer.clone(),
                store.clone(),
                notifier,
            );
            Self {
                dir,
                renderer,
                store,
                watcher,
                closer,
                consumer,
            }
        }

        fn write(&self, contents: &str) {
            fs::write(self.dir.path().join(".shposh"), contents).unwrap();
        }

        async fn notifications(self) -> Vec<Notification> {
            let recorder = Recorder::default();
            drop(self.watcher);
            self.closer.close();
            self.consumer.run(recorder.clone()).await;
            let seen = recorder.0.lock().unwrap().clone();
            seen
        }
    }

    #[tokio::test]
    async fn test_missing_file_starts_in_auto_with_one_warning() {
        let mut fx = Fixture::new();
        let err = fx.watcher.bootstrap().await.unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::NotFound);
        assert_eq!(fx.renderer.mode(), ColorMode::Auto);

        // Still missing: not reported again.
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: false });

        let seen = fx.notifications().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, NotificationKind::Warning);
        assert!(seen[0].text.contains("not found"));
    }

    #[tokio::test]
    async fn test_bootstrap_is_silent_and_change_is_announced_once() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"truecolor\"\n");
        fx.watcher.bootstrap().await.unwrap();
        assert_eq!(fx.renderer.mode(), ColorMode::TrueColor);

        assert_eq!(fx.watcher.poll().await, PollOutcome::Unchanged);

        fx.write("[shell]\ncolorScheme = \"256\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Applied);
        assert_eq!(fx.renderer.mode(), ColorMode::EightBit);
        assert_eq!(fx.watcher.poll().await, PollOutcome::Unchanged);

        let seen = fx.notifications().await;
        assert_eq!(
            seen,
            [Notification::config_update("color scheme set to 256")]
        );
    }

    #[tokio::test]
    async fn test_equal_content_with_different_formatting_is_unchanged() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"standard\"\n");
        fx.watcher.bootstrap().await.unwrap();
        let before = fx.renderer.current();

        fx.write("# comment\n[shell]\n  colorScheme   =   'standard'\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Unchanged);
        assert!(Arc::ptr_eq(&before, &fx.renderer.current()));
        assert!(fx.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported_once_and_previous_config_kept() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"256\"\n");
        fx.watcher.bootstrap().await.unwrap();

        fx.write("[shell\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: true });
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: false });
        assert_eq!(fx.renderer.mode(), ColorMode::EightBit);

        // Recovery clears the failure, so the next breakage shows up again.
        fx.write("[shell]\ncolorScheme = \"256\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Unchanged);
        fx.write("[shell\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: true });

        let kinds: Vec<NotificationKind> =
            fx.notifications().await.into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, [NotificationKind::Error, NotificationKind::Error]);
    }

    #[tokio::test]
    async fn test_removed_file_keeps_last_snapshot() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"windows\"\n");
        fx.watcher.bootstrap().await.unwrap();

        fs::remove_file(fx.dir.path().join(".shposh")).unwrap();
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: true });
        assert_eq!(fx.renderer.mode(), ColorMode::Windows);
        assert_eq!(fx.store.snapshot().color_scheme(), Some("windows"));
    }

    #[tokio::test]
    async fn test_invalid_scheme_is_recorded_silently() {
        let mut fx = Fixture::new();
        fx.watcher.bootstrap().await.unwrap_err();

        fx.write("[shell]\ncolorScheme = \"sepia\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Absorbed);
        assert_eq!(fx.watcher.poll().await, PollOutcome::Unchanged);
        assert_eq!(fx.renderer.mode(), ColorMode::Auto);

        let seen = fx.notifications().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, NotificationKind::Warning);
    }

    #[tokio::test]
    async fn test_scheme_typo_and_its_fix_announce_nothing() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"256\"\n");
        fx.watcher.bootstrap().await.unwrap();

        fx.write("[shell]\ncolorScheme = \"265\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Absorbed);
        assert_eq!(fx.renderer.mode(), ColorMode::EightBit);

        fx.write("[shell]\ncolorScheme = \"256\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Absorbed);
        assert_eq!(fx.renderer.mode(), ColorMode::EightBit);

        assert!(fx.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_changed_user_input_is_announced_as_reload() {
        let mut fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"256\"\n");
        fx.watcher.bootstrap().await.unwrap();

        fx.write("[shell]\ncolorScheme = \"256\"\nuserInput = \"make\"\n");
        assert_eq!(fx.watcher.poll().await, PollOutcome::Applied);

        let seen = fx.notifications().await;
        assert_eq!(seen, [Notification::config_update("configuration reloaded")]);
    }

    #[tokio::test]
    async fn test_unreadable_config_is_reported_once_as_unknown_error() {
        let mut fx = Fixture::new();
        fs::create_dir(fx.dir.path().join(".shposh")).unwrap();

        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: true });
        assert_eq!(fx.watcher.poll().await, PollOutcome::Failed { reported: false });
        assert_eq!(fx.renderer.mode(), ColorMode::Auto);

        let seen = fx.notifications().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, NotificationKind::Error);
        assert!(seen[0].text.contains("An unknown error occurred."));
    }

    #[tokio::test]
    async fn test_reload_keeps_session_user_input() {
        let mut fx = Fixture::new();
        fx.watcher.bootstrap().await.unwrap_err();
        fx.store.persist_user_input("typed");

        fx.write("[shell]\ncolorScheme = \"standard\"\n");
        fx.watcher.poll().await;
        assert_eq!(fx.store.snapshot().user_input(), Some("typed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let fx = Fixture::new();
        fx.write("[shell]\ncolorScheme = \"standard\"\n");
        let token = CancellationToken::new();
        let handle = ConfigWatcher::new(
            fx.dir.path().join(".shposh"),
            Duration::from_secs(1),
            fx.renderer.clone(),
            fx.store.clone(),
            fx.watcher.notifier.clone(),
        )
        .spawn(token.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(fx.renderer.mode(), ColorMode::Standard);
    }
}
