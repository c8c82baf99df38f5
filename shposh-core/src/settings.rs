//! Session settings and their defaults.

use crate::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};

/// What happens to the config watcher once the prompt loop returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum WatcherPolicy {
    /// Cancel and join the watcher before the notification queue is closed.
    #[default]
    StopWithPrompt,
    /// Leave the watcher polling until the runtime goes away. Anything it
    /// reports after the queue is closed is dropped.
    UntilExit,
}

/// Runtime settings for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub poll_interval: Duration,
    pub consumer_poll_timeout: Duration,
    pub debounce_delay: Duration,
    pub task_ticks: u32,
    pub task_interval: Duration,
    /// Emit task progress every this many ticks.
    pub task_progress_every: u32,
    pub watcher_policy: WatcherPolicy,
    pub max_input_failures: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            poll_interval: Duration::from_secs(1),
            consumer_poll_timeout: Duration::from_millis(500),
            debounce_delay: Duration::from_secs(1),
            task_ticks: 20,
            task_interval: Duration::from_secs(1),
            task_progress_every: 1,
            watcher_policy: WatcherPolicy::default(),
            max_input_failures: 16,
        }
    }
}
