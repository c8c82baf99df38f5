//! Core of the `shposh` interactive shell.
//!
//! A [`Session`] wires together a foreground [`PromptLoop`], a polling
//! [`ConfigWatcher`] that hot-reloads the color scheme, a debounced input
//! store and a notification queue through which every background producer
//! reaches the shared [`Renderer`].

pub mod config;
pub mod debounce;
pub mod input;
pub mod notify;
pub mod prompt;
pub mod renderer;
mod session;
pub mod settings;
mod shutdown;
pub mod simulator;
pub mod watcher;

pub use config::{Config, ConfigError, ConfigErrorKind, ConfigStore};
pub use input::{ChannelInput, InputEvent, LineSource, TerminalInput, is_interactive};
pub use notify::{Notification, NotificationKind, Notifier};
pub use prompt::{Command, PromptExit, PromptLoop, PromptState};
pub use renderer::{ColorMode, Reconfigured, Renderer, RendererHandle, Sink};
pub use session::{Session, SessionReport};
pub use settings::{Settings, WatcherPolicy};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use simulator::{SimulationOutcome, TaskSimulator};
pub use watcher::{ConfigWatcher, PollOutcome};
