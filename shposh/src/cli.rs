use crate::log::Level;
use clap::{Parser, crate_version};
use shposh_core::config::DEFAULT_CONFIG_PATH;
use shposh_core::{Settings, WatcherPolicy};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "shposh",
    version,
    color = clap::ColorChoice::Auto,
    about = format!(
        "shposh {}: an interactive prompt that restyles itself when its config changes",
        crate_version!()
    )
)]
pub struct Cli {
    #[arg(
        short,
        long,
        env = "SHPOSH_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Path to the config file."
    )]
    pub config: PathBuf,

    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "1s",
        help = "How often the config file is checked for changes."
    )]
    pub poll_interval: Duration,

    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "1s",
        help = "Idle time after the last input before it is saved."
    )]
    pub debounce: Duration,

    #[arg(
        long,
        default_value_t,
        help = "Whether the config watcher stops with the prompt (stop-with-prompt) \
                or runs until exit (until-exit)."
    )]
    pub watcher_policy: WatcherPolicy,

    #[arg(
        long,
        default_value_t,
        value_enum,
        help = "Log level for diagnostics written to stderr."
    )]
    pub log_level: Level,

    #[arg(short, long, help = "Enable additional debug logs.")]
    pub verbose: bool,

    #[arg(short, long, conflicts_with = "verbose", help = "Silence all logs")]
    pub quiet: bool,

    #[arg(long, env = "SHPOSH_LOG_FILE", help = "Also write logs to this file.")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn level(&self) -> Level {
        if self.verbose {
            Level::Debug
        } else if self.quiet {
            Level::Silent
        } else {
            self.log_level
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            config_path: self.config.clone(),
            poll_interval: self.poll_interval,
            debounce_delay: self.debounce,
            watcher_policy: self.watcher_policy,
            ..Settings::default()
        }
    }
}
