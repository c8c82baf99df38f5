//! Config file loading and the shared config snapshot.
//!
//! The config file is a small TOML document with a single `[shell]` table:
//!
//! ```toml
//! [shell]
//! colorScheme = "truecolor"
//! userInput = "echo hi"
//! ```
//!
//! A [`Config`] is never mutated after it has been loaded. Changes produce a
//! new value that is published through [`ConfigStore`].

use miette::Diagnostic;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./.shposh";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    #[diagnostic(
        code(shposh::config::not_found),
        help("create the file with a [shell] table to customize the prompt")
    )]
    NotFound { path: PathBuf },

    #[error("error when decoding {}: {source}", path.display())]
    #[diagnostic(code(shposh::config::decode))]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    #[diagnostic(code(shposh::config::io))]
    Unknown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of a [`ConfigError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigErrorKind {
    NotFound,
    Decode,
    Unknown,
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::NotFound { .. } => ConfigErrorKind::NotFound,
            ConfigError::Decode { .. } => ConfigErrorKind::Decode,
            ConfigError::Unknown { .. } => ConfigErrorKind::Unknown,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::Decode { path, .. }
            | ConfigError::Unknown { path, .. } => path,
        }
    }
}

/// Parsed contents of the config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Requested color mode. Kept verbatim: the renderer decides whether the
    /// value is usable.
    #[serde(default)]
    pub color_scheme: Option<String>,
    /// Last line persisted by the input debouncer.
    #[serde(default)]
    pub user_input: Option<String>,
}

impl Config {
    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse the config file at `path`.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(ConfigError::Unknown {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        Self::parse(&text).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn color_scheme(&self) -> Option<&str> {
        self.shell.color_scheme.as_deref()
    }

    pub fn user_input(&self) -> Option<&str> {
        self.shell.user_input.as_deref()
    }

    /// Copy of this config with `userInput` replaced.
    pub fn with_user_input(&self, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.shell.user_input = Some(text.into());
        next
    }
}

/// Shared handle to the effective config.
///
/// Readers get an `Arc` snapshot that never changes underneath them; writers
/// build a new `Config` and swap it in while holding the write lock, so the
/// watcher and the input debouncer never lose each other's updates.
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    current: Arc<RwLock<Arc<Config>>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn snapshot(&self) -> Arc<Config> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish a snapshot read from disk.
    ///
    /// The file is authoritative for every field it sets. A `userInput`
    /// persisted during this session survives when the file has none.
    pub fn publish_file(&self, config: Config) -> Arc<Config> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = if config.user_input().is_some() {
            config
        } else {
            match current.user_input() {
                Some(kept) => config.with_user_input(kept),
                None => config,
            }
        };
        *current = Arc::new(next);
        current.clone()
    }

    /// Publish a new snapshot carrying `text` as `userInput`.
    pub fn persist_user_input(&self, text: impl Into<String>) -> Arc<Config> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(current.with_user_input(text));
        current.clone()
    }
}
