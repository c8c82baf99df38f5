use shposh_core::{Settings, Sink};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// In-memory terminal.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn sink(&self) -> Sink {
        Sink::new(self.clone())
    }

    /// Everything written so far, with styling removed.
    pub fn text(&self) -> String {
        let bytes = self.0.lock().unwrap().clone();
        console::strip_ansi_codes(&String::from_utf8(bytes).expect("utf-8 output")).into_owned()
    }
}

/// Settings with short timings, reading the config from `dir`.
pub fn fast_settings(dir: &Path) -> Settings {
    Settings {
        config_path: config_path(dir),
        poll_interval: Duration::from_millis(20),
        consumer_poll_timeout: Duration::from_millis(20),
        debounce_delay: Duration::from_millis(50),
        task_ticks: 20,
        task_interval: Duration::from_millis(5),
        ..Settings::default()
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(".shposh")
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Replace the config file in one step so a poll never sees half a file.
pub fn write_config(dir: &Path, contents: &str) {
    let staging = dir.join(".shposh.tmp");
    std::fs::write(&staging, contents).expect("write config");
    std::fs::rename(&staging, config_path(dir)).expect("move config into place");
}

/// Wait with timeout for a condition
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
