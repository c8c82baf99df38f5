//! Line input for the prompt loop.

use async_trait::async_trait;
use std::io::{self, BufRead, IsTerminal};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;
use tracing::debug;

/// One thing that happened at the prompt.
#[derive(Debug)]
pub enum InputEvent {
    /// A submitted line, without its line terminator.
    Line(String),
    /// The user pressed Ctrl+C.
    Interrupted,
    EndOfInput,
    Failed(io::Error),
}

/// Source of prompt input.
#[async_trait]
pub trait LineSource: Send {
    async fn next_event(&mut self) -> InputEvent;
}

/// Whether stdin and stdout are both attached to a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Line input from the process's stdin, merged with SIGINT.
///
/// Reads happen on a dedicated thread so a blocked `read_line` never holds a
/// runtime worker.
pub struct TerminalInput {
    lines: mpsc::Receiver<InputEvent>,
    sigint: Signal,
}

impl TerminalInput {
    pub fn spawn() -> io::Result<Self> {
        // Registering the handler also stops Ctrl+C from killing the process.
        let sigint = signal(SignalKind::interrupt())?;
        let (tx, rx) = mpsc::channel(16);

        std::thread::Builder::new()
            .name("shposh-stdin".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                let mut stdin = stdin.lock();
                loop {
                    let mut line = String::new();
                    let event = match stdin.read_line(&mut line) {
                        Ok(0) => InputEvent::EndOfInput,
                        Ok(_) => {
                            let trimmed = line.trim_end_matches(['\n', '\r']).len();
                            line.truncate(trimmed);
                            InputEvent::Line(line)
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => InputEvent::Failed(e),
                    };
                    let finished = matches!(event, InputEvent::EndOfInput);
                    if tx.blocking_send(event).is_err() || finished {
                        debug!("stdin reader stopped");
                        break;
                    }
                }
            })?;

        Ok(Self { lines: rx, sigint })
    }
}

#[async_trait]
impl LineSource for TerminalInput {
    async fn next_event(&mut self) -> InputEvent {
        tokio::select! {
            biased;
            Some(()) = self.sigint.recv() => InputEvent::Interrupted,
            event = self.lines.recv() => event.unwrap_or(InputEvent::EndOfInput),
        }
    }
}

/// Input fed from a channel. Reports end of input once every sender is gone.
pub struct ChannelInput {
    events: mpsc::Receiver<InputEvent>,
}

impl ChannelInput {
    pub fn new(events: mpsc::Receiver<InputEvent>) -> Self {
        Self { events }
    }

    /// Input that replays `events` and then ends.
    pub fn scripted(events: impl IntoIterator<Item = InputEvent>) -> Self {
        let events: Vec<InputEvent> = events.into_iter().collect();
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this cannot fail.
            let _ = tx.try_send(event);
        }
        Self::new(rx)
    }
}

#[async_trait]
impl LineSource for ChannelInput {
    async fn next_event(&mut self) -> InputEvent {
        self.events.recv().await.unwrap_or(InputEvent::EndOfInput)
    }
}
