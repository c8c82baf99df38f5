//! The foreground read-dispatch loop.

use crate::debounce::Debouncer;
use crate::input::{InputEvent, LineSource};
use crate::renderer::RendererHandle;
use crate::shutdown::Shutdown;
use crate::simulator::{SimulationOutcome, TaskSimulator};
use std::io;
use std::sync::Arc;
use strum::Display;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Leave,
    SimTask,
    Empty,
    Unknown(String),
}

impl Command {
    /// Commands match the whole trimmed line, ignoring case.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Command::Empty
        } else if line.eq_ignore_ascii_case("leave") {
            Command::Leave
        } else if line.eq_ignore_ascii_case("simtask") {
            Command::SimTask
        } else {
            Command::Unknown(line.to_string())
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum PromptState {
    #[default]
    Idle,
    Reading,
    Dispatching,
    BlockedOnTask,
    Terminated,
}

/// Why the prompt loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PromptExit {
    Leave,
    EndOfInput,
    /// Session-wide shutdown, e.g. SIGTERM.
    Shutdown,
    /// Too many consecutive input failures.
    InputFailed,
}

impl PromptExit {
    pub fn is_success(self) -> bool {
        !matches!(self, PromptExit::InputFailed)
    }
}

pub struct PromptLoop {
    renderer: RendererHandle,
    debouncer: Debouncer,
    simulator: TaskSimulator,
    shutdown: Arc<Shutdown>,
    max_input_failures: u32,
    state: PromptState,
}

impl PromptLoop {
    pub fn new(
        renderer: RendererHandle,
        debouncer: Debouncer,
        simulator: TaskSimulator,
        shutdown: Arc<Shutdown>,
        max_input_failures: u32,
    ) -> Self {
        Self {
            renderer,
            debouncer,
            simulator,
            shutdown,
            max_input_failures: max_input_failures.max(1),
            state: PromptState::Idle,
        }
    }

    pub fn state(&self) -> PromptState {
        self.state
    }

    pub async fn run<I: LineSource + ?Sized>(&mut self, input: &mut I) -> PromptExit {
        show(self.renderer.current().log("Started shposh"));

        let mut failures = 0;
        let exit = loop {
            self.transition(PromptState::Reading);

            let event = tokio::select! {
                biased;
                _ = self.shutdown.wait_for_shutdown() => break PromptExit::Shutdown,
                event = input.next_event() => event,
            };

            match event {
                InputEvent::Line(line) => {
                    failures = 0;
                    self.transition(PromptState::Dispatching);
                    if let Some(exit) = self.dispatch(&line).await {
                        break exit;
                    }
                }
                InputEvent::Interrupted => {
                    failures = 0;
                    show(self.renderer.current().print("\nUse 'leave' to quit."));
                }
                InputEvent::EndOfInput => {
                    show(self.renderer.current().print("\nExiting shposh..."));
                    break PromptExit::EndOfInput;
                }
                InputEvent::Failed(e) => {
                    failures += 1;
                    warn!(failures, "failed to read input: {e}");
                    show(self.renderer.current().unknown_error(&e));
                    if failures >= self.max_input_failures {
                        break PromptExit::InputFailed;
                    }
                }
            }
        };

        self.transition(PromptState::Terminated);
        debug!(%exit, "prompt loop finished");
        exit
    }

    async fn dispatch(&mut self, line: &str) -> Option<PromptExit> {
        self.debouncer.submit(line.trim());

        match Command::parse(line) {
            Command::Leave => {
                show(self.renderer.current().print("Exiting shell..."));
                Some(PromptExit::Leave)
            }
            Command::SimTask => {
                self.transition(PromptState::BlockedOnTask);
                let outcome = self.simulator.run(&self.shutdown.child_token()).await;
                debug!(?outcome, "simulated task returned");
                if let SimulationOutcome::Cancelled { .. } = outcome {
                    return Some(PromptExit::Shutdown);
                }
                None
            }
            Command::Empty => None,
            Command::Unknown(command) => {
                show(self.renderer.current().log(&format!("Unknown command: {command}")));
                None
            }
        }
    }

    fn transition(&mut self, next: PromptState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "prompt state");
            self.state = next;
        }
    }
}

/// Output failures never end the loop.
fn show(result: io::Result<()>) {
    if let Err(e) = result {
        warn!("failed to write to the terminal: {e}");
    }
}
