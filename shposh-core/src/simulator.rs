//! The `simtask` command: a fixed number of timed steps reported through the
//! notification queue, cancellable between steps.

use crate::notify::{Notification, Notifier};
use crate::settings::Settings;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationOutcome {
    Completed,
    Cancelled { at_tick: u32 },
}

/// Fake long-running operation that reports progress through the queue.
#[derive(Clone, Debug)]
pub struct TaskSimulator {
    ticks: u32,
    interval: Duration,
    progress_every: u32,
    notifier: Notifier,
}

impl TaskSimulator {
    pub fn new(ticks: u32, interval: Duration, progress_every: u32, notifier: Notifier) -> Self {
        Self {
            ticks,
            interval,
            progress_every: progress_every.max(1),
            notifier,
        }
    }

    pub fn from_settings(settings: &Settings, notifier: Notifier) -> Self {
        Self::new(
            settings.task_ticks,
            settings.task_interval,
            settings.task_progress_every,
            notifier,
        )
    }

    pub async fn run(&self, token: &CancellationToken) -> SimulationOutcome {
        self.notifier
            .notify(Notification::task(format!("simtask: started ({} steps)", self.ticks)));

        for tick in 1..=self.ticks {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(tick, "simulated task cancelled");
                    self.notifier.notify(Notification::task("simtask cancelled"));
                    return SimulationOutcome::Cancelled { at_tick: tick - 1 };
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            if tick % self.progress_every == 0 || tick == self.ticks {
                self.notifier.notify(Notification::task(progress(tick, self.ticks)));
            }
        }

        self.notifier.notify(Notification::task("simtask: finished"));
        SimulationOutcome::Completed
    }
}

fn progress(tick: u32, ticks: u32) -> String {
    let percent = u64::from(tick) * 100 / u64::from(ticks.max(1));
    format!("simtask: {percent}% ({tick}/{ticks})")
}
