use crate::cycle::CycleResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Longest uninterrupted nap while waiting for the next cycle.
const SLEEP_SLICE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    RunningCycle,
    Sleeping,
    Stopped,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub notified: usize,
    /// New listings whose notification could not be delivered.
    pub notify_failures: usize,
}

/// Runs cycles back to back with a fixed pause in between until asked to stop.
///
/// A failed cycle is counted, nothing more. The cycle has already logged it at
/// the right severity. Only the stop flag ends the loop.
pub struct Poller {
    interval: Duration,
    stop: Arc<AtomicBool>,
    state: PollState,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop: Arc::new(AtomicBool::new(false)),
            state: PollState::Idle,
        }
    }

    /// Handle for whoever wants to stop the loop (signal handler, tests).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[cfg(test)]
    pub fn state(&self) -> PollState {
        self.state
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn transition(&mut self, next: PollState) {
        debug!("poller {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// First cycle starts immediately. Returns once the stop flag is set.
    pub fn run<F>(&mut self, mut cycle: F) -> PollReport
    where
        F: FnMut() -> CycleResult,
    {
        let mut report = PollReport::default();
        info!("starting poller, interval {:?}", self.interval);

        while !self.stop_requested() {
            self.transition(PollState::RunningCycle);
            let result = cycle();

            report.cycles += 1;
            report.notified += result.new.len();
            report.notify_failures += result.notify_failures;
            if let Some(e) = &result.error {
                report.failed_cycles += 1;
                debug!("cycle {} ended early: {e}", report.cycles);
            }

            if self.stop_requested() {
                break;
            }

            self.transition(PollState::Sleeping);
            self.sleep_interval();
        }

        self.transition(PollState::Stopped);
        info!(
            "poller stopped after {} cycle(s), {} failed, {} notified, {} undelivered",
            report.cycles, report.failed_cycles, report.notified, report.notify_failures
        );
        report
    }

    /// An interval too long to represent as an `Instant` means "until stopped".
    fn sleep_interval(&self) {
        let deadline = Instant::now().checked_add(self.interval);
        loop {
            if self.stop_requested() {
                return;
            }
            let nap = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    (deadline - now).min(SLEEP_SLICE)
                }
                None => SLEEP_SLICE,
            };
            std::thread::sleep(nap);
        }
    }
}
