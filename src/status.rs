use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::session::{Counters, MonitorSession};

/// Upper bound on how long the reporter sleeps before rechecking the stop flag.
const POLL_SLICE: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq)]
pub enum StatusObservation {
    /// New samples arrived since the previous tick.
    Progress {
        total: u64,
        match_ratio: f64,
        max_difference: f64,
    },
    /// Nothing new, but below the stall threshold.
    Idle { idle_ticks: u32 },
    /// Data stopped arriving after some had been collected.
    Stalled { idle_ticks: u32 },
    /// Nothing has ever been collected.
    AwaitingFirst,
}

pub struct StatusReporter {
    interval: Duration,
    idle_threshold: u32,
    last_total: u64,
    idle_ticks: u32,
}

impl StatusReporter {
    pub fn new(interval: Duration, idle_threshold: u32) -> Self {
        Self {
            interval,
            idle_threshold,
            last_total: 0,
            idle_ticks: 0,
        }
    }

    /// Classify one tick given the current counters.
    pub fn tick(&mut self, counters: Counters) -> StatusObservation {
        if counters.total > self.last_total {
            self.last_total = counters.total;
            self.idle_ticks = 0;
            return StatusObservation::Progress {
                total: counters.total,
                match_ratio: counters.match_ratio,
                max_difference: counters.max_difference,
            };
        }
        if counters.total == 0 {
            return StatusObservation::AwaitingFirst;
        }

        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks >= self.idle_threshold {
            StatusObservation::Stalled {
                idle_ticks: self.idle_ticks,
            }
        } else {
            StatusObservation::Idle {
                idle_ticks: self.idle_ticks,
            }
        }
    }

    /// Run the reporter on its own thread until `running` is cleared.
    pub fn spawn(
        mut self,
        session: Arc<MonitorSession>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("status-reporter".into())
            .spawn(move || {
                debug!(interval = ?self.interval, "status reporter started");
                while sleep_while_running(self.interval, &running) {
                    let observation = self.tick(session.counters());
                    session.sink().status(&observation);
                }
                debug!("status reporter stopped");
            })
    }
}

/// Sleep for `total`, waking early if `running` is cleared. Returns the flag.
fn sleep_while_running(total: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(POLL_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: u64) -> Counters {
        Counters {
            total,
            match_ratio: 1.0,
            max_difference: 0.0,
        }
    }

    #[test]
    fn test_awaiting_first_every_tick() {
        let mut reporter = StatusReporter::new(Duration::from_secs(5), 3);
        for _ in 0..5 {
            assert_eq!(reporter.tick(counters(0)), StatusObservation::AwaitingFirst);
        }
    }

    #[test]
    fn test_stall_after_threshold_and_reset_on_progress() {
        let mut reporter = StatusReporter::new(Duration::from_secs(5), 3);

        assert!(matches!(
            reporter.tick(counters(4)),
            StatusObservation::Progress { total: 4, .. }
        ));
        assert_eq!(reporter.tick(counters(4)), StatusObservation::Idle { idle_ticks: 1 });
        assert_eq!(reporter.tick(counters(4)), StatusObservation::Idle { idle_ticks: 2 });
        assert_eq!(reporter.tick(counters(4)), StatusObservation::Stalled { idle_ticks: 3 });
        assert_eq!(reporter.tick(counters(4)), StatusObservation::Stalled { idle_ticks: 4 });

        assert!(matches!(
            reporter.tick(counters(6)),
            StatusObservation::Progress { total: 6, .. }
        ));
        assert_eq!(reporter.tick(counters(6)), StatusObservation::Idle { idle_ticks: 1 });
    }

    #[test]
    fn test_idle_count_saturates() {
        let mut reporter = StatusReporter::new(Duration::from_secs(5), 3);
        reporter.tick(counters(1));
        reporter.idle_ticks = u32::MAX - 1;
        for _ in 0..3 {
            assert_eq!(
                reporter.tick(counters(1)),
                StatusObservation::Stalled { idle_ticks: u32::MAX }
            );
        }
    }

    #[test]
    fn test_sleep_returns_early_when_stopped() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        assert!(!sleep_while_running(Duration::from_secs(10), &running));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
