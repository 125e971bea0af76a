use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, Sleep};
use tracing::debug;

use super::{ReportingWindow, TIMER_DELAY};
use crate::config::Config;
use crate::metrics::{Delay, Reporter};

/// Far enough out that a stopped timer never fires in practice.
const PARKED: Duration = Duration::from_secs(86_400 * 365 * 30);

/// One timer, created once and re-armed for every wait.
///
/// Keeps the cost of building a new timer out of the measurement, so the
/// timer loop isolates the timer mechanism itself.
pub struct ReusableTimer {
    sleep: Pin<Box<Sleep>>,
}

impl ReusableTimer {
    /// Create the timer already stopped.
    pub fn new() -> Self {
        let mut timer = Self {
            sleep: Box::pin(tokio::time::sleep(Duration::from_secs(1))),
        };
        timer.stop();
        timer
    }

    /// Disarm: push the deadline out of reach.
    pub fn stop(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + PARKED);
    }

    /// Arm to fire `after` from now.
    pub fn reset(&mut self, after: Duration) {
        self.sleep.as_mut().reset(Instant::now() + after);
    }

    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    /// Wait for the timer and return when this task saw it fire.
    pub async fn fired(&mut self) -> Instant {
        self.sleep.as_mut().await;
        Instant::now()
    }
}

impl Default for ReusableTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Like the sleep probe, but every wait goes through one [`ReusableTimer`].
pub async fn measure_timer_delay(cfg: Arc<Config>, reporter: Reporter, running: Arc<AtomicBool>) {
    let mut timer = ReusableTimer::new();
    let mut window = ReportingWindow::new(cfg.report_interval, Instant::now());

    while running.load(Ordering::Relaxed) {
        let start = Instant::now();
        timer.reset(cfg.sleep_interval);
        let stop = timer.fired().await;

        if !running.load(Ordering::Relaxed) {
            break;
        }

        let sample = Delay::between(start, stop, cfg.sleep_interval);
        if window.record(sample, stop) {
            debug!(probe = TIMER_DELAY, samples = window.len(), "window closed");
            let summary = window.close(&cfg.percentiles, Instant::now());
            reporter.report(TIMER_DELAY, &summary);
        }
    }

    debug!(probe = TIMER_DELAY, "stopped");
}
