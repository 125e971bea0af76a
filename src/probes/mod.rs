//! Measurement loops.
//!
//! Each loop owns its buffers, runs until the shared `running` flag is
//! cleared, and checks that flag right after every suspension point.

pub mod sched;
pub mod sleep;
pub mod timer;

pub use sched::{measure_sched_latency, record_sched_latency};
pub use sleep::measure_sleep_delay;
pub use timer::{measure_timer_delay, ReusableTimer};

use std::time::Duration;

use tokio::time::Instant;

use crate::metrics::{sample_percentiles, Delay, Percentiles};

/// Report names, as printed in front of each line.
pub const SLEEP_DELAY: &str = "sleep delay";
pub const TIMER_DELAY: &str = "timer delay";
pub const SCHED_LATENCIES: &str = "/sched/latencies";

/// Samples collected since the last report, and when the next one is due.
pub struct ReportingWindow {
    interval: Duration,
    report_after: Instant,
    samples: Vec<Delay>,
}

impl ReportingWindow {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            report_after: now + interval,
            samples: Vec::new(),
        }
    }

    /// Append one sample taken at `stop`. Returns true once `stop` is past
    /// the end of the window.
    pub fn record(&mut self, sample: Delay, stop: Instant) -> bool {
        self.samples.push(sample);
        stop > self.report_after
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summarize and empty the buffer, then open the next window one
    /// interval after `now`. Lateness is not carried over.
    pub fn close(&mut self, percentiles: &Percentiles, now: Instant) -> Vec<Delay> {
        let summary = sample_percentiles(&mut self.samples, percentiles);
        self.samples.clear();
        self.report_after = now + self.interval;
        summary
    }
}
