use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use super::{ReportingWindow, SLEEP_DELAY};
use crate::config::Config;
use crate::metrics::{Delay, Reporter};

/// Sleep for `sleep_interval` over and over and report how late each
/// wake-up was. A fresh sleep future is created every iteration.
pub async fn measure_sleep_delay(cfg: Arc<Config>, reporter: Reporter, running: Arc<AtomicBool>) {
    let mut window = ReportingWindow::new(cfg.report_interval, Instant::now());

    while running.load(Ordering::Relaxed) {
        let start = Instant::now();
        tokio::time::sleep(cfg.sleep_interval).await;
        let stop = Instant::now();

        if !running.load(Ordering::Relaxed) {
            break;
        }

        let sample = Delay::between(start, stop, cfg.sleep_interval);
        if window.record(sample, stop) {
            debug!(probe = SLEEP_DELAY, samples = window.len(), "window closed");
            let summary = window.close(&cfg.percentiles, Instant::now());
            reporter.report(SLEEP_DELAY, &summary);
        }
    }

    debug!(probe = SLEEP_DELAY, "stopped");
}
