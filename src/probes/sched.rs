use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::SCHED_LATENCIES;
use crate::config::Config;
use crate::metrics::{histogram_percentiles, CumulativeHistogram, HistogramSnapshot, Reporter};

/// Average spacing between scheduler probes, in microseconds. The actual
/// gap is drawn uniformly from half to one and a half times this.
const PROBE_SPACING_US: u64 = 1_000;

// ─── Recorder ────────────────────────────────────────────────────

/// Feed scheduler queuing latency into `hist` until `running` is cleared.
///
/// Each round measures two "runnable → running" waits: how long a freshly
/// spawned task sits in the run queue before its first poll, and how long
/// this task waits to be polled again after yielding.
pub async fn record_sched_latency(hist: Arc<CumulativeHistogram>, running: Arc<AtomicBool>) {
    // Jittered spacing so probes don't phase-lock with timer ticks.
    let mut rng = StdRng::seed_from_u64(0x5c4e_d1a7);

    while running.load(Ordering::Relaxed) {
        let gap = rng.gen_range(PROBE_SPACING_US / 2..=PROBE_SPACING_US * 3 / 2);
        tokio::time::sleep(Duration::from_micros(gap)).await;

        let spawned_at = Instant::now();
        let spawn_hist = hist.clone();
        tokio::spawn(async move {
            spawn_hist.record(spawned_at.elapsed());
        });

        let yielded_at = Instant::now();
        tokio::task::yield_now().await;
        hist.record(yielded_at.elapsed());
    }

    debug!(histogram = hist.name(), "scheduler recorder stopped");
}

// ─── Reporting loop ──────────────────────────────────────────────

/// Once per report interval, report the percentiles of the scheduler
/// latencies recorded since the previous tick.
///
/// Two snapshot buffers are read into alternately: after each report the
/// fresh read becomes the baseline for the next tick.
pub async fn measure_sched_latency(
    cfg: Arc<Config>,
    hist: Arc<CumulativeHistogram>,
    reporter: Reporter,
    running: Arc<AtomicBool>,
) {
    let mut cur = HistogramSnapshot::default();
    let mut last = HistogramSnapshot::default();
    hist.read_into(&mut last);

    // First tick one full interval from now, so the first delta covers
    // exactly one interval of activity.
    let mut ticker = tokio::time::interval_at(Instant::now() + cfg.report_interval, cfg.report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(ticker);

    while ticks.next().await.is_some() {
        if !running.load(Ordering::Relaxed) {
            break;
        }

        hist.read_into(&mut cur);
        debug!(
            probe = SCHED_LATENCIES,
            events = cur.total().saturating_sub(last.total()),
            "tick"
        );
        let summary = histogram_percentiles(&cur, &last, &cfg.percentiles);
        reporter.report(SCHED_LATENCIES, &summary);

        std::mem::swap(&mut cur, &mut last);
    }

    debug!(probe = SCHED_LATENCIES, "stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn recorder_fills_histogram_and_stops() {
        let hist = Arc::new(CumulativeHistogram::default());
        let running = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(record_sched_latency(hist.clone(), running.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        running.store(false, Ordering::SeqCst);
        task.await.unwrap();

        // At least the yield measurement of every completed round.
        assert!(hist.snapshot().total() > 0);
    }
}
