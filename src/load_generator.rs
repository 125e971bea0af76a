use std::hint::black_box;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::metrics::CumulativeHistogram;

// ─── Payload ─────────────────────────────────────────────────────

/// What every worker serializes over and over. Captured once, never
/// updated; it only exists to keep the CPU and allocator busy.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    pub captured_at: DateTime<Utc>,
    pub runtime_workers: usize,
    pub alive_tasks: usize,
    pub histogram: String,
    pub bucket_bounds_secs: Vec<f64>,
    pub bucket_counts: Vec<u64>,
}

impl RuntimeStats {
    /// Must be called from inside a Tokio runtime.
    pub fn capture(hist: &CumulativeHistogram) -> Self {
        let metrics = tokio::runtime::Handle::current().metrics();
        let snap = hist.snapshot();
        Self {
            captured_at: Utc::now(),
            runtime_workers: metrics.num_workers(),
            alive_tasks: metrics.num_alive_tasks(),
            histogram: hist.name().to_owned(),
            bucket_bounds_secs: snap.boundaries().to_vec(),
            bucket_counts: snap.counts().to_vec(),
        }
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// CPU-bound background workers.
///
/// Workers are OS threads rather than Tokio tasks: they never yield, and
/// the kernel preempts them, so they contend with the runtime's worker
/// threads without starving them outright.
pub struct LoadGenerator {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl LoadGenerator {
    /// Spawns `workers` threads that serialize `stats` until `running`
    /// is set to false.
    pub fn start(workers: usize, stats: RuntimeStats, running: Arc<AtomicBool>) -> io::Result<Self> {
        let stats = Arc::new(stats);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let running = running.clone();
            let stats = stats.clone();
            let handle = thread::Builder::new()
                .name(format!("load-{worker_id}"))
                .spawn(move || worker(worker_id, &running, &stats))?;
            handles.push(handle);
        }

        Ok(Self { running, handles })
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Clear the flag and wait for every worker thread to exit.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        for h in self.handles {
            let _ = h.join();
        }
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

fn worker(id: usize, running: &AtomicBool, stats: &RuntimeStats) {
    let mut rounds: u64 = 0;
    while running.load(Ordering::Relaxed) {
        // Allocation + serialization is the point; the bytes are discarded.
        if let Ok(bytes) = serde_json::to_vec(stats) {
            black_box(bytes);
        }
        rounds += 1;
    }
    debug!(worker = id, rounds, "load worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn stats_serialize_with_histogram_layout() {
        let hist = CumulativeHistogram::default();
        let stats = RuntimeStats::capture(&hist);
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["histogram"], "/sched/latencies:seconds");
        assert_eq!(
            json["bucket_counts"].as_array().unwrap().len(),
            hist.num_buckets()
        );
    }

    #[tokio::test]
    async fn workers_run_until_stopped() {
        let hist = CumulativeHistogram::default();
        let running = Arc::new(AtomicBool::new(true));
        let load = LoadGenerator::start(2, RuntimeStats::capture(&hist), running.clone()).unwrap();
        assert_eq!(load.workers(), 2);

        std::thread::sleep(Duration::from_millis(20));
        load.stop();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn zero_workers_is_a_no_op() {
        let hist = CumulativeHistogram::default();
        let running = Arc::new(AtomicBool::new(true));
        let load = LoadGenerator::start(0, RuntimeStats::capture(&hist), running).unwrap();
        assert_eq!(load.workers(), 0);
        load.stop();
    }
}
