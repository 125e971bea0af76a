use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::load_generator::{LoadGenerator, RuntimeStats};
use crate::metrics::{CumulativeHistogram, Reporter};
use crate::probes;

/// Everything started by [`start`]: the scheduler recorder, the three
/// measurement loops and the load workers.
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    histogram: Arc<CumulativeHistogram>,
    tasks: Vec<JoinHandle<()>>,
    load: LoadGenerator,
}

/// Print the active configuration and launch every loop.
///
/// Must be called from inside a Tokio runtime. Nothing stops on its own;
/// call [`MonitorHandle::shutdown`] or kill the process.
pub fn start(cfg: Arc<Config>, reporter: Reporter) -> io::Result<MonitorHandle> {
    println!("Config: {cfg:?}");
    if cfg.sleep_interval >= cfg.report_interval {
        warn!(
            sleep_interval = ?cfg.sleep_interval,
            report_interval = ?cfg.report_interval,
            "sleep interval is not shorter than the report interval; expect one sample per report"
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    let histogram = Arc::new(CumulativeHistogram::default());

    let tasks = vec![
        tokio::spawn(probes::record_sched_latency(
            histogram.clone(),
            running.clone(),
        )),
        tokio::spawn(probes::measure_sleep_delay(
            cfg.clone(),
            reporter.clone(),
            running.clone(),
        )),
        tokio::spawn(probes::measure_timer_delay(
            cfg.clone(),
            reporter.clone(),
            running.clone(),
        )),
        tokio::spawn(probes::measure_sched_latency(
            cfg.clone(),
            histogram.clone(),
            reporter,
            running.clone(),
        )),
    ];

    let stats = RuntimeStats::capture(&histogram);
    let load = LoadGenerator::start(cfg.workers, stats, running.clone())?;

    info!(
        workers = load.workers(),
        report_interval = ?cfg.report_interval,
        sleep_interval = ?cfg.sleep_interval,
        "measuring"
    );

    Ok(MonitorHandle {
        running,
        histogram,
        tasks,
        load,
    })
}

impl MonitorHandle {
    pub fn histogram(&self) -> &Arc<CumulativeHistogram> {
        &self.histogram
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Clear the running flag and wait for every loop and worker to exit.
    ///
    /// Loops notice at their next wake-up, so this can take up to one
    /// report interval.
    pub async fn shutdown(self) {
        self.running.store(false, Ordering::SeqCst);
        for task in self.tasks {
            let _ = task.await;
        }
        let load = self.load;
        let _ = tokio::task::spawn_blocking(move || load.stop()).await;
        info!("stopped");
    }
}
