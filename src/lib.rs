//! Scheduling-latency probe for a Tokio runtime under CPU contention.
//!
//! Three independent loops report percentile summaries once per interval:
//! how late a fresh `sleep` wakes up, how late one reused timer fires, and
//! how long tasks wait in the run queue.

pub mod config;
pub mod error;
pub mod load_generator;
pub mod metrics;
pub mod monitor;
pub mod probes;

pub use config::{Args, Config};
pub use error::ConfigError;
pub use metrics::{Delay, Percentiles, Reporter};
pub use monitor::MonitorHandle;
