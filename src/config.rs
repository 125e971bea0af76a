use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;
use crate::metrics::Percentiles;

/// Measures timer, sleep and scheduler latency while CPU-bound workers
/// compete for the machine.
#[derive(Parser, Debug, Clone)]
#[command(name = "sched-delay", version)]
pub struct Args {
    /// How often to report delay measurements
    #[arg(long, env = "SCHED_DELAY_REPORT_INTERVAL", default_value = "1s", value_parser = parse_duration)]
    pub report_interval: Duration,

    /// How long to sleep to measure delay
    #[arg(long, env = "SCHED_DELAY_SLEEP_INTERVAL", default_value = "15ms", value_parser = parse_duration)]
    pub sleep_interval: Duration,

    /// Number of CPU-bound workers (defaults to available parallelism)
    #[arg(long, env = "SCHED_DELAY_WORKERS")]
    pub workers: Option<usize>,

    /// Comma separated percentile fractions to report
    #[arg(long, env = "SCHED_DELAY_PERCENTILES", default_value = "0,0.5,0.99,1", value_parser = parse_percentiles)]
    pub percentiles: Percentiles,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated, immutable settings shared by every component.
#[derive(Clone)]
pub struct Config {
    pub report_interval: Duration,
    pub sleep_interval: Duration,
    pub workers: usize,
    pub percentiles: Arc<Percentiles>,
}

impl Config {
    pub fn new(
        report_interval: Duration,
        sleep_interval: Duration,
        workers: usize,
        percentiles: Percentiles,
    ) -> Result<Self, ConfigError> {
        if report_interval.is_zero() {
            return Err(ConfigError::ZeroReportInterval);
        }
        Ok(Self {
            report_interval,
            sleep_interval,
            workers,
            percentiles: Arc::new(percentiles),
        })
    }
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let workers = args.workers.unwrap_or_else(default_workers);
        Config::new(
            args.report_interval,
            args.sleep_interval,
            workers,
            args.percentiles,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(1),
            sleep_interval: Duration::from_millis(15),
            workers: default_workers(),
            percentiles: Arc::new(Percentiles::default()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("report_interval", &self.report_interval)
            .field("sleep_interval", &self.sleep_interval)
            .field("workers", &self.workers)
            .field("percentiles", &*self.percentiles)
            .finish()
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

// ─── Value parsers ───────────────────────────────────────────────

/// Parse a duration made of `<number><unit>` pairs: `15ms`, `1.5s`, `1m30s`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `0` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(ConfigError::InvalidDuration(input.into()));
    }

    let mut total_ns = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| ConfigError::InvalidDuration(input.into()))?;
        let (num, tail) = rest.split_at(num_len);
        let value: f64 = num
            .parse()
            .map_err(|_| ConfigError::InvalidDuration(input.into()))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            _ => {
                return Err(ConfigError::UnknownUnit {
                    input: input.into(),
                    unit: unit.into(),
                })
            }
        };

        total_ns += value * scale;
        rest = tail;
    }

    Ok(Duration::from_nanos(total_ns.round() as u64))
}

/// Parse `0,0.5,0.99,1` into a validated [`Percentiles`].
pub fn parse_percentiles(input: &str) -> Result<Percentiles, ConfigError> {
    let fractions = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| ConfigError::InvalidPercentile(s.into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Percentiles::new(fractions)
}
