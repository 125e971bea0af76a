pub mod histogram;
pub mod percentiles;
pub mod report;

pub use histogram::{CumulativeHistogram, HistogramSnapshot};
pub use percentiles::{histogram_percentiles, sample_percentiles, Percentiles};
pub use report::{format_report, truncate, ReportSink, Reporter};

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A signed time interval in nanoseconds.
///
/// One sample is `(actual elapsed) - (intended elapsed)` for a single timed
/// wait. Timer imprecision can make it negative, so this is not a
/// `std::time::Duration`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delay {
    nanos: i64,
}

impl Delay {
    pub const ZERO: Delay = Delay { nanos: 0 };

    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    pub fn from_duration(d: Duration) -> Self {
        Self {
            nanos: i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        }
    }

    /// Fractional seconds → delay, the way histogram bucket edges are stored.
    /// Rounds to the nearest nanosecond so integral edges survive the trip.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            nanos: (secs * NANOS_PER_SEC).round() as i64,
        }
    }

    /// `(stop - start) - intended`
    pub fn between(start: Instant, stop: Instant, intended: Duration) -> Self {
        let elapsed = Self::from_duration(stop.saturating_duration_since(start));
        Self::from_nanos(elapsed.nanos.saturating_sub(Self::from_duration(intended).nanos))
    }

    pub const fn as_nanos(self) -> i64 {
        self.nanos
    }

    /// Round toward zero to a multiple of `step`.
    pub fn truncate(self, step: Delay) -> Self {
        if step.nanos <= 0 {
            return self;
        }
        Self {
            nanos: self.nanos - self.nanos % step.nanos,
        }
    }
}

impl From<Duration> for Delay {
    fn from(d: Duration) -> Self {
        Self::from_duration(d)
    }
}

impl fmt::Display for Delay {
    /// Unit-scaled like `Duration`'s debug form (`999ns`, `1.23ms`, `1.2s`),
    /// with a leading `-` for negative values. Width and alignment flags
    /// apply to the whole rendered value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = Duration::from_nanos(self.nanos.unsigned_abs());
        let rendered = if self.nanos < 0 {
            format!("-{magnitude:?}")
        } else {
            format!("{magnitude:?}")
        };
        f.pad(&rendered)
    }
}
