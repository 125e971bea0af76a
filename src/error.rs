use thiserror::Error;

/// Rejected command-line or environment configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid duration {0:?}: expected e.g. \"15ms\", \"1.5s\" or \"1m30s\"")]
    InvalidDuration(String),

    #[error("unknown duration unit {unit:?} in {input:?}")]
    UnknownUnit { input: String, unit: String },

    #[error("report interval must be greater than zero")]
    ZeroReportInterval,

    #[error("at least one percentile is required")]
    NoPercentiles,

    #[error("percentile {0} is outside [0, 1]")]
    PercentileOutOfRange(f64),

    #[error("invalid percentile {0:?}")]
    InvalidPercentile(String),

    #[error("percentiles must be in ascending order")]
    UnsortedPercentiles,
}
