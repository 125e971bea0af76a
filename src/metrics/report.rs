use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use super::percentiles::Percentiles;
use super::Delay;

const SECOND: Delay = Delay::from_nanos(1_000_000_000);
const MILLISECOND: Delay = Delay::from_nanos(1_000_000);
const MICROSECOND: Delay = Delay::from_nanos(1_000);

/// Where finished report lines go.
#[derive(Clone, Default)]
pub enum ReportSink {
    /// One `println!` per line.
    #[default]
    Stdout,
    /// Lines collected in memory, for tests and embedding.
    Capture(Arc<Mutex<Vec<String>>>),
}

/// Formats one measurement's percentiles and writes the line to its sink.
///
/// Cheap to clone; every measurement loop holds its own copy.
#[derive(Clone)]
pub struct Reporter {
    percentiles: Arc<Percentiles>,
    sink: ReportSink,
}

impl Reporter {
    pub fn new(percentiles: Arc<Percentiles>, sink: ReportSink) -> Self {
        Self { percentiles, sink }
    }

    /// A reporter that keeps its lines in memory, plus the shared buffer.
    pub fn capture(percentiles: Arc<Percentiles>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let reporter = Self::new(percentiles, ReportSink::Capture(lines.clone()));
        (reporter, lines)
    }

    pub fn percentiles(&self) -> &Arc<Percentiles> {
        &self.percentiles
    }

    pub fn report(&self, name: &str, values: &[Delay]) {
        let line = format_report(name, values, &self.percentiles);
        match &self.sink {
            ReportSink::Stdout => println!("{line}"),
            ReportSink::Capture(lines) => lines.lock().push(line),
        }
    }
}

/// `<name right-aligned to 20>: min <v> p50 <v> ...` with every value
/// truncated to a precision that matches its magnitude and left-aligned
/// in a 10-wide column.
pub fn format_report(name: &str, values: &[Delay], percentiles: &Percentiles) -> String {
    let mut line = format!("{name:>20}:");
    for (label, &value) in percentiles.labels().iter().zip(values) {
        let _ = write!(line, " {label} {:<10}", truncate(value));
    }
    line
}

/// Drop digits that are just jitter: 10ms steps above 1s, 10µs steps above
/// 1ms, 10ns steps above 1µs, untouched below that.
pub fn truncate(d: Delay) -> Delay {
    if d > SECOND {
        return d.truncate(Delay::from_nanos(10_000_000));
    }
    if d > MILLISECOND {
        return d.truncate(Delay::from_nanos(10_000));
    }
    if d > MICROSECOND {
        return d.truncate(Delay::from_nanos(10));
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_by_magnitude() {
        assert_eq!(truncate(Delay::from_nanos(1_234_567_000)).as_nanos(), 1_230_000_000);
        assert_eq!(truncate(Delay::from_nanos(1_234_000)).as_nanos(), 1_230_000);
        assert_eq!(truncate(Delay::from_nanos(12_345)).as_nanos(), 12_340);
        assert_eq!(truncate(Delay::from_nanos(999)).as_nanos(), 999);
    }

    #[test]
    fn truncate_leaves_exact_thresholds_and_negatives() {
        assert_eq!(truncate(SECOND), SECOND);
        assert_eq!(truncate(Delay::from_nanos(-5_555_555)).as_nanos(), -5_555_555);
    }

    #[test]
    fn line_layout() {
        let values = [
            Delay::from_nanos(999),
            Delay::from_nanos(1_234_000),
            Delay::from_nanos(12_345),
            Delay::from_nanos(1_234_567_000),
        ];
        let line = format_report("timer delay", &values, &Percentiles::default());
        assert_eq!(
            line,
            "         timer delay: min 999ns      p50 1.23ms     p99 12.34µs    max 1.23s     "
        );
    }

    #[test]
    fn capture_sink_collects_lines() {
        let (reporter, lines) = Reporter::capture(Arc::new(Percentiles::default()));
        reporter.report("sleep delay", &[Delay::ZERO; 4]);
        reporter.report("sleep delay", &[Delay::ZERO; 4]);

        let lines = lines.lock();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("         sleep delay: min 0ns"));
    }
}
