use std::fmt;

use super::histogram::HistogramSnapshot;
use super::Delay;
use crate::error::ConfigError;

/// The fixed set of fractions every measurement is summarized at.
///
/// Built once from configuration and shared read-only by both estimators
/// and the reporter. Fractions are ascending and within `[0, 1]`; `0` maps
/// to the minimum and `1` to the maximum.
#[derive(Clone, PartialEq)]
pub struct Percentiles {
    fractions: Vec<f64>,
    labels: Vec<String>,
}

impl Percentiles {
    pub const DEFAULT: [f64; 4] = [0.0, 0.5, 0.99, 1.0];

    pub fn new(fractions: Vec<f64>) -> Result<Self, ConfigError> {
        if fractions.is_empty() {
            return Err(ConfigError::NoPercentiles);
        }
        if let Some(&bad) = fractions.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(ConfigError::PercentileOutOfRange(bad));
        }
        if fractions.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::UnsortedPercentiles);
        }

        let labels = fractions.iter().map(|&p| label_for(p)).collect();
        Ok(Self { fractions, labels })
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}

impl Default for Percentiles {
    fn default() -> Self {
        let fractions = Self::DEFAULT.to_vec();
        let labels = fractions.iter().map(|&p| label_for(p)).collect();
        Self { fractions, labels }
    }
}

impl fmt::Debug for Percentiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fractions).finish()
    }
}

/// `min`, `max`, or `p<percent>` with up to three decimals (`p99.9`).
fn label_for(p: f64) -> String {
    if p == 0.0 {
        return "min".into();
    }
    if p == 1.0 {
        return "max".into();
    }
    let pct = (p * 100_000.0).round() / 1_000.0;
    format!("p{pct}")
}

// ─── Discrete samples ────────────────────────────────────────────

/// Nearest-rank percentiles over a buffer of samples.
///
/// Sorts `samples` in place. An empty buffer yields [`Delay::ZERO`] for
/// every fraction. The caller must clear the buffer before the next
/// window.
pub fn sample_percentiles(samples: &mut [Delay], percentiles: &Percentiles) -> Vec<Delay> {
    samples.sort_unstable();

    percentiles
        .fractions()
        .iter()
        .map(|&p| {
            if samples.is_empty() {
                return Delay::ZERO;
            }
            let idx = (p * (samples.len() - 1) as f64) as usize;
            samples[idx]
        })
        .collect()
}

// ─── Cumulative histogram delta ──────────────────────────────────

/// Percentiles of the distribution recorded between two snapshots of the
/// same cumulative histogram.
///
/// Both snapshots must share one bucket layout and `cur` must have been
/// read after `last`. Each result is the *upper* edge of the bucket the
/// rank falls into, clamped to the last boundary for the open-ended top
/// bucket. With no new events every rank is 0, so fractions below 1 land
/// on the last boundary and the maximum lands on the first bucket's
/// upper edge.
pub fn histogram_percentiles(
    cur: &HistogramSnapshot,
    last: &HistogramSnapshot,
    percentiles: &Percentiles,
) -> Vec<Delay> {
    debug_assert_eq!(
        cur.boundaries(),
        last.boundaries(),
        "histogram bucket layout changed between reads"
    );

    let mut total: u64 = 0;
    let cumulative: Vec<u64> = cur
        .counts()
        .iter()
        .zip(last.counts())
        .map(|(&now, &before)| {
            debug_assert!(now >= before, "cumulative histogram went backwards");
            total += now - before;
            total
        })
        .collect();

    let bounds = cur.boundaries();
    percentiles
        .fractions()
        .iter()
        .map(|&p| {
            let rank = (p * total as f64) as u64;

            // The max needs `>=` so it lands in the last non-empty bucket
            // instead of one past it when that bucket brings the sum to `total`.
            let idx = if p == 1.0 {
                cumulative.partition_point(|&c| c < rank)
            } else {
                cumulative.partition_point(|&c| c <= rank)
            };

            // Upper edge of the located bucket.
            let upper = idx + 1;
            match bounds.get(upper) {
                Some(&edge) => Delay::from_secs_f64(edge),
                None => bounds
                    .last()
                    .map_or(Delay::ZERO, |&edge| Delay::from_secs_f64(edge)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: i64) -> Delay {
        Delay::from_nanos(v * 1_000_000)
    }

    fn snapshot(boundaries: &[f64], counts: &[u64]) -> HistogramSnapshot {
        HistogramSnapshot::from_parts(boundaries.to_vec(), counts.to_vec())
    }

    #[test]
    fn default_set_labels() {
        let ps = Percentiles::default();
        assert_eq!(ps.labels(), ["min", "p50", "p99", "max"]);
        assert_eq!(ps.fractions(), Percentiles::DEFAULT);
    }

    #[test]
    fn fractional_percent_labels() {
        let ps = Percentiles::new(vec![0.25, 0.999]).unwrap();
        assert_eq!(ps.labels(), ["p25", "p99.9"]);
    }

    #[test]
    fn rejects_bad_fraction_lists() {
        assert!(matches!(
            Percentiles::new(vec![]),
            Err(ConfigError::NoPercentiles)
        ));
        assert!(matches!(
            Percentiles::new(vec![0.5, 1.5]),
            Err(ConfigError::PercentileOutOfRange(p)) if p == 1.5
        ));
        assert!(matches!(
            Percentiles::new(vec![0.99, 0.5]),
            Err(ConfigError::UnsortedPercentiles)
        ));
    }

    // ── sample_percentiles ──────────────────────────────────────

    #[test]
    fn samples_min_and_max_at_the_ends() {
        let mut samples = vec![ms(7), ms(3), ms(9), ms(1), ms(5)];
        let got = sample_percentiles(&mut samples, &Percentiles::default());
        assert_eq!(got[0], ms(1));
        assert_eq!(got[3], ms(9));
    }

    #[test]
    fn samples_empty_buffer_is_all_zero() {
        let got = sample_percentiles(&mut [], &Percentiles::default());
        assert_eq!(got, vec![Delay::ZERO; 4]);
    }

    #[test]
    fn samples_use_nearest_rank_without_interpolation() {
        // 10 samples: p50 → floor(0.5 * 9) = index 4, p99 → floor(8.91) = 8
        let mut samples: Vec<Delay> = (1..=10).map(ms).collect();
        let got = sample_percentiles(&mut samples, &Percentiles::default());
        assert_eq!(got, vec![ms(1), ms(5), ms(9), ms(10)]);
    }

    #[test]
    fn samples_ignore_arrival_order() {
        let mut ascending: Vec<Delay> = (0..50).map(|i| Delay::from_nanos(i * 37)).collect();
        let mut shuffled = ascending.clone();
        shuffled.reverse();
        shuffled.swap(3, 40);
        shuffled.swap(0, 25);

        let ps = Percentiles::default();
        assert_eq!(
            sample_percentiles(&mut ascending, &ps),
            sample_percentiles(&mut shuffled, &ps)
        );
    }

    #[test]
    fn samples_single_value_fills_every_slot() {
        let mut samples = vec![Delay::from_nanos(-42)];
        let got = sample_percentiles(&mut samples, &Percentiles::default());
        assert_eq!(got, vec![Delay::from_nanos(-42); 4]);
    }

    // ── histogram_percentiles ───────────────────────────────────

    #[test]
    fn histogram_without_new_events() {
        let bounds = [0.001, 0.01, 0.1];
        let last = snapshot(&bounds, &[0, 0, 0]);
        let cur = snapshot(&bounds, &[0, 0, 0]);

        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        // rank 0 never exceeds an all-zero cumulative array, so p < 1 clamps
        // to the last edge; the max finds bucket 0 and takes its upper edge.
        assert_eq!(got, vec![ms(100), ms(100), ms(100), ms(10)]);
    }

    #[test]
    fn histogram_two_filled_buckets() {
        let bounds = [0.001, 0.01, 0.1];
        let last = snapshot(&bounds, &[0, 0, 0]);
        let cur = snapshot(&bounds, &[5, 5, 0]);

        // cumulative = [5, 10, 10], total = 10
        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        assert_eq!(got[0], ms(10), "min: first c > 0 is bucket 0, upper edge is index 1");
        assert_eq!(got[1], ms(100), "p50: first c > 5 is bucket 1");
        assert_eq!(got[2], ms(100), "p99: first c > 9 is bucket 1");
        assert_eq!(got[3], ms(100), "max: first c >= 10 is bucket 1");
    }

    #[test]
    fn histogram_max_uses_inclusive_search() {
        let bounds = [0.0, 0.001, 0.002, 0.004];
        let last = snapshot(&bounds, &[0, 0, 0, 0]);
        let cur = snapshot(&bounds, &[0, 4, 0, 0]);

        // cumulative = [0, 4, 4, 4]; a strict search for the max would find
        // nothing and clamp to 4ms instead of bucket 1's upper edge.
        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        assert_eq!(got[3], ms(2));
        assert_eq!(got[2], ms(2));
        assert_eq!(got[0], ms(2));
    }

    #[test]
    fn histogram_subtracts_previous_counts() {
        let bounds = [0.0, 0.001, 0.002, 0.004];
        let last = snapshot(&bounds, &[100, 50, 0, 0]);
        let cur = snapshot(&bounds, &[100, 50, 8, 0]);

        // Only bucket 2 grew: every percentile is its upper edge.
        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        assert_eq!(got, vec![ms(4); 4]);
    }

    #[test]
    fn histogram_top_bucket_clamps_to_last_boundary() {
        let bounds = [0.0, 0.001, 0.002, 0.004];
        let last = snapshot(&bounds, &[0, 0, 0, 0]);
        let cur = snapshot(&bounds, &[0, 0, 0, 3]);

        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        assert_eq!(got, vec![ms(4); 4]);
    }

    #[test]
    fn histogram_spread_distribution() {
        let bounds = [0.0, 0.001, 0.002, 0.004, 0.008];
        let last = snapshot(&bounds, &[0, 0, 0, 0, 0]);
        let cur = snapshot(&bounds, &[10, 80, 9, 1, 0]);

        // cumulative = [10, 90, 99, 100, 100], total = 100
        let got = histogram_percentiles(&cur, &last, &Percentiles::default());
        assert_eq!(got, vec![ms(1), ms(2), ms(8), ms(8)]);
    }
}
