use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// ─── Configuration ───────────────────────────────────────────────

/// Smallest non-zero bucket edge: 2^6 ns = 64 ns
const MIN_OCTAVE: u32 = 6;

/// Largest octave start: 2^34 ns ≈ 17 s (its last sub-bucket is open-ended)
const MAX_OCTAVE: u32 = 34;

/// Linear sub-buckets per power-of-two octave
const SUB_BUCKETS: u64 = 4;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

// ─── Public types ────────────────────────────────────────────────

/// A process-lifetime histogram whose per-bucket counts only ever grow.
///
/// Writers call [`record`](Self::record) from any task or thread; readers
/// copy the counts out with [`read_into`](Self::read_into) and diff two
/// reads to get the distribution of one interval.
///
/// `boundaries[i]` is the inclusive lower edge of bucket `i`, so bucket `i`
/// covers `[boundaries[i], boundaries[i + 1])` and the last bucket is
/// open-ended.
pub struct CumulativeHistogram {
    name: &'static str,
    bounds_ns: Vec<u64>,
    counts: Vec<AtomicU64>,
}

/// A point-in-time copy of a [`CumulativeHistogram`].
///
/// Boundaries are fractional seconds. The buffers are meant to be reused:
/// keep two snapshots around and swap them between reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSnapshot {
    boundaries: Vec<f64>,
    counts: Vec<u64>,
}

// ─── CumulativeHistogram impl ────────────────────────────────────

impl CumulativeHistogram {
    /// Name of the scheduler wait-time histogram.
    pub const SCHED_LATENCIES: &'static str = "/sched/latencies:seconds";

    /// Empty histogram with the default latency layout: one bucket for
    /// `[0, 64ns)`, then 4 linear sub-buckets per power of two up to ~30 s.
    pub fn new(name: &'static str) -> Self {
        let mut bounds_ns = Vec::with_capacity(1 + (MAX_OCTAVE - MIN_OCTAVE + 1) as usize * 4);
        bounds_ns.push(0);
        for octave in MIN_OCTAVE..=MAX_OCTAVE {
            let base = 1u64 << octave;
            let step = base / SUB_BUCKETS;
            for sub in 0..SUB_BUCKETS {
                bounds_ns.push(base + sub * step);
            }
        }
        Self::with_bounds(name, bounds_ns)
    }

    /// Custom layout. `bounds_ns` must start at 0 and be strictly ascending.
    pub fn with_bounds(name: &'static str, bounds_ns: Vec<u64>) -> Self {
        debug_assert_eq!(bounds_ns.first(), Some(&0), "first bucket must start at 0");
        debug_assert!(
            bounds_ns.windows(2).all(|w| w[0] < w[1]),
            "bucket edges must be strictly ascending"
        );
        let counts = bounds_ns.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            name,
            bounds_ns,
            counts,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn num_buckets(&self) -> usize {
        self.counts.len()
    }

    /// Count one observation.
    pub fn record(&self, value: Duration) {
        let ns = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        // partition_point gives the first edge > ns; the bucket is one before.
        let idx = self
            .bounds_ns
            .partition_point(|&edge| edge <= ns)
            .saturating_sub(1);
        if let Some(slot) = self.counts.get(idx) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy the current counts into `snap`, reusing its allocations.
    ///
    /// Every counter is monotonic, so a later read of the same histogram
    /// never observes a smaller count in any bucket.
    pub fn read_into(&self, snap: &mut HistogramSnapshot) {
        if snap.boundaries.len() != self.bounds_ns.len() {
            snap.boundaries.clear();
            snap.boundaries
                .extend(self.bounds_ns.iter().map(|&ns| ns as f64 / NANOS_PER_SEC));
        }
        snap.counts.clear();
        snap.counts
            .extend(self.counts.iter().map(|c| c.load(Ordering::Relaxed)));
    }

    /// Convenience for one-off reads.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut snap = HistogramSnapshot::default();
        self.read_into(&mut snap);
        snap
    }
}

impl Default for CumulativeHistogram {
    fn default() -> Self {
        Self::new(Self::SCHED_LATENCIES)
    }
}

// ─── HistogramSnapshot impl ──────────────────────────────────────

impl HistogramSnapshot {
    /// Build a snapshot from raw parts. Both vectors must be the same length.
    pub fn from_parts(boundaries: Vec<f64>, counts: Vec<u64>) -> Self {
        debug_assert_eq!(boundaries.len(), counts.len());
        Self { boundaries, counts }
    }

    /// Bucket lower edges in seconds.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
