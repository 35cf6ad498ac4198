//! Count-Sketch for signed approximate frequency estimation.
//!
//! A `d × w` table of signed counters with, per row, one index hash
//! choosing a column and one sign hash choosing `{−1, +1}`. Point
//! queries take the median across rows, which keeps the estimate
//! unbiased under turnstile (mixed-sign) updates.

use std::cmp::Ordering;
use std::ops::{AddAssign, Neg};

use crate::hash::{mix64, KWiseHash};
use crate::SketchError;

/// Counter types a [`CountSketch`] table can hold.
///
/// `i64` serves the public integer sketch; `f64` serves the real-valued
/// variant that [`crate::sampler::LpSampler`] feeds with scaled updates.
pub trait Counter: Copy + Default + AddAssign + Neg<Output = Self> {
    /// Total order used to select the median row estimate.
    fn total_cmp(&self, other: &Self) -> Ordering;
}

impl Counter for i64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl Counter for f64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }
}

enum RowHasher {
    /// Degree-2 polynomial hashes: rows are 2-wise independent.
    KWise {
        index: Vec<KWiseHash>,
        sign: Vec<KWiseHash>,
    },
    /// Seeded mixing hash: faster, no independence guarantee.
    Mixing,
}

/// A d × w signed-count table with median decoding.
///
/// With `ε² ≥ 3/w` and `d = Θ(log δ⁻¹)`, the estimate for any key is
/// within `ε · ‖f₋ₖ‖₂` of its true frequency with probability at least
/// `1 − δ`. Odd `d` is recommended so the median is a single row value;
/// even `d` uses the lower median.
///
/// # Example
/// ```
/// use lp_sampling::CountSketch;
///
/// let mut cs: CountSketch = CountSketch::new(128, 5, 42).unwrap();
/// cs.update(7, 3);
/// cs.update(7, -1);
/// assert_eq!(cs.estimate(7), 2);
/// ```
pub struct CountSketch<C: Counter = i64> {
    width: usize,
    depth: usize,
    seed: u64,
    table: Vec<C>,
    hasher: RowHasher,
}

impl<C: Counter> CountSketch<C> {
    /// Builds a sketch backed by the 2-wise independent hash family.
    ///
    /// Index hashes are seeded `seed + i` and sign hashes `seed + d + i`,
    /// keeping the two seed ranges disjoint for every row.
    ///
    /// # Errors
    /// [`SketchError::InvalidParameter`] when `width` or `depth` is zero.
    pub fn new(width: usize, depth: usize, seed: u64) -> Result<Self, SketchError> {
        let index = (0..depth)
            .map(|i| KWiseHash::new(2, seed.wrapping_add(i as u64)))
            .collect();
        let sign = (0..depth)
            .map(|i| KWiseHash::new(2, seed.wrapping_add((depth + i) as u64)))
            .collect();
        Self::build(width, depth, seed, RowHasher::KWise { index, sign })
    }

    /// Builds a sketch backed by the seeded mixing hash.
    ///
    /// Trades the 2-wise independence guarantee for throughput; the same
    /// per-row seed offsets as [`CountSketch::new`] are used.
    pub fn with_fast_hash(width: usize, depth: usize, seed: u64) -> Result<Self, SketchError> {
        Self::build(width, depth, seed, RowHasher::Mixing)
    }

    fn build(
        width: usize,
        depth: usize,
        seed: u64,
        hasher: RowHasher,
    ) -> Result<Self, SketchError> {
        if width == 0 {
            return Err(SketchError::InvalidParameter("width must be positive"));
        }
        if depth == 0 {
            return Err(SketchError::InvalidParameter("depth must be positive"));
        }
        Ok(Self {
            width,
            depth,
            seed,
            table: vec![C::default(); width * depth],
            hasher,
        })
    }

    /// Returns the number of columns per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn column(&self, row: usize, key: u64) -> usize {
        let digest = match &self.hasher {
            RowHasher::KWise { index, .. } => index[row].hash(key),
            RowHasher::Mixing => mix64(key, self.seed.wrapping_add(row as u64)),
        };
        (digest % self.width as u64) as usize
    }

    /// Sign is `1 − 2·(h(key) & 1)`: positive on even digests.
    fn positive(&self, row: usize, key: u64) -> bool {
        let digest = match &self.hasher {
            RowHasher::KWise { sign, .. } => sign[row].hash(key),
            RowHasher::Mixing => mix64(key, self.seed.wrapping_add((self.depth + row) as u64)),
        };
        digest & 1 == 0
    }

    /// Applies the turnstile update `(key, delta)` to every row.
    pub fn update(&mut self, key: u64, delta: C) {
        for row in 0..self.depth {
            let cell = row * self.width + self.column(row, key);
            if self.positive(row, key) {
                self.table[cell] += delta;
            } else {
                self.table[cell] += -delta;
            }
        }
    }

    /// Estimates the frequency of `key` as the median of per-row reads.
    ///
    /// Well-defined for keys never updated; those return a zero-centered
    /// noise estimate.
    pub fn estimate(&self, key: u64) -> C {
        let mut reads: Vec<C> = (0..self.depth)
            .map(|row| {
                let value = self.table[row * self.width + self.column(row, key)];
                if self.positive(row, key) {
                    value
                } else {
                    -value
                }
            })
            .collect();
        reads.sort_unstable_by(C::total_cmp);
        reads[(reads.len() - 1) / 2]
    }

    #[cfg(test)]
    pub(crate) fn raw_table(&self) -> &[C] {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert!(CountSketch::<i64>::new(0, 5, 1).is_err());
        assert!(CountSketch::<i64>::new(64, 0, 1).is_err());
        assert!(CountSketch::<i64>::with_fast_hash(0, 3, 1).is_err());
    }

    #[test]
    fn small_stream_recovers_exact_frequencies() {
        let mut cs: CountSketch = CountSketch::new(128, 5, 42).unwrap();
        cs.update(42, 10);
        cs.update(42, 5);
        cs.update(7, 3);
        cs.update(123, -2);

        assert_eq!(cs.estimate(42), 15);
        assert_eq!(cs.estimate(7), 3);
        assert_eq!(cs.estimate(123), -2);
        assert!(cs.estimate(99).abs() <= 2);
    }

    #[test]
    fn fast_hash_mode_recovers_exact_frequencies() {
        let mut cs: CountSketch = CountSketch::with_fast_hash(128, 5, 42).unwrap();
        cs.update(42, 10);
        cs.update(42, 5);
        cs.update(7, 3);
        cs.update(123, -2);

        assert_eq!(cs.estimate(42), 15);
        assert_eq!(cs.estimate(7), 3);
        assert_eq!(cs.estimate(123), -2);
    }

    #[test]
    fn updates_are_linear_in_delta() {
        let mut split: CountSketch = CountSketch::new(64, 5, 9).unwrap();
        split.update(1000, 4);
        split.update(1000, 9);

        let mut merged: CountSketch = CountSketch::new(64, 5, 9).unwrap();
        merged.update(1000, 13);

        assert_eq!(split.raw_table(), merged.raw_table());
        assert_eq!(split.estimate(1000), merged.estimate(1000));
    }

    #[test]
    fn distinct_keys_estimate_exactly_at_large_width() {
        let mut cs: CountSketch = CountSketch::new(4096, 5, 77).unwrap();
        for key in 0..30u64 {
            cs.update(key * 31 + 5, key as i64 - 10);
        }
        for key in 0..30u64 {
            assert_eq!(cs.estimate(key * 31 + 5), key as i64 - 10);
        }
    }

    #[test]
    fn unseen_keys_read_zero_from_empty_sketch() {
        let cs = CountSketch::<i64>::new(32, 4, 3).unwrap();
        for key in 0..100 {
            assert_eq!(cs.estimate(key), 0);
        }
    }

    #[test]
    fn real_valued_table_supports_fractional_deltas() {
        let mut cs: CountSketch<f64> = CountSketch::new(256, 5, 11).unwrap();
        assert_eq!(cs.width(), 256);
        assert_eq!(cs.depth(), 5);
        cs.update(3, 1.5);
        cs.update(3, 2.25);
        cs.update(8, -0.5);

        assert!((cs.estimate(3) - 3.75).abs() < 1e-12);
        assert!((cs.estimate(8) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn negative_updates_cancel_positive_mass() {
        let mut cs: CountSketch = CountSketch::new(64, 5, 13).unwrap();
        cs.update(500, 25);
        cs.update(500, -25);
        assert_eq!(cs.estimate(500), 0);
    }
}
