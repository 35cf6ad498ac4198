//! p-norm estimators for turnstile streams, p ∈ {1, 2}.
//!
//! [`F2Estimator`] is a single-row AMS sketch: the squared table norm is
//! an unbiased estimate of `F₂ = Σ f_i²`. [`F1Estimator`] follows
//! Indyk's stable-projection construction with deterministic
//! pseudo-Cauchy projections, decoding `‖f‖₁` as the median of absolute
//! table entries. [`NormEstimator`] is the tagged pair of the two, so a
//! sampler can pick its norm sketch from `p` at construction time.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hash::{mix64, KWiseHash};
use crate::SketchError;

fn check_rate(value: f64, name: &'static str) -> Result<(), SketchError> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        // One message per parameter keeps the variant payload static.
        return Err(SketchError::InvalidParameter(name));
    }
    Ok(())
}

/// Single-row AMS sketch estimating `‖f‖₂`.
///
/// Width is `⌈6 / (ε² δ)⌉`; with that sizing the norm estimate is within
/// `ε · ‖f‖₂` with probability at least `1 − δ`. The sketch is additive,
/// and [`subtract`](F2Estimator::subtract) turns two compatibly seeded
/// instances into a sketch of the difference vector.
pub struct F2Estimator {
    width: usize,
    seed: u64,
    fast_hash: bool,
    table: Vec<f64>,
    index_hash: KWiseHash,
    sign_hash: KWiseHash,
}

impl F2Estimator {
    /// Builds an estimator for the given error rate and failure
    /// probability, both in `(0, 1)`.
    ///
    /// # Errors
    /// [`SketchError::InvalidParameter`] when either rate is out of range.
    pub fn new(eps: f64, delta: f64, seed: u64) -> Result<Self, SketchError> {
        Self::build(eps, delta, seed, false)
    }

    /// Like [`F2Estimator::new`] but hashing with the seeded mixing hash
    /// instead of the 2-wise independent family.
    pub fn with_fast_hash(eps: f64, delta: f64, seed: u64) -> Result<Self, SketchError> {
        Self::build(eps, delta, seed, true)
    }

    fn build(eps: f64, delta: f64, seed: u64, fast_hash: bool) -> Result<Self, SketchError> {
        check_rate(eps, "eps must be in (0, 1)")?;
        check_rate(delta, "delta must be in (0, 1)")?;
        let width = (6.0 / (eps * eps * delta)).ceil() as usize;
        Ok(Self {
            width,
            seed,
            fast_hash,
            table: vec![0.0; width],
            index_hash: KWiseHash::new(2, seed),
            // Degree 4 on the sign side tightens the variance bound.
            sign_hash: KWiseHash::new(4, seed.wrapping_add(20)),
        })
    }

    /// Returns the row width `⌈6 / (ε² δ)⌉`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the construction seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn column(&self, key: u64) -> usize {
        let digest = if self.fast_hash {
            mix64(key, self.seed)
        } else {
            self.index_hash.hash(key)
        };
        (digest % self.width as u64) as usize
    }

    fn sign(&self, key: u64) -> f64 {
        let digest = if self.fast_hash {
            mix64(key, self.seed.wrapping_add(20))
        } else {
            self.sign_hash.hash(key)
        };
        if digest & 1 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Applies the turnstile update `(key, delta)`.
    pub fn update(&mut self, key: u64, delta: f64) {
        let column = self.column(key);
        self.table[column] += self.sign(key) * delta;
    }

    /// Returns the `‖f‖₂` estimate `sqrt(Σ table[j]²)`.
    pub fn estimate_norm(&self) -> f64 {
        self.table.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Entrywise subtraction `T ← T − other.T`.
    ///
    /// After subtracting, the sketch estimates the norm of the difference
    /// of the two underlying vectors.
    ///
    /// # Errors
    /// [`SketchError::ContractViolation`] unless both sketches share the
    /// same width, seed, and hash mode.
    pub fn subtract(&mut self, other: &F2Estimator) -> Result<(), SketchError> {
        if self.width != other.width {
            return Err(SketchError::ContractViolation(
                "subtract requires equal sketch widths",
            ));
        }
        if self.seed != other.seed || self.fast_hash != other.fast_hash {
            return Err(SketchError::ContractViolation(
                "subtract requires identical hash seeds",
            ));
        }
        for (mine, theirs) in self.table.iter_mut().zip(&other.table) {
            *mine -= theirs;
        }
        Ok(())
    }
}

/// Median-of-Cauchy sketch estimating `‖f‖₁`.
///
/// Each of the `w₁` columns carries a deterministic pseudo-Cauchy
/// projection `C_j`, and an update adds `delta · C_j(key)` to every
/// column. `C_j(key)` is a pure function of the column seed and the key,
/// so updates and queries always agree on the projection values.
pub struct F1Estimator {
    width: usize,
    columns: Vec<KWiseHash>,
    table: Vec<f64>,
}

impl F1Estimator {
    /// Builds an estimator for the given error rate and failure
    /// probability, both in `(0, 1)`.
    ///
    /// The width is the next odd integer at or above `⌈3 ε⁻² ln δ⁻¹⌉`
    /// so the decoding median is a single entry. Column seeds come from
    /// a meta hash applied to per-column nonces, all derived
    /// deterministically from `seed`.
    ///
    /// # Errors
    /// [`SketchError::InvalidParameter`] when either rate is out of range.
    pub fn new(eps: f64, delta: f64, seed: u64) -> Result<Self, SketchError> {
        check_rate(eps, "eps must be in (0, 1)")?;
        check_rate(delta, "delta must be in (0, 1)")?;

        let mut width = (3.0 / (eps * eps) * (1.0 / delta).ln()).ceil() as usize;
        if width % 2 == 0 {
            width += 1;
        }
        let degree = ((1.0 / eps) * (-eps.ln()).powi(3)).ceil().max(1.0) as usize;

        let meta = KWiseHash::new(2, seed);
        let mut nonces = StdRng::seed_from_u64(seed);
        let columns = (0..width)
            .map(|_| KWiseHash::new(degree, meta.hash(nonces.gen())))
            .collect();

        Ok(Self {
            width,
            columns,
            table: vec![0.0; width],
        })
    }

    /// Returns the (odd) number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The column-`j` pseudo-Cauchy projection of `key`: map the digest
    /// to `u ∈ [0, 1)`, then take `tan((u − 1/2) π)`.
    fn cauchy(&self, column: usize, key: u64) -> f64 {
        let hash = &self.columns[column];
        let u = hash.hash(key) as f64 / hash.modulus() as f64;
        ((u - 0.5) * PI).tan()
    }

    /// Applies the turnstile update `(key, delta)` to every column.
    pub fn update(&mut self, key: u64, delta: f64) {
        for column in 0..self.width {
            self.table[column] += delta * self.cauchy(column, key);
        }
    }

    /// Returns the `‖f‖₁` estimate: the median of `|table[j]|`.
    pub fn estimate_norm(&self) -> f64 {
        let mut magnitudes: Vec<f64> = self.table.iter().map(|v| v.abs()).collect();
        magnitudes.sort_unstable_by(f64::total_cmp);
        magnitudes[magnitudes.len() / 2]
    }
}

/// The norm sketch a sampler owns, chosen from `p` at construction.
pub enum NormEstimator {
    /// `p = 1`: median-of-Cauchy.
    F1(F1Estimator),
    /// `p = 2`: single-row AMS.
    F2(F2Estimator),
}

impl NormEstimator {
    /// Applies the turnstile update `(key, delta)`.
    pub fn update(&mut self, key: u64, delta: f64) {
        match self {
            NormEstimator::F1(sketch) => sketch.update(key, delta),
            NormEstimator::F2(sketch) => sketch.update(key, delta),
        }
    }

    /// Returns the `‖f‖_p` estimate of the wrapped sketch.
    pub fn estimate_norm(&self) -> f64 {
        match self {
            NormEstimator::F1(sketch) => sketch.estimate_norm(),
            NormEstimator::F2(sketch) => sketch.estimate_norm(),
        }
    }
}
