//! One-pass L_p sampling over turnstile streams, p ∈ {1, 2}.
//!
//! The sampler scales every update by `u_i^{−1/p}` for a deterministic
//! per-coordinate uniform `u_i`, sketches the scaled vector, and at
//! query time accepts the largest recovered coordinate only when two
//! consistency checks pass. Conditioned on acceptance, coordinate `i`
//! is returned with probability close to `|f_i|^p / ‖f‖_p^p`; rejection
//! is an expected outcome that callers boost away by racing independent
//! instances (see [`crate::boost`]).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::count_sketch::CountSketch;
use crate::hash::KWiseHash;
use crate::norm::{F1Estimator, F2Estimator, NormEstimator};
use crate::SketchError;

/// Heap entry ordered by the magnitude of the recovered coordinate.
struct Recovered {
    index: u64,
    value: f64,
}

impl PartialEq for Recovered {
    fn eq(&self, other: &Self) -> bool {
        self.value.abs().total_cmp(&other.value.abs()).is_eq()
    }
}

impl Eq for Recovered {}

impl PartialOrd for Recovered {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Recovered {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.abs().total_cmp(&other.value.abs())
    }
}

/// A single-shot L_p sampler for a turnstile stream over `[0, n)`.
///
/// Owns three sub-sketches fed on every update: a real-valued
/// [`CountSketch`] of the scaled vector, an F_p norm estimator of the
/// unscaled vector, and an auxiliary [`F2Estimator`] tracking the scaled
/// vector for the tail-error check. All three derive their randomness
/// from the constructor seed, so equal `(p, ε, δ, n, seed)` samplers are
/// interchangeable.
pub struct LpSampler {
    p: u32,
    eps: f64,
    delta: f64,
    n: u64,
    seed: u64,
    m: usize,
    scalars: KWiseHash,
    sketch: CountSketch<f64>,
    fp: NormEstimator,
    f2_err: F2Estimator,
    sampled: bool,
}

impl LpSampler {
    /// Builds a sampler for `p ∈ {1, 2}`, `ε, δ ∈ (0, 1)`, and a key
    /// domain of size `n > 0`.
    ///
    /// Sketch dimensions follow the analysis: the inner Count-Sketch has
    /// width `6m` and odd depth `⌈4 ln n⌉ + 1`, where `m = ⌈8 ln ε⁻¹⌉`
    /// for `p = 1` and `m = ⌈8 ε⁻¹ ln n⌉` for `p = 2`. The norm sketches
    /// run at `(ε, δ/2)`.
    ///
    /// # Errors
    /// [`SketchError::InvalidParameter`] for any parameter outside its
    /// domain.
    pub fn new(p: u32, eps: f64, delta: f64, n: u64, seed: u64) -> Result<Self, SketchError> {
        if p != 1 && p != 2 {
            return Err(SketchError::InvalidParameter("p must be 1 or 2"));
        }
        if !eps.is_finite() || eps <= 0.0 || eps >= 1.0 {
            return Err(SketchError::InvalidParameter("eps must be in (0, 1)"));
        }
        if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
            return Err(SketchError::InvalidParameter("delta must be in (0, 1)"));
        }
        if n == 0 {
            return Err(SketchError::InvalidParameter("n must be positive"));
        }

        let degree = (2.0 * (1.0 - eps.log2()).max(1.0)).ceil() as usize;
        let scalars = KWiseHash::new(degree, seed);

        let (m, fp) = if p == 1 {
            let m = (8.0 * (1.0 / eps).ln()).ceil().max(1.0) as usize;
            (m, NormEstimator::F1(F1Estimator::new(eps, delta / 2.0, seed)?))
        } else {
            let m = (8.0 / eps * (n as f64).ln()).ceil().max(1.0) as usize;
            (m, NormEstimator::F2(F2Estimator::new(eps, delta / 2.0, seed)?))
        };

        let mut depth = (4.0 * (n as f64).ln()).ceil() as usize + 1;
        if depth % 2 == 0 {
            depth += 1;
        }
        let sketch = CountSketch::new(6 * m, depth, seed)?;
        let f2_err = F2Estimator::new(eps, delta / 2.0, seed)?;

        Ok(Self {
            p,
            eps,
            delta,
            n,
            seed,
            m,
            scalars,
            sketch,
            fp,
            f2_err,
            sampled: false,
        })
    }

    /// Returns the sampler's `p`.
    pub fn p(&self) -> u32 {
        self.p
    }

    /// Returns the size of the key domain.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// The scaling variable `u_i ∈ (0, 1)`, a pure function of the seed
    /// and the coordinate.
    fn scaling(&self, i: u64) -> f64 {
        self.scalars.unit(i)
    }

    fn scaled(&self, i: u64, delta: f64) -> f64 {
        match self.p {
            1 => delta / self.scaling(i),
            _ => delta / self.scaling(i).sqrt(),
        }
    }

    /// Applies the turnstile update `(i, delta)` to all three
    /// sub-sketches.
    ///
    /// # Errors
    /// [`SketchError::ContractViolation`] when `i ≥ n`. The sketch state
    /// is untouched in that case.
    pub fn update(&mut self, i: u64, delta: f64) -> Result<(), SketchError> {
        if i >= self.n {
            return Err(SketchError::ContractViolation(
                "update index outside the key domain",
            ));
        }
        let z = self.scaled(i, delta);
        self.sketch.update(i, z);
        self.fp.update(i, delta);
        self.f2_err.update(i, z);
        Ok(())
    }

    /// Attempts to draw a coordinate; `Ok(None)` means the attempt's
    /// consistency checks rejected the candidate, which is the expected
    /// failure mode the boosting harness absorbs.
    ///
    /// The sampler is single-shot: a second call is a
    /// [`SketchError::ContractViolation`].
    pub fn sample(&mut self) -> Result<Option<u64>, SketchError> {
        if self.sampled {
            return Err(SketchError::ContractViolation(
                "sample may only be called once per sampler",
            ));
        }
        self.sampled = true;

        let r = 1.5 * self.fp.estimate_norm();

        // Scan the domain once, tracking the argmax and a min-heap of
        // the m largest recovered magnitudes.
        let mut best = Recovered { index: 0, value: 0.0 };
        let mut top = BinaryHeap::with_capacity(self.m + 1);
        for i in 0..self.n {
            let z = self.sketch.estimate(i);
            if z.abs() > best.value.abs() {
                best = Recovered { index: i, value: z };
            }
            top.push(Reverse(Recovered { index: i, value: z }));
            if top.len() > self.m {
                top.pop();
            }
        }

        // Sketch the m-sparse approximation with the error sketch's own
        // seed so the tables line up entrywise.
        let mut sparse = F2Estimator::new(self.eps, self.delta / 2.0, self.seed)?;
        for Reverse(entry) in top {
            sparse.update(entry.index, entry.value);
        }
        self.f2_err.subtract(&sparse)?;
        let s = 1.5 * self.f2_err.estimate_norm();

        let p = self.p as f64;
        let tail_bound = self.eps.powf(1.0 - 1.0 / p) * r * (self.m as f64).sqrt();
        let peak_bound = r / self.eps.powf(1.0 / p);
        if s > tail_bound || best.value.abs() < peak_bound {
            return Ok(None);
        }
        Ok(Some(best.index))
    }
}
