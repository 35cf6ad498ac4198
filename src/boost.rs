//! Boosting harness: race independent samplers until one succeeds.
//!
//! A single [`LpSampler`] attempt fails with constant probability by
//! design. The harness drives `N = ⌈4 ε⁻¹ ln δ⁻¹⌉` attempts with
//! disjoint seeds across a pool of worker threads; the first successful
//! attempt wins the race and the rest cancel cooperatively at their
//! next sampler boundary. No sketch state crosses threads: workers
//! share only the cancellation flag and the one-shot publication cell.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crate::sampler::LpSampler;
use crate::SketchError;

/// Parallel race over independent [`LpSampler`] instances.
///
/// # Example
/// ```no_run
/// use lp_sampling::BoostedSampler;
///
/// let updates: Vec<(u64, f64)> = (0..10).map(|i| (i, i as f64)).collect();
/// let race = BoostedSampler::new(1, 0.0625, 0.1, 10, 42).unwrap();
/// match race.run(&updates).unwrap() {
///     Some(index) => println!("{index}"),
///     None => println!("FAIL"),
/// }
/// ```
pub struct BoostedSampler {
    p: u32,
    eps: f64,
    delta: f64,
    n: u64,
    seed: u64,
    attempts: usize,
    workers: usize,
}

impl BoostedSampler {
    /// Builds a harness whose attempts use seeds `seed + s` for
    /// `s ∈ [0, N)` with `N = ⌈4 ε⁻¹ ln δ⁻¹⌉`, spread over
    /// `min(N, hardware concurrency)` workers.
    ///
    /// # Errors
    /// [`SketchError::InvalidParameter`] under the same parameter domain
    /// as [`LpSampler::new`].
    pub fn new(p: u32, eps: f64, delta: f64, n: u64, seed: u64) -> Result<Self, SketchError> {
        // Probe construction validates the shared parameter set once so
        // worker loops cannot fail on it later.
        LpSampler::new(p, eps, delta, n, seed)?;

        let attempts = (4.0 / eps * (1.0 / delta).ln()).ceil().max(1.0) as usize;
        let hardware = thread::available_parallelism().map_or(1, usize::from);
        let workers = hardware.min(attempts).max(1);
        Ok(Self {
            p,
            eps,
            delta,
            n,
            seed,
            attempts,
            workers,
        })
    }

    /// Returns the number of sampler attempts the race will make.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns the worker-thread count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs the race: every worker sequentially constructs a sampler,
    /// replays `updates`, and queries it, polling the shared flag
    /// between attempts. Returns the first published coordinate, or
    /// `Ok(None)` when all `N` attempts failed.
    ///
    /// # Errors
    /// [`SketchError::ContractViolation`] when any update index is
    /// outside `[0, n)`; the check runs before any thread spawns.
    pub fn run(&self, updates: &[(u64, f64)]) -> Result<Option<u64>, SketchError> {
        if updates.iter().any(|&(i, _)| i >= self.n) {
            return Err(SketchError::ContractViolation(
                "update index outside the key domain",
            ));
        }

        let found = AtomicBool::new(false);
        // The domain size doubles as the "nothing published" sentinel.
        let published = AtomicU64::new(self.n);
        let per_worker = (self.attempts + self.workers - 1) / self.workers;

        thread::scope(|scope| {
            for worker in 0..self.workers {
                let found = &found;
                let published = &published;
                let start = worker * per_worker;
                let end = (start + per_worker).min(self.attempts);
                scope.spawn(move || {
                    for attempt in start..end {
                        if found.load(Ordering::Acquire) {
                            break;
                        }
                        let index = match self.attempt(updates, attempt as u64) {
                            Some(index) => index,
                            None => continue,
                        };
                        // First publisher wins; losers must not overwrite.
                        if found
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                        {
                            published.store(index, Ordering::Release);
                        }
                        break;
                    }
                });
            }
        });

        if found.load(Ordering::Acquire) {
            Ok(Some(published.load(Ordering::Acquire)))
        } else {
            Ok(None)
        }
    }

    /// One full sampler lifetime: construct, replay, query. Parameters
    /// and updates were validated up front, so errors cannot occur here;
    /// any that did would count as a failed attempt.
    fn attempt(&self, updates: &[(u64, f64)], offset: u64) -> Option<u64> {
        let seed = self.seed.wrapping_add(offset);
        let mut sampler = LpSampler::new(self.p, self.eps, self.delta, self.n, seed).ok()?;
        for &(i, delta) in updates {
            sampler.update(i, delta).ok()?;
        }
        sampler.sample().ok().flatten()
    }
}
