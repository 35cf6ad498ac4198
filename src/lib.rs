//! Sublinear-space sketches and samplers for turnstile streams.
//!
//! A turnstile stream is a sequence of `(index, delta)` updates, with
//! possibly negative deltas, defining an implicit frequency vector `f`
//! that is never materialized. The crate answers three kinds of query
//! over that vector:
//!
//! - [`count_sketch::CountSketch`] estimates individual frequencies
//!   `f_i` with error relative to `‖f‖₂`.
//! - [`norm::F2Estimator`] and [`norm::F1Estimator`] estimate `‖f‖₂`
//!   and `‖f‖₁`.
//! - [`sampler::LpSampler`] draws a coordinate `i` with probability
//!   approximately `|f_i|^p / ‖f‖_p^p` for `p ∈ {1, 2}`, and
//!   [`boost::BoostedSampler`] races independent sampler instances in
//!   parallel until one succeeds.
//!
//! All randomness is seeded and deterministic: two sketches built from
//! the same parameters and seed behave identically, which is what lets
//! the race harness and the F2 `subtract` operation line instances up.
//! [`stream`] holds the collaborators around the core: stream-file IO,
//! synthetic update generators, and the sample-outcome log.

use thiserror::Error;

pub mod boost;
pub mod count_sketch;
pub mod hash;
pub mod norm;
pub mod sampler;
pub mod stream;

pub use boost::BoostedSampler;
pub use count_sketch::CountSketch;
pub use hash::KWiseHash;
pub use norm::{F1Estimator, F2Estimator};
pub use sampler::LpSampler;

/// Errors surfaced by sketch constructors and mutating operations.
///
/// A sampler that runs to completion but rejects its candidate is not an
/// error: that outcome is the `Ok(None)` value of
/// [`LpSampler::sample`](sampler::LpSampler::sample).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SketchError {
    /// A constructor received a parameter outside its documented domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    /// An operation was called in a state its contract forbids.
    #[error("contract violation: {0}")]
    ContractViolation(&'static str),
}
