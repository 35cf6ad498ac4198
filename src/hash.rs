//! Seeded hash functions shared by every sketch in the crate.
//!
//! [`KWiseHash`] is a polynomial hash over the Mersenne field
//! GF(2^61 − 1): any `k` distinct keys have a jointly uniform image
//! distribution, conditional on the random coefficient draw. The modulus
//! is chosen so that reduction of a 128-bit product is branch-free using
//! shifts. [`mix64`] is the fast non-independent alternative used by the
//! sketches' fast-hash mode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// The Mersenne prime 2^61 − 1 used as the field modulus.
pub const MERSENNE_61: u64 = (1 << 61) - 1;

const UNIT_61: f64 = 1.0 / (1u64 << 61) as f64;

/// A k-wise independent hash family member over GF(2^61 − 1).
///
/// Evaluates `h(x) = (a_0 + a_1 x + … + a_{k−1} x^{k−1}) mod P` with
/// coefficients drawn uniformly from `[0, P)` by a PRNG seeded from
/// `seed`. Construction is deterministic: equal `(k, seed)` pairs yield
/// equal functions. Parameters are immutable after construction.
#[derive(Debug, Clone)]
pub struct KWiseHash {
    coeffs: Vec<u64>,
}

impl KWiseHash {
    /// Draws a degree-`k` member of the family.
    ///
    /// `k` is clamped to at least 1 (a degree-0 polynomial would hash
    /// everything to a constant anyway, so the constant case is `k = 1`).
    pub fn new(k: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let coeffs = (0..k.max(1))
            .map(|_| rng.gen_range(0..MERSENNE_61))
            .collect();
        Self { coeffs }
    }

    /// Evaluates the polynomial at `x`, returning a digest in `[0, P)`.
    pub fn hash(&self, x: u64) -> u64 {
        // Keep every Horner multiplicand below 2^61 so the shift-based
        // reduction identity applies.
        let x = x % MERSENNE_61;
        let mut acc = 0u64;
        for &a in self.coeffs.iter().rev() {
            acc = mul61(acc, x);
            acc += a;
            if acc >= MERSENNE_61 {
                acc -= MERSENNE_61;
            }
        }
        acc
    }

    /// Maps `x` to the open unit interval `(0, 1)`.
    ///
    /// The `+1` keeps zero out of the range, so callers may divide by the
    /// result or take its logarithm.
    pub fn unit(&self, x: u64) -> f64 {
        (self.hash(x) + 1) as f64 * UNIT_61
    }

    /// Returns the field modulus P = 2^61 − 1.
    pub fn modulus(&self) -> u64 {
        MERSENNE_61
    }

    /// Returns the degree of the polynomial (the `k` in k-wise).
    pub fn degree(&self) -> usize {
        self.coeffs.len()
    }
}

/// Reduces the 128-bit value `hi:lo` modulo 2^61 − 1.
///
/// Uses 2^61 ≡ 1 and 2^64 ≡ 8 (mod P): fold the low word at bit 61 and
/// the high word at bit 58, then normalize with a single subtraction.
/// Valid whenever both multiplicands were below 2^61.
#[inline]
fn mod61(hi: u64, lo: u64) -> u64 {
    let folded = (lo & MERSENNE_61) + (lo >> 61) + (hi << 3) + (hi >> 58);
    if folded >= MERSENNE_61 {
        folded - MERSENNE_61
    } else {
        folded
    }
}

/// Multiplies `a * b mod P` through a 128-bit intermediate.
#[inline]
fn mul61(a: u64, b: u64) -> u64 {
    let prod = a as u128 * b as u128;
    mod61((prod >> 64) as u64, prod as u64)
}

/// Seeded 64-bit mixing hash (xxh3) for the sketches' fast-hash mode.
///
/// Not 2-wise independent; the estimation guarantees that rely on the
/// polynomial family do not carry over.
#[inline]
pub(crate) fn mix64(key: u64, seed: u64) -> u64 {
    xxh3_64_with_seed(&key.to_le_bytes(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_stay_below_modulus() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let h = KWiseHash::new(rng.gen_range(1..=6), rng.gen());
            for _ in 0..50 {
                assert!(h.hash(rng.gen()) < MERSENNE_61);
            }
        }
    }

    #[test]
    fn evaluation_is_deterministic_across_constructions() {
        let a = KWiseHash::new(4, 42);
        let b = KWiseHash::new(4, 42);
        assert_eq!(a.hash(12345), b.hash(12345));
        for x in [0u64, 1, 999, u64::MAX] {
            assert_eq!(a.hash(x), a.hash(x));
            assert_eq!(a.hash(x), b.hash(x));
        }
    }

    #[test]
    fn distinct_seeds_give_distinct_functions() {
        let a = KWiseHash::new(2, 1);
        let b = KWiseHash::new(2, 2);
        let disagree = (0..32u64).any(|x| a.hash(x) != b.hash(x));
        assert!(disagree);
    }

    #[test]
    fn unit_mapping_stays_inside_the_open_interval() {
        let h = KWiseHash::new(2, 99);
        for x in 0..1000u64 {
            let u = h.unit(x);
            assert!(u > 0.0 && u < 1.0, "u = {u}");
        }
    }

    #[test]
    fn modulus_and_degree_accessors() {
        let h = KWiseHash::new(3, 0);
        assert_eq!(h.modulus(), (1 << 61) - 1);
        assert_eq!(h.degree(), 3);
    }

    #[test]
    fn reduction_matches_wide_arithmetic() {
        let mut rng = StdRng::seed_from_u64(21);
        let p = MERSENNE_61 as u128;
        for _ in 0..10_000 {
            let a = rng.gen_range(0..MERSENNE_61);
            let b = rng.gen_range(0..MERSENNE_61);
            let expect = ((a as u128 * b as u128) % p) as u64;
            assert_eq!(mul61(a, b), expect);
        }
    }

    /// Pairwise independence, statistically: for fixed `x != y`, the
    /// joint distribution of `(h(x), h(y))` over random coefficient
    /// draws should be uniform on `[0, P)^2`. Bin each digest into
    /// quartiles and chi-square the 16-cell histogram.
    #[test]
    fn pairwise_digests_are_jointly_uniform() {
        const DRAWS: usize = 4096;
        const BINS: u64 = 4;
        let bucket = |digest: u64| ((digest / (MERSENNE_61 / BINS)) as usize).min(3);

        let mut rng = StdRng::seed_from_u64(1234);
        let (x, y) = (17u64, 905_003u64);
        let mut cells = [0usize; 16];
        for _ in 0..DRAWS {
            let h = KWiseHash::new(2, rng.gen());
            cells[bucket(h.hash(x)) * 4 + bucket(h.hash(y))] += 1;
        }

        let expected = DRAWS as f64 / 16.0;
        let chi2: f64 = cells
            .iter()
            .map(|&obs| {
                let diff = obs as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 15 degrees of freedom; the 99.9th percentile is ~37.7.
        assert!(chi2 < 45.0, "chi-square statistic too large: {chi2}");
    }
}
