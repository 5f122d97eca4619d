//! Constant-time modular arithmetic for the consumption path.
//!
//! Everything in this module may touch secret-dependent values (ciphertext
//! residues during decryption), so none of it branches on its operands or
//! divides. Reductions use precomputed Barrett or Shoup factors; the only
//! data-dependent step is a masked conditional subtraction.
//!
//! Construction of [`Modulus`] and [`ShoupModulus`] lives in
//! [`crate::rns::setup`] and is variable-time.

/// A word-sized modulus `q < 2^63` with Barrett factors.
///
/// Invariants: `barrett_64 == floor(2^64 / q)` and
/// `barrett_128 == floor(2^128 / q)` stored as `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulus {
    pub(super) value: u64,
    pub(super) barrett_64: u64,
    pub(super) barrett_128: [u64; 2],
}

/// A modulus paired with a fixed multiplicand `w < q` and the Shoup factor
/// `floor(w * 2^64 / q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShoupModulus {
    pub(super) modulus: u64,
    pub(super) multiplicand: u64,
    pub(super) factor: u64,
}

// ─── Word helpers ─────────────────────────────────────────────────────────────

#[inline(always)]
fn mul_hi(a: u64, b: u64) -> u64 {
    ((a as u128 * b as u128) >> 64) as u64
}

/// All-ones when `bit == 1`, zero when `bit == 0`.
#[inline(always)]
fn mask_from_bit(bit: u64) -> u64 {
    0u64.wrapping_sub(bit & 1)
}

/// Maps `x` in `[0, 2q)` to `[0, q)` without branching. Requires `q < 2^63`.
#[inline(always)]
pub fn cond_sub(x: u64, q: u64) -> u64 {
    let diff = x.wrapping_sub(q);
    // Top bit of `diff` is set exactly when `x < q`.
    diff.wrapping_add(q & mask_from_bit(diff >> 63))
}

/// Returns `if_set` when `mask` is all-ones and `if_clear` when it is zero.
#[inline(always)]
pub fn select(mask: u64, if_set: u64, if_clear: u64) -> u64 {
    (if_set & mask) | (if_clear & !mask)
}

/// All-ones when `a > b`, zero otherwise. Both operands must be `< 2^63`.
#[inline(always)]
pub fn gt_mask(a: u64, b: u64) -> u64 {
    mask_from_bit(b.wrapping_sub(a) >> 63)
}

// ─── Modulus ──────────────────────────────────────────────────────────────────

impl Modulus {
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// `x mod q` for any `u64` input.
    #[inline]
    pub fn reduce(&self, x: u64) -> u64 {
        let quotient = mul_hi(x, self.barrett_64);
        cond_sub(x.wrapping_sub(quotient.wrapping_mul(self.value)), self.value)
    }

    /// `x mod q` for any `u128` input.
    ///
    /// Computes the high half of `x * floor(2^128 / q)` from four partial
    /// products. The quotient estimate is short by at most one, so a single
    /// conditional subtraction finishes the reduction.
    #[inline]
    pub fn reduce_u128(&self, x: u128) -> u64 {
        let x_lo = x as u64;
        let x_hi = (x >> 64) as u64;
        let [m_lo, m_hi] = self.barrett_128;

        let lo_lo_hi = mul_hi(x_lo, m_lo);
        let lo_hi = x_lo as u128 * m_hi as u128;
        let hi_lo = x_hi as u128 * m_lo as u128;
        let middle = lo_lo_hi as u128 + (lo_hi as u64) as u128 + (hi_lo as u64) as u128;

        let quotient = x_hi
            .wrapping_mul(m_hi)
            .wrapping_add((lo_hi >> 64) as u64)
            .wrapping_add((hi_lo >> 64) as u64)
            .wrapping_add((middle >> 64) as u64);

        cond_sub(x_lo.wrapping_sub(quotient.wrapping_mul(self.value)), self.value)
    }

    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        cond_sub(a + b, self.value)
    }

    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        cond_sub(a + self.value - b, self.value)
    }

    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        self.sub(0, a)
    }

    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128)
    }
}

// ─── ShoupModulus ─────────────────────────────────────────────────────────────

impl ShoupModulus {
    #[inline]
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    #[inline]
    pub fn multiplicand(&self) -> u64 {
        self.multiplicand
    }

    /// `x * w mod q` up to one extra `q`: the result lies in `[0, 2q)`.
    ///
    /// Valid for every `x < 2^64`.
    #[inline]
    pub fn multiply_reduce_lazy(&self, x: u64) -> u64 {
        let quotient = mul_hi(x, self.factor);
        x.wrapping_mul(self.multiplicand)
            .wrapping_sub(quotient.wrapping_mul(self.modulus))
    }

    /// `x * w mod q` in `[0, q)`.
    #[inline]
    pub fn multiply_reduce(&self, x: u64) -> u64 {
        cond_sub(self.multiply_reduce_lazy(x), self.modulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    const MODULI: [u64; 6] = [
        2,
        17,
        65_537,
        1_152_921_504_606_846_883,
        (1 << 61) - 1,
        (1 << 63) - 25,
    ];

    #[test]
    fn cond_sub_maps_lazy_range() {
        let q = 97;
        for x in 0..2 * q {
            assert_eq!(cond_sub(x, q), x % q);
        }
    }

    #[test]
    fn select_and_compare_are_consistent() {
        assert_eq!(gt_mask(5, 3), u64::MAX);
        assert_eq!(gt_mask(3, 5), 0);
        assert_eq!(gt_mask(4, 4), 0);
        let half_gamma = crate::rns::GAMMA / 2;
        assert_eq!(gt_mask(half_gamma, half_gamma), 0);
        assert_eq!(gt_mask(half_gamma + 1, half_gamma), u64::MAX);
        assert_eq!(select(u64::MAX, 1, 2), 1);
        assert_eq!(select(0, 1, 2), 2);
    }

    #[test]
    fn barrett_reduce_matches_remainder() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for &q in &MODULI {
            let modulus = Modulus::new(q).unwrap();
            for x in [0, 1, q - 1, q, u64::MAX] {
                assert_eq!(modulus.reduce(x), x % q, "q={q} x={x}");
            }
            for _ in 0..1_000 {
                let x: u64 = rng.random();
                assert_eq!(modulus.reduce(x), x % q);
                let wide: u128 = rng.random();
                assert_eq!(modulus.reduce_u128(wide), (wide % q as u128) as u64);
            }
            assert_eq!(
                modulus.reduce_u128(u128::MAX),
                (u128::MAX % q as u128) as u64
            );
        }
    }

    #[test]
    fn add_sub_mul_match_reference() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for &q in &MODULI {
            let modulus = Modulus::new(q).unwrap();
            for _ in 0..500 {
                let a = rng.random_range(0..q);
                let b = rng.random_range(0..q);
                assert_eq!(modulus.add(a, b), ((a as u128 + b as u128) % q as u128) as u64);
                assert_eq!(
                    modulus.sub(a, b),
                    ((a as u128 + q as u128 - b as u128) % q as u128) as u64
                );
                assert_eq!(modulus.mul(a, b), ((a as u128 * b as u128) % q as u128) as u64);
                assert_eq!(modulus.add(modulus.neg(a), a), 0);
            }
        }
    }

    #[test]
    fn shoup_multiply_stays_lazy_then_exact() {
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        for &q in &MODULI {
            for _ in 0..50 {
                let w = rng.random_range(0..q);
                let shoup = ShoupModulus::new(w, q).unwrap();
                for _ in 0..50 {
                    let x: u64 = rng.random();
                    let expected = ((x as u128 * w as u128) % q as u128) as u64;
                    let lazy = shoup.multiply_reduce_lazy(x);
                    assert!(lazy < 2 * q);
                    assert_eq!(lazy % q, expected);
                    assert_eq!(shoup.multiply_reduce(x), expected);
                }
            }
        }
    }
}
