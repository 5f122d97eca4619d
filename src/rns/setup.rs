//! Variable-time construction of public parameters.
//!
//! Nothing here may ever see secret data: divisions, early returns and
//! data-dependent loops are all fine because every input is a public modulus,
//! a ring degree or a constant derived from them.

use crypto_bigint::{NonZero, U1024};

use super::{
    errors::{RnsError, RnsResult},
    scalar::{Modulus, ShoupModulus},
};

/// Moduli must fit in 63 bits so that lazy values in `[0, 2q)` fit a word.
pub const MODULUS_BITS_MAX: u32 = 63;

/// Wide integer holding a product of up to [`NMODULI_MAX`](super::NMODULI_MAX)
/// moduli of at most 63 bits each.
pub(crate) type WideInt = U1024;

impl Modulus {
    pub fn new(value: u64) -> RnsResult<Self> {
        if value < 2 || value >> MODULUS_BITS_MAX != 0 {
            return Err(RnsError::InvalidModulus { modulus: value });
        }
        let barrett_64 = (u64::MAX / value) + u64::from(u64::MAX % value == value - 1);
        let barrett = u128::MAX / value as u128
            + u128::from(u128::MAX % value as u128 == value as u128 - 1);
        Ok(Self {
            value,
            barrett_64,
            barrett_128: [barrett as u64, (barrett >> 64) as u64],
        })
    }
}

impl ShoupModulus {
    pub fn new(multiplicand: u64, modulus: u64) -> RnsResult<Self> {
        if modulus < 2 || modulus >> MODULUS_BITS_MAX != 0 {
            return Err(RnsError::InvalidModulus { modulus });
        }
        if multiplicand >= modulus {
            return Err(RnsError::InvalidMultiplicand {
                multiplicand,
                modulus,
            });
        }
        let factor = (((multiplicand as u128) << 64) / modulus as u128) as u64;
        Ok(Self {
            modulus,
            multiplicand,
            factor,
        })
    }

    /// Builds the Shoup form of `value mod modulus` for an arbitrary `value`.
    pub fn reduced(value: u64, modulus: u64) -> RnsResult<Self> {
        Self::new(value % modulus.max(1), modulus)
    }
}

// ─── Number theory on public values ───────────────────────────────────────────

pub fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

pub fn pow_mod(mut base: u64, mut exponent: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1u64;
    base %= modulus;
    while exponent > 0 {
        if exponent & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exponent >>= 1;
    }
    acc
}

/// Inverse of `value` modulo `modulus`, or `None` when they share a factor.
pub fn inv_mod(value: u64, modulus: u64) -> Option<u64> {
    if modulus < 2 {
        return None;
    }
    let (mut old_r, mut r) = ((value % modulus) as i128, modulus as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(modulus as i128) as u64)
}

/// Finds `psi` with `psi^degree == -1 (mod modulus)`, a primitive
/// `2 * degree`-th root of unity.
///
/// Candidates are tried in increasing order so the result is deterministic.
/// Requires `modulus` prime and `modulus == 1 (mod 2 * degree)`.
pub fn primitive_root_2n(modulus: u64, degree: usize) -> Option<u64> {
    let order = 2 * degree as u64;
    if modulus < 3 || (modulus - 1) % order != 0 {
        return None;
    }
    let exponent = (modulus - 1) / order;
    (2..modulus)
        .map(|candidate| pow_mod(candidate, exponent, modulus))
        .find(|&root| pow_mod(root, degree as u64, modulus) == modulus - 1)
}

// ─── Wide products ────────────────────────────────────────────────────────────

/// Product of `moduli`, skipping index `skip` when given.
pub(crate) fn product(moduli: &[u64], skip: Option<usize>) -> WideInt {
    moduli
        .iter()
        .enumerate()
        .filter(|&(index, _)| Some(index) != skip)
        .fold(WideInt::ONE, |acc, (_, &modulus)| {
            acc.wrapping_mul(&WideInt::from_u64(modulus))
        })
}

/// `value mod modulus` for a wide `value`.
pub(crate) fn wide_rem(value: &WideInt, modulus: u64) -> RnsResult<u64> {
    let divisor: Option<NonZero<WideInt>> =
        NonZero::new(WideInt::from_u64(modulus)).into();
    let divisor = divisor.ok_or(RnsError::InvalidModulus { modulus })?;
    Ok(value.rem(&divisor).as_words()[0])
}

/// `floor(value / divisor) mod modulus`.
pub(crate) fn wide_div_rem(value: &WideInt, divisor: u64, modulus: u64) -> RnsResult<u64> {
    let divisor_nz: Option<NonZero<WideInt>> =
        NonZero::new(WideInt::from_u64(divisor)).into();
    let divisor_nz = divisor_nz.ok_or(RnsError::InvalidModulus { modulus: divisor })?;
    let (quotient, _) = value.div_rem(&divisor_nz);
    wide_rem(&quotient, modulus)
}
