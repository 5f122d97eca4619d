use super::{
    context::HeContext,
    errors::{HeError, HeResult},
};
use crate::rns::{CoeffPoly, RnsError};

/// A message polynomial with coefficients in `[0, t)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plaintext {
    coeffs: Vec<u64>,
}

impl Plaintext {
    /// Pads `coeffs` with zeros up to the ring degree.
    pub fn new(ctx: &HeContext, coeffs: &[u64]) -> HeResult<Self> {
        let degree = ctx.params().degree;
        let t = ctx.plaintext_modulus();
        if coeffs.len() > degree {
            return Err(HeError::PlaintextLength {
                degree,
                actual: coeffs.len(),
            });
        }
        if let Some(&value) = coeffs.iter().find(|&&c| c >= t) {
            return Err(HeError::PlaintextOutOfRange { value, modulus: t });
        }
        let mut padded = vec![0; degree];
        padded[..coeffs.len()].copy_from_slice(coeffs);
        Ok(Self { coeffs: padded })
    }

    /// Reduces signed values into `[0, t)` first.
    pub fn from_signed(ctx: &HeContext, coeffs: &[i64]) -> HeResult<Self> {
        let t = ctx.plaintext_modulus() as i128;
        let reduced: Vec<u64> = coeffs
            .iter()
            .map(|&c| (c as i128).rem_euclid(t) as u64)
            .collect();
        Self::new(ctx, &reduced)
    }

    pub(super) fn from_reduced(coeffs: Vec<u64>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }
}

/// `(c0, c1)` in coefficient form over one level of the chain.
///
/// Decryption yields `m * correction_factor (mod t)`; BGV modulus switching
/// multiplies the factor by `q_last^-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    pub(super) c0: CoeffPoly,
    pub(super) c1: CoeffPoly,
    pub(super) correction_factor: u64,
}

impl Ciphertext {
    pub fn new(c0: CoeffPoly, c1: CoeffPoly, correction_factor: u64) -> HeResult<Self> {
        if c0.context() != c1.context() {
            return Err(RnsError::ContextMismatch { operand: "c1" }.into());
        }
        Ok(Self {
            c0,
            c1,
            correction_factor,
        })
    }

    /// Number of moduli the ciphertext is defined over.
    pub fn level(&self) -> usize {
        self.c0.context().nmoduli()
    }

    pub fn c0(&self) -> &CoeffPoly {
        &self.c0
    }

    pub fn c1(&self) -> &CoeffPoly {
        &self.c1
    }

    pub fn correction_factor(&self) -> u64 {
        self.correction_factor
    }
}
