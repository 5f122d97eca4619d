use std::fmt;

use rand::Rng;

use super::{
    context::HeContext,
    errors::{HeError, HeResult},
};
use crate::{
    math::ternary_coefficients,
    rns::{CoeffPoly, EvalPoly},
};

/// Sparse ternary secret `s`, kept in evaluation form at every level.
///
/// Level `k` holds the first `k` residue rows of the top-level transform,
/// which is `s` over `q_0, ..., q_{k-1}`.
pub struct SecretKey {
    levels: Vec<EvalPoly>,
}

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(ctx: &HeContext, rng: &mut R) -> HeResult<Self> {
        let params = ctx.params();
        if params.hamming_weight > params.degree {
            return Err(HeError::InvalidHammingWeight {
                weight: params.hamming_weight,
                degree: params.degree,
            });
        }
        let coeffs = ternary_coefficients(params.degree, params.hamming_weight, rng);
        let top = CoeffPoly::from_signed(ctx.chain().top(), &coeffs)?.forward_transform()?;
        let levels = (1..=ctx.max_level())
            .map(|level| Ok(top.prefix(ctx.context(level)?)?))
            .collect::<HeResult<_>>()?;
        Ok(Self { levels })
    }

    /// `s` over the first `level` moduli, in evaluation form.
    pub fn at_level(&self, level: usize) -> HeResult<&EvalPoly> {
        level
            .checked_sub(1)
            .and_then(|index| self.levels.get(index))
            .ok_or(HeError::InvalidLevel {
                level,
                max: self.levels.len(),
            })
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("levels", &self.levels.len())
            .finish_non_exhaustive()
    }
}
