use super::BaseConverter;
use crate::rns::{
    context::Dims,
    errors::{RnsError, RnsResult},
    poly::{Coeff, Poly, Storage},
    scalar::{Modulus, ShoupModulus},
    workspace::Scratch,
};

/// Scratch words needed by [`BaseConverter::convert_approx`] for an input of
/// shape `input`.
pub fn approx_scratch_words(input: Dims) -> usize {
    input.words()
}

impl BaseConverter {
    /// Fast base conversion: `r_j = x + v * Q (mod t_j)` for some unknown
    /// `v` in `[0, L - 1]`.
    ///
    /// `out` must be over the output context and `x` over the input context.
    pub fn convert_approx<S: Storage, T: Storage>(
        &self,
        scratch: &mut Scratch<'_>,
        out: &mut Poly<Coeff, S>,
        x: &Poly<Coeff, T>,
    ) -> RnsResult<()> {
        self.expect_input(x.context())?;
        self.expect_output(out.context())?;
        let mut scope = scratch.scope();
        let y = scope.alloc(x.dims().words())?;
        self.load_scaled(x, y);

        let degree = x.degree();
        for (j, t_j) in self.output.moduli().iter().enumerate() {
            self.accumulate(y, degree, j, t_j, out.residues_mut(j))?;
        }
        Ok(())
    }

    /// `y_i = x_i * (Q / q_i)^-1 mod q_i`, row by row.
    pub(super) fn load_scaled<T: Storage>(&self, x: &Poly<Coeff, T>, y: &mut [u64]) {
        let degree = x.degree();
        for (i, (row, inv)) in y.chunks_exact_mut(degree).zip(&self.inv_punctured).enumerate() {
            for (dst, &x_i) in row.iter_mut().zip(x.residues(i)) {
                *dst = inv.multiply_reduce(x_i);
            }
        }
    }

    /// Multiplies row `i` of `y` in place by `scalars[i]`.
    pub(super) fn scale_rows(
        y: &mut [u64],
        degree: usize,
        scalars: &[ShoupModulus],
    ) {
        for (row, scalar) in y.chunks_exact_mut(degree).zip(scalars) {
            for value in row {
                *value = scalar.multiply_reduce(*value);
            }
        }
    }

    /// `out[c] = sum_i y_i[c] * punctured[i][j] mod t_j`, reduced once per
    /// coefficient.
    pub(super) fn accumulate(
        &self,
        y: &[u64],
        degree: usize,
        j: usize,
        t_j: &Modulus,
        out: &mut [u64],
    ) -> RnsResult<()> {
        if !self.accumulator_fits {
            return Err(RnsError::AccumulatorOverflow);
        }
        for (c, dst) in out.iter_mut().enumerate() {
            let sum = y
                .chunks_exact(degree)
                .enumerate()
                .fold(0u128, |acc, (i, row)| {
                    acc + row[c] as u128 * self.punctured_product(i, j) as u128
                });
            *dst = t_j.reduce_u128(sum);
        }
        Ok(())
    }
}
