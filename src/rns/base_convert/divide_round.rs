use super::{BaseConverter, GAMMA, required};
use crate::rns::{
    context::Dims,
    errors::{RnsError, RnsResult},
    poly::{Coeff, Poly, Storage},
    scalar::{gt_mask, select},
    workspace::Scratch,
};

/// Scratch words needed by [`BaseConverter::divide_and_round`]: the scaled
/// input plus one row each for `t` and `GAMMA`.
pub fn divide_and_round_scratch_words(input: Dims) -> usize {
    input.words() + 2 * input.degree
}

impl BaseConverter {
    /// `out = round(t * x / Q) mod t`, coefficient-wise.
    ///
    /// The converter's output basis must be `[t, GAMMA]` and `out` must be
    /// over the single modulus `t`. The auxiliary `GAMMA` residue removes the
    /// carry left by the fast conversion, so the result is exact whenever
    /// `t * x / Q` is not within `L / GAMMA` of a half-integer.
    pub fn divide_and_round<S: Storage, T: Storage>(
        &self,
        scratch: &mut Scratch<'_>,
        out: &mut Poly<Coeff, S>,
        x: &Poly<Coeff, T>,
    ) -> RnsResult<()> {
        let output = &self.output;
        if output.nmoduli() != 2
            || output.modulus(1).value() != GAMMA
            || output.modulus(0).value() == GAMMA
        {
            return Err(RnsError::UnsupportedOutputBasis);
        }
        let t = *output.modulus(0);
        let out_ctx = out.context();
        if out_ctx.nmoduli() != 1
            || out_ctx.degree() != output.degree()
            || out_ctx.modulus(0).value() != t.value()
        {
            return Err(RnsError::ContextMismatch { operand: "output" });
        }
        self.expect_input(x.context())?;
        let neg_inv_q_mod_t = required(&self.neg_inv_q_mod_t0, "neg_inv_q_mod_t0")?;
        let neg_inv_q_mod_gamma = required(&self.neg_inv_q_mod_gamma, "neg_inv_q_mod_gamma")?;
        let inv_gamma_mod_t = required(&self.inv_gamma_mod_t0, "inv_gamma_mod_t0")?;
        let gamma = *output.modulus(1);

        let degree = x.degree();
        let mut scope = scratch.scope();
        let y = scope.alloc(x.dims().words())?;
        let t_row = scope.alloc(degree)?;
        let gamma_row = scope.alloc(degree)?;

        // y_i = x_i * (t * GAMMA) * (Q / q_i)^-1 mod q_i
        self.load_scaled(x, y);
        Self::scale_rows(y, degree, &self.t0_gamma_mod_q);
        self.accumulate(y, degree, 0, &t, t_row)?;
        self.accumulate(y, degree, 1, &gamma, gamma_row)?;

        let half_gamma = GAMMA / 2;
        for ((dst, &r_t), &r_gamma) in out.residues_mut(0).iter_mut().zip(t_row.iter()).zip(gamma_row.iter()) {
            let r_t = neg_inv_q_mod_t.multiply_reduce(r_t);
            let r_gamma = neg_inv_q_mod_gamma.multiply_reduce(r_gamma);
            // Centre the GAMMA residue into [-(GAMMA - 1) / 2, (GAMMA - 1) / 2] and
            // carry it over to t. GAMMA is odd, so that range has no tie to break.
            let lifted = t.reduce(r_gamma);
            let centred = select(
                gt_mask(r_gamma, half_gamma),
                t.sub(lifted, self.gamma_mod_t0),
                lifted,
            );
            *dst = inv_gamma_mod_t.multiply_reduce(t.sub(r_t, centred));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::rns::{
        base_convert::{BaseConverter, GAMMA, divide_and_round_scratch_words},
        context::RingContext,
        errors::{ErrorKind, RnsError},
        poly::CoeffPoly,
        setup::pow_mod,
        workspace::Workspace,
    };

    fn divide_and_round(moduli: &[u64], t: u64, degree: usize, residues: Vec<u64>) -> Vec<u64> {
        let input = RingContext::new(degree, moduli).unwrap();
        let output = RingContext::new(degree, &[t, GAMMA]).unwrap();
        let plain = RingContext::new(degree, &[t]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        let x = CoeffPoly::from_residues(&input, residues).unwrap();
        let mut out = CoeffPoly::zero(&plain);
        let mut workspace =
            Workspace::with_capacity(divide_and_round_scratch_words(input.dims()));
        converter
            .divide_and_round(&mut workspace.scratch(), &mut out, &x)
            .unwrap();
        out.data().to_vec()
    }

    #[test]
    fn rounds_small_values() {
        // 29 and 30 modulo 35: round(29 * 3 / 35) = 2, round(30 * 3 / 35) = 3 = 0 mod 3.
        assert_eq!(divide_and_round(&[5, 7], 3, 2, vec![4, 0, 1, 2]), vec![2, 0]);
        assert_eq!(divide_and_round(&[17, 29], 5, 2, vec![0, 15, 2, 27]), vec![4, 0]);
    }

    #[test]
    fn rounds_on_either_side_of_a_half() {
        // 2 * x / 143 for x = 35, 36, 107, 108 is 0.49, 0.503, 1.496, 1.51.
        let residues = vec![2, 3, 8, 9, 9, 10, 3, 4];
        assert_eq!(divide_and_round(&[11, 13], 2, 4, residues), vec![0, 1, 1, 0]);
    }

    #[test]
    fn rounds_values_above_two_to_the_128() {
        let moduli = [(1u64 << 60) - 93, (1 << 60) - 173, (1 << 30) - 35];
        let t = 549_755_860_993;
        let degree = 16;
        // x_i = i * 2^150
        let mut residues = Vec::with_capacity(moduli.len() * degree);
        for &q in &moduli {
            let base = pow_mod(2, 150, q);
            residues.extend((0..degree as u64).map(|i| (i * base) % q));
        }
        let expected: Vec<u64> = (0..degree as u64).map(|i| 17_920 * i).collect();
        assert_eq!(divide_and_round(&moduli, t, degree, residues), expected);
    }

    #[test]
    fn rejects_unsupported_output_basis() {
        let input = RingContext::new(2, &[5, 7]).unwrap();
        let plain = RingContext::new(2, &[3]).unwrap();
        let x = CoeffPoly::zero(&input);
        let mut out = CoeffPoly::zero(&plain);
        let mut workspace = Workspace::with_capacity(8);

        for output_moduli in [&[3u64][..], &[3, 11], &[GAMMA, 3]] {
            let output = RingContext::new(2, output_moduli).unwrap();
            let converter = BaseConverter::new(&input, &output).unwrap();
            let err = converter
                .divide_and_round(&mut workspace.scratch(), &mut out, &x)
                .unwrap_err();
            assert_eq!(err, RnsError::UnsupportedOutputBasis);
            assert_eq!(err.kind(), ErrorKind::Parameter);
        }
    }

    #[test]
    fn rejects_result_over_wrong_modulus() {
        let input = RingContext::new(2, &[5, 7]).unwrap();
        let output = RingContext::new(2, &[3, GAMMA]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        let x = CoeffPoly::zero(&input);
        let mut workspace = Workspace::with_capacity(8);
        for result_moduli in [&[11u64][..], &[3, 11]] {
            let mut out = CoeffPoly::zero(&RingContext::new(2, result_moduli).unwrap());
            assert_eq!(
                converter.divide_and_round(&mut workspace.scratch(), &mut out, &x),
                Err(RnsError::ContextMismatch { operand: "output" })
            );
        }
    }
}
