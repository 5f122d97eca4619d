use super::BaseConverter;
use crate::rns::{
    context::Dims,
    errors::{RnsError, RnsResult},
    poly::{Coeff, Poly, Storage},
    workspace::Scratch,
};

/// Scratch words needed by [`BaseConverter::convert_exact`].
pub fn exact_scratch_words(input: Dims) -> usize {
    input.words()
}

impl BaseConverter {
    /// Exact conversion to a single modulus `t`.
    ///
    /// Writes `[x]_t` where `x` is taken in `(-Q/2, Q/2]`, stored in
    /// `[0, t)`. The CRT carry `v` is recovered as
    /// `floor(sum_i y_i / q_i + 0.5)` in double precision. That estimate is
    /// exact unless `x` lies within roughly `L * 2^-53 * Q` of `Q/2`, which
    /// valid decryption inputs never do.
    pub fn convert_exact<S: Storage, T: Storage>(
        &self,
        scratch: &mut Scratch<'_>,
        out: &mut Poly<Coeff, S>,
        x: &Poly<Coeff, T>,
    ) -> RnsResult<()> {
        if self.output.nmoduli() != 1 {
            return Err(RnsError::ModulusCountMismatch {
                expected: 1,
                actual: self.output.nmoduli(),
            });
        }
        self.expect_input(x.context())?;
        self.expect_output(out.context())?;
        if !self.accumulator_fits {
            return Err(RnsError::AccumulatorOverflow);
        }
        let mut scope = scratch.scope();
        let y = scope.alloc(x.dims().words())?;
        self.load_scaled(x, y);

        let degree = x.degree();
        let t = *self.output.modulus(0);
        let q_mod_t = self.q_mod_t0;
        for (c, dst) in out.residues_mut(0).iter_mut().enumerate() {
            let mut sum = 0u128;
            let mut carry = 0.0f64;
            for (i, row) in y.chunks_exact(degree).enumerate() {
                sum += row[c] as u128 * self.punctured_product(i, 0) as u128;
                carry += row[c] as f64 * self.inv_moduli_f64[i];
            }
            let carry = (carry + 0.5) as u64;
            *dst = t.sub(t.reduce_u128(sum), t.mul(t.reduce(carry), q_mod_t));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::rns::{
        base_convert::{BaseConverter, exact_scratch_words},
        context::RingContext,
        errors::RnsError,
        poly::CoeffPoly,
        workspace::Workspace,
    };

    fn convert(input_moduli: &[u64], t: u64, degree: usize, residues: Vec<u64>) -> Vec<u64> {
        let input = RingContext::new(degree, input_moduli).unwrap();
        let output = RingContext::new(degree, &[t]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        let x = CoeffPoly::from_residues(&input, residues).unwrap();
        let mut out = CoeffPoly::zero(&output);
        let mut workspace = Workspace::with_capacity(exact_scratch_words(input.dims()));
        converter
            .convert_exact(&mut workspace.scratch(), &mut out, &x)
            .unwrap();
        out.data().to_vec()
    }

    #[test]
    fn small_basis_uses_centred_representative() {
        // First coefficient is 422 mod 437, i.e. -15, and -15 mod 17 = 2.
        let data = vec![4, 11, 18, 6, 8, 4, 20, 9];
        assert_eq!(convert(&[19, 23], 17, 4, data), vec![2, 3, 11, 16]);
    }

    #[test]
    fn forty_bit_basis() {
        let data = vec![
            254_214_216_418,
            246_569_320_229,
            260_953_636_675,
            453_771_295_098,
            127_369_132_888,
            441_500_051_754,
            123_180_445_633,
            364_769_066_626,
            77_369_979_215,
            450_885_200_634,
            476_413_172_159,
            431_365_495_836,
            86_947_970_415,
            377_088_307_954,
            261_683_354_562,
            279_442_548_348,
        ];
        assert_eq!(
            convert(&[549_755_813_927, 549_755_813_933], 549_755_813_911, 8, data),
            vec![
                359_294_972_960,
                434_734_724_305,
                419_402_627_383,
                513_520_093_130,
                51_906_961_571,
                246_760_826_064,
                120_343_231_155,
                409_054_510_613,
            ]
        );
    }

    #[test]
    fn requires_single_output_modulus() {
        let input = RingContext::new(4, &[17, 29]).unwrap();
        let output = RingContext::new(4, &[13, 37]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        let x = CoeffPoly::zero(&input);
        let mut out = CoeffPoly::zero(&output);
        let mut workspace = Workspace::with_capacity(8);
        assert_eq!(
            converter.convert_exact(&mut workspace.scratch(), &mut out, &x),
            Err(RnsError::ModulusCountMismatch {
                expected: 1,
                actual: 2
            })
        );
    }
}
