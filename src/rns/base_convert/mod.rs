//! CRT base conversion between two RNS bases of the same ring degree.
//!
//! A [`BaseConverter`] is built once per `(input, output)` pair on the
//! variable-time side and is read-only afterwards. The conversions themselves
//! live in the submodules and only use [`crate::rns::scalar`] arithmetic.

mod approx;
mod divide_round;
mod exact;
mod mod_drop;

use log::debug;

use super::{
    context::RingContext,
    errors::{RnsError, RnsResult},
    scalar::ShoupModulus,
    setup::{inv_mod, product, wide_rem},
};

pub use approx::approx_scratch_words;
pub use divide_round::divide_and_round_scratch_words;
pub use exact::exact_scratch_words;
pub use mod_drop::mod_drop_scratch_words;

/// Auxiliary modulus for exact divide-and-round: the Mersenne prime
/// `2^61 - 1`. It must differ from every input modulus.
pub const GAMMA: u64 = (1 << 61) - 1;

/// Precomputed CRT tables for one `(input, output)` basis pair.
///
/// With input moduli `q_0..q_{L-1}`, output moduli `t_0..t_{M-1}` and
/// `Q = prod q_k`:
/// - `punctured[i * M + j] = (Q / q_i) mod t_j`
/// - `inv_punctured[i] = (Q / q_i)^-1 mod q_i`
#[derive(Debug, Clone)]
pub struct BaseConverter {
    input: RingContext,
    output: RingContext,
    punctured: Vec<u64>,
    inv_punctured: Vec<ShoupModulus>,
    /// `1 / q_i` for the floating-point carry estimate.
    inv_moduli_f64: Vec<f64>,
    /// Whether `sum_i (q_i - 1) * punctured[i][j]` fits in a `u128` for
    /// every output modulus.
    accumulator_fits: bool,
    q_mod_t0: u64,
    gamma_mod_t0: u64,
    inv_gamma_mod_t0: Option<ShoupModulus>,
    neg_inv_q_mod_t0: Option<ShoupModulus>,
    neg_inv_q_mod_gamma: Option<ShoupModulus>,
    /// `(t_0 * GAMMA) mod q_i`.
    t0_gamma_mod_q: Vec<ShoupModulus>,
    inv_q_last_mod_t0: Option<ShoupModulus>,
    /// `q_last mod q_i` for `i < L - 1`.
    q_last_mod_q: Vec<ShoupModulus>,
    /// `q_last^-1 mod q_i` for `i < L - 1`.
    inv_q_last_mod_q: Vec<ShoupModulus>,
}

impl BaseConverter {
    pub fn new(input: &RingContext, output: &RingContext) -> RnsResult<Self> {
        if input.degree() != output.degree() {
            return Err(RnsError::ConverterDegreeMismatch {
                input: input.degree(),
                output: output.degree(),
            });
        }
        let q: Vec<u64> = input.modulus_values().collect();
        let t: Vec<u64> = output.modulus_values().collect();
        if let Some(&modulus) = q.iter().find(|&&modulus| modulus == GAMMA) {
            return Err(RnsError::GammaCollision { modulus });
        }

        let mut punctured = Vec::with_capacity(q.len() * t.len());
        let mut inv_punctured = Vec::with_capacity(q.len());
        for (index, &q_i) in q.iter().enumerate() {
            let q_hat = product(&q, Some(index));
            for &t_j in &t {
                punctured.push(wide_rem(&q_hat, t_j)?);
            }
            let q_hat_mod_q_i = wide_rem(&q_hat, q_i)?;
            let inverse = inv_mod(q_hat_mod_q_i, q_i).ok_or(RnsError::NotInvertible {
                value: q_hat_mod_q_i,
                modulus: q_i,
            })?;
            inv_punctured.push(ShoupModulus::new(inverse, q_i)?);
        }
        let inv_moduli_f64 = q.iter().map(|&q_i| 1.0 / q_i as f64).collect();
        let accumulator_fits = (0..t.len()).all(|j| {
            q.iter()
                .enumerate()
                .try_fold(0u128, |acc, (i, &q_i)| {
                    acc.checked_add((q_i - 1) as u128 * punctured[i * t.len() + j] as u128)
                })
                .is_some()
        });

        let t0 = t[0];
        let big_q = product(&q, None);
        let q_mod_t0 = wide_rem(&big_q, t0)?;
        let gamma_mod_t0 = GAMMA % t0;
        let inv_gamma_mod_t0 = inv_shoup(gamma_mod_t0, t0)?;
        let neg_inv_q_mod_t0 = neg_inv_shoup(q_mod_t0, t0)?;
        let neg_inv_q_mod_gamma = match t.len() {
            1 => None,
            _ => neg_inv_shoup(wide_rem(&big_q, GAMMA)?, GAMMA)?,
        };

        let t0_gamma = t0 as u128 * GAMMA as u128;
        let t0_gamma_mod_q = q
            .iter()
            .map(|&q_i| ShoupModulus::new((t0_gamma % q_i as u128) as u64, q_i))
            .collect::<RnsResult<_>>()?;

        let (q_last, rest) = q.split_last().ok_or(RnsError::InvalidModulusCount {
            nmoduli: 0,
            max: super::NMODULI_MAX,
        })?;
        let inv_q_last_mod_t0 = inv_shoup(q_last % t0, t0)?;
        let mut q_last_mod_q = Vec::with_capacity(rest.len());
        let mut inv_q_last_mod_q = Vec::with_capacity(rest.len());
        for &q_i in rest {
            q_last_mod_q.push(ShoupModulus::reduced(*q_last, q_i)?);
            let inverse = inv_mod(*q_last, q_i).ok_or(RnsError::NotInvertible {
                value: *q_last,
                modulus: q_i,
            })?;
            inv_q_last_mod_q.push(ShoupModulus::new(inverse, q_i)?);
        }

        debug!(
            "built base converter: degree {}, {} -> {} moduli",
            input.degree(),
            q.len(),
            t.len()
        );
        Ok(Self {
            input: input.clone(),
            output: output.clone(),
            punctured,
            inv_punctured,
            inv_moduli_f64,
            accumulator_fits,
            q_mod_t0,
            gamma_mod_t0,
            inv_gamma_mod_t0,
            neg_inv_q_mod_t0,
            neg_inv_q_mod_gamma,
            t0_gamma_mod_q,
            inv_q_last_mod_t0,
            q_last_mod_q,
            inv_q_last_mod_q,
        })
    }

    pub fn input_context(&self) -> &RingContext {
        &self.input
    }

    pub fn output_context(&self) -> &RingContext {
        &self.output
    }

    /// `(Q / q_i) mod t_j`.
    pub fn punctured_product(&self, input_index: usize, output_index: usize) -> u64 {
        self.punctured[input_index * self.output.nmoduli() + output_index]
    }

    /// `(Q / q_i)^-1 mod q_i`.
    pub fn inv_punctured_product(&self, input_index: usize) -> u64 {
        self.inv_punctured[input_index].multiplicand()
    }

    pub fn q_mod_t0(&self) -> u64 {
        self.q_mod_t0
    }

    pub fn gamma_mod_t0(&self) -> u64 {
        self.gamma_mod_t0
    }

    fn expect_input(&self, ctx: &RingContext) -> RnsResult<()> {
        if ctx != &self.input {
            return Err(RnsError::ContextMismatch { operand: "input" });
        }
        Ok(())
    }

    fn expect_output(&self, ctx: &RingContext) -> RnsResult<()> {
        if ctx != &self.output {
            return Err(RnsError::ContextMismatch { operand: "output" });
        }
        Ok(())
    }

    /// `scale * q_last^-1 mod t_0`, the factor a BGV plaintext picks up when
    /// `q_last` is dropped.
    pub fn scale_inv_q_last_mod_t(&self, scale: u64) -> RnsResult<u64> {
        let inv_q_last = required(&self.inv_q_last_mod_t0, "inv_q_last_mod_t0")?;
        Ok(inv_q_last.multiply_reduce(scale))
    }
}

fn required<'a>(table: &'a Option<ShoupModulus>, name: &'static str) -> RnsResult<&'a ShoupModulus> {
    table
        .as_ref()
        .ok_or(RnsError::MissingConverterTable { table: name })
}

fn inv_shoup(value: u64, modulus: u64) -> RnsResult<Option<ShoupModulus>> {
    inv_mod(value, modulus)
        .map(|inverse| ShoupModulus::new(inverse, modulus))
        .transpose()
}

fn neg_inv_shoup(value: u64, modulus: u64) -> RnsResult<Option<ShoupModulus>> {
    inv_mod(value, modulus)
        .map(|inverse| ShoupModulus::new((modulus - inverse) % modulus, modulus))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rns::{context::Dims, errors::ErrorKind, setup::mul_mod};

    #[test]
    fn punctured_tables_match_direct_products() {
        let input = RingContext::new(4, &[17, 29, 41]).unwrap();
        let output = RingContext::new(4, &[13, 37]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        assert_eq!(converter.punctured_product(0, 0), (29 * 41) % 13);
        assert_eq!(converter.punctured_product(1, 1), (17 * 41) % 37);
        assert_eq!(converter.punctured_product(2, 0), (17 * 29) % 13);
        for (index, q_i) in [17u64, 29, 41].into_iter().enumerate() {
            let q_hat = 17 * 29 * 41 / q_i;
            assert_eq!(mul_mod(converter.inv_punctured_product(index), q_hat, q_i), 1);
        }
        assert_eq!(converter.q_mod_t0(), (17 * 29 * 41) % 13);
        assert_eq!(converter.gamma_mod_t0(), GAMMA % 13);
    }

    #[test]
    fn construction_rejects_bad_pairs() {
        let input = RingContext::new(4, &[17, GAMMA]).unwrap();
        let output = RingContext::new(4, &[13]).unwrap();
        let err = BaseConverter::new(&input, &output).unwrap_err();
        assert_eq!(err, RnsError::GammaCollision { modulus: GAMMA });
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let input = RingContext::new(8, &[17]).unwrap();
        assert!(matches!(
            BaseConverter::new(&input, &output),
            Err(RnsError::ConverterDegreeMismatch {
                input: 8,
                output: 4
            })
        ));

        let input = RingContext::new(4, &[6, 9]).unwrap();
        assert!(matches!(
            BaseConverter::new(&input, &output),
            Err(RnsError::NotInvertible { .. })
        ));
    }

    #[test]
    fn optional_tables_are_absent_when_not_invertible() {
        // Q = 17 * 29 is divisible by t_0 = 17.
        let input = RingContext::new(4, &[17, 29]).unwrap();
        let output = RingContext::new(4, &[17]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        assert!(converter.neg_inv_q_mod_t0.is_none());
        assert!(converter.neg_inv_q_mod_gamma.is_none());
        assert_eq!(converter.scale_inv_q_last_mod_t(3).unwrap(), (3 * 10) % 17);
    }

    #[test]
    fn q_last_tables_cover_all_but_last_modulus() {
        let input = RingContext::new(4, &[17, 29, 41]).unwrap();
        let output = RingContext::new(4, &[7]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        assert_eq!(converter.q_last_mod_q.len(), 2);
        assert_eq!(converter.q_last_mod_q[0].multiplicand(), 41 % 17);
        assert_eq!(
            mul_mod(converter.inv_q_last_mod_q[1].multiplicand(), 41, 29),
            1
        );
    }

    #[test]
    fn single_modulus_input_has_no_drop_tables() {
        let input = RingContext::new(4, &[17]).unwrap();
        let output = RingContext::new(4, &[7]).unwrap();
        let converter = BaseConverter::new(&input, &output).unwrap();
        assert!(converter.q_last_mod_q.is_empty());
        assert_eq!(converter.input_context().dims(), Dims::new(4, 1));
    }
}
