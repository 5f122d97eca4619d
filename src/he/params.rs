use super::errors::{HeError, HeResult};
use crate::{
    math::generate_primes,
    rns::{GAMMA, MODULUS_BITS_MAX, setup::inv_mod},
};

const DEFAULT_ERROR_STD_DEV: f64 = 3.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Message in the high bits: `c0 + c1 * s = floor(Q / t) * m + e`.
    Bfv,
    /// Message in the low bits: `c0 + c1 * s = m + t * e`.
    Bgv,
}

/// Public parameters of a BFV or BGV instance.
#[derive(Debug, Clone, PartialEq)]
pub struct HeParams {
    pub scheme: Scheme,
    pub degree: usize,
    pub plaintext_modulus: u64,
    /// Coefficient moduli `q_0, ..., q_{L-1}`; modulus switching drops them
    /// from the end.
    pub moduli: Vec<u64>,
    pub error_std_dev: f64,
    pub hamming_weight: usize,
}

impl HeParams {
    pub fn builder(scheme: Scheme, degree: usize) -> HeParamsBuilder {
        HeParamsBuilder::new(scheme, degree)
    }

    /// Picks one NTT-friendly prime per entry of `bit_sizes`, distinct and
    /// largest first within each bit size, and default noise parameters.
    pub fn generate(
        scheme: Scheme,
        degree: usize,
        plaintext_modulus: u64,
        bit_sizes: &[u32],
    ) -> HeResult<Self> {
        let mut moduli = Vec::with_capacity(bit_sizes.len());
        for (index, &bits) in bit_sizes.iter().enumerate() {
            let count = bit_sizes[..=index].iter().filter(|&&b| b == bits).count();
            let primes = generate_primes(bits, count, degree as u64).ok_or(
                HeError::PrimeGeneration {
                    bits,
                    count,
                    degree,
                },
            )?;
            moduli.extend(primes.last());
        }
        Self::builder(scheme, degree)
            .plaintext_modulus(plaintext_modulus)
            .moduli(moduli)
            .build()
    }

    /// Checks everything that does not need the ring tables. Degree and
    /// modulus shape are validated when the context chain is built.
    pub fn validate(&self) -> HeResult<()> {
        if !(self.error_std_dev.is_finite() && self.error_std_dev > 0.0) {
            return Err(HeError::InvalidStdDev {
                std_dev: self.error_std_dev,
            });
        }
        if self.hamming_weight > self.degree {
            return Err(HeError::InvalidHammingWeight {
                weight: self.hamming_weight,
                degree: self.degree,
            });
        }
        let t = self.plaintext_modulus;
        let invalid = HeError::InvalidPlaintextModulus { modulus: t };
        if t < 2 || t >> MODULUS_BITS_MAX != 0 {
            return Err(invalid);
        }
        if self.moduli.iter().any(|&q| q >= 2 && inv_mod(t % q, q).is_none()) {
            return Err(invalid);
        }
        if self.scheme == Scheme::Bfv && inv_mod(GAMMA % t, t).is_none() {
            return Err(invalid);
        }
        Ok(())
    }
}

pub struct HeParamsBuilder {
    scheme: Scheme,
    degree: usize,
    plaintext_modulus: Option<u64>,
    moduli: Option<Vec<u64>>,
    error_std_dev: Option<f64>,
    hamming_weight: Option<usize>,
}

impl HeParamsBuilder {
    pub fn new(scheme: Scheme, degree: usize) -> Self {
        Self {
            scheme,
            degree,
            plaintext_modulus: None,
            moduli: None,
            error_std_dev: None,
            hamming_weight: None,
        }
    }

    pub fn plaintext_modulus(mut self, modulus: u64) -> Self {
        self.plaintext_modulus = Some(modulus);
        self
    }

    pub fn moduli(mut self, moduli: Vec<u64>) -> Self {
        self.moduli = Some(moduli);
        self
    }

    pub fn error_std_dev(mut self, std_dev: f64) -> Self {
        self.error_std_dev = Some(std_dev);
        self
    }

    pub fn hamming_weight(mut self, weight: usize) -> Self {
        self.hamming_weight = Some(weight);
        self
    }

    pub fn build(self) -> HeResult<HeParams> {
        let params = HeParams {
            scheme: self.scheme,
            degree: self.degree,
            plaintext_modulus: self.plaintext_modulus.ok_or(HeError::MissingParameter {
                name: "plaintext_modulus",
            })?,
            moduli: self
                .moduli
                .ok_or(HeError::MissingParameter { name: "moduli" })?,
            error_std_dev: self.error_std_dev.unwrap_or(DEFAULT_ERROR_STD_DEV),
            hamming_weight: self.hamming_weight.unwrap_or(self.degree / 2),
        };
        params.validate()?;
        Ok(params)
    }
}
