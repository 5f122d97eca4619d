use thiserror::Error;

use crate::rns::{ErrorKind, RnsError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeError {
    #[error("rns: {source}")]
    Rns {
        #[from]
        source: RnsError,
    },

    #[error("missing parameter: {name}")]
    MissingParameter { name: &'static str },
    #[error(
        "plaintext modulus {modulus} must be in [2, 2^63) and coprime to every \
         coefficient modulus"
    )]
    InvalidPlaintextModulus { modulus: u64 },
    #[error("error standard deviation must be finite and positive, got {std_dev}")]
    InvalidStdDev { std_dev: f64 },
    #[error("Hamming weight {weight} exceeds ring degree {degree}")]
    InvalidHammingWeight { weight: usize, degree: usize },
    #[error("not enough {bits}-bit NTT-friendly primes for degree {degree}: need {count}")]
    PrimeGeneration { bits: u32, count: usize, degree: usize },

    #[error("plaintext has {actual} coefficients, ring degree is {degree}")]
    PlaintextLength { degree: usize, actual: usize },
    #[error("plaintext coefficient {value} is not reduced modulo {modulus}")]
    PlaintextOutOfRange { value: u64, modulus: u64 },
    #[error("level {level} is outside [1, {max}]")]
    InvalidLevel { level: usize, max: usize },
    #[error("ciphertext is already at the lowest level")]
    LowestLevel,
    #[error("correction factor {factor} has no inverse modulo {modulus}")]
    NonInvertibleCorrectionFactor { factor: u64, modulus: u64 },
}

impl HeError {
    /// Maps onto the same taxonomy as [`RnsError::kind`].
    pub fn kind(&self) -> ErrorKind {
        use HeError::*;
        match self {
            Rns { source } => source.kind(),
            MissingParameter { .. }
            | InvalidPlaintextModulus { .. }
            | InvalidStdDev { .. }
            | InvalidHammingWeight { .. }
            | PrimeGeneration { .. } => ErrorKind::Configuration,
            PlaintextLength { .. }
            | PlaintextOutOfRange { .. }
            | InvalidLevel { .. }
            | LowestLevel
            | NonInvertibleCorrectionFactor { .. } => ErrorKind::Parameter,
        }
    }
}

pub type HeResult<T> = Result<T, HeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err: HeError = RnsError::AccumulatorOverflow.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        let err: HeError = RnsError::WorkspaceExhausted {
            requested: 4,
            available: 0,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Parameter);
        assert_eq!(
            HeError::InvalidStdDev { std_dev: 0.0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(HeError::LowestLevel.kind(), ErrorKind::Parameter);
    }
}
