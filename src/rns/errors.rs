use thiserror::Error;

/// Coarse classification every [`RnsError`] maps onto.
///
/// Callers are expected to branch on the kind only; the variant payloads are
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad shape of public parameters, detected while building tables.
    Configuration,
    /// An operand does not fit the context or converter it was passed to.
    Parameter,
    /// An arithmetic invariant that valid parameters guarantee was violated.
    Internal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RnsError {
    #[error("ring degree must be a power of two in [1, {max}], got {degree}")]
    InvalidDegree { degree: usize, max: usize },
    #[error("modulus count must be in [1, {max}], got {nmoduli}")]
    InvalidModulusCount { nmoduli: usize, max: usize },
    #[error("modulus {modulus} is outside [2, 2^63)")]
    InvalidModulus { modulus: u64 },
    #[error("modulus {modulus} appears more than once in the basis")]
    DuplicateModulus { modulus: u64 },
    #[error("modulus {modulus} is not NTT-friendly for degree {degree}")]
    NonNttFriendlyModulus { modulus: u64, degree: usize },
    #[error("input modulus {modulus} collides with GAMMA")]
    GammaCollision { modulus: u64 },
    #[error("{value} has no inverse modulo {modulus}")]
    NotInvertible { value: u64, modulus: u64 },
    #[error("converter degree mismatch: input {input}, output {output}")]
    ConverterDegreeMismatch { input: usize, output: usize },

    #[error("multiplicand {multiplicand} is not reduced modulo {modulus}")]
    InvalidMultiplicand { multiplicand: u64, modulus: u64 },
    #[error("{operand} context does not match the expected context")]
    ContextMismatch { operand: &'static str },
    #[error("expected {expected} moduli, got {actual}")]
    ModulusCountMismatch { expected: usize, actual: usize },
    #[error("degree mismatch: expected {expected}, got {actual}")]
    DegreeMismatch { expected: usize, actual: usize },
    #[error("storage holds {actual} words, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("residue {residue} is not reduced modulo {modulus}")]
    NonReducedResidue { residue: u64, modulus: u64 },
    #[error("context with {nmoduli} moduli has no next context")]
    NoNextContext { nmoduli: usize },
    #[error("converter output basis must be [t, GAMMA] with t != GAMMA")]
    UnsupportedOutputBasis,
    #[error("converter table `{table}` is undefined for this basis pair")]
    MissingConverterTable { table: &'static str },
    #[error("workspace exhausted: requested {requested} words, {available} available")]
    WorkspaceExhausted { requested: usize, available: usize },

    #[error("base conversion accumulator overflowed")]
    AccumulatorOverflow,
}

impl RnsError {
    pub fn kind(&self) -> ErrorKind {
        use RnsError::*;
        match self {
            InvalidDegree { .. }
            | InvalidModulusCount { .. }
            | InvalidModulus { .. }
            | DuplicateModulus { .. }
            | NonNttFriendlyModulus { .. }
            | GammaCollision { .. }
            | NotInvertible { .. }
            | ConverterDegreeMismatch { .. } => ErrorKind::Configuration,
            InvalidMultiplicand { .. }
            | ContextMismatch { .. }
            | ModulusCountMismatch { .. }
            | DegreeMismatch { .. }
            | LengthMismatch { .. }
            | NonReducedResidue { .. }
            | NoNextContext { .. }
            | UnsupportedOutputBasis
            | MissingConverterTable { .. }
            | WorkspaceExhausted { .. } => ErrorKind::Parameter,
            AccumulatorOverflow => ErrorKind::Internal,
        }
    }
}

pub type RnsResult<T> = Result<T, RnsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            RnsError::GammaCollision { modulus: 7 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            RnsError::ContextMismatch { operand: "input" }.kind(),
            ErrorKind::Parameter
        );
        assert_eq!(RnsError::AccumulatorOverflow.kind(), ErrorKind::Internal);
    }
}
