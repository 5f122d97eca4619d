//! RNS base conversion for BFV/BGV-style lattice schemes.
//!
//! [`rns`] holds the engine: word-sized moduli with Barrett and Shoup
//! reduction, ring contexts and modulus chains, polynomials over an RNS basis
//! and the [`BaseConverter`] with its approximate, exact, divide-and-round and
//! modulus-drop conversions. [`he`] is a small symmetric BFV/BGV layer that
//! drives the engine through decryption and modulus switching.

pub mod he;
pub mod math;
pub mod rns;

pub use he::{
    Ciphertext, HeContext, HeError, HeParams, HeParamsBuilder, HeResult, Plaintext, Scheme,
    SecretKey,
};
pub use rns::{
    BaseConverter, Coeff, CoeffPoly, ContextChain, ErrorKind, Eval, EvalPoly, GAMMA, Poly,
    RingContext, RnsError, RnsResult, Scratch, Workspace,
};
