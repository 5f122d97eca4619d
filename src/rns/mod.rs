//! Residue Number System arithmetic for BFV/BGV-style rings.
//!
//! An element of `Z_Q[X] / (X^N + 1)` with `Q = q_0 * ... * q_{L-1}` is kept
//! as `L` rows of `N` word-sized residues. The submodules split along the
//! setup/consumption line: [`setup`] builds public tables in variable time,
//! while [`scalar`], [`poly`] and [`base_convert`] run on secret-dependent
//! data without branching on it.

pub mod base_convert;
pub mod context;
pub mod errors;
pub mod ntt;
pub mod poly;
pub mod scalar;
pub mod setup;
pub mod workspace;

pub use base_convert::{
    BaseConverter, GAMMA, approx_scratch_words, divide_and_round_scratch_words,
    exact_scratch_words, mod_drop_scratch_words,
};
pub use context::{ContextChain, DEGREE_MAX, Dims, NMODULI_MAX, RingContext};
pub use errors::{ErrorKind, RnsError, RnsResult};
pub use ntt::NttTable;
pub use poly::{Coeff, CoeffPoly, Eval, EvalPoly, Form, Poly, Storage};
pub use scalar::{Modulus, ShoupModulus};
pub use setup::MODULUS_BITS_MAX;
pub use workspace::{Scratch, Workspace};
