//! A minimal BFV/BGV layer on top of [`crate::rns`].
//!
//! It covers symmetric encryption, decryption and modulus switching, which
//! is enough to drive every base conversion end to end. There is no public
//! key, relinearisation or homomorphic multiplication.

mod context;
mod errors;
mod keys;
mod operations;
mod params;
mod types;

pub use context::HeContext;
pub use errors::{HeError, HeResult};
pub use keys::SecretKey;
pub use params::{HeParams, HeParamsBuilder, Scheme};
pub use types::{Ciphertext, Plaintext};
