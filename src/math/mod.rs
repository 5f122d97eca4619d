pub mod primes;
pub mod sampling;

pub use primes::{generate_primes, is_ntt_friendly_prime, is_prime, ntt_primes_below};
pub use sampling::{gaussian_coefficients, ternary_coefficients, uniform_residues};
