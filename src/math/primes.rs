//! Prime utilities for choosing NTT-friendly RNS bases.
//!
//! Primality uses Miller-Rabin with the first twelve prime bases, which is
//! deterministic for every `u64`. Candidates for a ring of degree `n` are
//! restricted to `p = 1 (mod 2n)`, the condition for `Z_p` to contain a
//! primitive `2n`-th root of unity.

use crate::rns::setup::{mul_mod, pow_mod};

// Deterministic for all n < 3.3 * 10^24, which covers all u64 values.
const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Returns `true` if `n` is prime.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n & 1 == 0 => return false,
        _ => {}
    }

    let r = (n - 1).trailing_zeros();
    let d = (n - 1) >> r;
    'bases: for &a in &MILLER_RABIN_BASES {
        if a % n == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Returns `true` when `p` is prime and `p = 1 (mod 2 * degree)`.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, degree: u64) -> bool {
    match degree.checked_mul(2) {
        Some(order) if degree > 0 => p % order == 1 && is_prime(p),
        _ => false,
    }
}

/// Returns up to `count` NTT-friendly primes below `bound`, largest first.
pub fn ntt_primes_below(bound: u64, degree: u64, count: usize) -> Vec<u64> {
    let Some(order) = degree.checked_mul(2).filter(|_| degree > 0) else {
        return Vec::new();
    };
    if bound <= order {
        return Vec::new();
    }
    // Largest candidate below `bound` congruent to 1 modulo `order`.
    let top = bound - 1;
    let mut candidate = top - (top + order - 1) % order;
    let mut primes = Vec::with_capacity(count);
    while primes.len() < count && candidate > order {
        if is_prime(candidate) {
            primes.push(candidate);
        }
        candidate -= order;
    }
    primes
}

/// Returns `count` distinct NTT-friendly primes of exactly `bits` bits, or
/// `None` if the range holds fewer than `count` of them.
pub fn generate_primes(bits: u32, count: usize, degree: u64) -> Option<Vec<u64>> {
    if !(2..=63).contains(&bits) {
        return None;
    }
    let primes = ntt_primes_below(1u64 << bits, degree, count);
    let floor = 1u64 << (bits - 1);
    (primes.len() == count && primes.iter().all(|&p| p > floor)).then_some(primes)
}
