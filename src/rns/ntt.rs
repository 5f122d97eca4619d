use super::{
    errors::{RnsError, RnsResult},
    scalar::{Modulus, ShoupModulus},
    setup::{inv_mod, pow_mod, primitive_root_2n},
};
use crate::math::is_ntt_friendly_prime;

/// Twiddle factors for the negacyclic NTT over `Z_q[X] / (X^N + 1)`.
///
/// `roots[k] = psi^bitrev(k)` and `inverse_roots[k] = psi^-bitrev(k)` where
/// `psi` is the smallest-candidate primitive `2N`-th root of unity. Both are
/// stored in Shoup form.
#[derive(Debug, Clone)]
pub struct NttTable {
    modulus: Modulus,
    roots: Vec<ShoupModulus>,
    inverse_roots: Vec<ShoupModulus>,
    degree_inverse: ShoupModulus,
}

impl NttTable {
    pub fn new(modulus: Modulus, degree: usize) -> RnsResult<Self> {
        let q = modulus.value();
        let not_friendly = RnsError::NonNttFriendlyModulus { modulus: q, degree };
        if !degree.is_power_of_two() || !is_ntt_friendly_prime(q, degree as u64) {
            return Err(not_friendly);
        }
        let psi = primitive_root_2n(q, degree).ok_or(not_friendly.clone())?;
        let psi_inverse = inv_mod(psi, q).ok_or(not_friendly.clone())?;
        let bit_count = degree.trailing_zeros() as usize;

        let mut roots = Vec::with_capacity(degree);
        let mut inverse_roots = Vec::with_capacity(degree);
        for index in 0..degree {
            let exponent = reverse_bits(index, bit_count) as u64;
            roots.push(ShoupModulus::new(pow_mod(psi, exponent, q), q)?);
            inverse_roots.push(ShoupModulus::new(pow_mod(psi_inverse, exponent, q), q)?);
        }
        let degree_inverse = inv_mod(degree as u64 % q, q).ok_or(not_friendly)?;
        Ok(Self {
            modulus,
            roots,
            inverse_roots,
            degree_inverse: ShoupModulus::new(degree_inverse, q)?,
        })
    }

    pub fn degree(&self) -> usize {
        self.roots.len()
    }

    /// In-place forward transform: natural-order coefficients to bit-reversed
    /// evaluations (Cooley-Tukey butterflies, no explicit permutation).
    pub fn forward(&self, values: &mut [u64]) {
        let n = self.degree();
        debug_assert_eq!(values.len(), n);
        let modulus = &self.modulus;
        let mut span = n;
        let mut groups = 1;
        while groups < n {
            span /= 2;
            for group in 0..groups {
                let twiddle = &self.roots[groups + group];
                let start = 2 * group * span;
                let (left, right) = values[start..start + 2 * span].split_at_mut(span);
                for (u, v) in left.iter_mut().zip(right.iter_mut()) {
                    let t = twiddle.multiply_reduce(*v);
                    *v = modulus.sub(*u, t);
                    *u = modulus.add(*u, t);
                }
            }
            groups *= 2;
        }
    }

    /// In-place inverse transform (Gentleman-Sande butterflies followed by
    /// scaling with `N^-1`).
    pub fn inverse(&self, values: &mut [u64]) {
        let n = self.degree();
        debug_assert_eq!(values.len(), n);
        let modulus = &self.modulus;
        let mut span = 1;
        let mut groups = n;
        while groups > 1 {
            let half = groups / 2;
            for group in 0..half {
                let twiddle = &self.inverse_roots[half + group];
                let start = 2 * group * span;
                let (left, right) = values[start..start + 2 * span].split_at_mut(span);
                for (u, v) in left.iter_mut().zip(right.iter_mut()) {
                    let sum = modulus.add(*u, *v);
                    let diff = modulus.sub(*u, *v);
                    *u = sum;
                    *v = twiddle.multiply_reduce(diff);
                }
            }
            span *= 2;
            groups = half;
        }
        for value in values.iter_mut() {
            *value = self.degree_inverse.multiply_reduce(*value);
        }
    }
}

pub(super) fn reverse_bits(value: usize, bit_count: usize) -> usize {
    if bit_count == 0 {
        return 0;
    }
    value.reverse_bits() >> (usize::BITS as usize - bit_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn negacyclic_product(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = ((a[i] as u128 * b[j] as u128) % q as u128) as u64;
                let k = (i + j) % n;
                out[k] = if i + j < n {
                    (out[k] + prod) % q
                } else {
                    (out[k] + q - prod) % q
                };
            }
        }
        out
    }

    #[test]
    fn rejects_non_friendly_modulus() {
        let modulus = Modulus::new(19).unwrap();
        assert!(matches!(
            NttTable::new(modulus, 8),
            Err(RnsError::NonNttFriendlyModulus {
                modulus: 19,
                degree: 8
            })
        ));
    }

    #[test]
    fn roundtrip_is_identity() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for (q, n) in [(17u64, 8usize), (12_289, 1024), (576_460_752_303_439_873, 16)] {
            let table = NttTable::new(Modulus::new(q).unwrap(), n).unwrap();
            let original: Vec<u64> = (0..n).map(|_| rng.random_range(0..q)).collect();
            let mut values = original.clone();
            table.forward(&mut values);
            table.inverse(&mut values);
            assert_eq!(values, original);
        }
    }

    #[test]
    fn pointwise_product_is_negacyclic_convolution() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let (q, n) = (97u64, 16usize);
        let table = NttTable::new(Modulus::new(q).unwrap(), n).unwrap();
        let modulus = Modulus::new(q).unwrap();
        let a: Vec<u64> = (0..n).map(|_| rng.random_range(0..q)).collect();
        let b: Vec<u64> = (0..n).map(|_| rng.random_range(0..q)).collect();

        let (mut a_eval, mut b_eval) = (a.clone(), b.clone());
        table.forward(&mut a_eval);
        table.forward(&mut b_eval);
        let mut product: Vec<u64> = a_eval
            .iter()
            .zip(&b_eval)
            .map(|(&x, &y)| modulus.mul(x, y))
            .collect();
        table.inverse(&mut product);

        assert_eq!(product, negacyclic_product(&a, &b, q));
    }

    #[test]
    fn degree_one_is_trivial() {
        let table = NttTable::new(Modulus::new(3).unwrap(), 1).unwrap();
        let mut values = vec![2u64];
        table.forward(&mut values);
        table.inverse(&mut values);
        assert_eq!(values, vec![2]);
    }
}
