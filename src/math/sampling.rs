use rand::{Rng, seq::SliceRandom};
use rand_distr::{Distribution, Normal};

/// Samples `degree` integers uniformly from `[0, modulus)`.
///
/// # Panics
///
/// Panics if `modulus == 0`.
pub fn uniform_residues<R: Rng + ?Sized>(modulus: u64, degree: usize, rng: &mut R) -> Vec<u64> {
    assert!(modulus > 0, "uniform_residues: modulus must be positive");
    (0..degree).map(|_| rng.random_range(0..modulus)).collect()
}

/// Samples `degree` rounded Gaussian integers centred at zero.
///
/// Returns `None` unless `std_dev` is finite and positive.
pub fn gaussian_coefficients<R: Rng + ?Sized>(
    std_dev: f64,
    degree: usize,
    rng: &mut R,
) -> Option<Vec<i64>> {
    if !(std_dev.is_finite() && std_dev > 0.0) {
        return None;
    }
    let normal = Normal::new(0.0, std_dev).ok()?;
    Some(
        (0..degree)
            .map(|_| normal.sample(rng).round() as i64)
            .collect(),
    )
}

/// Samples a ternary vector with exactly `hamming_weight` entries in
/// `{-1, 1}` and the rest zero.
///
/// # Panics
///
/// Panics if `hamming_weight > degree`.
pub fn ternary_coefficients<R: Rng + ?Sized>(
    degree: usize,
    hamming_weight: usize,
    rng: &mut R,
) -> Vec<i64> {
    assert!(
        hamming_weight <= degree,
        "ternary_coefficients: hamming_weight must be <= degree"
    );
    let mut out = vec![0i64; degree];
    let mut indices: Vec<usize> = (0..degree).collect();
    indices.shuffle(rng);
    for &idx in indices.iter().take(hamming_weight) {
        out[idx] = if rng.random_bool(0.5) { 1 } else { -1 };
    }
    out
}
