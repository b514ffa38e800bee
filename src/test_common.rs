use float_cmp::{approx_eq, F64Margin};
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Deterministic white noise, uniform in `[-1, 1)`, from an xorshift
/// generator. Different seeds give independent looking streams.
pub fn noise(num_samples: usize, seed: u64) -> Array1<f64> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    Array1::from_iter((0..num_samples).map(|_| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }))
}

/// A `[input][time]` matrix of independent noise rows.
pub fn noise_matrix(num_inputs: usize, num_samples: usize, seed: u64) -> Array2<f64> {
    let mut matrix = Array2::zeros((num_inputs, num_samples));
    for (input, mut row) in matrix.outer_iter_mut().enumerate() {
        row.assign(&noise(num_samples, seed + input as u64));
    }
    matrix
}

/// A unit amplitude complex exponential at `freq_hz`.
pub fn complex_tone(num_samples: usize, freq_hz: f64, sample_rate_hz: f64) -> Array1<Complex64> {
    Array1::from_iter(
        (0..num_samples)
            .map(|n| Complex64::from_polar(1.0, 2.0 * PI * freq_hz * n as f64 / sample_rate_hz)),
    )
}

/// Whether two real arrays agree to within a few ulps or an absolute margin.
pub fn all_approx_eq(left: ArrayView1<f64>, right: ArrayView1<f64>, epsilon: f64) -> bool {
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|(&l, &r)| {
            approx_eq!(
                f64,
                l,
                r,
                F64Margin {
                    epsilon,
                    ulps: 4
                }
            )
        })
}

#[test]
fn test_noise_is_deterministic() {
    assert_eq!(noise(64, 3), noise(64, 3));
    assert_ne!(noise(64, 3), noise(64, 4));
    assert!(noise(10_000, 9).iter().all(|x| (-1.0..1.0).contains(x)));
    assert!(noise(10_000, 9).mean().unwrap().abs() < 0.05);
}
