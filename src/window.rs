//! Window functions used while channelising.

use std::f64::consts::PI;

/// Blackman window (same as numpy.blackman)
///
/// `w[n] = 0.42 - 0.50 cos(2πn/N) + 0.08 cos(4πn/N)` with `N = length - 1`.
pub fn blackman_window(length: usize) -> Vec<f64> {
    if length == 1 {
        return vec![1.0];
    }
    let n = length as f64 - 1.0;
    (0..length)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / n;
            0.42 - 0.5 * a.cos() + 0.08 * (2.0 * a).cos()
        })
        .collect()
}

/// A sinc function which evaluates to zero at both ends of the range.
///
/// `x = 4π/length · (n - length/2)`, and the sample at `x == 0` is exactly
/// `1.0` rather than `0/0`.
pub fn sinc_window(length: usize) -> Vec<f64> {
    let half = (length / 2) as f64;
    (0..length)
        .map(|i| {
            let x = 4.0 * PI / length as f64 * (i as f64 - half);
            if x == 0.0 {
                1.0
            } else {
                x.sin() / x
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_blackman_window() {
        let window = blackman_window(10);
        assert_eq!(window.len(), 10);
        // Blackman window should start and end near zero
        assert!(window[0] < 0.1);
        assert!(window[9] < 0.1);
        // And peak in the middle
        assert!(window[4] > 0.3);
        assert!(window[5] > 0.3);
    }

    #[test]
    fn test_blackman_symmetric() {
        for length in [2, 3, 16, 63, 64, 128, 257] {
            let window = blackman_window(length);
            assert_eq!(window.len(), length);
            for n in 0..length {
                assert_abs_diff_eq!(window[n], window[length - 1 - n], epsilon = 1e-12);
            }
            // 0.42 - 0.5 + 0.08 at both ends
            assert_abs_diff_eq!(window[0], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(window[length - 1], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_blackman_degenerate() {
        assert!(blackman_window(0).is_empty());
        assert_eq!(blackman_window(1), vec![1.0]);
    }

    #[test]
    fn test_sinc_window_finite() {
        for length in [1, 2, 7, 64, 256, 511] {
            let window = sinc_window(length);
            assert_eq!(window.len(), length);
            assert!(window.iter().all(|w| w.is_finite()));
            assert_eq!(window[length / 2], 1.0);
        }
    }

    #[test]
    fn test_sinc_window_values() {
        let window = sinc_window(256);
        // x = ±π halfway between the centre and the ends
        assert_abs_diff_eq!(window[128 + 64], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(window[128 - 64], 0.0, epsilon = 1e-12);
        // and -2π at the start
        assert_abs_diff_eq!(window[0], 0.0, epsilon = 1e-12);
        let x = 4.0 * PI / 256.0;
        assert_abs_diff_eq!(window[129], x.sin() / x, epsilon = 1e-15);
    }
}
