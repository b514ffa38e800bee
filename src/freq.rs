//! Frequency bookkeeping for the channelised data.
//!
//! Real signals only occupy the positive half of the transform, so they use a
//! transform of `2 * LFFT` samples and keep bins `[1, LFFT)`. Complex (I/Q)
//! signals use an `LFFT` transform which is shifted so frequencies ascend, and
//! are offset by the central tuning frequency.

use crate::SampleKind;

/// Sample frequencies of a discrete Fourier transform of length `n`, in the
/// same order as the transform output (same as numpy.fft.fftfreq).
pub fn fft_freqs(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    let n_pos = (n + 1) / 2;
    (0..n)
        .map(|k| {
            let k = if k < n_pos {
                k as f64
            } else {
                k as f64 - n as f64
            };
            k * sample_rate_hz / n as f64
        })
        .collect()
}

/// Rotate a transform so the zero-frequency element is in the middle (same
/// as numpy.fft.fftshift).
pub fn fft_shift<T: Clone>(values: &mut [T]) {
    let n = values.len();
    values.rotate_right(n / 2);
}

/// The `LFFT - 1` channel frequencies \[Hz\] of the correlator output.
///
/// Two grids are the same grid if their values are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid {
    freqs_hz: Vec<f64>,
}

impl FrequencyGrid {
    /// Build the grid for a transform length, sample kind, sample rate and
    /// (complex data only) central frequency.
    pub fn new(lfft: usize, kind: SampleKind, sample_rate_hz: f64, central_freq_hz: f64) -> Self {
        let mut freqs = fft_freqs(kind.l_factor() * lfft, sample_rate_hz);
        if kind == SampleKind::Complex {
            for freq in freqs.iter_mut() {
                *freq += central_freq_hz;
            }
            fft_shift(&mut freqs);
        }
        Self {
            freqs_hz: freqs[1..lfft].to_vec(),
        }
    }

    /// Wrap an existing list of frequencies.
    pub fn from_freqs(freqs_hz: Vec<f64>) -> Self {
        Self { freqs_hz }
    }

    /// The channel frequencies \[Hz\].
    pub fn freqs_hz(&self) -> &[f64] {
        &self.freqs_hz
    }

    /// The number of channels.
    pub fn len(&self) -> usize {
        self.freqs_hz.len()
    }

    /// Whether there are no channels.
    pub fn is_empty(&self) -> bool {
        self.freqs_hz.is_empty()
    }

    /// The index of the channel used as the delay reference.
    pub fn delay_ref_idx(&self) -> usize {
        self.freqs_hz.len() / 2
    }

    /// The channel nearest to a frequency.
    pub fn nearest_idx(&self, freq_hz: f64) -> Option<usize> {
        self.freqs_hz
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - freq_hz).abs().total_cmp(&(*b - freq_hz).abs()))
            .map(|(idx, _)| idx)
    }
}
