//! Windowed FFT of a single chunk of samples, shared by the spectrum estimator
//! and the correlation kernel.

use crate::{freq::fft_shift, window::blackman_window, FxError, SampleKind};
use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Turns chunks of `l_factor * lfft` samples into the `lfft - 1` channels of
/// the [`crate::FrequencyGrid`].
///
/// The planned transform is immutable and may be shared between threads.
#[derive(Clone)]
pub struct Channelizer {
    lfft: usize,
    kind: SampleKind,
    fft: Arc<dyn Fft<f64>>,
    window: Option<Vec<f64>>,
}

impl std::fmt::Debug for Channelizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channelizer")
            .field("lfft", &self.lfft)
            .field("kind", &self.kind)
            .field("blackman", &self.window.is_some())
            .finish()
    }
}

impl Channelizer {
    /// Plan the transform for `lfft` channels of `kind` data, optionally
    /// applying a Blackman window to each chunk.
    pub fn new(lfft: usize, kind: SampleKind, blackman: bool) -> Self {
        let chunk_len = kind.l_factor() * lfft;
        let mut planner = FftPlanner::new();
        Self {
            lfft,
            kind,
            fft: planner.plan_fft_forward(chunk_len),
            window: if blackman {
                Some(blackman_window(chunk_len))
            } else {
                None
            },
        }
    }

    /// The number of samples consumed per transform.
    pub fn chunk_len(&self) -> usize {
        self.kind.l_factor() * self.lfft
    }

    /// The number of channels produced per transform.
    pub fn num_chans(&self) -> usize {
        self.lfft - 1
    }

    /// Window and transform one chunk, returning bins `[1, lfft)`.
    ///
    /// Complex transforms are shifted first so the channels line up with the
    /// frequency grid.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::BadArrayShape`] if `chunk` is not exactly
    /// [`Channelizer::chunk_len`] samples long.
    pub fn channelize(&self, chunk: ArrayView1<Complex64>) -> Result<Vec<Complex64>, FxError> {
        if chunk.len() != self.chunk_len() {
            return Err(FxError::BadArrayShape {
                argument: "chunk".into(),
                function: "Channelizer::channelize".into(),
                expected: format!("({},)", self.chunk_len()),
                received: format!("({},)", chunk.len()),
            });
        }
        let mut buffer: Vec<Complex64> = match &self.window {
            Some(window) => chunk
                .iter()
                .zip(window.iter())
                .map(|(&sample, &weight)| sample * weight)
                .collect(),
            None => chunk.to_vec(),
        };
        self.fft.process(&mut buffer);
        if self.kind == SampleKind::Complex {
            fft_shift(&mut buffer);
        }
        buffer.truncate(self.lfft);
        buffer.remove(0);
        Ok(buffer)
    }
}

/// Subtract the mean of a signal from each of its samples.
pub fn remove_mean(signal: &mut Array1<Complex64>) {
    if let Some(mean) = signal.mean() {
        signal.mapv_inplace(|sample| sample - mean);
    }
}
