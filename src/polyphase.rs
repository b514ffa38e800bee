//! Polyphase pre-filtering of time series data.
//!
//! The signal is multiplied by a sinc function in blocks of `length * windows`
//! samples, each block is broken into `windows` sub-segments of `length`
//! samples, and the sub-segments are summed. This decimates the signal by
//! `windows` while low-pass filtering it.

use crate::{window::sinc_window, FxError};
use itertools::izip;
use log::trace;
use ndarray::{Array1, ArrayView1, Axis};
use num_traits::Zero;
use std::ops::{AddAssign, Mul};

/// Polyphase filter a time series, returning the decimated signal.
///
/// Trailing samples which don't fill a complete block of `length * windows`
/// samples are dropped.
///
/// # Errors
///
/// Will return [`FxError::InvalidConfiguration`] if `length` or `windows` is
/// zero, or if a single block is longer than the signal.
pub fn polyphase_filter<T>(
    signal: ArrayView1<T>,
    length: usize,
    windows: usize,
) -> Result<Array1<T>, FxError>
where
    T: Copy + Zero + AddAssign + Mul<f64, Output = T>,
{
    let block_len = length * windows;
    if length == 0 || windows == 0 || block_len > signal.len() {
        return Err(FxError::InvalidConfiguration {
            function: "polyphase_filter",
            option: "length * windows".into(),
            expected: format!("non-zero and at most the signal length {}", signal.len()),
            received: format!("{length} * {windows}"),
        });
    }

    let sinc = sinc_window(block_len);
    let num_blocks = signal.len() / block_len;
    let mut filtered = Array1::<T>::zeros(num_blocks * length);
    trace!(
        "polyphase: {} samples -> {} filtered samples",
        signal.len(),
        filtered.len()
    );

    for (block, mut out) in izip!(
        signal.axis_chunks_iter(Axis(0), block_len).take(num_blocks),
        filtered.axis_chunks_iter_mut(Axis(0), length),
    ) {
        for (idx, (&sample, &weight)) in block.iter().zip(sinc.iter()).enumerate() {
            out[idx % length] += sample * weight;
        }
    }

    Ok(filtered)
}
