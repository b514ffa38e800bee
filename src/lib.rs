#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! fxcorr channelises the time series recorded by each antenna of an array
//! and cross-correlates every pair of antennas (an "FX" correlator), producing
//! complex visibilities on a grid of frequency channels.
//!
//! # Examples
//!
//! Here's an example of how to correlate four antennas of real samples
//!
//! ```rust
//! use fxcorr::{
//!     delay::{DelayCache, ZeroDelay},
//!     fx_correlator,
//!     ndarray::Array2,
//!     CorrelatorConfigBuilder, FrequencyGrid, SignalMatrix,
//! };
//!
//! // four antennas, 4096 real samples each
//! let samples = Array2::from_shape_fn((4, 4096), |(ant, t)| {
//!     ((t * (ant + 3)) % 17) as f64 - 8.0
//! });
//! let signals = SignalMatrix::from_real(samples);
//!
//! // 63 channels from 1 MHz samples
//! let config = CorrelatorConfigBuilder::default()
//!     .lfft(64)
//!     .sample_rate(Some(1e6))
//!     .build()
//!     .unwrap();
//!
//! // every antenna sees the sky at the same time
//! let mut cache = DelayCache::new(Box::new(ZeroDelay), FrequencyGrid::from_freqs(vec![]));
//!
//! let (freq, vis) =
//!     fx_correlator(signals.view(), &[0, 1, 2, 3], &config, None, &mut cache).unwrap();
//! assert_eq!(freq.len(), 63);
//! assert_eq!(vis.dim(), (6, 63));
//! ```
//!
//! # Details
//!
//! Each antenna's stream is aligned to whole samples using the delays from a
//! [`delay::SignalDelay`] model, optionally polyphase filtered, split into
//! (possibly overlapping) chunks and Fourier transformed. The product of each
//! pair of spectra is averaged over all chunks. Baselines are independent
//! tasks, spread over a worker pool by [`executor::AnyExecutor`].

use cfg_if::cfg_if;

pub mod baselines;
pub mod channelize;
pub mod constants;
pub mod correlate;
pub mod delay;
pub mod error;
pub mod executor;
pub mod freq;
pub mod fx;
pub mod io;
pub mod polyphase;
pub mod spectrum;
pub mod types;
pub mod util;
pub mod uvw;
pub mod window;

cfg_if! {
    if #[cfg(feature = "cli")] {
        pub mod cli;
        pub use cli::FxContext;
    }
}

#[cfg(test)]
pub(crate) mod test_common;

pub use ndarray;
pub use num_complex;
pub use rayon;

pub use baselines::{get_baseline_idxs, get_baselines, BaselineList};
pub use correlate::{correlate, CorrelatorConfig, CorrelatorConfigBuilder};
pub use delay::{DelayCache, SignalDelay, StationGeometry};
pub use error::{CLIError, FxError};
pub use freq::FrequencyGrid;
pub use fx::{correlate_windows, fx_correlator, VisOutput};
pub use spectrum::{calc_spectra, calc_spectrum};
pub use types::{AntennaId, PolProduct, SampleKind, SignalMatrix, SignalView};

/// Evaluate the statements, adding the time they took to `$durs[$name]`.
///
/// ```rust
/// use fxcorr::with_increment_duration;
/// use std::{collections::HashMap, time::Duration};
///
/// let mut durations = HashMap::<String, Duration>::new();
/// let sum = with_increment_duration!(durations, "sum", (0..100).sum::<u32>());
/// assert_eq!(sum, 4950);
/// assert!(durations.contains_key("sum"));
/// ```
#[macro_export]
macro_rules! with_increment_duration {
    ($durs:expr, $name:literal, $($s:stmt);+ $(;)?) => {
        {
            let _now = std::time::Instant::now();
            let _res = {
                $(
                    $s
                );*
            };
            *$durs.entry($name.into()).or_insert(std::time::Duration::default()) += _now.elapsed();
            _res
        }
    };
}
