//! Correlating every baseline of a signal matrix.
//!
//! The frequency grid and delay cache are set up once, on the calling thread,
//! then each baseline is handed to the executor as an independent task. The
//! result of task `k` always lands in row `k`, the `k`th baseline of
//! [`get_baseline_idxs`].

use crate::{
    baselines::{get_baseline_idxs, get_baselines, BaselineList},
    channelize::Channelizer,
    correlate::{correlate_with, CorrelatorConfig},
    delay::{DelayCache, StationGeometry},
    executor::{AnyExecutor, Executor},
    util::{fmt_freqs_mhz, progress_bar},
    uvw::{baseline_uvws, uvw_wavelengths, HADec},
    AntennaId, FrequencyGrid, FxError, PolProduct, SignalView,
};
use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;

/// Correlate every baseline between the rows of `signals`.
///
/// `antennas[i]` is the antenna recorded in row `i`. The visibility of
/// baseline `(i, j)` is `FFT(second[j]) * conj(FFT(signals[i]))` where
/// `second` is `cross_pol` if given (e.g. the Y polarisation of each antenna)
/// and `signals` otherwise.
///
/// Returns the frequency grid and the visibilities, `[baseline][channel]`.
///
/// # Errors
///
/// - [`FxError::BadArrayShape`] if `antennas` or `cross_pol` don't match
///   `signals`
/// - [`FxError::InvalidConfiguration`] if `config` doesn't validate
/// - any error from the delay model or any baseline; nothing is returned for
///   the other baselines
pub fn fx_correlator<'a>(
    signals: SignalView<'a>,
    antennas: &[AntennaId],
    config: &CorrelatorConfig,
    cross_pol: Option<SignalView<'a>>,
    cache: &mut DelayCache,
) -> Result<(FrequencyGrid, Array2<Complex64>), FxError> {
    config.validate()?;
    let num_inputs = signals.num_inputs();
    if antennas.len() != num_inputs {
        return Err(FxError::BadArrayShape {
            argument: "antennas".into(),
            function: "fx_correlator".into(),
            expected: format!("({num_inputs},)"),
            received: format!("({},)", antennas.len()),
        });
    }
    if let Some(cross_pol) = cross_pol {
        if cross_pol.data.dim() != signals.data.dim() || cross_pol.kind != signals.kind {
            return Err(FxError::BadArrayShape {
                argument: "cross_pol".into(),
                function: "fx_correlator".into(),
                expected: format!("{:?} {}", signals.data.dim(), signals.kind),
                received: format!("{:?} {}", cross_pol.data.dim(), cross_pol.kind),
            });
        }
    }
    let second = cross_pol.unwrap_or(signals);

    let freq = FrequencyGrid::new(
        config.lfft,
        signals.kind,
        config.sample_rate_hz(),
        config.central_freq,
    );
    debug!("frequency grid: {}", fmt_freqs_mhz(freq.freqs_hz()));

    // every delay is computed here, workers only read the cache
    cache.update_freq(&freq);
    cache.populate(antennas)?;
    let cache: &DelayCache = cache;

    let baselines = get_baseline_idxs(num_inputs, config.include_auto);
    let channelizer = Channelizer::new(config.lfft, signals.kind, config.blackman_filter);
    let executor = AnyExecutor::from_config(config.disable_pool, config.num_workers);
    debug!(
        "correlating {} baselines of {} samples with {} workers",
        baselines.len(),
        signals.num_samples(),
        executor.num_workers()
    );

    let progress = progress_bar(baselines.len(), "correlating", config.draw_progress);
    let results = executor.run_indexed(baselines.len(), |baseline_idx| {
        let (i, j) = baselines[baseline_idx];
        let vis = correlate_with(
            &channelizer,
            signals.row(i),
            second.row(j),
            antennas[i],
            antennas[j],
            &freq,
            config,
            cache,
        )?;
        progress.inc(1);
        Ok(vis)
    })?;
    progress.finish();

    let mut vis = Array2::<Complex64>::zeros((baselines.len(), freq.len()));
    for (mut row, result) in vis.axis_iter_mut(Axis(0)).zip(results.iter()) {
        row.assign(result);
    }
    Ok((freq, vis))
}

/// Everything downstream writers need to know about correlated data.
#[derive(Debug, Clone)]
pub struct VisOutput {
    /// channel frequencies
    pub freq: FrequencyGrid,
    /// the baselines, in visibility order
    pub baselines: BaselineList,
    /// visibilities, `[window][baseline][channel]`
    pub vis: Array3<Complex64>,
    /// the length of each averaging window \[s\]
    pub int_time_s: f64,
    /// the polarisation product which was correlated
    pub pol: PolProduct,
    /// baseline coordinates in wavelengths, `[baseline][u, v, w][channel]`,
    /// if the array geometry is known
    pub uvw: Option<Array3<f64>>,
}

impl VisOutput {
    /// The number of averaging windows.
    pub fn num_windows(&self) -> usize {
        self.vis.len_of(Axis(0))
    }

    /// Fill in [`VisOutput::uvw`] for every baseline and channel, looking
    /// towards `phase_centre` from a site at `latitude_rad`.
    ///
    /// # Errors
    ///
    /// - [`FxError::InvalidConfiguration`] if the baselines are listed by row
    ///   index rather than antenna
    /// - [`FxError::UnknownAntenna`] if an antenna isn't in `station`
    pub fn set_uvw(
        &mut self,
        station: &StationGeometry,
        phase_centre: HADec,
        latitude_rad: f64,
    ) -> Result<(), FxError> {
        let pairs = match &self.baselines {
            BaselineList::ByAntenna(pairs) => pairs,
            BaselineList::ByIndex(_) => {
                return Err(FxError::InvalidConfiguration {
                    function: "VisOutput::set_uvw",
                    option: "baselines".into(),
                    expected: "baselines listed by antenna".into(),
                    received: "baselines listed by row index".into(),
                })
            }
        };
        let uvws = baseline_uvws(station, pairs, phase_centre, latitude_rad)?;
        self.uvw = Some(uvw_wavelengths(&uvws, self.freq.freqs_hz()));
        Ok(())
    }
}

/// Split the samples into consecutive averaging windows of `window_samples`
/// samples (or one window of every sample) and correlate each of them with
/// [`fx_correlator`]. Trailing samples which don't fill a window are dropped.
///
/// # Errors
///
/// Will return [`FxError::InsufficientData`] if there isn't a single complete
/// window, or any error from [`fx_correlator`].
#[allow(clippy::too_many_arguments)]
pub fn correlate_windows<'a>(
    signals: SignalView<'a>,
    antennas: &[AntennaId],
    config: &CorrelatorConfig,
    cross_pol: Option<SignalView<'a>>,
    cache: &mut DelayCache,
    window_samples: Option<usize>,
    pol: PolProduct,
) -> Result<VisOutput, FxError> {
    let num_samples = signals.num_samples();
    let window_samples = window_samples.unwrap_or(num_samples);
    let num_windows = if window_samples == 0 {
        0
    } else {
        num_samples / window_samples
    };
    if num_windows == 0 {
        return Err(FxError::InsufficientData {
            function: "correlate_windows",
            needed: window_samples.max(1),
            available: num_samples,
        });
    }
    info!(
        "correlating {} {} window(s) of {} samples",
        num_windows, pol, window_samples
    );

    let mut windows = Vec::with_capacity(num_windows);
    let mut freq = None;
    for window_idx in 0..num_windows {
        let range = window_idx * window_samples..(window_idx + 1) * window_samples;
        let window_signals = signals.slice_time(range.clone())?;
        let window_cross = cross_pol
            .map(|cross_pol| cross_pol.slice_time(range))
            .transpose()?;
        let (window_freq, vis) =
            fx_correlator(window_signals, antennas, config, window_cross, cache)?;
        freq = Some(window_freq);
        windows.push(vis);
    }

    let views = windows.iter().map(|vis| vis.view()).collect::<Vec<_>>();
    let vis = ndarray::stack(Axis(0), &views).map_err(|err| FxError::BadArrayShape {
        argument: "windows".into(),
        function: "correlate_windows".into(),
        expected: "windows of equal shape".into(),
        received: err.to_string(),
    })?;

    Ok(VisOutput {
        freq: freq.unwrap_or_else(|| FrequencyGrid::from_freqs(vec![])),
        baselines: get_baselines(antennas, config.include_auto, false),
        vis,
        int_time_s: window_samples as f64 / config.sample_rate_hz(),
        pol,
        uvw: None,
    })
}
