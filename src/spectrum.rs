//! Power spectra of individual inputs, averaged over chunks of samples.

use crate::{
    channelize::{remove_mean, Channelizer},
    constants::POLYPHASE_WINDOWS,
    correlate::CorrelatorConfig,
    executor::{AnyExecutor, Executor},
    polyphase::polyphase_filter,
    util::progress_bar,
    FrequencyGrid, FxError, SampleKind, SignalView,
};
use log::{debug, trace};
use ndarray::{s, Array1, Array3, ArrayView1};
use num_complex::Complex64;

/// The average power spectrum of a single signal on the
/// [`FrequencyGrid`] channels.
///
/// The signal is optionally polyphase filtered, has its mean removed, and is
/// then cut into non-overlapping chunks of `l_factor * lfft` samples whose
/// squared transforms are averaged. Correlating a signal with itself gives the
/// same values.
///
/// # Errors
///
/// Will return [`FxError::InsufficientData`] if there isn't a single complete
/// chunk.
pub fn calc_spectrum(
    signal: ArrayView1<Complex64>,
    kind: SampleKind,
    lfft: usize,
    blackman: bool,
    polyphase: bool,
) -> Result<Array1<f64>, FxError> {
    let channelizer = Channelizer::new(lfft, kind, blackman);
    spectrum_with(&channelizer, signal, polyphase)
}

fn spectrum_with(
    channelizer: &Channelizer,
    signal: ArrayView1<Complex64>,
    polyphase: bool,
) -> Result<Array1<f64>, FxError> {
    let chunk_len = channelizer.chunk_len();
    let needed = if polyphase {
        chunk_len * POLYPHASE_WINDOWS
    } else {
        chunk_len
    };
    if signal.len() < needed {
        return Err(FxError::InsufficientData {
            function: "calc_spectrum",
            needed,
            available: signal.len(),
        });
    }

    let mut prepared = if polyphase {
        polyphase_filter(signal, chunk_len, POLYPHASE_WINDOWS)?
    } else {
        signal.to_owned()
    };
    remove_mean(&mut prepared);

    let num_chunks = prepared.len() / chunk_len;
    trace!("spectrum of {} samples in {} chunks", signal.len(), num_chunks);
    let mut power = Array1::<f64>::zeros(channelizer.num_chans());
    for chunk_idx in 0..num_chunks {
        let offset = chunk_idx * chunk_len;
        let channels = channelizer.channelize(prepared.slice(s![offset..offset + chunk_len]))?;
        for (acc, value) in power.iter_mut().zip(channels.iter()) {
            *acc += value.norm_sqr();
        }
    }
    power.mapv_inplace(|p| p / num_chunks as f64);
    Ok(power)
}

/// Power spectra of every input, in segments of `sample_average` transforms
/// each, or a single segment covering every sample if `sample_average` is
/// `None`.
///
/// Returns the frequency grid and the power, `[input][segment][channel]`.
///
/// # Errors
///
/// - [`FxError::InvalidConfiguration`] if `sample_average` is zero or the
///   config doesn't validate
/// - [`FxError::InsufficientData`] if there are too few samples for a single
///   segment
pub fn calc_spectra(
    signals: SignalView,
    config: &CorrelatorConfig,
    sample_average: Option<usize>,
) -> Result<(FrequencyGrid, Array3<f64>), FxError> {
    config.validate()?;
    let kind = signals.kind;
    let channelizer = Channelizer::new(config.lfft, kind, config.blackman_filter);
    let chunk_len = channelizer.chunk_len();
    let num_samples = signals.num_samples();

    let (segment_len, num_segments) = match sample_average {
        Some(0) => {
            return Err(FxError::InvalidConfiguration {
                function: "calc_spectra",
                option: "sample_average".into(),
                expected: "at least 1".into(),
                received: "0".into(),
            })
        }
        Some(sample_average) => {
            let segment_len = chunk_len * sample_average;
            (segment_len, num_samples / segment_len)
        }
        None if num_samples >= chunk_len => ((num_samples / chunk_len) * chunk_len, 1),
        None => (chunk_len, 0),
    };
    if num_segments == 0 {
        return Err(FxError::InsufficientData {
            function: "calc_spectra",
            needed: segment_len,
            available: num_samples,
        });
    }

    let freq = FrequencyGrid::new(
        config.lfft,
        kind,
        config.sample_rate_hz(),
        config.central_freq,
    );
    let num_inputs = signals.num_inputs();
    debug!(
        "spectra of {} inputs in {} segments of {} samples",
        num_inputs, num_segments, segment_len
    );

    let executor = AnyExecutor::from_config(config.disable_pool, config.num_workers);
    let progress = progress_bar(num_inputs * num_segments, "spectra", config.draw_progress);
    let spectra = executor.run_indexed(num_inputs * num_segments, |task_idx| {
        let (input, segment) = (task_idx / num_segments, task_idx % num_segments);
        let offset = segment * segment_len;
        let spectrum = spectrum_with(
            &channelizer,
            signals.row(input).slice_move(s![offset..offset + segment_len]),
            config.polyphase_filter,
        )?;
        progress.inc(1);
        Ok(spectrum)
    })?;
    progress.finish();

    let mut power = Array3::<f64>::zeros((num_inputs, num_segments, freq.len()));
    for (task_idx, spectrum) in spectra.into_iter().enumerate() {
        power
            .slice_mut(s![task_idx / num_segments, task_idx % num_segments, ..])
            .assign(&spectrum);
    }
    Ok((freq, power))
}
