//! Correlator configuration and the single baseline correlation kernel.

use crate::{
    channelize::{remove_mean, Channelizer},
    constants::{DEFAULT_LFFT, DEFAULT_NUM_WORKERS, POLYPHASE_WINDOWS, STATION_SAMPLE_RATE_HZ},
    delay::DelayCache,
    polyphase::polyphase_filter,
    AntennaId, FrequencyGrid, FxError, SampleKind,
};
use derive_builder::Builder;
use log::trace;
use ndarray::{s, Array1, ArrayView1};
use num_complex::Complex64;
use std::{f64::consts::PI, fmt::Display};

/// Options for channelising and correlating a set of signals
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct CorrelatorConfig {
    /// The number of channels per transform (plus the dropped one)
    #[builder(default = "DEFAULT_LFFT")]
    pub lfft: usize,
    /// The number of overlapping chunks per transform length
    #[builder(default = "1")]
    pub overlap: usize,
    /// Whether to correlate each antenna with itself
    #[builder(default = "false")]
    pub include_auto: bool,
    /// Whether to apply a Blackman window to each chunk
    #[builder(default = "false")]
    pub blackman_filter: bool,
    /// Whether to polyphase filter the signals before channelising
    #[builder(default = "false")]
    pub polyphase_filter: bool,
    /// The sample rate \[Hz\], the station default if not given
    #[builder(default)]
    pub sample_rate: Option<f64>,
    /// The tuning frequency of complex data \[Hz\]
    #[builder(default = "0.0")]
    pub central_freq: f64,
    /// Whether to run every baseline on the calling thread
    #[builder(default = "false")]
    pub disable_pool: bool,
    /// The size of the worker pool
    #[builder(default = "DEFAULT_NUM_WORKERS")]
    pub num_workers: usize,
    /// Whether to rotate out the residual delay left after whole sample
    /// alignment
    #[builder(default = "false")]
    pub apply_phase_correction: bool,
    /// Whether to draw progress bars
    #[builder(default = "false")]
    pub draw_progress: bool,
}

impl CorrelatorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(lfft) = self.lfft {
            if lfft < 2 {
                return Err(format!("lfft must be at least 2, received {lfft}"));
            }
        }
        if let Some(0) = self.overlap {
            return Err("overlap must be at least 1".into());
        }
        if let Some(0) = self.num_workers {
            return Err("num_workers must be at least 1".into());
        }
        if let Some(Some(rate)) = self.sample_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(format!("sample_rate must be positive, received {rate}"));
            }
        }
        Ok(())
    }
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            lfft: DEFAULT_LFFT,
            overlap: 1,
            include_auto: false,
            blackman_filter: false,
            polyphase_filter: false,
            sample_rate: None,
            central_freq: 0.0,
            disable_pool: false,
            num_workers: DEFAULT_NUM_WORKERS,
            apply_phase_correction: false,
            draw_progress: false,
        }
    }
}

impl Display for CorrelatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Will use {} channels with {}x overlap at {} Hz.",
            self.lfft - 1,
            self.overlap,
            self.sample_rate_hz()
        )?;
        writeln!(
            f,
            "{} include autocorrelations.",
            if self.include_auto { "Will" } else { "Will not" }
        )?;
        writeln!(
            f,
            "{} apply a Blackman window.",
            if self.blackman_filter {
                "Will"
            } else {
                "Will not"
            }
        )?;
        writeln!(
            f,
            "{} polyphase filter.",
            if self.polyphase_filter {
                "Will"
            } else {
                "Will not"
            }
        )?;
        writeln!(
            f,
            "{} correct residual delay phases.",
            if self.apply_phase_correction {
                "Will"
            } else {
                "Will not"
            }
        )?;
        if self.disable_pool {
            writeln!(f, "Will correlate on a single thread.")?;
        } else {
            writeln!(f, "Will correlate with {} workers.", self.num_workers)?;
        }
        Ok(())
    }
}

impl CorrelatorConfig {
    /// The sample rate \[Hz\] in use.
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate.unwrap_or(STATION_SAMPLE_RATE_HZ)
    }

    /// Check the options make sense together, for configs not made by the
    /// builder.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::InvalidConfiguration`] naming the first bad
    /// option.
    pub fn validate(&self) -> Result<(), FxError> {
        let invalid = |option: &str, expected: &str, received: String| {
            Err(FxError::InvalidConfiguration {
                function: "CorrelatorConfig::validate",
                option: option.into(),
                expected: expected.into(),
                received,
            })
        };
        if self.lfft < 2 {
            return invalid("lfft", "at least 2", self.lfft.to_string());
        }
        if self.overlap == 0 || self.overlap > self.lfft {
            return invalid(
                "overlap",
                "between 1 and lfft",
                self.overlap.to_string(),
            );
        }
        if self.num_workers == 0 {
            return invalid("num_workers", "at least 1", self.num_workers.to_string());
        }
        let rate = self.sample_rate_hz();
        if !(rate.is_finite() && rate > 0.0) {
            return invalid("sample_rate", "a positive number", rate.to_string());
        }
        Ok(())
    }
}

/// Correlate the signals of two antennas, returning the averaged visibility
/// `FFT(signal2) * conj(FFT(signal1))` on each channel of `freq`.
///
/// `cache` must already hold the delays of both antennas for `freq`.
///
/// # Errors
///
/// - [`FxError::StaleDelayCache`] if `cache` was populated for another grid
/// - [`FxError::UnknownAntenna`] if either antenna isn't in `cache`
/// - [`FxError::InsufficientOverlap`] if no whole chunk is left after
///   alignment
/// - [`FxError::NonFiniteResult`] if the transform produced NaN or infinity
#[allow(clippy::too_many_arguments)]
pub fn correlate(
    signal1: ArrayView1<Complex64>,
    signal2: ArrayView1<Complex64>,
    ant1: AntennaId,
    ant2: AntennaId,
    kind: SampleKind,
    freq: &FrequencyGrid,
    config: &CorrelatorConfig,
    cache: &DelayCache,
) -> Result<Array1<Complex64>, FxError> {
    let channelizer = Channelizer::new(config.lfft, kind, config.blackman_filter);
    correlate_with(
        &channelizer,
        signal1,
        signal2,
        ant1,
        ant2,
        freq,
        config,
        cache,
    )
}

/// [`correlate`] with a transform planned ahead of time, so it can be shared
/// by every baseline.
///
/// # Errors
///
/// See [`correlate`].
#[allow(clippy::too_many_arguments)]
pub fn correlate_with(
    channelizer: &Channelizer,
    signal1: ArrayView1<Complex64>,
    signal2: ArrayView1<Complex64>,
    ant1: AntennaId,
    ant2: AntennaId,
    freq: &FrequencyGrid,
    config: &CorrelatorConfig,
    cache: &DelayCache,
) -> Result<Array1<Complex64>, FxError> {
    if cache.freq() != freq {
        return Err(FxError::StaleDelayCache);
    }
    let sample_rate = config.sample_rate_hz();
    let chunk_len = channelizer.chunk_len();
    let overlap = config.overlap;

    let delay = cache.baseline_delay(ant1, ant2, sample_rate)?;

    // filter and remove the mean of each whole signal, then shift
    let prepare = |signal: ArrayView1<Complex64>| -> Result<_, FxError> {
        let mut prepared = if config.polyphase_filter {
            if signal.len() < chunk_len * POLYPHASE_WINDOWS {
                return Ok(Array1::zeros(0));
            }
            polyphase_filter(signal, chunk_len, POLYPHASE_WINDOWS)?
        } else {
            signal.to_owned()
        };
        remove_mean(&mut prepared);
        Ok(prepared)
    };
    let prepared1 = prepare(signal1)?;
    let prepared2 = prepare(signal2)?;

    let usable1 = prepared1.len().saturating_sub(delay.start1);
    let usable2 = prepared2.len().saturating_sub(delay.start2);
    let num_full = (usable1 / chunk_len).min(usable2 / chunk_len) as isize;
    let length = num_full * overlap as isize - overlap as isize + 1;
    if length <= 0 {
        return Err(FxError::InsufficientOverlap { ant1, ant2, length });
    }
    let length = length as usize;
    trace!(
        "correlating {}-{}: starts ({}, {}), {} chunks",
        ant1,
        ant2,
        delay.start1,
        delay.start2,
        length
    );

    let mut vis = Array1::<Complex64>::zeros(freq.len());
    for chunk_idx in 0..length {
        let offset = chunk_len * chunk_idx / overlap;
        let (lo1, lo2) = (delay.start1 + offset, delay.start2 + offset);
        let spec1 = channelizer.channelize(prepared1.slice(s![lo1..lo1 + chunk_len]))?;
        let spec2 = channelizer.channelize(prepared2.slice(s![lo2..lo2 + chunk_len]))?;
        for (acc, (x1, x2)) in vis.iter_mut().zip(spec1.iter().zip(spec2.iter())) {
            *acc += x2 * x1.conj();
        }
    }

    if config.apply_phase_correction {
        let shift1 = delay.start1 as f64 / sample_rate;
        let shift2 = delay.start2 as f64 / sample_rate;
        for (k, acc) in vis.iter_mut().enumerate() {
            let residual = (delay.delay1[k] - shift1) - (delay.delay2[k] - shift2);
            *acc *= Complex64::from_polar(1.0, 2.0 * PI * freq.freqs_hz()[k] * residual);
        }
    }

    vis.mapv_inplace(|v| v / length as f64);

    if !vis.iter().all(|v| v.is_finite()) {
        return Err(FxError::NonFiniteResult {
            function: "correlate",
            ant1,
            ant2,
        });
    }
    Ok(vis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        delay::{SignalDelay, ZeroDelay},
        spectrum::calc_spectrum,
        test_common::{complex_tone, noise},
    };
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    fn zero_cache(freq: &FrequencyGrid, antennas: &[AntennaId]) -> DelayCache {
        let mut cache = DelayCache::new(Box::new(ZeroDelay), freq.clone());
        cache.populate(antennas).unwrap();
        cache
    }

    /// A whole number of samples of delay per antenna.
    struct SampleDelay {
        samples: HashMap<AntennaId, f64>,
        sample_rate: f64,
    }

    impl SignalDelay for SampleDelay {
        fn signal_delay(&self, antenna: AntennaId, freqs_hz: &[f64]) -> Result<Vec<f64>, FxError> {
            let samples = self
                .samples
                .get(&antenna)
                .ok_or(FxError::UnknownAntenna { antenna })?;
            Ok(vec![samples / self.sample_rate; freqs_hz.len()])
        }
    }

    #[test]
    fn test_builder_defaults() {
        let config = CorrelatorConfigBuilder::default().build().unwrap();
        assert_eq!(config.lfft, 64);
        assert_eq!(config.overlap, 1);
        assert_eq!(config.num_workers, 4);
        assert!(!config.include_auto);
        assert!(!config.apply_phase_correction);
        assert_abs_diff_eq!(config.sample_rate_hz(), 196e6);
        assert!(config.validate().is_ok());
        assert!(CorrelatorConfigBuilder::default().overlap(0).build().is_err());
        assert!(CorrelatorConfigBuilder::default().lfft(1).build().is_err());
        assert!(CorrelatorConfigBuilder::default()
            .sample_rate(Some(-1.0))
            .build()
            .is_err());
    }

    #[test]
    fn test_validate() {
        let config = CorrelatorConfig {
            overlap: 128,
            ..CorrelatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FxError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_display() {
        let config = CorrelatorConfig {
            include_auto: true,
            disable_pool: true,
            ..CorrelatorConfig::default()
        };
        let summary = config.to_string();
        assert!(summary.contains("Will include autocorrelations."));
        assert!(summary.contains("Will not apply a Blackman window."));
        assert!(summary.contains("single thread"));
    }

    #[test]
    fn test_self_correlation_is_spectrum_real() {
        let signal = noise(4096, 7).mapv(|x| Complex64::new(x, 0.0));
        for (blackman, polyphase) in [(false, false), (true, false), (false, true), (true, true)] {
            let config = CorrelatorConfig {
                lfft: 32,
                blackman_filter: blackman,
                polyphase_filter: polyphase,
                sample_rate: Some(1e6),
                ..CorrelatorConfig::default()
            };
            let freq = FrequencyGrid::new(32, SampleKind::Real, 1e6, 0.0);
            let cache = zero_cache(&freq, &[3]);
            let vis = correlate(
                signal.view(),
                signal.view(),
                3,
                3,
                SampleKind::Real,
                &freq,
                &config,
                &cache,
            )
            .unwrap();
            let spectrum =
                calc_spectrum(signal.view(), SampleKind::Real, 32, blackman, polyphase).unwrap();
            for (v, p) in vis.iter().zip(spectrum.iter()) {
                assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-9);
                assert!(v.re >= 0.0);
                assert_abs_diff_eq!(v.re, *p, epsilon = 1e-9 * p.max(1.0));
            }
        }
    }

    #[test]
    fn test_self_correlation_is_spectrum_complex() {
        let signal = noise(2048, 1)
            .iter()
            .zip(noise(2048, 2).iter())
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect::<Array1<_>>();
        let config = CorrelatorConfig {
            lfft: 16,
            blackman_filter: true,
            sample_rate: Some(1e5),
            ..CorrelatorConfig::default()
        };
        let freq = FrequencyGrid::new(16, SampleKind::Complex, 1e5, 0.0);
        let cache = zero_cache(&freq, &[0]);
        let vis = correlate(
            signal.view(),
            signal.view(),
            0,
            0,
            SampleKind::Complex,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        let spectrum = calc_spectrum(signal.view(), SampleKind::Complex, 16, true, false).unwrap();
        for (v, p) in vis.iter().zip(spectrum.iter()) {
            assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(v.re, *p, epsilon = 1e-9 * p.max(1.0));
        }
    }

    #[test]
    fn test_conjugate_symmetry() {
        let signal1 = noise(1024, 3).mapv(|x| Complex64::new(x, 0.0));
        let signal2 = noise(1024, 4).mapv(|x| Complex64::new(x, 0.0));
        let config = CorrelatorConfig {
            lfft: 16,
            overlap: 2,
            ..CorrelatorConfig::default()
        };
        let freq = FrequencyGrid::new(16, SampleKind::Real, config.sample_rate_hz(), 0.0);
        let cache = zero_cache(&freq, &[1, 2]);
        let forward = correlate(
            signal1.view(),
            signal2.view(),
            1,
            2,
            SampleKind::Real,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        let reverse = correlate(
            signal2.view(),
            signal1.view(),
            2,
            1,
            SampleKind::Real,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        for (f, r) in forward.iter().zip(reverse.iter()) {
            assert_abs_diff_eq!(*f, r.conj(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_complex_tone_peak() {
        let sample_rate = 64e3;
        let tone = complex_tone(8192, 10e3, sample_rate);
        let config = CorrelatorConfig {
            sample_rate: Some(sample_rate),
            ..CorrelatorConfig::default()
        };
        let freq = FrequencyGrid::new(64, SampleKind::Complex, sample_rate, 0.0);
        let cache = zero_cache(&freq, &[1, 2]);
        let vis = correlate(
            tone.view(),
            tone.view(),
            1,
            2,
            SampleKind::Complex,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        let peak = freq.nearest_idx(10e3).unwrap();
        assert_eq!(peak, 41);
        assert_abs_diff_eq!(vis[peak].re, 4096.0, epsilon = 1e-6);
        for (k, v) in vis.iter().enumerate() {
            if k != peak {
                assert!(v.norm() < 1e-6, "bin {k} has {v}");
            }
        }
    }

    #[test]
    fn test_whole_sample_delay_is_aligned() {
        let sample_rate = 1e6;
        let base = noise(2053, 11).mapv(|x| Complex64::new(x, 0.0));
        // antenna 2 lags by 5 samples, so antenna 1 is advanced by 5
        let signal1 = base.view();
        let signal2 = base.slice(s![5..]);
        let config = CorrelatorConfig {
            lfft: 32,
            sample_rate: Some(sample_rate),
            ..CorrelatorConfig::default()
        };
        let freq = FrequencyGrid::new(32, SampleKind::Real, sample_rate, 0.0);
        let model = SampleDelay {
            samples: HashMap::from([(1, 0.0), (2, 5.0)]),
            sample_rate,
        };
        let mut cache = DelayCache::new(Box::new(model), freq.clone());
        cache.populate(&[1, 2]).unwrap();

        let cross = correlate(
            signal1,
            signal2,
            1,
            2,
            SampleKind::Real,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        let auto = correlate(
            signal2,
            signal2,
            2,
            2,
            SampleKind::Real,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        for (c, a) in cross.iter().zip(auto.iter()) {
            assert_abs_diff_eq!(*c, *a, epsilon = 1e-9);
        }

        // whole sample delays leave no residual to correct
        let corrected = correlate(
            signal1,
            signal2,
            1,
            2,
            SampleKind::Real,
            &freq,
            &CorrelatorConfig {
                apply_phase_correction: true,
                ..config
            },
            &cache,
        )
        .unwrap();
        for (c, a) in corrected.iter().zip(auto.iter()) {
            assert_abs_diff_eq!(*c, *a, epsilon = 1e-9);
        }
    }

    /// Delays of `samples + slope * freq_hz` samples, per antenna.
    struct LinearDelay {
        samples: HashMap<AntennaId, (f64, f64)>,
        sample_rate: f64,
    }

    impl SignalDelay for LinearDelay {
        fn signal_delay(&self, antenna: AntennaId, freqs_hz: &[f64]) -> Result<Vec<f64>, FxError> {
            let (samples, slope) = self
                .samples
                .get(&antenna)
                .ok_or(FxError::UnknownAntenna { antenna })?;
            Ok(freqs_hz
                .iter()
                .map(|f| (samples + slope * f) / self.sample_rate)
                .collect())
        }
    }

    #[test]
    fn test_shift_applies_to_prepared_signal() {
        let sample_rate = 1e6;
        let lfft = 16;
        let chunk_len = 2 * lfft;
        // a ramp makes the mean depend on which samples are included
        let ramp = |seed| {
            noise(4096, seed)
                .iter()
                .enumerate()
                .map(|(n, &x)| Complex64::new(x + n as f64 * 1e-3, 0.0))
                .collect::<Array1<_>>()
        };
        let (signal1, signal2) = (ramp(21), ramp(22));
        let freq = FrequencyGrid::new(lfft, SampleKind::Real, sample_rate, 0.0);
        let model = SampleDelay {
            samples: HashMap::from([(1, 0.0), (2, 40.0)]),
            sample_rate,
        };
        let mut cache = DelayCache::new(Box::new(model), freq.clone());
        cache.populate(&[1, 2]).unwrap();

        for (blackman, polyphase) in [(true, false), (false, true), (true, true)] {
            let config = CorrelatorConfig {
                lfft,
                blackman_filter: blackman,
                polyphase_filter: polyphase,
                sample_rate: Some(sample_rate),
                ..CorrelatorConfig::default()
            };
            let vis = correlate(
                signal1.view(),
                signal2.view(),
                1,
                2,
                SampleKind::Real,
                &freq,
                &config,
                &cache,
            )
            .unwrap();

            // filter and remove the mean of the whole signal, then skip 40
            // samples of antenna 1
            let channelizer = Channelizer::new(lfft, SampleKind::Real, blackman);
            let prepare = |signal: &Array1<Complex64>| {
                let mut prepared = if polyphase {
                    polyphase_filter(signal.view(), chunk_len, POLYPHASE_WINDOWS).unwrap()
                } else {
                    signal.clone()
                };
                remove_mean(&mut prepared);
                prepared
            };
            let (prepared1, prepared2) = (prepare(&signal1), prepare(&signal2));
            let num_chunks = (prepared1.len() - 40) / chunk_len;
            let mut expected = Array1::<Complex64>::zeros(lfft - 1);
            for chunk_idx in 0..num_chunks {
                let offset = chunk_idx * chunk_len;
                let x1 = channelizer
                    .channelize(prepared1.slice(s![40 + offset..40 + offset + chunk_len]))
                    .unwrap();
                let x2 = channelizer
                    .channelize(prepared2.slice(s![offset..offset + chunk_len]))
                    .unwrap();
                for (acc, (a, b)) in expected.iter_mut().zip(x1.iter().zip(x2.iter())) {
                    *acc += b * a.conj() / num_chunks as f64;
                }
            }
            for (v, e) in vis.iter().zip(expected.iter()) {
                assert_abs_diff_eq!(*v, *e, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_phase_correction_fractional_delay() {
        let sample_rate = 1e6;
        let lfft = 32;
        let signal1 = noise(4096, 31).mapv(|x| Complex64::new(x, 0.0));
        let signal2 = noise(4096, 32).mapv(|x| Complex64::new(x, 0.0));
        let freq = FrequencyGrid::new(lfft, SampleKind::Real, sample_rate, 0.0);
        // antenna 2 lags by 5.3 samples plus a little more at high frequencies
        let model = LinearDelay {
            samples: HashMap::from([(1, (0.0, 0.0)), (2, (5.3, 1e-6))]),
            sample_rate,
        };
        let mut cache = DelayCache::new(Box::new(model), freq.clone());
        cache.populate(&[1, 2]).unwrap();
        let config = CorrelatorConfig {
            lfft,
            sample_rate: Some(sample_rate),
            ..CorrelatorConfig::default()
        };
        let plain = correlate(
            signal1.view(),
            signal2.view(),
            1,
            2,
            SampleKind::Real,
            &freq,
            &config,
            &cache,
        )
        .unwrap();
        let corrected = correlate(
            signal1.view(),
            signal2.view(),
            1,
            2,
            SampleKind::Real,
            &freq,
            &CorrelatorConfig {
                apply_phase_correction: true,
                ..config
            },
            &cache,
        )
        .unwrap();

        // the reference channel is 250 kHz, a delay of 5.55 samples
        let delay = cache.baseline_delay(1, 2, sample_rate).unwrap();
        assert_eq!((delay.start1, delay.start2), (6, 0));
        for (k, &freq_hz) in freq.freqs_hz().iter().enumerate() {
            let residual = (delay.delay1[k] - 6.0 / sample_rate) - delay.delay2[k];
            assert_abs_diff_eq!(residual * sample_rate, -0.7 + 1e-6 * freq_hz, epsilon = 1e-9);
            let rotation = Complex64::from_polar(1.0, 2.0 * PI * freq_hz * residual);
            assert_abs_diff_eq!(corrected[k], plain[k] * rotation, epsilon = 1e-9);
            if residual.abs() > 1e-9 {
                assert!((corrected[k] - plain[k]).norm() > 1e-6 * plain[k].norm());
            }
        }
    }

    #[test]
    fn test_insufficient_overlap() {
        let sample_rate = 1e6;
        let signal = noise(100, 5).mapv(|x| Complex64::new(x, 0.0));
        let freq = FrequencyGrid::new(32, SampleKind::Real, sample_rate, 0.0);
        let model = SampleDelay {
            samples: HashMap::from([(1, 0.0), (2, 50.0)]),
            sample_rate,
        };
        let mut cache = DelayCache::new(Box::new(model), freq.clone());
        cache.populate(&[1, 2]).unwrap();
        let config = CorrelatorConfig {
            lfft: 32,
            sample_rate: Some(sample_rate),
            ..CorrelatorConfig::default()
        };
        // 100 - 50 samples can't hold a 64 sample chunk
        assert!(matches!(
            correlate(
                signal.view(),
                signal.view(),
                1,
                2,
                SampleKind::Real,
                &freq,
                &config,
                &cache
            ),
            Err(FxError::InsufficientOverlap { ant1: 1, ant2: 2, .. })
        ));
    }

    #[test]
    fn test_stale_cache() {
        let signal = noise(256, 5).mapv(|x| Complex64::new(x, 0.0));
        let config = CorrelatorConfig {
            lfft: 16,
            ..CorrelatorConfig::default()
        };
        let freq = FrequencyGrid::new(16, SampleKind::Real, config.sample_rate_hz(), 0.0);
        let other = FrequencyGrid::new(16, SampleKind::Real, 1e6, 0.0);
        let cache = zero_cache(&other, &[1, 2]);
        assert!(matches!(
            correlate(
                signal.view(),
                signal.view(),
                1,
                2,
                SampleKind::Real,
                &freq,
                &config,
                &cache
            ),
            Err(FxError::StaleDelayCache)
        ));
    }
}
