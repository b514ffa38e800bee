//! Command Line Interface helpers for fxcorr

use crate::{
    constants::STATION_LATITUDE_DEG,
    delay::{AntennaGeometry, DelayCache, SignalDelay, StationGeometry, ZeroDelay},
    error::{CLIError::InvalidCommandLineArgument, FxError, FxError::DryRun},
    fx::correlate_windows,
    io::{
        create_buffered, error::IOError, raw::RawSamples, vis_csv::write_spectra,
        vis_csv::write_visibilities, IOContext,
    },
    spectrum::calc_spectra,
    util::fmt_freqs_mhz,
    uvw::HADec,
    with_increment_duration, AntennaId, CorrelatorConfig, CorrelatorConfigBuilder, FrequencyGrid,
    PolProduct, SampleKind,
};
use clap::{
    arg, command,
    ErrorKind::{ArgumentNotFound, DisplayHelp, DisplayVersion},
    ValueHint::FilePath,
};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use prettytable::{format as prettyformat, row, table};
use std::{
    collections::HashMap,
    ffi::OsString,
    fmt::{Debug, Display},
    time::Duration,
};

/// How one antenna's stream will be aligned, for the summary.
#[derive(Debug, Clone)]
pub struct AntennaSummary {
    /// the antenna's row, or pair of rows when dual polarisation
    pub row: usize,
    /// antenna identity
    pub id: AntennaId,
    /// position and cable, if an antenna table was given
    pub geometry: Option<AntennaGeometry>,
    /// total delay at the reference channel \[s\]
    pub delay_s: f64,
    /// samples skipped to line the antenna up with the most delayed antenna
    pub shift: usize,
}

/// Args for correlating a sample file.
pub struct FxContext {
    /// Input / output paths
    pub io_ctx: IOContext,
    /// The samples to correlate
    pub raw: RawSamples,
    /// Channelisation and correlation parameters
    pub corr_config: CorrelatorConfig,
    /// Antenna identities, one per antenna row (or row pair)
    pub antennas: Vec<AntennaId>,
    /// Antenna positions and cables, zero delays if not given
    pub geometry: Option<StationGeometry>,
    /// Whether rows are interleaved X and Y polarisations
    pub dual_pol: bool,
    /// Polarisation products to correlate
    pub products: Vec<PolProduct>,
    /// samples per averaging window, all samples if None
    pub window_samples: Option<usize>,
    /// chunks averaged into each spectrum segment, all samples if None
    pub spectra_average: Option<usize>,
    /// per antenna delay summary
    pub antenna_summary: Vec<AntennaSummary>,
    /// where baseline coordinates are projected to
    pub phase_centre: HADec,
    /// latitude of the station \[rad\]
    pub latitude_rad: f64,
}

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

/// Write many info-level log lines of how this executable was compiled.
///
/// # Errors
///
/// propagates writeln! fails
pub fn fmt_build_info(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match GIT_HEAD_REF {
        Some(hr) => {
            let dirty = GIT_DIRTY.unwrap_or(false);
            writeln!(
                f,
                "Compiled on git commit hash: {}{}",
                GIT_COMMIT_HASH.unwrap_or("<unknown>"),
                if dirty { " (dirty)" } else { "" }
            )?;
            writeln!(f, "            git head ref: {}", hr)?;
        }
        None => writeln!(f, "Compiled on git commit hash: <no git info>")?,
    }
    writeln!(f, "            {}", BUILT_TIME_UTC)?;
    writeln!(f, "         with compiler {}", RUSTC_VERSION)?;
    writeln!(f)?;
    Ok(())
}

impl Display for FxContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} version {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
        )?;

        fmt_build_info(f)?;

        let signals = &self.raw.signals;
        writeln!(f, "Sample file:          {}", self.io_ctx.samples_in)?;
        writeln!(
            f,
            "Samples:              {} inputs of {} {} samples",
            signals.num_inputs(),
            signals.num_samples(),
            signals.kind,
        )?;
        if signals.kind == SampleKind::Complex {
            writeln!(
                f,
                "Central frequency:    {} Hz",
                self.corr_config.central_freq
            )?;
        }
        let freq = FrequencyGrid::new(
            self.corr_config.lfft,
            signals.kind,
            self.corr_config.sample_rate_hz(),
            self.corr_config.central_freq,
        );
        writeln!(f, "Channels:             {}", fmt_freqs_mhz(freq.freqs_hz()))?;
        writeln!(
            f,
            "Polarisations:        {} ({})",
            if self.dual_pol { "dual" } else { "single" },
            self.products.iter().join(", ")
        )?;
        match self.window_samples {
            Some(window_samples) => writeln!(
                f,
                "Averaging:            {} window(s) of {} samples ({:.6} s)",
                signals.num_samples() / window_samples,
                window_samples,
                window_samples as f64 / self.corr_config.sample_rate_hz()
            )?,
            None => writeln!(f, "Averaging:            all samples in one window")?,
        }

        write!(f, "{}", &self.corr_config)?;

        let mut ant_table = table!([
            "",
            "id",
            "east [m]",
            "north [m]",
            "up [m]",
            "cable [m]",
            "delay [ns]",
            "shift"
        ]);
        ant_table.set_format(*prettyformat::consts::FORMAT_CLEAN);
        for summary in &self.antenna_summary {
            let (east, north, up, cable) = match &summary.geometry {
                Some(geometry) => (
                    format!("{:.3}", geometry.enu_m[0]),
                    format!("{:.3}", geometry.enu_m[1]),
                    format!("{:.3}", geometry.enu_m[2]),
                    format!("{:.3}", geometry.cable.length_m),
                ),
                None => ("-".into(), "-".into(), "-".into(), "-".into()),
            };
            ant_table.add_row(row![r =>
                format!("ant{}:", summary.row),
                summary.id,
                east,
                north,
                up,
                cable,
                format!("{:.3}", summary.delay_s * 1e9),
                summary.shift
            ]);
        }
        writeln!(
            f,
            "Antenna details (antennas={}, delays at {:.6} MHz):\n{}",
            self.antennas.len(),
            freq.freqs_hz()
                .get(freq.delay_ref_idx())
                .copied()
                .unwrap_or_default()
                / 1e6,
            ant_table
        )?;

        if self.geometry.is_some() {
            writeln!(
                f,
                "Will compute uvw towards HA {:.4} h, dec {:.4} deg from latitude {:.4} deg.",
                self.phase_centre.ha.to_degrees() / 15.0,
                self.phase_centre.dec.to_degrees(),
                self.latitude_rad.to_degrees()
            )?;
        } else {
            writeln!(f, "Will not compute uvw without an antenna table.")?;
        }

        match &self.io_ctx.vis_out {
            Some(vis_out) => writeln!(f, "Will write visibilities to {vis_out}")?,
            None => writeln!(f, "Will not write visibilities.")?,
        }
        if let Some(spectra_out) = &self.io_ctx.spectra_out {
            writeln!(f, "Will write spectra to {spectra_out}")?;
        }
        Ok(())
    }
}

fn invalid_arg(option: &str, expected: impl Into<String>, received: impl Display) -> FxError {
    FxError::CLIError(InvalidCommandLineArgument {
        option: option.into(),
        expected: expected.into(),
        received: format!("{received}"),
    })
}

impl FxContext {
    fn get_matches<I, T>(args: I) -> Result<clap::ArgMatches, FxError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        let mut app = command!()
            .arg_required_else_help(true)
            .next_line_help(false)
            .about("Channelise and cross-correlate the time series of an antenna array.")
            .args(&[
                // input options
                arg!(-i --input <PATH> "Raw sample file to correlate")
                    .required(true)
                    .value_hint(FilePath)
                    .help_heading("INPUT"),
                arg!(-a --antennas <PATH> "CSV table of antenna positions and cables, one row per antenna")
                    .required(false)
                    .value_hint(FilePath)
                    .help_heading("INPUT"),
                arg!(--"dual-pol" "Rows are interleaved X and Y polarisations (implied by an antenna table with half as many rows)")
                    .help_heading("INPUT"),
                arg!(--"sample-rate" <HZ> "Override the sample rate from the sample file")
                    .required(false)
                    .help_heading("INPUT"),
                arg!(--"central-freq" <HZ> "Override the central frequency from the sample file")
                    .required(false)
                    .help_heading("INPUT"),

                // processing options
                arg!(--"dry-run" "Just print the summary and exit"),
                arg!(--"no-draw-progress" "do not show progress bars"),

                // correlation options
                arg!(-l --"fft-length" <LFFT> "Transform length, one more than the number of channels [default: 64]")
                    .required(false)
                    .help_heading("CORRELATION"),
                arg!(--overlap <COUNT> "Overlapping chunks per transform length [default: 1]")
                    .required(false)
                    .help_heading("CORRELATION"),
                arg!(-t --"avg-time" <SECONDS> "Length of each averaging window, all samples if not given")
                    .required(false)
                    .help_heading("CORRELATION"),
                arg!(-p --products <POL>... "Polarisation products to correlate, XX YY XY or YX [default: XX]")
                    .multiple_values(true)
                    .required(false)
                    .help_heading("CORRELATION"),
                arg!(--"include-auto" "Correlate each antenna with itself")
                    .help_heading("CORRELATION"),
                arg!(--blackman "Apply a Blackman window to each chunk")
                    .help_heading("CORRELATION"),
                arg!(--polyphase "Polyphase filter the signals before channelising")
                    .help_heading("CORRELATION"),
                arg!(--"phase-correction" "Rotate out the delay left after whole sample alignment")
                    .help_heading("CORRELATION"),
                arg!(--pointing "Direction being observed (degrees) [default: zenith]")
                    .value_names(&["AZ", "EL"])
                    .required(false)
                    .help_heading("CORRELATION"),
                arg!(--"phase-centre" "Phase centre for uvw, hour angle (hours) and declination (degrees) [default: zenith]")
                    .value_names(&["HA", "DEC"])
                    .required(false)
                    .allow_hyphen_values(true)
                    .help_heading("CORRELATION"),
                arg!(--latitude <DEG> "Latitude of the station (degrees) [default: 34.070]")
                    .required(false)
                    .allow_hyphen_values(true)
                    .help_heading("CORRELATION"),

                // resource limit options
                arg!(--"no-pool" "Correlate every baseline on the calling thread")
                    .help_heading("RESOURCE LIMITS"),
                arg!(--"num-workers" <COUNT> "Size of the worker pool [default: 4]")
                    .required(false)
                    .conflicts_with("no-pool")
                    .help_heading("RESOURCE LIMITS"),

                // output options
                arg!(-o --"vis-out" <PATH> "Path for visibility output as CSV")
                    .required(false)
                    .value_hint(FilePath)
                    .help_heading("OUTPUT"),
                arg!(--"spectra-out" <PATH> "Path for power spectra of each input as CSV")
                    .required(false)
                    .value_hint(FilePath)
                    .help_heading("OUTPUT"),
                arg!(--"spectra-avg" <CHUNKS> "Chunks averaged into each spectrum, all samples if not given")
                    .required(false)
                    .requires("spectra-out")
                    .help_heading("OUTPUT"),
            ]);

        app.try_get_matches_from_mut(args).map_err(FxError::from)
    }

    fn parse_io_matches(matches: &clap::ArgMatches) -> IOContext {
        IOContext {
            samples_in: matches.value_of("input").map(Into::into).unwrap_or_default(),
            antennas_in: matches.value_of("antennas").map(Into::into),
            vis_out: matches.value_of("vis-out").map(Into::into),
            spectra_out: matches.value_of("spectra-out").map(Into::into),
        }
    }

    fn parse_corr_matches(
        matches: &clap::ArgMatches,
        raw: &RawSamples,
    ) -> Result<CorrelatorConfig, FxError> {
        let mut builder = CorrelatorConfigBuilder::default();

        match matches.value_of_t::<usize>("fft-length") {
            Ok(lfft) if lfft < 2 => {
                return Err(invalid_arg(
                    "--fft-length <LFFT>",
                    "an integer of at least 2",
                    lfft,
                ))
            }
            Ok(lfft) => {
                builder.lfft(lfft);
            }
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => {}
        };
        match matches.value_of_t::<usize>("overlap") {
            Ok(0) => {
                return Err(invalid_arg(
                    "--overlap <COUNT>",
                    "a positive, non-zero integer",
                    0,
                ))
            }
            Ok(overlap) => {
                builder.overlap(overlap);
            }
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => {}
        };
        match matches.value_of_t::<usize>("num-workers") {
            Ok(0) => {
                return Err(invalid_arg(
                    "--num-workers <COUNT>",
                    "a positive, non-zero integer",
                    0,
                ))
            }
            Ok(num_workers) => {
                builder.num_workers(num_workers);
            }
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => {}
        };
        let sample_rate = match matches.value_of_t::<f64>("sample-rate") {
            Ok(rate) => rate,
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => raw.sample_rate_hz,
        };
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(invalid_arg(
                "--sample-rate <HZ>",
                "a positive sample rate",
                sample_rate,
            ));
        }
        let central_freq = match matches.value_of_t::<f64>("central-freq") {
            Ok(freq) => freq,
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => raw.central_freq_hz,
        };

        let corr_config = builder
            .sample_rate(Some(sample_rate))
            .central_freq(central_freq)
            .include_auto(matches.is_present("include-auto"))
            .blackman_filter(matches.is_present("blackman"))
            .polyphase_filter(matches.is_present("polyphase"))
            .apply_phase_correction(matches.is_present("phase-correction"))
            .disable_pool(matches.is_present("no-pool"))
            .draw_progress(!matches.is_present("no-draw-progress"))
            .build()
            .map_err(|err| invalid_arg("correlation options", "a valid combination", err))?;
        corr_config.validate()?;
        Ok(corr_config)
    }

    /// Work out which antenna is in which row, and whether the rows are
    /// interleaved polarisations.
    fn parse_antenna_matches(
        matches: &clap::ArgMatches,
        io_ctx: &IOContext,
        raw: &RawSamples,
        antenna_table: Option<Vec<AntennaGeometry>>,
    ) -> Result<(Vec<AntennaId>, Option<StationGeometry>, bool), FxError> {
        let num_rows = raw.signals.num_inputs();
        let pointing = match matches.values_of_t::<f64>("pointing") {
            Ok(values) => match values[..] {
                [az, el] => Some((az.to_radians(), el.to_radians())),
                _ => return Err(invalid_arg("--pointing <AZ> <EL>", "two angles", values.len())),
            },
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => None,
        };

        let Some(antenna_table) = antenna_table else {
            if pointing.is_some() {
                warn!("--pointing has no effect without an antenna table");
            }
            let dual_pol = matches.is_present("dual-pol");
            if dual_pol && num_rows % 2 != 0 {
                return Err(invalid_arg(
                    "--dual-pol",
                    "an even number of inputs",
                    num_rows,
                ));
            }
            let num_ants = if dual_pol { num_rows / 2 } else { num_rows };
            return Ok(((0..num_ants as AntennaId).collect(), None, dual_pol));
        };

        let num_ants = antenna_table.len();
        let dual_pol = if num_rows == 2 * num_ants && num_ants > 0 {
            true
        } else if num_rows == num_ants && !matches.is_present("dual-pol") {
            false
        } else {
            return Err(IOError::AntennaMismatch {
                file: io_ctx.antennas_in.clone().unwrap_or_default(),
                message: format!(
                    "{} antennas don't match {} inputs in {}",
                    num_ants, num_rows, io_ctx.samples_in
                ),
            }
            .into());
        };
        let antennas = antenna_table.iter().map(|ant| ant.id).collect();
        let mut geometry = StationGeometry::new(antenna_table);
        if let Some((az, el)) = pointing {
            geometry = geometry.with_pointing(az, el);
        }
        Ok((antennas, Some(geometry), dual_pol))
    }

    fn parse_product_matches(
        matches: &clap::ArgMatches,
        dual_pol: bool,
    ) -> Result<Vec<PolProduct>, FxError> {
        let products: Vec<PolProduct> = match matches.values_of("products") {
            Some(values) => values
                .map(str::parse)
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .unique()
                .collect(),
            None => vec![PolProduct::XX],
        };
        if !dual_pol {
            if let Some(product) = products.iter().find(|&&product| product != PolProduct::XX) {
                return Err(invalid_arg(
                    "--products <POL>",
                    "XX for single polarisation inputs",
                    product,
                ));
            }
        }
        Ok(products)
    }

    fn parse_avg_matches(
        matches: &clap::ArgMatches,
        corr_config: &CorrelatorConfig,
        num_samples: usize,
    ) -> Result<(Option<usize>, Option<usize>), FxError> {
        let sample_rate_hz = corr_config.sample_rate_hz();
        let window_samples = match matches.value_of_t::<f64>("avg-time") {
            // filter any errors other than ArgumentNotFound
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Ok(seconds) => {
                let samples = (seconds * sample_rate_hz).round();
                if !(samples >= 1.0 && samples <= num_samples as f64) {
                    return Err(invalid_arg(
                        "--avg-time <SECONDS>",
                        format!(
                            "between {} and {} seconds",
                            1.0 / sample_rate_hz,
                            num_samples as f64 / sample_rate_hz
                        ),
                        seconds,
                    ));
                }
                Some(samples as usize)
            }
            Err(_) => None,
        };
        let spectra_average = match matches.value_of_t::<usize>("spectra-avg") {
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Ok(0) => {
                return Err(invalid_arg(
                    "--spectra-avg <CHUNKS>",
                    "a positive, non-zero integer",
                    0,
                ))
            }
            Ok(chunks) => Some(chunks),
            Err(_) => None,
        };
        Ok((window_samples, spectra_average))
    }

    /// The phase centre and station latitude used for uvw.
    fn parse_uvw_matches(matches: &clap::ArgMatches) -> Result<(HADec, f64), FxError> {
        let latitude_deg = match matches.value_of_t::<f64>("latitude") {
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Ok(latitude_deg) if !(-90.0..=90.0).contains(&latitude_deg) => {
                return Err(invalid_arg(
                    "--latitude <DEG>",
                    "between -90 and 90 degrees",
                    latitude_deg,
                ))
            }
            Ok(latitude_deg) => latitude_deg,
            Err(_) => STATION_LATITUDE_DEG,
        };
        let latitude_rad = latitude_deg.to_radians();
        let phase_centre = match matches.values_of_t::<f64>("phase-centre") {
            Ok(values) => match values[..] {
                [ha_hours, dec_deg] => HADec::from_hours_degrees(ha_hours, dec_deg),
                _ => {
                    return Err(invalid_arg(
                        "--phase-centre <HA> <DEC>",
                        "an hour angle and a declination",
                        values.len(),
                    ))
                }
            },
            Err(err) if err.kind() != ArgumentNotFound => return Err(err.into()),
            Err(_) => HADec::zenith(latitude_rad),
        };
        Ok((phase_centre, latitude_rad))
    }

    /// The delay of each antenna at the reference channel, and the whole
    /// sample shift which lines it up with the most delayed antenna.
    fn summarise_antennas(
        antennas: &[AntennaId],
        geometry: Option<&StationGeometry>,
        corr_config: &CorrelatorConfig,
        kind: SampleKind,
    ) -> Result<Vec<AntennaSummary>, FxError> {
        let freq = FrequencyGrid::new(
            corr_config.lfft,
            kind,
            corr_config.sample_rate_hz(),
            corr_config.central_freq,
        );
        let ref_freq_hz = freq
            .freqs_hz()
            .get(freq.delay_ref_idx())
            .copied()
            .unwrap_or_default();
        let model: &dyn SignalDelay = match geometry {
            Some(geometry) => geometry,
            None => &ZeroDelay,
        };
        let delays = antennas
            .iter()
            .map(|&antenna| {
                model
                    .signal_delay(antenna, &[ref_freq_hz])
                    .map(|delays| delays.first().copied().unwrap_or_default())
            })
            .collect::<Result<Vec<_>, _>>()?;
        let max_delay = delays.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(antennas
            .iter()
            .zip(delays)
            .enumerate()
            .map(|(row, (&id, delay_s))| AntennaSummary {
                row,
                id,
                geometry: geometry.and_then(|geometry| geometry.antenna(id)).cloned(),
                delay_s,
                shift: ((max_delay - delay_s) * corr_config.sample_rate_hz()).round() as usize,
            })
            .collect())
    }

    /// Parse command line arguments and read the inputs.
    ///
    /// # Errors
    ///
    /// - [`FxError::ClapError`] for arguments clap doesn't understand
    /// - [`FxError::CLIError`] for arguments with invalid values
    /// - [`FxError::IOError`] if the inputs can't be read or don't match
    /// - [`FxError::DryRun`] after printing the summary if `--dry-run`
    pub fn from_args<I, T>(args: I) -> Result<Self, FxError>
    where
        I: IntoIterator<Item = T> + Debug,
        T: Into<OsString> + Clone,
    {
        debug!("args:\n{:?}", &args);

        let matches = Self::get_matches(args)?;
        trace!("arg matches:\n{:?}", &matches);

        let io_ctx = Self::parse_io_matches(&matches);
        let raw = io_ctx.read_samples()?;
        let antenna_table = io_ctx.read_antennas()?;
        let corr_config = Self::parse_corr_matches(&matches, &raw)?;
        let (antennas, geometry, dual_pol) =
            Self::parse_antenna_matches(&matches, &io_ctx, &raw, antenna_table)?;
        let products = Self::parse_product_matches(&matches, dual_pol)?;
        let (window_samples, spectra_average) =
            Self::parse_avg_matches(&matches, &corr_config, raw.signals.num_samples())?;
        let (phase_centre, latitude_rad) = Self::parse_uvw_matches(&matches)?;
        let antenna_summary = Self::summarise_antennas(
            &antennas,
            geometry.as_ref(),
            &corr_config,
            raw.signals.kind,
        )?;

        let result = Self {
            io_ctx,
            raw,
            corr_config,
            antennas,
            geometry,
            dual_pol,
            products,
            window_samples,
            spectra_average,
            antenna_summary,
            phase_centre,
            latitude_rad,
        };

        info!("{}", &result);

        if matches.is_present("dry-run") {
            return Err(DryRun {});
        }

        Ok(result)
    }

    /// Compute spectra, correlate each polarisation product and write the
    /// results.
    ///
    /// # Errors
    ///
    /// Will return any error from [`calc_spectra`], [`correlate_windows`] or
    /// the writers.
    pub fn run(self) -> Result<HashMap<String, Duration>, FxError> {
        let FxContext {
            io_ctx,
            raw,
            corr_config,
            antennas,
            geometry,
            dual_pol,
            products,
            window_samples,
            spectra_average,
            phase_centre,
            latitude_rad,
            ..
        } = self;

        // used to time large operations
        let mut durations = HashMap::<String, Duration>::new();

        if let Some(spectra_out) = io_ctx.spectra_out.as_ref() {
            let (freq, power) = with_increment_duration!(
                durations,
                "spectra",
                calc_spectra(raw.signals.view(), &corr_config, spectra_average)?
            );
            with_increment_duration!(
                durations,
                "write",
                write_spectra(create_buffered(spectra_out)?, &freq, power.view())?
            );
        }

        let model: Box<dyn SignalDelay> = match geometry.as_ref() {
            Some(geometry) => Box::new(geometry.clone()),
            None => Box::new(ZeroDelay),
        };
        let mut cache = DelayCache::new(model, FrequencyGrid::from_freqs(vec![]));

        let mut outputs = Vec::with_capacity(products.len());
        for pol in products {
            let (signals, cross_pol) = if dual_pol {
                let (first, second) = pol.pol_offsets();
                (
                    raw.signals.select_inputs(first, 2),
                    pol.is_cross()
                        .then(|| raw.signals.select_inputs(second, 2)),
                )
            } else {
                (raw.signals.clone(), None)
            };
            let mut output = with_increment_duration!(
                durations,
                "correlate",
                correlate_windows(
                    signals.view(),
                    &antennas,
                    &corr_config,
                    cross_pol.as_ref().map(|cross_pol| cross_pol.view()),
                    &mut cache,
                    window_samples,
                    pol,
                )?
            );
            info!(
                "{}: {} baselines x {} channels in {} window(s) of {:.6} s",
                pol,
                output.baselines.len(),
                output.freq.len(),
                output.num_windows(),
                output.int_time_s
            );
            if let Some(geometry) = geometry.as_ref() {
                output.set_uvw(geometry, phase_centre, latitude_rad)?;
            }
            outputs.push(output);
        }

        if let Some(vis_out) = io_ctx.vis_out.as_ref() {
            with_increment_duration!(
                durations,
                "write",
                write_visibilities(create_buffered(vis_out)?, &outputs)?
            );
        }

        Ok(durations)
    }
}

/// Parse `args`, then correlate, returning the process exit code.
pub fn main_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    I: Debug,
{
    let fx_ctx = match FxContext::from_args(args) {
        Ok(fx_ctx) => fx_ctx,
        Err(DryRun {}) => {
            info!("Dry run. No files will be written.");
            return 0;
        }
        Err(FxError::ClapError(inner)) => {
            // Swallow broken pipe errors
            trace!("clap error: {:?}", inner.kind());
            let _ = inner.print();
            match inner.kind() {
                DisplayHelp | DisplayVersion => return 0,
                _ => return 1,
            }
        }
        Err(e) => {
            eprintln!("error parsing args: {e}");
            return 1;
        }
    };

    match fx_ctx.run() {
        Ok(durations) => {
            info!(
                "total duration: {:?}",
                durations
                    .into_iter()
                    .fold(Duration::ZERO, |duration_sum, (name, duration)| {
                        info!("{} duration: {:?}", name, duration);
                        duration_sum + duration
                    })
            );
            0
        }
        Err(e) => {
            eprintln!("correlation error: {e}");
            1
        }
    }
}

#[cfg(test)]
mod argparse_tests {
    use super::*;
    use crate::{
        constants::VEL_C, io::raw::SampleFormat, test_common::noise_matrix, SignalMatrix,
    };
    use approx::assert_abs_diff_eq;
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    fn write_samples(dir: &Path, num_inputs: usize, num_samples: usize) -> PathBuf {
        let path = dir.join("samples.fxs");
        RawSamples {
            signals: SignalMatrix::from_real(
                noise_matrix(num_inputs, num_samples, 7).mapv(|v| v * 1000.0),
            ),
            sample_rate_hz: 1e6,
            central_freq_hz: 0.0,
        }
        .write(&path, SampleFormat::I16Real)
        .unwrap();
        path
    }

    fn write_antennas(dir: &Path, table: &str) -> PathBuf {
        let path = dir.join("antennas.csv");
        std::fs::write(&path, table).unwrap();
        path
    }

    fn setup(num_inputs: usize) -> (TempDir, String) {
        let tmp_dir = tempdir().unwrap();
        let samples_path = write_samples(tmp_dir.path(), num_inputs, 2048);
        let samples = samples_path.to_str().unwrap().to_string();
        (tmp_dir, samples)
    }

    #[test]
    fn test_parse_missing_input() {
        let args = vec!["fxcorr", "--include-auto"];

        match FxContext::from_args(&args) {
            Err(FxError::ClapError(inner)) => assert!(matches!(
                inner.kind(),
                clap::error::ErrorKind::MissingRequiredArgument { .. }
            )),
            Err(e) => panic!("expected missing required argument error, not {}", e),
            Ok(_) => panic!("expected error, but got Ok(_)"),
        }
    }

    #[test]
    fn test_parse_invalid_input() {
        let tmp_dir = tempdir().unwrap();
        let missing = tmp_dir.path().join("missing.fxs");
        let args = vec!["fxcorr", "-i", missing.to_str().unwrap()];

        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::IOError(IOError::StdIo(_)))
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let (_tmp_dir, samples) = setup(3);
        let args = vec!["fxcorr", "-i", &samples, "--no-draw-progress"];

        let fx_ctx = FxContext::from_args(&args).unwrap();
        assert_eq!(fx_ctx.antennas, vec![0, 1, 2]);
        assert!(!fx_ctx.dual_pol);
        assert_eq!(fx_ctx.products, vec![PolProduct::XX]);
        assert_eq!(fx_ctx.corr_config.lfft, 64);
        assert_eq!(fx_ctx.corr_config.sample_rate, Some(1e6));
        assert!(!fx_ctx.corr_config.draw_progress);
        assert_eq!(fx_ctx.window_samples, None);
        assert!(fx_ctx.antenna_summary.iter().all(|ant| ant.shift == 0));
    }

    #[test]
    fn test_parse_invalid_fft_length() {
        let (_tmp_dir, samples) = setup(2);

        let args = vec!["fxcorr", "-i", &samples, "-l", "sixty-four"];
        match FxContext::from_args(&args) {
            Err(FxError::ClapError(inner)) => assert!(matches!(
                inner.kind(),
                clap::error::ErrorKind::ValueValidation { .. }
            )),
            Err(e) => panic!("expected value validation error, not {}", e),
            Ok(_) => panic!("expected error, but got Ok(_)"),
        }

        let args = vec!["fxcorr", "-i", &samples, "-l", "1"];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::CLIError(InvalidCommandLineArgument { .. }))
        ));

        // more overlap than samples per chunk
        let args = vec!["fxcorr", "-i", &samples, "-l", "4", "--overlap", "5"];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_parse_products() {
        let (_tmp_dir, samples) = setup(4);

        let args = vec!["fxcorr", "-i", &samples, "-p", "ZZ"];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::CLIError(InvalidCommandLineArgument { .. }))
        ));

        // cross products need two polarisations
        let args = vec!["fxcorr", "-i", &samples, "-p", "XY"];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::CLIError(InvalidCommandLineArgument { .. }))
        ));

        let args = vec!["fxcorr", "-i", &samples, "--dual-pol", "-p", "xx", "XY", "XX"];
        let fx_ctx = FxContext::from_args(&args).unwrap();
        assert!(fx_ctx.dual_pol);
        assert_eq!(fx_ctx.antennas, vec![0, 1]);
        assert_eq!(fx_ctx.products, vec![PolProduct::XX, PolProduct::XY]);
    }

    #[test]
    fn test_parse_avg_time() {
        let (_tmp_dir, samples) = setup(2);

        let args = vec!["fxcorr", "-i", &samples, "-t", "0.000512"];
        let fx_ctx = FxContext::from_args(&args).unwrap();
        assert_eq!(fx_ctx.window_samples, Some(512));

        for bad in ["0", "1.0", "0.0000001"] {
            let args = vec!["fxcorr", "-i", &samples, "-t", bad];
            assert!(
                matches!(
                    FxContext::from_args(&args),
                    Err(FxError::CLIError(InvalidCommandLineArgument { .. }))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_parse_antenna_table() {
        let (tmp_dir, samples) = setup(4);
        let antennas = write_antennas(
            tmp_dir.path(),
            "# id, east, north, up, cable\n\
             21, 0.0, 0.0, 0.0, 10.0\n\
             42, 0.0, 0.0, 0.0, 130.0\n",
        );
        let args = vec![
            "fxcorr",
            "-i",
            &samples,
            "-a",
            antennas.to_str().unwrap(),
            "-p",
            "YX",
        ];

        let fx_ctx = FxContext::from_args(&args).unwrap();
        // two antennas for four inputs
        assert!(fx_ctx.dual_pol);
        assert_eq!(fx_ctx.antennas, vec![21, 42]);
        assert_eq!(fx_ctx.antenna_summary.len(), 2);
        // 120 m more cable is ~0.48 us, or 0 samples at 1 MHz; ant 42 lags
        assert!(fx_ctx.antenna_summary[1].delay_s > fx_ctx.antenna_summary[0].delay_s);
        assert_eq!(fx_ctx.antenna_summary[1].shift, 0);

        let display = format!("{}", &fx_ctx);
        assert!(display.contains("fxcorr version"));
        assert!(display.contains("Polarisations:        dual (YX)"));
        assert!(display.contains("Will not include autocorrelations."));
        assert!(display.contains("ant1:"));
        assert!(display.contains("Will not write visibilities."));
        assert!(display.contains("Will compute uvw towards HA 0.0000 h, dec 34.0700 deg"));

        let (tmp_dir, samples) = setup(3);
        let antennas = write_antennas(tmp_dir.path(), "1, 0, 0, 0, 5\n2, 0, 0, 0, 5\n");
        let args = vec!["fxcorr", "-i", &samples, "-a", antennas.to_str().unwrap()];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::IOError(IOError::AntennaMismatch { .. }))
        ));
    }

    #[test]
    fn test_parse_phase_centre() {
        let (_tmp_dir, samples) = setup(2);

        let args = vec!["fxcorr", "-i", &samples];
        let fx_ctx = FxContext::from_args(&args).unwrap();
        assert_abs_diff_eq!(fx_ctx.latitude_rad, STATION_LATITUDE_DEG.to_radians());
        assert_eq!(fx_ctx.phase_centre, HADec::zenith(fx_ctx.latitude_rad));
        assert!(format!("{}", &fx_ctx).contains("Will not compute uvw without an antenna table."));

        let args = vec![
            "fxcorr",
            "-i",
            &samples,
            "--phase-centre",
            "2",
            "-10.5",
            "--latitude",
            "-26.7",
        ];
        let fx_ctx = FxContext::from_args(&args).unwrap();
        assert_abs_diff_eq!(fx_ctx.latitude_rad, (-26.7_f64).to_radians());
        assert_abs_diff_eq!(fx_ctx.phase_centre.ha, 30_f64.to_radians());
        assert_abs_diff_eq!(fx_ctx.phase_centre.dec, (-10.5_f64).to_radians());

        let args = vec!["fxcorr", "-i", &samples, "--latitude", "91"];
        assert!(matches!(
            FxContext::from_args(&args),
            Err(FxError::CLIError(InvalidCommandLineArgument { .. }))
        ));
    }

    #[test]
    fn test_parse_dry_run() {
        let (_tmp_dir, samples) = setup(2);
        let args = vec!["fxcorr", "-i", &samples, "--include-auto", "--dry-run"];

        assert!(matches!(FxContext::from_args(&args), Err(DryRun {})));
        assert_eq!(main_with_args(&args), 0);
    }

    #[test]
    fn test_run_writes_outputs() {
        let (tmp_dir, samples) = setup(3);
        let vis_path = tmp_dir.path().join("vis.csv");
        let spectra_path = tmp_dir.path().join("spectra.csv");
        let args = vec![
            "fxcorr",
            "-i",
            &samples,
            "-l",
            "16",
            "-t",
            "0.001024",
            "--no-pool",
            "--no-draw-progress",
            "-o",
            vis_path.to_str().unwrap(),
            "--spectra-out",
            spectra_path.to_str().unwrap(),
            "--spectra-avg",
            "32",
        ];

        let durations = FxContext::from_args(&args).unwrap().run().unwrap();
        assert!(durations.contains_key("correlate"));
        assert!(durations.contains_key("spectra"));
        assert!(durations.contains_key("write"));

        // 2 windows * 3 baselines * 15 channels
        let vis = std::fs::read_to_string(&vis_path).unwrap();
        assert_eq!(vis.lines().count(), 1 + 2 * 3 * 15);
        // 3 inputs * 2 segments of 32 chunks * 15 channels
        let spectra = std::fs::read_to_string(&spectra_path).unwrap();
        assert_eq!(spectra.lines().count(), 1 + 3 * 2 * 15);
    }

    #[test]
    fn test_run_writes_uvw() {
        let (tmp_dir, samples) = setup(2);
        let antennas = write_antennas(
            tmp_dir.path(),
            "# id, east, north, up, cable\n\
             21, 0.0, 0.0, 0.0, 10.0\n\
             42, 10.0, 0.0, 0.0, 10.0\n",
        );
        let vis_path = tmp_dir.path().join("vis.csv");
        let args = vec![
            "fxcorr",
            "-i",
            &samples,
            "-a",
            antennas.to_str().unwrap(),
            "-l",
            "16",
            "--no-pool",
            "--no-draw-progress",
            "-o",
            vis_path.to_str().unwrap(),
        ];
        FxContext::from_args(&args).unwrap().run().unwrap();

        let mut reader = csv::Reader::from_path(&vis_path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["window", "baseline", "ant1", "ant2", "pol", "freq_hz", "re", "im", "u", "v", "w"]
        );
        let records = reader.records().map(Result::unwrap).collect::<Vec<_>>();
        assert_eq!(records.len(), 15);
        for record in records {
            assert_eq!((&record[2], &record[3]), ("21", "42"));
            let value = |idx: usize| record[idx].parse::<f64>().unwrap();
            // ant 42 is 10 m east of ant 21, seen from the zenith
            assert_abs_diff_eq!(value(8), -10.0 * value(5) / VEL_C, epsilon = 1e-9);
            assert_abs_diff_eq!(value(9), 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(value(10), 0.0, epsilon = 1e-9);
        }
    }
}
