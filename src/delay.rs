//! Signal delays: the frequency dependent propagation and cable delay of each
//! antenna, and a cache of those delays for a fixed frequency grid.
//!
//! Correlating a baseline only needs the delay of each antenna *relative* to
//! the other. The antenna which lags at the reference channel (the middle of
//! the grid) becomes the common reference, and the other antenna's stream is
//! advanced by a whole number of samples.

use crate::{
    constants::{DEFAULT_CABLE_DISPERSION, DEFAULT_CABLE_VELOCITY_FACTOR, VEL_C},
    AntennaId, FrequencyGrid, FxError,
};
use log::{debug, trace};
use ndarray::Array1;
use std::collections::HashMap;

/// Anything that can give the total signal delay of an antenna as a function
/// of frequency.
pub trait SignalDelay: Send + Sync {
    /// Delay \[s\] of `antenna` at each of `freqs_hz`.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::UnknownAntenna`] if nothing is known about
    /// `antenna`.
    fn signal_delay(&self, antenna: AntennaId, freqs_hz: &[f64]) -> Result<Vec<f64>, FxError>;
}

/// Every antenna has zero delay at every frequency.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroDelay;

impl SignalDelay for ZeroDelay {
    fn signal_delay(&self, _antenna: AntennaId, freqs_hz: &[f64]) -> Result<Vec<f64>, FxError> {
        Ok(vec![0.0; freqs_hz.len()])
    }
}

/// A coaxial cable between the antenna and the digitiser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cable {
    /// physical length \[m\]
    pub length_m: f64,
    /// propagation speed as a fraction of the speed of light
    pub velocity_factor: f64,
    /// dispersion coefficient \[s Hz^0.5 per 100 m\]
    pub dispersion: f64,
}

impl Cable {
    /// A cable of the given length with the default velocity factor and
    /// dispersion.
    pub fn new(length_m: f64) -> Self {
        Self {
            length_m,
            velocity_factor: DEFAULT_CABLE_VELOCITY_FACTOR,
            dispersion: DEFAULT_CABLE_DISPERSION,
        }
    }

    /// Delay \[s\] through the cable at `freq_hz`: a bulk delay plus a
    /// dispersive term which falls off with the square root of frequency.
    /// The dispersive term is left out at zero frequency.
    pub fn delay(&self, freq_hz: f64) -> f64 {
        let bulk = self.length_m / (self.velocity_factor * VEL_C);
        let freq_hz = freq_hz.abs();
        if freq_hz > 0.0 {
            bulk + self.dispersion * (self.length_m / 100.0) / freq_hz.sqrt()
        } else {
            bulk
        }
    }
}

/// Where an antenna is and how it is cabled.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaGeometry {
    /// antenna identity
    pub id: AntennaId,
    /// east, north, up position relative to the array centre \[m\]
    pub enu_m: [f64; 3],
    /// the antenna's cable
    pub cable: Cable,
}

/// Geometric and cable delays for the antennas of a station.
#[derive(Debug, Clone)]
pub struct StationGeometry {
    antennas: HashMap<AntennaId, AntennaGeometry>,
    /// the direction being observed, (azimuth, elevation) \[rad\]
    pub pointing_az_el_rad: (f64, f64),
}

impl StationGeometry {
    /// A station observing zenith.
    pub fn new(antennas: Vec<AntennaGeometry>) -> Self {
        Self {
            antennas: antennas.into_iter().map(|ant| (ant.id, ant)).collect(),
            pointing_az_el_rad: (0.0, std::f64::consts::FRAC_PI_2),
        }
    }

    /// Observe a different direction.
    pub fn with_pointing(mut self, azimuth_rad: f64, elevation_rad: f64) -> Self {
        self.pointing_az_el_rad = (azimuth_rad, elevation_rad);
        self
    }

    /// Look up an antenna.
    pub fn antenna(&self, antenna: AntennaId) -> Option<&AntennaGeometry> {
        self.antennas.get(&antenna)
    }

    /// The number of antennas.
    pub fn len(&self) -> usize {
        self.antennas.len()
    }

    /// Whether there are no antennas.
    pub fn is_empty(&self) -> bool {
        self.antennas.is_empty()
    }

    /// Propagation delay \[s\] of a wavefront from the pointing direction to
    /// `geometry`, relative to the array centre. Antennas closer to the source
    /// see the wavefront first.
    pub fn geometric_delay(&self, geometry: &AntennaGeometry) -> f64 {
        let (az, el) = self.pointing_az_el_rad;
        let direction = [az.sin() * el.cos(), az.cos() * el.cos(), el.sin()];
        let projected: f64 = geometry
            .enu_m
            .iter()
            .zip(direction.iter())
            .map(|(p, s)| p * s)
            .sum();
        -projected / VEL_C
    }
}

impl SignalDelay for StationGeometry {
    fn signal_delay(&self, antenna: AntennaId, freqs_hz: &[f64]) -> Result<Vec<f64>, FxError> {
        let geometry = self
            .antenna(antenna)
            .ok_or(FxError::UnknownAntenna { antenna })?;
        let geometric = self.geometric_delay(geometry);
        Ok(freqs_hz
            .iter()
            .map(|&freq_hz| geometric + geometry.cable.delay(freq_hz))
            .collect())
    }
}

/// The delays of both antennas of a baseline, relative to whichever antenna
/// lags at the reference channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineDelay {
    /// relative delay of the first antenna \[s\]
    pub delay1: Array1<f64>,
    /// relative delay of the second antenna \[s\]
    pub delay2: Array1<f64>,
    /// whole samples to skip at the start of the first antenna's stream
    pub start1: usize,
    /// whole samples to skip at the start of the second antenna's stream
    pub start2: usize,
}

/// Per antenna delays for a single frequency grid.
///
/// The cache must be populated before correlation starts; lookups never
/// compute anything, so it can be shared between workers.
pub struct DelayCache {
    model: Box<dyn SignalDelay>,
    freq: FrequencyGrid,
    delays: HashMap<AntennaId, Array1<f64>>,
}

impl std::fmt::Debug for DelayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayCache")
            .field("num_chans", &self.freq.len())
            .field("antennas", &self.delays.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DelayCache {
    /// An empty cache for `freq`.
    pub fn new(model: Box<dyn SignalDelay>, freq: FrequencyGrid) -> Self {
        Self {
            model,
            freq,
            delays: HashMap::new(),
        }
    }

    /// The frequency grid the cached delays are aligned to.
    pub fn freq(&self) -> &FrequencyGrid {
        &self.freq
    }

    /// Switch to a new frequency grid. Everything cached is dropped if the
    /// grid is different.
    pub fn update_freq(&mut self, freq: &FrequencyGrid) {
        if &self.freq != freq {
            trace!("frequency grid changed, dropping {} delays", self.delays.len());
            self.freq = freq.clone();
            self.delays.clear();
        }
    }

    /// Compute the delays of any of `antennas` which aren't cached yet.
    ///
    /// # Errors
    ///
    /// Will return an error from the delay model, or
    /// [`FxError::BadArrayShape`] if the model gives the wrong number of
    /// delays.
    pub fn populate(&mut self, antennas: &[AntennaId]) -> Result<(), FxError> {
        for &antenna in antennas {
            if self.delays.contains_key(&antenna) {
                continue;
            }
            let delay = self.model.signal_delay(antenna, self.freq.freqs_hz())?;
            if delay.len() != self.freq.len() {
                return Err(FxError::BadArrayShape {
                    argument: format!("signal_delay(antenna={antenna})"),
                    function: "DelayCache::populate".into(),
                    expected: format!("({},)", self.freq.len()),
                    received: format!("({},)", delay.len()),
                });
            }
            self.delays.insert(antenna, Array1::from_vec(delay));
        }
        Ok(())
    }

    /// The cached delays of `antenna`.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::UnknownAntenna`] if `antenna` was never
    /// populated.
    pub fn signal_delay(&self, antenna: AntennaId) -> Result<&Array1<f64>, FxError> {
        self.delays
            .get(&antenna)
            .ok_or(FxError::UnknownAntenna { antenna })
    }

    /// Relative delays and whole sample shifts for the baseline `(ant1, ant2)`.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::UnknownAntenna`] if either antenna isn't cached.
    pub fn baseline_delay(
        &self,
        ant1: AntennaId,
        ant2: AntennaId,
        sample_rate_hz: f64,
    ) -> Result<BaselineDelay, FxError> {
        let dly1 = self.signal_delay(ant1)?;
        let dly2 = self.signal_delay(ant2)?;
        let ref_idx = self.freq.delay_ref_idx();

        let (delay1, delay2) = if dly2[ref_idx] > dly1[ref_idx] {
            (dly2 - dly1, Array1::zeros(dly2.len()))
        } else {
            (Array1::zeros(dly1.len()), dly1 - dly2)
        };
        let start1 = (delay1[ref_idx] * sample_rate_hz).round() as usize;
        let start2 = (delay2[ref_idx] * sample_rate_hz).round() as usize;

        debug!(
            "delay for antenna {}: {:.2} - {:.2} ns (= {} samples)",
            ant1,
            delay1[delay1.len() - 1] * 1e9,
            delay1[0] * 1e9,
            start1
        );
        debug!(
            "delay for antenna {}: {:.2} - {:.2} ns (= {} samples)",
            ant2,
            delay2[delay2.len() - 1] * 1e9,
            delay2[0] * 1e9,
            start2
        );

        Ok(BaselineDelay {
            delay1,
            delay2,
            start1,
            start2,
        })
    }
}
