//! Baseline coordinates in the uv plane.
//!
//! Antenna positions are east, north, up offsets. They are rotated into a
//! local equatorial frame (X towards the local meridian on the celestial
//! equator, Y east, Z towards the celestial pole), and baselines in that
//! frame are projected onto the phase centre.
//!
//! See chapter 4 of Interferometry and Synthesis in Radio Astronomy, third
//! edition: Geometrical Relationships, Polarimetry, and the Measurement
//! Equation.

use crate::{
    baselines::{get_baseline_idxs, get_baselines_between},
    constants::{UV_TRACK_POINTS, VEL_C},
    delay::StationGeometry,
    AntennaId, FxError,
};
use ndarray::{Array3, Axis};

/// A direction on the sky by hour angle and declination \[rad\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HADec {
    /// hour angle \[rad\]
    pub ha: f64,
    /// declination \[rad\]
    pub dec: f64,
}

impl HADec {
    /// A direction from an hour angle in hours and a declination in degrees.
    pub fn from_hours_degrees(ha_hours: f64, dec_deg: f64) -> Self {
        Self {
            ha: (ha_hours * 15.0).to_radians(),
            dec: dec_deg.to_radians(),
        }
    }

    /// The local zenith of a site at `latitude_rad`.
    pub fn zenith(latitude_rad: f64) -> Self {
        Self {
            ha: 0.0,
            dec: latitude_rad,
        }
    }
}

/// A position or baseline in the local equatorial frame \[m\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XYZ {
    /// towards the local meridian on the celestial equator \[m\]
    pub x: f64,
    /// east \[m\]
    pub y: f64,
    /// towards the celestial pole \[m\]
    pub z: f64,
}

impl XYZ {
    /// Rotate an east, north, up offset at `latitude_rad` into the local
    /// equatorial frame.
    pub fn from_enu(enu_m: [f64; 3], latitude_rad: f64) -> Self {
        let [e, n, u] = enu_m;
        let (s_lat, c_lat) = latitude_rad.sin_cos();
        Self {
            x: -n * s_lat + u * c_lat,
            y: e,
            z: n * c_lat + u * s_lat,
        }
    }
}

impl std::ops::Sub for XYZ {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// The (u, v, w) coordinates of a baseline \[m\].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UVW {
    /// u \[m\]
    pub u: f64,
    /// v \[m\]
    pub v: f64,
    /// w \[m\]
    pub w: f64,
}

impl UVW {
    /// Project a baseline onto `phase_centre`.
    pub fn from_xyz(xyz: XYZ, phase_centre: HADec) -> Self {
        let (s_ha, c_ha) = phase_centre.ha.sin_cos();
        let (s_dec, c_dec) = phase_centre.dec.sin_cos();
        Self {
            u: s_ha * xyz.x + c_ha * xyz.y,
            v: -s_dec * c_ha * xyz.x + s_dec * s_ha * xyz.y + c_dec * xyz.z,
            w: c_dec * c_ha * xyz.x - c_dec * s_ha * xyz.y + s_dec * xyz.z,
        }
    }
}

fn antenna_xyz(
    station: &StationGeometry,
    antenna: AntennaId,
    latitude_rad: f64,
) -> Result<XYZ, FxError> {
    station
        .antenna(antenna)
        .map(|geometry| XYZ::from_enu(geometry.enu_m, latitude_rad))
        .ok_or(FxError::UnknownAntenna { antenna })
}

/// The uvw \[m\] of each `(ant1, ant2)` baseline, `ant1 - ant2`.
///
/// # Errors
///
/// Will return [`FxError::UnknownAntenna`] if an antenna isn't in `station`.
pub fn baseline_uvws(
    station: &StationGeometry,
    baselines: &[(AntennaId, AntennaId)],
    phase_centre: HADec,
    latitude_rad: f64,
) -> Result<Vec<UVW>, FxError> {
    baselines
        .iter()
        .map(|&(ant1, ant2)| {
            let xyz = antenna_xyz(station, ant1, latitude_rad)?
                - antenna_xyz(station, ant2, latitude_rad)?;
            Ok(UVW::from_xyz(xyz, phase_centre))
        })
        .collect()
}

/// The uvw coverage of every baseline between `antennas` in wavelengths,
/// `[baseline][u, v, w][frequency]`. With `antennas2`, baselines pair
/// `antennas` with `antennas2` as in [`get_baselines_between`].
///
/// # Errors
///
/// Will return [`FxError::UnknownAntenna`] if an antenna isn't in `station`,
/// or [`FxError::BadArrayShape`] if `antennas2` differs in length.
pub fn compute_uvw(
    station: &StationGeometry,
    antennas: &[AntennaId],
    antennas2: Option<&[AntennaId]>,
    include_auto: bool,
    phase_centre: HADec,
    latitude_rad: f64,
    freqs_hz: &[f64],
) -> Result<Array3<f64>, FxError> {
    let baselines =
        get_baselines_between(antennas, antennas2.unwrap_or(antennas), include_auto)?;
    let uvws = baseline_uvws(station, &baselines, phase_centre, latitude_rad)?;
    Ok(uvw_wavelengths(&uvws, freqs_hz))
}

/// Scale baselines \[m\] to wavelengths at each of `freqs_hz`,
/// `[baseline][u, v, w][frequency]`.
pub fn uvw_wavelengths(uvws: &[UVW], freqs_hz: &[f64]) -> Array3<f64> {
    let mut out = Array3::zeros((uvws.len(), 3, freqs_hz.len()));
    for (mut baseline, uvw) in out.axis_iter_mut(Axis(0)).zip(uvws.iter()) {
        for (mut coord, metres) in baseline
            .axis_iter_mut(Axis(0))
            .zip([uvw.u, uvw.v, uvw.w])
        {
            for (value, freq_hz) in coord.iter_mut().zip(freqs_hz.iter()) {
                *value = metres * freq_hz / VEL_C;
            }
        }
    }
    out
}

/// The ellipse each baseline between `antennas` traces through the uv plane
/// over a full rotation of the Earth, for a source at `dec_rad`, in
/// wavelengths at `freq_hz`. Returns `[baseline][u, v][point]`.
///
/// The first half of the points sweep u upwards along the upper half of the
/// ellipse and the second half return along the lower half.
///
/// # Errors
///
/// Will return [`FxError::UnknownAntenna`] if an antenna isn't in `station`.
pub fn compute_uv_track(
    station: &StationGeometry,
    antennas: &[AntennaId],
    dec_rad: f64,
    latitude_rad: f64,
    freq_hz: f64,
) -> Result<Array3<f64>, FxError> {
    let baselines = get_baseline_idxs(antennas.len(), false);
    let half = UV_TRACK_POINTS / 2;
    let (s_dec, c_dec) = dec_rad.sin_cos();
    let scale = freq_hz / VEL_C;

    let mut track = Array3::zeros((baselines.len(), 2, UV_TRACK_POINTS));
    for (mut out, &(i, j)) in track.axis_iter_mut(Axis(0)).zip(baselines.iter()) {
        let xyz = antenna_xyz(station, antennas[i], latitude_rad)?
            - antenna_xyz(station, antennas[j], latitude_rad)?;
        let radius = xyz.x.hypot(xyz.y);
        for point in 0..half {
            let u = -radius + 2.0 * radius * point as f64 / (half - 1) as f64;
            // clamped, rounding can push the ends of the sweep past the radius
            let height = (radius * radius - u * u).max(0.0).sqrt() * s_dec;
            let centre = xyz.z * c_dec;
            out[[0, point]] = u * scale;
            out[[1, point]] = (height + centre) * scale;
            out[[0, UV_TRACK_POINTS - 1 - point]] = u * scale;
            out[[1, UV_TRACK_POINTS - 1 - point]] = (centre - height) * scale;
        }
    }
    Ok(track)
}
