// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.
//!
//! All constants *must* be double precision.

/// Speed of light in a vacuum \[m/s\].
pub const VEL_C: f64 = 299_792_458.0;

/// The station's digitiser clock rate \[Hz\]. Used as the sample rate when
/// none is supplied.
pub const STATION_SAMPLE_RATE_HZ: f64 = 196e6;

/// Default transform length.
pub const DEFAULT_LFFT: usize = 64;

/// Number of sub-segments summed together by the polyphase pre-filter.
pub const POLYPHASE_WINDOWS: usize = 4;

/// Default size of the correlation worker pool.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Default cable velocity factor, as a fraction of [`VEL_C`].
pub const DEFAULT_CABLE_VELOCITY_FACTOR: f64 = 0.83;

/// Default cable dispersion coefficient \[s Hz^0.5 per 100 m\].
pub const DEFAULT_CABLE_DISPERSION: f64 = 2.4e-7;

/// Latitude of the default station site \[degrees\], used to rotate antenna
/// positions into the equatorial frame.
pub const STATION_LATITUDE_DEG: f64 = 34.070;

/// Number of points along each baseline's track through the uv plane.
pub const UV_TRACK_POINTS: usize = 512;
