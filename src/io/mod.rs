//! Input and output file formats
//!
//! These are thin adapters around the correlator so it can be driven from the
//! command line; decoding a station's native recording formats is left to other
//! tools, which can write [`raw`] sample files.

pub mod antennas;
pub mod error;
pub mod raw;
pub mod vis_csv;

use self::{error::IOError, raw::RawSamples};
use crate::delay::AntennaGeometry;
use std::{fs::File, io::BufWriter, path::Path};

/// Groups together parameters related to I/O
#[derive(Debug, Default, Clone)]
pub struct IOContext {
    // in
    /// The path to the raw sample file
    pub samples_in: String,
    /// Optional path to a CSV antenna table
    pub antennas_in: Option<String>,

    // out
    /// Optional path to write visibilities to as CSV
    pub vis_out: Option<String>,
    /// Optional path to write power spectra to as CSV
    pub spectra_out: Option<String>,
}

impl IOContext {
    /// Read the sample file.
    ///
    /// # Errors
    ///
    /// see [`RawSamples::read`]
    pub fn read_samples(&self) -> Result<RawSamples, IOError> {
        RawSamples::read(&self.samples_in)
    }

    /// Read the antenna table, if there is one.
    ///
    /// # Errors
    ///
    /// see [`antennas::read_antennas`]
    pub fn read_antennas(&self) -> Result<Option<Vec<AntennaGeometry>>, IOError> {
        self.antennas_in
            .as_ref()
            .map(antennas::read_antennas)
            .transpose()
    }
}

/// Open a file for buffered writing.
///
/// # Errors
///
/// Will return an [`IOError::StdIo`] if the file can't be created.
pub fn create_buffered<T: AsRef<Path>>(file: T) -> Result<BufWriter<File>, IOError> {
    Ok(BufWriter::new(File::create(file)?))
}
