//! Errors that can occur in fxcorr

use crate::{io::error::IOError, AntennaId};
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors raised while validating command line arguments
pub enum CLIError {
    #[error("Invalid command line argument for option {option}. Expected {expected}, received {received}")]
    /// A command line argument had an unexpected value
    InvalidCommandLineArgument {
        /// The option for which the argument was provided
        option: String,
        /// The argument that was expected
        expected: String,
        /// The argument that was received instead
        received: String,
    },
}

#[derive(Error, Debug)]
/// All the errors that can occur while channelising and correlating
pub enum FxError {
    #[error("Invalid configuration in {function}: {option} should be {expected}, received {received}")]
    /// A transform length, overlap or shape combination that can't work
    InvalidConfiguration {
        /// The function where the problem was found
        function: &'static str,
        /// The offending option
        option: String,
        /// What was expected of it
        expected: String,
        /// What was received
        received: String,
    },

    #[error("Insufficient data in {function}: at least {needed} samples needed, {available} available")]
    /// Not enough samples for the requested chunk or segment count
    InsufficientData {
        /// The function where the problem was found
        function: &'static str,
        /// The number of samples required
        needed: usize,
        /// The number of samples provided
        available: usize,
    },

    #[error("No overlapping chunks remain between antennas {ant1} and {ant2} after delay alignment (length {length})")]
    /// The correlation length is not positive after applying sample shifts
    InsufficientOverlap {
        /// first antenna of the baseline
        ant1: AntennaId,
        /// second antenna of the baseline
        ant2: AntennaId,
        /// the computed number of chunks
        length: isize,
    },

    #[error("No baseline between antennas {ant1} and {ant2} in the baseline list")]
    /// A baseline lookup missed
    BaselineNotFound {
        /// first antenna of the lookup
        ant1: String,
        /// second antenna of the lookup
        ant2: String,
    },

    #[error("No signal delay is known for antenna {antenna}")]
    /// The delay model or cache has no entry for an antenna
    UnknownAntenna {
        /// The antenna which was looked up
        antenna: AntennaId,
    },

    #[error("The delay cache was populated for a different frequency grid")]
    /// The delay cache's frequency grid does not match the one in use
    StaleDelayCache,

    #[error("Non-finite result in {function} for antennas {ant1} and {ant2}")]
    /// NaN or infinite values came out of the transform
    NonFiniteResult {
        /// The function where the problem was found
        function: &'static str,
        /// first antenna of the baseline
        ant1: AntennaId,
        /// second antenna of the baseline
        ant2: AntennaId,
    },

    #[error("bad array shape supplied to argument {argument} of function {function}. expected {expected}, received {received}")]
    /// Error for bad array shape in provided argument
    BadArrayShape {
        /// The argument name within the function
        argument: String,
        /// The function name
        function: String,
        /// The expected shape
        expected: String,
        /// The shape that was received instead
        received: String,
    },

    #[error("Could not build the worker pool: {0}")]
    /// Error derived from [`rayon::ThreadPoolBuildError`]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    /// Error derived from [`crate::io::error::IOError`]
    IOError(#[from] IOError),

    #[error(transparent)]
    /// Error derived from [`CLIError`]
    CLIError(#[from] CLIError),

    #[cfg(feature = "cli")]
    #[error(transparent)]
    /// Error derived from [`clap::Error`]
    ClapError(#[from] clap::Error),

    #[error("Dry run")]
    /// Not really an error, the summary was printed and nothing else should happen
    DryRun {},
}
