//! Errors that can occur in the io module

use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::upper_case_acronyms)]
/// All the errors that can occur in file io operations
pub enum IOError {
    #[error("{file}: not a sample file, expected magic {expected:?}, found {found:?}")]
    /// The file doesn't start with the sample file magic
    BadMagic {
        /// The filename
        file: String,
        /// The magic that was expected
        expected: String,
        /// What was found instead
        found: String,
    },

    #[error("{file}: unsupported {field} {found}, expected {expected}")]
    /// A header field has a value this version can't read
    UnsupportedHeader {
        /// The filename
        file: String,
        /// The header field
        field: &'static str,
        /// The value that was expected
        expected: String,
        /// The unexpected value that was found
        found: String,
    },

    #[error("{file} line {line}: {message}")]
    /// A row of an antenna table couldn't be understood
    BadAntennaRow {
        /// The filename
        file: String,
        /// The line number of the row
        line: u64,
        /// What was wrong with it
        message: String,
    },

    #[error("{file}: {message}")]
    /// The antennas in a table don't match the signals
    AntennaMismatch {
        /// The filename
        file: String,
        /// What was wrong
        message: String,
    },

    #[error(transparent)]
    /// Error derived from [`std::io::Error`]
    StdIo(#[from] std::io::Error),

    #[error(transparent)]
    /// Error derived from [`csv::Error`]
    Csv(#[from] csv::Error),
}
