//! Antenna tables: one CSV row per antenna with its position and cable.
//!
//! ```text
//! # id, east_m, north_m, up_m, cable_length_m[, velocity_factor, dispersion]
//! 10, 0.0, 0.0, 0.0, 85.3
//! 11, 5.2, -3.1, 0.1, 112.0, 0.83, 2.4e-7
//! ```
//!
//! The cable's velocity factor and dispersion fall back to the defaults in
//! [`crate::constants`] when left out.

use super::error::IOError;
use crate::{
    delay::{AntennaGeometry, Cable},
    AntennaId,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use std::{io::Read, path::Path, str::FromStr};

fn parse_field<T: FromStr>(
    record: &StringRecord,
    idx: usize,
    name: &str,
    file: &str,
) -> Result<Option<T>, IOError> {
    let line = record.position().map_or(0, |pos| pos.line());
    match record.get(idx) {
        None | Some("") => Ok(None),
        Some(field) => field.parse().map(Some).map_err(|_| IOError::BadAntennaRow {
            file: file.into(),
            line,
            message: format!("could not parse {name} from {field:?}"),
        }),
    }
}

fn required<T>(value: Option<T>, name: &str, record: &StringRecord, file: &str) -> Result<T, IOError> {
    value.ok_or_else(|| IOError::BadAntennaRow {
        file: file.into(),
        line: record.position().map_or(0, |pos| pos.line()),
        message: format!("missing {name}"),
    })
}

/// Read an antenna table from a file.
///
/// # Errors
///
/// Will return [`IOError::BadAntennaRow`] for rows with missing or
/// unparseable fields, [`IOError::AntennaMismatch`] for duplicate antennas, or
/// an error from the file or the CSV reader.
pub fn read_antennas<T: AsRef<Path>>(file: T) -> Result<Vec<AntennaGeometry>, IOError> {
    let file_str = file.as_ref().display().to_string();
    let reader = std::fs::File::open(&file)?;
    read_antennas_from(reader, &file_str)
}

/// Read an antenna table from any reader, `file` is only used in errors.
///
/// # Errors
///
/// See [`read_antennas`].
pub fn read_antennas_from<R: Read>(reader: R, file: &str) -> Result<Vec<AntennaGeometry>, IOError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut antennas: Vec<AntennaGeometry> = vec![];
    for record in csv_reader.records() {
        let record = record?;
        let id: AntennaId = required(parse_field(&record, 0, "id", file)?, "id", &record, file)?;
        let mut enu_m = [0.0; 3];
        for (axis, name) in ["east_m", "north_m", "up_m"].iter().enumerate() {
            enu_m[axis] = required(parse_field(&record, axis + 1, name, file)?, name, &record, file)?;
        }
        let length_m = required(
            parse_field(&record, 4, "cable_length_m", file)?,
            "cable_length_m",
            &record,
            file,
        )?;
        let mut cable = Cable::new(length_m);
        if let Some(velocity_factor) = parse_field(&record, 5, "velocity_factor", file)? {
            cable.velocity_factor = velocity_factor;
        }
        if let Some(dispersion) = parse_field(&record, 6, "dispersion", file)? {
            cable.dispersion = dispersion;
        }

        if antennas.iter().any(|ant| ant.id == id) {
            return Err(IOError::AntennaMismatch {
                file: file.into(),
                message: format!("antenna {id} is listed more than once"),
            });
        }
        antennas.push(AntennaGeometry { id, enu_m, cable });
    }
    debug!("{}: read {} antennas", file, antennas.len());
    Ok(antennas)
}
