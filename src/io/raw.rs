//! IO for raw sample files: a little-endian header followed by the samples of
//! every input, one input after the other.
//!
//! | offset | type      | contents                                   |
//! |--------|-----------|--------------------------------------------|
//! | 0      | `[u8; 8]` | `FXSAMPLE`                                 |
//! | 8      | `u32`     | version, currently 1                       |
//! | 12     | `u32`     | number of inputs                           |
//! | 16     | `u64`     | number of samples per input                |
//! | 24     | `u8`      | sample format, see [`SampleFormat`]        |
//! | 25     | `f64`     | sample rate \[Hz\]                         |
//! | 33     | `f64`     | central frequency \[Hz\]                   |
//! | 41     |           | samples, `[input][time]`, `(re, im)` pairs |

use super::error::IOError;
use crate::{SampleKind, SignalMatrix};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};
use ndarray::{Array2, ShapeError};
use num_complex::Complex64;
use std::{
    fmt::Display,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

/// The first bytes of every sample file.
pub const MAGIC: &[u8; 8] = b"FXSAMPLE";
/// The version of the format written by this crate.
pub const VERSION: u32 = 1;

/// How samples are encoded on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// real samples as `i16`, e.g. straight from a digitiser
    I16Real = 0,
    /// real samples as `f32`
    F32Real = 1,
    /// complex samples as pairs of `f32`
    F32Complex = 2,
}

impl SampleFormat {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SampleFormat::I16Real),
            1 => Some(SampleFormat::F32Real),
            2 => Some(SampleFormat::F32Complex),
            _ => None,
        }
    }

    /// The kind of samples the format holds.
    pub fn kind(self) -> SampleKind {
        match self {
            SampleFormat::I16Real | SampleFormat::F32Real => SampleKind::Real,
            SampleFormat::F32Complex => SampleKind::Complex,
        }
    }
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleFormat::I16Real => write!(f, "i16 real"),
            SampleFormat::F32Real => write!(f, "f32 real"),
            SampleFormat::F32Complex => write!(f, "f32 complex"),
        }
    }
}

/// The contents of a sample file.
#[derive(Debug, Clone)]
pub struct RawSamples {
    /// the samples of each input
    pub signals: SignalMatrix,
    /// sample rate \[Hz\]
    pub sample_rate_hz: f64,
    /// tuning frequency of complex samples \[Hz\]
    pub central_freq_hz: f64,
}

impl RawSamples {
    /// Read a sample file.
    ///
    /// # Errors
    ///
    /// Will return [`IOError::BadMagic`] or [`IOError::UnsupportedHeader`] if
    /// the file isn't a sample file this version understands or holds fewer
    /// samples than its header says, or an [`IOError::StdIo`] if the header
    /// is truncated.
    pub fn read<T: AsRef<Path>>(file: T) -> Result<Self, IOError> {
        let file_str = file.as_ref().display().to_string();
        let mut reader = BufReader::new(File::open(&file)?);
        Self::read_from(&mut reader, &file_str)
    }

    /// Read samples from any reader, `file` is only used in errors.
    ///
    /// # Errors
    ///
    /// See [`RawSamples::read`].
    pub fn read_from<R: Read>(reader: &mut R, file: &str) -> Result<Self, IOError> {
        let mut magic = [0_u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(IOError::BadMagic {
                file: file.into(),
                expected: String::from_utf8_lossy(MAGIC).into(),
                found: String::from_utf8_lossy(&magic).into(),
            });
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(IOError::UnsupportedHeader {
                file: file.into(),
                field: "version",
                expected: VERSION.to_string(),
                found: version.to_string(),
            });
        }
        let num_inputs = reader.read_u32::<LittleEndian>()? as usize;
        let num_samples = reader.read_u64::<LittleEndian>()?;
        let format_byte = reader.read_u8()?;
        let format = SampleFormat::from_u8(format_byte).ok_or_else(|| IOError::UnsupportedHeader {
            file: file.into(),
            field: "sample format",
            expected: "0, 1 or 2".into(),
            found: format_byte.to_string(),
        })?;
        let sample_rate_hz = reader.read_f64::<LittleEndian>()?;
        let central_freq_hz = reader.read_f64::<LittleEndian>()?;
        debug!(
            "{}: {} inputs of {} {} samples at {} Hz",
            file, num_inputs, num_samples, format, sample_rate_hz
        );

        let bad_shape = |expected: String| IOError::UnsupportedHeader {
            file: file.into(),
            field: "shape",
            expected,
            found: format!("({num_inputs}, {num_samples})"),
        };
        let bytes_per_value = match format {
            SampleFormat::I16Real => 2,
            SampleFormat::F32Real => 4,
            SampleFormat::F32Complex => 8,
        };
        let fits = usize::try_from(num_samples).ok().and_then(|num_samples| {
            let num_values = num_inputs.checked_mul(num_samples)?;
            let num_bytes = u64::try_from(num_values.checked_mul(bytes_per_value)?).ok()?;
            Some((num_samples, num_values, num_bytes))
        });
        let (num_samples, num_values, num_bytes) =
            fits.ok_or_else(|| bad_shape("a shape which fits in memory".into()))?;
        let shape = (num_inputs, num_samples);
        let shape_err = |err: ShapeError| bad_shape(err.to_string());

        // only allocate for the samples which are actually there
        let mut body = Vec::new();
        reader.by_ref().take(num_bytes).read_to_end(&mut body)?;
        if body.len() as u64 != num_bytes {
            return Err(bad_shape(format!(
                "{num_bytes} bytes of samples, found {}",
                body.len()
            )));
        }

        let signals = match format {
            SampleFormat::I16Real => {
                let mut values = vec![0_i16; num_values];
                LittleEndian::read_i16_into(&body, &mut values);
                let values = values.into_iter().map(f64::from).collect();
                SignalMatrix::from_real(Array2::from_shape_vec(shape, values).map_err(shape_err)?)
            }
            SampleFormat::F32Real => {
                let mut values = vec![0_f32; num_values];
                LittleEndian::read_f32_into(&body, &mut values);
                let values = values.into_iter().map(f64::from).collect();
                SignalMatrix::from_real(Array2::from_shape_vec(shape, values).map_err(shape_err)?)
            }
            SampleFormat::F32Complex => {
                let mut values = vec![0_f32; 2 * num_values];
                LittleEndian::read_f32_into(&body, &mut values);
                let values = values
                    .chunks_exact(2)
                    .map(|pair| Complex64::new(pair[0] as f64, pair[1] as f64))
                    .collect();
                SignalMatrix::from_complex(
                    Array2::from_shape_vec(shape, values).map_err(shape_err)?,
                )
            }
        };
        trace!("{}: read {} values", file, num_values);

        Ok(Self {
            signals,
            sample_rate_hz,
            central_freq_hz,
        })
    }

    /// Write a sample file. Values are rounded and saturated when written as
    /// [`SampleFormat::I16Real`], and real formats drop the imaginary part.
    ///
    /// # Errors
    ///
    /// Will return an [`IOError::StdIo`] if the file can't be written, or
    /// [`IOError::UnsupportedHeader`] if `format` can't hold complex samples.
    pub fn write<T: AsRef<Path>>(&self, file: T, format: SampleFormat) -> Result<(), IOError> {
        let mut writer = BufWriter::new(File::create(&file)?);
        self.write_to(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }

    /// Write samples to any writer.
    ///
    /// # Errors
    ///
    /// See [`RawSamples::write`].
    pub fn write_to<W: Write>(&self, writer: &mut W, format: SampleFormat) -> Result<(), IOError> {
        if self.signals.kind == SampleKind::Complex && format.kind() == SampleKind::Real {
            return Err(IOError::UnsupportedHeader {
                file: "<output>".into(),
                field: "sample format",
                expected: SampleFormat::F32Complex.to_string(),
                found: format.to_string(),
            });
        }
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(VERSION)?;
        writer.write_u32::<LittleEndian>(self.signals.num_inputs() as u32)?;
        writer.write_u64::<LittleEndian>(self.signals.num_samples() as u64)?;
        writer.write_u8(format as u8)?;
        writer.write_f64::<LittleEndian>(self.sample_rate_hz)?;
        writer.write_f64::<LittleEndian>(self.central_freq_hz)?;
        for sample in self.signals.data.iter() {
            match format {
                SampleFormat::I16Real => writer.write_i16::<LittleEndian>(
                    sample.re.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16,
                )?,
                SampleFormat::F32Real => writer.write_f32::<LittleEndian>(sample.re as f32)?,
                SampleFormat::F32Complex => {
                    writer.write_f32::<LittleEndian>(sample.re as f32)?;
                    writer.write_f32::<LittleEndian>(sample.im as f32)?;
                }
            }
        }
        Ok(())
    }
}
