//! Types shared across the correlator: signal matrices, sample kinds and
//! polarisation products.

use crate::{CLIError, FxError};
use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;
use std::{fmt::Display, ops::Range, str::FromStr};

/// Opaque antenna identity (the stand number). Only used as a key.
pub type AntennaId = u32;

/// Whether samples came from a real-valued (e.g. TBW) or complex I/Q
/// (e.g. TBN) stream. This decides how the transforms are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Real samples: the spectrum mirrors about DC, so a `2 * LFFT` transform
    /// is needed for `LFFT - 1` positive frequency bins.
    Real,
    /// Complex I/Q samples, the whole shifted spectrum is used.
    Complex,
}

impl SampleKind {
    /// The number of samples per transform, in units of `LFFT`.
    pub fn l_factor(self) -> usize {
        match self {
            SampleKind::Real => 2,
            SampleKind::Complex => 1,
        }
    }
}

impl Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleKind::Real => write!(f, "real"),
            SampleKind::Complex => write!(f, "complex"),
        }
    }
}

/// A matrix of time series with inputs on the first axis and samples on the
/// second.
///
/// Real samples are promoted to complex with a zero imaginary part. Every
/// operation in this crate is numerically unchanged by the promotion; the
/// [`SampleKind`] is kept so the transforms are laid out correctly.
#[derive(Debug, Clone)]
pub struct SignalMatrix {
    /// samples, `[input][time]`
    pub data: Array2<Complex64>,
    /// the kind of the original samples
    pub kind: SampleKind,
}

impl SignalMatrix {
    /// Wrap real-valued samples.
    pub fn from_real(data: Array2<f64>) -> Self {
        Self {
            data: data.mapv(|re| Complex64::new(re, 0.0)),
            kind: SampleKind::Real,
        }
    }

    /// Wrap complex I/Q samples.
    pub fn from_complex(data: Array2<Complex64>) -> Self {
        Self {
            data,
            kind: SampleKind::Complex,
        }
    }

    /// Borrow the whole matrix.
    pub fn view(&self) -> SignalView<'_> {
        SignalView {
            data: self.data.view(),
            kind: self.kind,
        }
    }

    /// Keep every `step`th input starting at `offset`, e.g. to split
    /// interleaved X and Y polarisations.
    pub fn select_inputs(&self, offset: usize, step: usize) -> Self {
        Self {
            data: self.data.slice(s![offset..;step, ..]).to_owned(),
            kind: self.kind,
        }
    }

    /// The number of inputs (rows).
    pub fn num_inputs(&self) -> usize {
        self.data.nrows()
    }

    /// The number of time samples (columns).
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }
}

/// A borrowed [`SignalMatrix`], possibly restricted to a range of samples.
#[derive(Debug, Clone, Copy)]
pub struct SignalView<'a> {
    /// samples, `[input][time]`
    pub data: ArrayView2<'a, Complex64>,
    /// the kind of the original samples
    pub kind: SampleKind,
}

impl<'a> SignalView<'a> {
    /// The time series of a single input.
    pub fn row(&self, input: usize) -> ArrayView1<'a, Complex64> {
        self.data.index_axis_move(Axis(0), input)
    }

    /// Restrict the view to a range of time samples.
    ///
    /// # Errors
    ///
    /// Will return [`FxError::InsufficientData`] if the range extends past the
    /// end of the samples.
    pub fn slice_time(&self, range: Range<usize>) -> Result<SignalView<'a>, FxError> {
        if range.end > self.num_samples() || range.start > range.end {
            return Err(FxError::InsufficientData {
                function: "SignalView::slice_time",
                needed: range.end,
                available: self.num_samples(),
            });
        }
        Ok(SignalView {
            data: self.data.slice_move(s![.., range]),
            kind: self.kind,
        })
    }

    /// The number of inputs (rows).
    pub fn num_inputs(&self) -> usize {
        self.data.nrows()
    }

    /// The number of time samples (columns).
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }
}

/// A polarisation product. `XY` correlates X of the first antenna in each
/// baseline with Y of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolProduct {
    #[default]
    /// X with X
    XX,
    /// Y with Y
    YY,
    /// X with Y
    XY,
    /// Y with X
    YX,
}

impl PolProduct {
    /// The polarisations `(first, second)` as indices into interleaved X/Y
    /// inputs.
    pub fn pol_offsets(self) -> (usize, usize) {
        match self {
            PolProduct::XX => (0, 0),
            PolProduct::YY => (1, 1),
            PolProduct::XY => (0, 1),
            PolProduct::YX => (1, 0),
        }
    }

    /// Whether two different polarisations are multiplied.
    pub fn is_cross(self) -> bool {
        let (a, b) = self.pol_offsets();
        a != b
    }
}

impl Display for PolProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PolProduct::XX => "XX",
            PolProduct::YY => "YY",
            PolProduct::XY => "XY",
            PolProduct::YX => "YX",
        };
        write!(f, "{label}")
    }
}

impl FromStr for PolProduct {
    type Err = CLIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "XX" => Ok(PolProduct::XX),
            "YY" => Ok(PolProduct::YY),
            "XY" => Ok(PolProduct::XY),
            "YX" => Ok(PolProduct::YX),
            _ => Err(CLIError::InvalidCommandLineArgument {
                option: "--products <POL>".into(),
                expected: "one of XX, YY, XY, YX".into(),
                received: s.into(),
            }),
        }
    }
}
