//! CSV output of visibilities and spectra, one value per row.

use super::error::IOError;
use crate::{baselines::BaselineList, fx::VisOutput, FrequencyGrid};
use csv::Writer;
use ndarray::{ArrayView3, Axis};
use std::io::Write;

/// Write visibilities as `window,baseline,ant1,ant2,pol,freq_hz,re,im,u,v,w`
/// rows, one polarisation product after the other. The uvw columns, in
/// wavelengths, are empty if an output has no uvw.
///
/// Baselines listed by index name their members by row index, otherwise by
/// antenna identity.
///
/// # Errors
///
/// Will return an error from the CSV writer.
pub fn write_visibilities<W: Write>(writer: W, outputs: &[VisOutput]) -> Result<(), IOError> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record([
        "window", "baseline", "ant1", "ant2", "pol", "freq_hz", "re", "im", "u", "v", "w",
    ])?;
    for output in outputs {
        let members: Vec<(String, String)> = match &output.baselines {
            BaselineList::ByIndex(pairs) => pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            BaselineList::ByAntenna(pairs) => pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        };
        let pol = output.pol.to_string();
        for (window_idx, window) in output.vis.axis_iter(Axis(0)).enumerate() {
            for ((baseline_idx, baseline), (ant1, ant2)) in
                window.axis_iter(Axis(0)).enumerate().zip(members.iter())
            {
                for (chan, (freq_hz, vis)) in output
                    .freq
                    .freqs_hz()
                    .iter()
                    .zip(baseline.iter())
                    .enumerate()
                {
                    let uvw = |coord: usize| {
                        output
                            .uvw
                            .as_ref()
                            .and_then(|uvw| uvw.get([baseline_idx, coord, chan]))
                            .map(f64::to_string)
                            .unwrap_or_default()
                    };
                    csv_writer.write_record(&[
                        window_idx.to_string(),
                        baseline_idx.to_string(),
                        ant1.clone(),
                        ant2.clone(),
                        pol.clone(),
                        freq_hz.to_string(),
                        vis.re.to_string(),
                        vis.im.to_string(),
                        uvw(0),
                        uvw(1),
                        uvw(2),
                    ])?;
                }
            }
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write power spectra, `[input][segment][channel]`, as
/// `input,segment,freq_hz,power` rows.
///
/// # Errors
///
/// Will return an error from the CSV writer.
pub fn write_spectra<W: Write>(
    writer: W,
    freq: &FrequencyGrid,
    power: ArrayView3<f64>,
) -> Result<(), IOError> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record(["input", "segment", "freq_hz", "power"])?;
    for ((input, segment, chan), value) in power.indexed_iter() {
        let freq_hz = freq.freqs_hz().get(chan).copied().unwrap_or(f64::NAN);
        csv_writer.write_record(&[
            input.to_string(),
            segment.to_string(),
            freq_hz.to_string(),
            value.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
