//! Baseline enumeration and lookup.
//!
//! Baselines are always listed in the same order: the first member ascends in
//! the outer loop, the second member ascends from the first (with
//! autocorrelations) or from the one after it.

use crate::{AntennaId, FxError};
use std::fmt::Debug;

/// A list of baselines, either as row indices into the signal matrix or as
/// antenna identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineList {
    /// pairs of signal matrix rows
    ByIndex(Vec<(usize, usize)>),
    /// pairs of antenna identities
    ByAntenna(Vec<(AntennaId, AntennaId)>),
}

impl BaselineList {
    /// The number of baselines.
    pub fn len(&self) -> usize {
        match self {
            BaselineList::ByIndex(pairs) => pairs.len(),
            BaselineList::ByAntenna(pairs) => pairs.len(),
        }
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row index pairs for every baseline between `num_inputs` signals.
pub fn get_baseline_idxs(num_inputs: usize, include_auto: bool) -> Vec<(usize, usize)> {
    let num_baselines = if include_auto {
        num_inputs * (num_inputs + 1) / 2
    } else {
        num_inputs * num_inputs.saturating_sub(1) / 2
    };
    let mut baselines = Vec::with_capacity(num_baselines);
    for i in 0..num_inputs {
        let first_j = if include_auto { i } else { i + 1 };
        for j in first_j..num_inputs {
            baselines.push((i, j));
        }
    }
    baselines
}

/// Every baseline between `antennas`, as indices into `antennas` if
/// `by_index`, otherwise as antenna identities.
pub fn get_baselines(antennas: &[AntennaId], include_auto: bool, by_index: bool) -> BaselineList {
    let idxs = get_baseline_idxs(antennas.len(), include_auto);
    if by_index {
        BaselineList::ByIndex(idxs)
    } else {
        BaselineList::ByAntenna(
            idxs.into_iter()
                .map(|(i, j)| (antennas[i], antennas[j]))
                .collect(),
        )
    }
}

/// Baselines pairing each of `antennas` with the antenna at the same
/// position in `antennas2`, or with every later antenna in `antennas2` (and
/// itself, if `include_auto`).
///
/// # Errors
///
/// Will return [`FxError::BadArrayShape`] if the two lists differ in length.
pub fn get_baselines_between(
    antennas: &[AntennaId],
    antennas2: &[AntennaId],
    include_auto: bool,
) -> Result<Vec<(AntennaId, AntennaId)>, FxError> {
    if antennas.len() != antennas2.len() {
        return Err(FxError::BadArrayShape {
            argument: "antennas2".to_string(),
            function: "get_baselines_between".to_string(),
            expected: format!("{} antennas", antennas.len()),
            received: format!("{} antennas", antennas2.len()),
        });
    }
    Ok(get_baseline_idxs(antennas.len(), include_auto)
        .into_iter()
        .map(|(i, j)| (antennas[i], antennas2[j]))
        .collect())
}

/// The members of baseline number `baseline`, if there is one.
pub fn baseline_to_ants<T: Copy>(baseline: usize, baselines: &[(T, T)]) -> Option<(T, T)> {
    baselines.get(baseline).copied()
}

/// The number of the first baseline containing both `ant1` and `ant2`, in
/// either order.
///
/// # Errors
///
/// Will return [`FxError::BaselineNotFound`] if no baseline matches.
pub fn ants_to_baseline<T>(ant1: T, ant2: T, baselines: &[(T, T)]) -> Result<usize, FxError>
where
    T: PartialEq + Debug,
{
    baselines
        .iter()
        .position(|(a, b)| (*a == ant1 && *b == ant2) || (*a == ant2 && *b == ant1))
        .ok_or_else(|| FxError::BaselineNotFound {
            ant1: format!("{ant1:?}"),
            ant2: format!("{ant2:?}"),
        })
}
