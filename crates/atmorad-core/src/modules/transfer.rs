//! Sequential two-directional fold of a spectrum through a height-ordered
//! stack of slabs.

use crate::common::constants::COSMIC_BACKGROUND_K;
use crate::domain::{RadError, RadResult, SpectralWindow};
use crate::modules::column::{Layer, Slab};
use crate::modules::traits::OpticalSlab;
use crate::numerics::planck::planck_spectrum;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Observer looking down at the surface.
    Down,
    /// Observer looking up at the sky.
    Up,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Up => "up",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for Direction {
    type Err = RadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            other => Err(RadError::input_validation(
                "INPUT.DIRECTION",
                format!("unknown direction '{}' (expected up or down)", other),
            )),
        }
    }
}

/// Surface emission seen from above.
pub fn downward_source(
    window: &SpectralWindow,
    surface_temperature: f64,
    surface_emissivity: f64,
) -> Vec<f64> {
    planck_spectrum(window, surface_temperature)
        .into_iter()
        .map(|radiance| radiance * surface_emissivity)
        .collect()
}

/// Cosmic background seen from below.
pub fn upward_source(window: &SpectralWindow) -> Vec<f64> {
    planck_spectrum(window, COSMIC_BACKGROUND_K)
}

/// Mean heights must strictly increase with the slab index.
pub fn check_height_order<S: OpticalSlab>(slabs: &[S]) -> RadResult<()> {
    for (index, pair) in slabs.windows(2).enumerate() {
        if !(pair[0].mean_height() < pair[1].mean_height()) {
            return Err(RadError::input_validation(
                "INPUT.LAYER_ORDER",
                format!(
                    "layer {} (mean height {} cm) is not below layer {} ({} cm)",
                    index,
                    pair[0].mean_height(),
                    index + 1,
                    pair[1].mean_height()
                ),
            ));
        }
    }
    Ok(())
}

/// Indices of the slabs an observer at `height` sees, in fold order:
/// ascending below the observer for `Down`, descending above for `Up`.
pub fn path_indices<S: OpticalSlab>(slabs: &[S], height: f64, direction: Direction) -> Vec<usize> {
    match direction {
        Direction::Down => (0..slabs.len())
            .filter(|index| slabs[*index].mean_height() < height)
            .collect(),
        Direction::Up => (0..slabs.len())
            .rev()
            .filter(|index| slabs[*index].mean_height() > height)
            .collect(),
    }
}

/// Folds `source` through every slab on the path, calling `visit` with the
/// slab index and the spectrum leaving it.
pub fn propagate_with<S: OpticalSlab>(
    slabs: &[S],
    wavenumbers: &[f64],
    height: f64,
    direction: Direction,
    source: Vec<f64>,
    mut visit: impl FnMut(usize, &[f64]) -> RadResult<()>,
) -> RadResult<Vec<f64>> {
    check_height_order(slabs)?;
    if source.len() != wavenumbers.len() {
        return Err(spectrum_length_error(source.len(), wavenumbers.len()));
    }

    let mut spectrum = source;
    for index in path_indices(slabs, height, direction) {
        let slab = &slabs[index];
        if slab.absorption_coefficient().len() != spectrum.len() {
            return Err(spectrum_length_error(
                slab.absorption_coefficient().len(),
                spectrum.len(),
            ));
        }
        spectrum = slab.transmit(&spectrum, wavenumbers);
        visit(index, &spectrum)?;
    }
    Ok(spectrum)
}

pub fn propagate<S: OpticalSlab>(
    slabs: &[S],
    wavenumbers: &[f64],
    height: f64,
    direction: Direction,
    source: Vec<f64>,
) -> RadResult<Vec<f64>> {
    propagate_with(slabs, wavenumbers, height, direction, source, |_, _| Ok(()))
}

fn spectrum_length_error(found: usize, expected: usize) -> RadError {
    RadError::input_validation(
        "INPUT.SPECTRUM_LENGTH",
        format!("spectrum has {} bins where {} were expected", found, expected),
    )
}

/// The same fold seen through one gas: every layer contributes only the
/// absorption and emission of `molecule`.
pub fn propagate_molecule(
    layers: &[Layer],
    molecule: &str,
    wavenumbers: &[f64],
    height: f64,
    direction: Direction,
    source: Vec<f64>,
) -> RadResult<Vec<f64>> {
    let slabs = layers
        .iter()
        .map(|layer| {
            layer.molecule_slab(molecule).ok_or_else(|| {
                RadError::input_validation(
                    "INPUT.UNKNOWN_MOLECULE",
                    format!("molecule '{}' has no computed data in every layer", molecule),
                )
            })
        })
        .collect::<RadResult<Vec<Slab>>>()?;
    propagate(&slabs, wavenumbers, height, direction, source)
}
