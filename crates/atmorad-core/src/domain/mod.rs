pub mod errors;

pub use errors::{RadError, RadErrorCategory, RadResult};

use crate::common::constants::{P_REF_MBAR, T_REF_K};
use crate::numerics::interpolate_linear;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A single spectroscopic transition as delivered by the line database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub wavenumber: f64,
    pub reference_intensity: f64,
    #[serde(default)]
    pub einstein_a: f64,
    pub air_half_width: f64,
    pub self_half_width: f64,
    pub lower_state_energy: f64,
    pub temp_exponent: f64,
    #[serde(default)]
    pub pressure_shift: f64,
}

impl Line {
    /// Line center after the pressure shift at `pressure_mbar`.
    pub fn broadened_wavenumber(&self, pressure_mbar: f64) -> f64 {
        self.wavenumber + self.pressure_shift * pressure_mbar / P_REF_MBAR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsotopeParams {
    pub global_id: u32,
    pub short_name: String,
    pub molecule_id: u32,
    pub local_iso_number: u32,
    pub abundance: f64,
    pub q296: f64,
    #[serde(default)]
    pub statistical_weight: f64,
    pub molar_mass: f64,
}

/// Tabulated partition function Q(T), keyed by integer kelvin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionTable {
    entries: BTreeMap<u32, f64>,
}

impl PartitionTable {
    pub fn new(entries: BTreeMap<u32, f64>) -> Self {
        Self { entries }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Q at `temperature`, linearly interpolated between integer-kelvin
    /// entries and clamped at the table ends.
    pub fn q_at(&self, temperature: f64) -> Option<f64> {
        if !temperature.is_finite() {
            return None;
        }

        let exact = temperature.round();
        if exact == temperature && exact >= 0.0 {
            if let Some(value) = self.entries.get(&(exact as u32)) {
                return Some(*value);
            }
        }

        match self.entries.len() {
            0 => None,
            1 => self.entries.values().next().copied(),
            _ => {
                let (x_grid, y_grid): (Vec<f64>, Vec<f64>) = self
                    .entries
                    .iter()
                    .map(|(kelvin, q)| (f64::from(*kelvin), *q))
                    .unzip();
                interpolate_linear(temperature, &x_grid, &y_grid)
            }
        }
    }

    pub fn q_ref(&self) -> Option<f64> {
        self.q_at(T_REF_K)
    }
}

/// Uniform wavenumber grid `[min, max)` sampled every `resolution` cm⁻¹.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectralWindow {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

impl SpectralWindow {
    pub fn new(min: f64, max: f64, resolution: f64) -> RadResult<Self> {
        let window = Self {
            min,
            max,
            resolution,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> RadResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.max <= self.min {
            return Err(RadError::input_validation(
                "INPUT.SPECTRAL_WINDOW",
                format!(
                    "spectral range [{}, {}] must be finite with max > min",
                    self.min, self.max
                ),
            ));
        }

        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(RadError::input_validation(
                "INPUT.SPECTRAL_RESOLUTION",
                format!("resolution {} must be positive", self.resolution),
            ));
        }

        if self.len() == 0 {
            return Err(RadError::input_validation(
                "INPUT.SPECTRAL_WINDOW",
                format!(
                    "spectral range [{}, {}] is narrower than one {} cm-1 bin",
                    self.min, self.max, self.resolution
                ),
            ));
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        let bins = ((self.max - self.min) / self.resolution).round();
        if bins.is_finite() && bins > 0.0 {
            bins as usize
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn wavenumber_at(&self, index: usize) -> f64 {
        self.min + index as f64 * self.resolution
    }

    pub fn wavenumbers(&self) -> Vec<f64> {
        (0..self.len()).map(|index| self.wavenumber_at(index)).collect()
    }

    /// Bin holding `wavenumber`; may fall outside `[0, len)`.
    pub fn bin_of(&self, wavenumber: f64) -> i64 {
        ((wavenumber - self.min) / self.resolution).floor() as i64
    }

    pub fn zeroed(&self) -> Vec<f64> {
        vec![0.0; self.len()]
    }

    /// Window widened by `wing` on both sides, floored at zero, used when
    /// fetching lines whose wings reach into the grid.
    pub fn fetch_range(&self, wing: f64) -> (f64, f64) {
        ((self.min - wing).max(0.0), self.max + wing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComputeState {
    #[default]
    NotComputed,
    Computing,
    Computed,
}

impl ComputeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotComputed => "not-computed",
            Self::Computing => "computing",
            Self::Computed => "computed",
        }
    }

    pub const fn is_computed(self) -> bool {
        matches!(self, Self::Computed)
    }
}

impl Display for ComputeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
