//! Isotope / molecule / layer aggregation and the Beer–Lambert conversions
//! applied to their cross sections.

pub mod isotope;
pub mod layer;
pub mod molecule;

pub use isotope::Isotope;
pub use layer::{Layer, default_wing};
pub use molecule::{Abundance, Molecule};

use crate::common::constants::BOLTZMANN;
use crate::domain::SpectralWindow;
use crate::modules::traits::OpticalSlab;
use serde::{Deserialize, Serialize};

/// State a layer hands down to its molecules and isotopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConditions {
    pub temperature: f64,
    pub pressure: f64,
    pub window: SpectralWindow,
    pub wing: f64,
}

impl LayerConditions {
    /// Range of raw line centers whose wings reach the window.
    pub fn fetch_range(&self) -> (f64, f64) {
        self.window.fetch_range(self.wing)
    }
}

/// Number-density conversion from cross section (cm²/molecule) to
/// absorption coefficient (cm⁻¹) for a gas at `pressure` mbar.
pub fn absorption_coefficient(
    cross_section: &[f64],
    concentration: f64,
    pressure: f64,
    temperature: f64,
) -> Vec<f64> {
    let number_density = concentration * pressure / (1.0e4 * BOLTZMANN * temperature);
    cross_section
        .iter()
        .map(|sigma| sigma * number_density)
        .collect()
}

pub fn transmittance(absorption_coefficient: &[f64], depth: f64) -> Vec<f64> {
    absorption_coefficient
        .iter()
        .map(|alpha| (-alpha * depth).exp())
        .collect()
}

pub fn optical_depth(absorption_coefficient: &[f64], depth: f64) -> Vec<f64> {
    absorption_coefficient
        .iter()
        .map(|alpha| alpha * depth)
        .collect()
}

pub fn emissivity(transmittance: &[f64]) -> Vec<f64> {
    transmittance.iter().map(|tau| 1.0 - tau).collect()
}

pub fn absorbance(transmittance: &[f64]) -> Vec<f64> {
    transmittance.iter().map(|tau| (1.0 / tau).log10()).collect()
}

pub fn add_into(total: &mut [f64], part: &[f64]) {
    for (sum, value) in total.iter_mut().zip(part) {
        *sum += value;
    }
}

/// Owned absorption profile of one slab of the column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slab {
    pub absorption_coefficient: Vec<f64>,
    pub depth: f64,
    pub temperature: f64,
    pub height: f64,
}

impl OpticalSlab for Slab {
    fn absorption_coefficient(&self) -> &[f64] {
        &self.absorption_coefficient
    }

    fn depth(&self) -> f64 {
        self.depth
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn mean_height(&self) -> f64 {
        self.height + 0.5 * self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::{Slab, absorbance, absorption_coefficient, optical_depth, transmittance};
    use crate::common::constants::BOLTZMANN;
    use crate::modules::traits::OpticalSlab;

    #[test]
    fn absorption_coefficient_uses_ideal_gas_number_density() {
        let alpha = absorption_coefficient(&[1.0e-20, 0.0], 0.5, 1000.0, 250.0);
        let expected = 1.0e-20 * 0.5 * 1000.0 / (1.0e4 * BOLTZMANN * 250.0);
        assert!((alpha[0] - expected).abs() <= expected * 1.0e-15);
        assert_eq!(alpha[1], 0.0);
    }

    #[test]
    fn transmittance_is_monotone_in_depth_concentration_and_coefficient() {
        let sigma = [1.0e-21, 3.0e-21];
        let thin = transmittance(&absorption_coefficient(&sigma, 1.0e-3, 1000.0, 280.0), 100.0);
        let deep = transmittance(&absorption_coefficient(&sigma, 1.0e-3, 1000.0, 280.0), 1.0e4);
        let rich = transmittance(&absorption_coefficient(&sigma, 2.0e-3, 1000.0, 280.0), 100.0);

        for index in 0..sigma.len() {
            assert!(deep[index] <= thin[index]);
            assert!(rich[index] <= thin[index]);
            assert!(thin[index] > 0.0 && thin[index] <= 1.0);
        }
        assert!(thin[1] <= thin[0]);
    }

    #[test]
    fn optical_depth_and_absorbance_agree_with_transmittance() {
        let alpha = [2.0e-3];
        let tau = transmittance(&alpha, 500.0);
        assert!((optical_depth(&alpha, 500.0)[0] - 1.0).abs() < 1.0e-15);
        assert!((absorbance(&tau)[0] - 1.0 / std::f64::consts::LN_10).abs() < 1.0e-12);
    }

    #[test]
    fn slab_mean_height_is_midpoint() {
        let slab = Slab {
            absorption_coefficient: vec![0.0],
            depth: 200.0,
            temperature: 280.0,
            height: 1000.0,
        };
        assert_eq!(slab.mean_height(), 1100.0);
        assert_eq!(slab.effective_emissivity(), 0.0);
    }
}
