use crate::domain::ComputeState;
use crate::modules::column::{absorbance, emissivity, optical_depth, transmittance};
use crate::numerics::{planck_radiance, stable_mean};

/// Common interface of the isotope / molecule / layer hierarchy.
pub trait SpectralComponent {
    fn name(&self) -> &str;

    fn state(&self) -> ComputeState;

    /// Drops the cached cross section of this component and every child.
    fn reset_cross_section(&mut self);

    fn cross_section(&self) -> Option<&[f64]> {
        None
    }
}

/// A homogeneous slab of gas described by its absorption coefficient.
pub trait OpticalSlab {
    fn absorption_coefficient(&self) -> &[f64];

    /// Path length in cm.
    fn depth(&self) -> f64;

    fn temperature(&self) -> f64;

    /// Height of the slab midpoint in cm.
    fn mean_height(&self) -> f64;

    fn transmittance(&self) -> Vec<f64> {
        transmittance(self.absorption_coefficient(), self.depth())
    }

    fn emissivity(&self) -> Vec<f64> {
        emissivity(&self.transmittance())
    }

    fn absorbance(&self) -> Vec<f64> {
        absorbance(&self.transmittance())
    }

    fn optical_depth(&self) -> Vec<f64> {
        optical_depth(self.absorption_coefficient(), self.depth())
    }

    fn effective_emissivity(&self) -> f64 {
        stable_mean(&self.emissivity()).unwrap_or(0.0)
    }

    /// Attenuates `spectrum` through the slab and adds the slab's own
    /// thermal emission. `wavenumbers` must line up with the spectrum bins.
    fn transmit(&self, spectrum: &[f64], wavenumbers: &[f64]) -> Vec<f64> {
        let temperature = self.temperature();
        self.transmittance()
            .iter()
            .zip(spectrum)
            .zip(wavenumbers)
            .map(|((tau, incoming), nu)| {
                tau * incoming + (1.0 - tau) * planck_radiance(*nu, temperature)
            })
            .collect()
    }
}
