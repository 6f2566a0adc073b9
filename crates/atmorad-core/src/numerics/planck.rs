//! Blackbody radiance per wavenumber and the spectrum reductions used when
//! reporting transfer results.

use crate::common::constants::{BOLTZMANN, PLANCK, SPEED_OF_LIGHT, STEFAN_BOLTZMANN};
use crate::domain::{RadError, RadResult, SpectralWindow};
use crate::numerics::stable_sum;
use std::f64::consts::PI;

/// Radiance in W·m⁻²·sr⁻¹·(cm⁻¹)⁻¹ at `wavenumber` cm⁻¹.
pub fn planck_radiance(wavenumber: f64, temperature: f64) -> f64 {
    if wavenumber <= 0.0 || temperature <= 0.0 {
        return 0.0;
    }
    let a = 2.0e8 * PLANCK * SPEED_OF_LIGHT.powi(2) * wavenumber.powi(3);
    let b = 100.0 * PLANCK * SPEED_OF_LIGHT * wavenumber / (BOLTZMANN * temperature);
    a / b.exp_m1()
}

pub fn planck_spectrum(window: &SpectralWindow, temperature: f64) -> Vec<f64> {
    (0..window.len())
        .map(|index| planck_radiance(window.wavenumber_at(index), temperature))
        .collect()
}

/// Hemispheric power in W·m⁻² of a radiance spectrum sampled every
/// `resolution` cm⁻¹. Non-finite bins are skipped.
pub fn integrate_spectrum(radiance: &[f64], resolution: f64) -> f64 {
    let finite: Vec<f64> = radiance
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .collect();
    stable_sum(&finite) * PI * resolution
}

/// Stefan–Boltzmann temperature of a blackbody emitting `power` W·m⁻².
pub fn effective_temperature(power: f64) -> f64 {
    (power / STEFAN_BOLTZMANN).powf(0.25)
}

/// Box-averages consecutive bins from `base_resolution` down to
/// `final_resolution`; a trailing partial box is dropped.
pub fn reduce_resolution(
    values: &[f64],
    base_resolution: f64,
    final_resolution: f64,
) -> RadResult<Vec<f64>> {
    let ratio = final_resolution / base_resolution;
    let factor = ratio.round();
    if !ratio.is_finite() || factor < 1.0 || (ratio - factor).abs() > 1.0e-9 * factor {
        return Err(RadError::input_validation(
            "INPUT.OUTPUT_RESOLUTION",
            format!(
                "output resolution {} must be a whole multiple of the grid resolution {}",
                final_resolution, base_resolution
            ),
        ));
    }

    let factor = factor as usize;
    if factor == 1 {
        return Ok(values.to_vec());
    }
    Ok(values
        .chunks_exact(factor)
        .map(|chunk| chunk.iter().map(|value| value / factor as f64).sum())
        .collect())
}
