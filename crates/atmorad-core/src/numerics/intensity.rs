//! Temperature correction of reference (296 K) line intensities.

use crate::common::constants::{C2, T_REF_K};

pub fn boltzmann_factor(lower_state_energy: f64, temperature: f64) -> f64 {
    (-C2 * lower_state_energy / temperature).exp() / (-C2 * lower_state_energy / T_REF_K).exp()
}

pub fn stimulated_emission(wavenumber: f64, temperature: f64) -> f64 {
    (1.0 - (-C2 * wavenumber / temperature).exp()) / (1.0 - (-C2 * wavenumber / T_REF_K).exp())
}

/// Line intensity at `temperature`, given Q at that temperature (`q_t`) and
/// at the reference temperature (`q_ref`).
pub fn intensity_factor(
    reference_intensity: f64,
    wavenumber: f64,
    temperature: f64,
    lower_state_energy: f64,
    q_t: f64,
    q_ref: f64,
) -> f64 {
    reference_intensity
        * (q_ref / q_t)
        * stimulated_emission(wavenumber, temperature)
        * boltzmann_factor(lower_state_energy, temperature)
}
