//! Doppler and pressure broadening widths and the right-half line profiles
//! synthesized from them.

use crate::common::constants::{
    AVOGADRO, BOLTZMANN, GAUSSIAN_DOMINANCE_RATIO, LORENTZ_DOMINANCE_RATIO, P_REF_MBAR,
    SPEED_OF_LIGHT, T_REF_K,
};
use std::f64::consts::{LN_2, PI};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineShapeError {
    #[error("half-widths must be finite and non-negative with at least one positive, got gaussian={gaussian} lorentz={lorentz}")]
    InvalidHalfWidths { gaussian: f64, lorentz: f64 },
    #[error("wing width {distance} and grid step {step} must both be positive and finite")]
    InvalidGrid { distance: f64, step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Gaussian,
    Lorentz,
    PseudoVoigt,
}

impl ProfileKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Lorentz => "lorentz",
            Self::PseudoVoigt => "pseudo-voigt",
        }
    }
}

impl Display for ProfileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Mass of one molecule in kg from a molar mass in g/mol.
pub fn molecular_mass_kg(molar_mass_grams: f64) -> f64 {
    molar_mass_grams / 1000.0 / AVOGADRO
}

pub fn gaussian_half_width(center_wavenumber: f64, temperature: f64, mass_kg: f64) -> f64 {
    center_wavenumber * (2.0 * BOLTZMANN * temperature / (mass_kg * SPEED_OF_LIGHT.powi(2))).sqrt()
}

pub fn lorentz_half_width(
    air_half_width: f64,
    self_half_width: f64,
    pressure_mbar: f64,
    temperature: f64,
    mole_fraction: f64,
    temp_exponent: f64,
) -> f64 {
    ((1.0 - mole_fraction) * air_half_width + mole_fraction * self_half_width)
        * (pressure_mbar / P_REF_MBAR)
        * (T_REF_K / temperature).powf(temp_exponent)
}

pub fn gaussian_profile(half_width: f64, x_grid: &[f64]) -> Vec<f64> {
    let peak = (LN_2 / PI).sqrt() / half_width;
    x_grid
        .iter()
        .map(|x| peak * (-(x / half_width).powi(2) * LN_2).exp())
        .collect()
}

pub fn lorentz_profile(half_width: f64, x_grid: &[f64]) -> Vec<f64> {
    x_grid
        .iter()
        .map(|x| half_width / (PI * (x * x + half_width * half_width)))
        .collect()
}

/// Olivero–Longbothum combined full width from the two half-widths.
pub fn olivero_longbothum_width(gaussian_hw: f64, lorentz_hw: f64) -> f64 {
    let g = 2.0 * gaussian_hw;
    let l = 2.0 * lorentz_hw;
    (g.powi(5)
        + 2.69269 * g.powi(4) * l
        + 2.42843 * g.powi(3) * l.powi(2)
        + 4.47163 * g.powi(2) * l.powi(3)
        + 0.07842 * g * l.powi(4)
        + l.powi(5))
    .powf(0.2)
}

/// Lorentz weight of the pseudo-Voigt mixture for full widths `l` and `f`.
pub fn pseudo_voigt_mixing(lorentz_fw: f64, combined_fw: f64) -> f64 {
    let ratio = lorentz_fw / combined_fw;
    1.36603 * ratio - 0.47719 * ratio.powi(2) + 0.11116 * ratio.powi(3)
}

pub fn select_profile(gaussian_hw: f64, lorentz_hw: f64) -> ProfileKind {
    let ratio = lorentz_hw / gaussian_hw;
    if ratio < GAUSSIAN_DOMINANCE_RATIO {
        ProfileKind::Gaussian
    } else if ratio > LORENTZ_DOMINANCE_RATIO {
        ProfileKind::Lorentz
    } else {
        ProfileKind::PseudoVoigt
    }
}

/// Offsets `[0, distance)` from the line center in steps of `step`.
pub fn shape_grid(distance: f64, step: f64) -> Result<Vec<f64>, LineShapeError> {
    if !(distance.is_finite() && step.is_finite()) || distance <= 0.0 || step <= 0.0 {
        return Err(LineShapeError::InvalidGrid { distance, step });
    }
    let count = (distance / step).ceil() as usize;
    Ok(crate::numerics::step_grid(step, count))
}

/// Where the Gaussian and Lorentz curves come from. The line-shape cache
/// implements this to hand back memoized curves.
pub trait ProfileSource {
    fn gaussian(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64>;
    fn lorentz(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticProfiles;

impl ProfileSource for AnalyticProfiles {
    fn gaussian(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        gaussian_profile(half_width, x_grid)
    }

    fn lorentz(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        lorentz_profile(half_width, x_grid)
    }
}

pub fn pseudo_voigt(gaussian_hw: f64, lorentz_hw: f64, x_grid: &[f64]) -> Vec<f64> {
    pseudo_voigt_from(&AnalyticProfiles, gaussian_hw, lorentz_hw, x_grid)
}

pub fn pseudo_voigt_from<S: ProfileSource + ?Sized>(
    source: &S,
    gaussian_hw: f64,
    lorentz_hw: f64,
    x_grid: &[f64],
) -> Vec<f64> {
    let combined = olivero_longbothum_width(gaussian_hw, lorentz_hw);
    let eta = pseudo_voigt_mixing(2.0 * lorentz_hw, combined);
    let gaussian = source.gaussian(combined / 2.0, x_grid);
    let lorentz = source.lorentz(combined / 2.0, x_grid);
    lorentz
        .iter()
        .zip(&gaussian)
        .map(|(l, g)| eta * l + (1.0 - eta) * g)
        .collect()
}

/// Right-half profile for a line, picking the cheapest branch that the
/// width ratio allows.
pub fn compute_shape<S: ProfileSource + ?Sized>(
    source: &S,
    gaussian_hw: f64,
    lorentz_hw: f64,
    x_grid: &[f64],
) -> Result<(ProfileKind, Vec<f64>), LineShapeError> {
    let valid = |value: f64| value.is_finite() && value >= 0.0;
    if !valid(gaussian_hw) || !valid(lorentz_hw) || (gaussian_hw == 0.0 && lorentz_hw == 0.0) {
        return Err(LineShapeError::InvalidHalfWidths {
            gaussian: gaussian_hw,
            lorentz: lorentz_hw,
        });
    }

    let kind = select_profile(gaussian_hw, lorentz_hw);
    let shape = match kind {
        ProfileKind::Gaussian => source.gaussian(gaussian_hw, x_grid),
        ProfileKind::Lorentz => source.lorentz(lorentz_hw, x_grid),
        ProfileKind::PseudoVoigt => pseudo_voigt_from(source, gaussian_hw, lorentz_hw, x_grid),
    };
    Ok((kind, shape))
}

#[cfg(test)]
mod tests {
    use super::{
        AnalyticProfiles, LineShapeError, ProfileKind, compute_shape, gaussian_half_width,
        gaussian_profile, lorentz_half_width, lorentz_profile, molecular_mass_kg,
        olivero_longbothum_width, pseudo_voigt, pseudo_voigt_mixing, select_profile, shape_grid,
    };
    use crate::numerics::within_tolerance;

    #[test]
    fn gaussian_branch_is_bit_identical_below_ratio_threshold() {
        let x_grid = shape_grid(1.0, 0.01).expect("grid");
        let (kind, shape) =
            compute_shape(&AnalyticProfiles, 1.0e-3, 5.0e-6, &x_grid).expect("shape");
        assert_eq!(kind, ProfileKind::Gaussian);
        assert_eq!(shape, gaussian_profile(1.0e-3, &x_grid));
    }

    #[test]
    fn lorentz_branch_is_bit_identical_above_ratio_threshold() {
        let x_grid = shape_grid(1.0, 0.01).expect("grid");
        let (kind, shape) =
            compute_shape(&AnalyticProfiles, 5.0e-4, 0.07, &x_grid).expect("shape");
        assert_eq!(kind, ProfileKind::Lorentz);
        assert_eq!(shape, lorentz_profile(0.07, &x_grid));
    }

    #[test]
    fn intermediate_ratio_uses_pseudo_voigt() {
        assert_eq!(select_profile(1.0e-3, 1.0e-3), ProfileKind::PseudoVoigt);
        assert_eq!(select_profile(1.0, 0.01), ProfileKind::PseudoVoigt);
        assert_eq!(select_profile(1.0, 100.0), ProfileKind::PseudoVoigt);
        assert_eq!(select_profile(0.0, 0.1), ProfileKind::Lorentz);
        assert_eq!(select_profile(0.1, 0.0), ProfileKind::Gaussian);
    }

    #[test]
    fn combined_width_matches_closed_form_for_equal_half_widths() {
        let half_width = 0.0375;
        let expected = 2.0 * half_width * 11.67117_f64.powf(0.2);
        let actual = olivero_longbothum_width(half_width, half_width);
        assert!(within_tolerance(actual, expected, 0.0, 1.0e-6, 1.0e-300));
    }

    #[test]
    fn pseudo_voigt_mixes_components_at_combined_half_width() {
        let x_grid = [0.0, 0.02, 0.1];
        let (g, l) = (0.02, 0.03);
        let combined = olivero_longbothum_width(g, l);
        let eta = pseudo_voigt_mixing(2.0 * l, combined);
        let shape = pseudo_voigt(g, l, &x_grid);
        let gaussian = gaussian_profile(combined / 2.0, &x_grid);
        let lorentz = lorentz_profile(combined / 2.0, &x_grid);

        assert!(eta > 0.0 && eta < 1.0);
        for index in 0..x_grid.len() {
            let expected = eta * lorentz[index] + (1.0 - eta) * gaussian[index];
            assert_eq!(shape[index], expected);
        }
        assert!(shape.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn profiles_are_normalized_peaks() {
        let gaussian = gaussian_profile(0.5, &[0.0, 0.5]);
        assert!((gaussian[1] / gaussian[0] - 0.5).abs() < 1.0e-12);
        let lorentz = lorentz_profile(0.5, &[0.0, 0.5]);
        assert!((lorentz[1] / lorentz[0] - 0.5).abs() < 1.0e-12);
    }

    #[test]
    fn half_widths_follow_reference_scaling() {
        assert_eq!(lorentz_half_width(0.07, 0.09, 1013.25, 296.0, 0.0, 0.75), 0.07);
        let mixed = lorentz_half_width(0.07, 0.09, 506.625, 296.0, 0.5, 0.75);
        assert!((mixed - 0.04).abs() < 1.0e-12);

        let co2 = gaussian_half_width(667.0, 296.0, molecular_mass_kg(43.99));
        assert!(co2 > 7.0e-4 && co2 < 8.0e-4);
    }

    #[test]
    fn shape_grid_matches_half_open_range() {
        assert_eq!(shape_grid(5.0, 0.01).expect("grid").len(), 500);
        assert_eq!(shape_grid(0.105, 0.01).expect("grid").len(), 11);
        assert!(matches!(
            shape_grid(0.0, 0.01),
            Err(LineShapeError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn degenerate_half_widths_are_rejected() {
        let error = compute_shape(&AnalyticProfiles, 0.0, 0.0, &[0.0]).expect_err("degenerate");
        assert!(matches!(error, LineShapeError::InvalidHalfWidths { .. }));
    }
}
