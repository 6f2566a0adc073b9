//! Per-isotope cross-section accumulation: every line's broadened profile,
//! scaled by its temperature-corrected intensity, is scatter-added onto the
//! layer grid.

use crate::domain::{Line, RadError, RadResult, SpectralWindow};
use crate::numerics::intensity::intensity_factor;
use crate::numerics::lineshape::{
    ProfileKind, ProfileSource, compute_shape, gaussian_half_width, lorentz_half_width,
    shape_grid,
};
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchCounts {
    pub gaussian: usize,
    pub lorentz: usize,
    pub pseudo_voigt: usize,
}

impl BranchCounts {
    pub fn record(&mut self, kind: ProfileKind) {
        match kind {
            ProfileKind::Gaussian => self.gaussian += 1,
            ProfileKind::Lorentz => self.lorentz += 1,
            ProfileKind::PseudoVoigt => self.pseudo_voigt += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.gaussian + self.lorentz + self.pseudo_voigt
    }
}

impl AddAssign for BranchCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.gaussian += rhs.gaussian;
        self.lorentz += rhs.lorentz;
        self.pseudo_voigt += rhs.pseudo_voigt;
    }
}

/// Thermodynamic state and grid a set of lines is accumulated under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationInput {
    pub window: SpectralWindow,
    pub temperature: f64,
    pub pressure: f64,
    pub mole_fraction: f64,
    /// Half-width of the synthesized profile in cm⁻¹.
    pub wing: f64,
    pub molecular_mass_kg: f64,
    pub q_t: f64,
    pub q_ref: f64,
}

/// Adds `shape` mirrored around `center` into `target`. Bins outside the
/// target are dropped. The last shape sample is not used.
pub fn scatter_add(target: &mut [f64], center: i64, shape: &[f64], scale: f64) {
    let len = target.len() as i64;
    let mut add = |index: i64, value: f64| {
        if (0..len).contains(&index) {
            target[index as usize] += value;
        }
    };

    let Some(peak) = shape.first() else {
        return;
    };
    add(center, peak * scale);
    for offset in 1..shape.len().saturating_sub(1) {
        let value = shape[offset] * scale;
        add(center + offset as i64, value);
        add(center - offset as i64, value);
    }
}

/// Cross section of `lines` on `input.window`, with the profile branch
/// taken for each line.
pub fn accumulate_lines<S: ProfileSource + ?Sized>(
    source: &S,
    lines: &[Line],
    input: &AccumulationInput,
) -> RadResult<(Vec<f64>, BranchCounts)> {
    let mut cross_section = input.window.zeroed();
    let mut branches = BranchCounts::default();
    if lines.is_empty() {
        return Ok((cross_section, branches));
    }

    let x_grid = shape_grid(input.wing, input.window.resolution).map_err(|source| {
        RadError::input_validation("INPUT.LINE_WING", source.to_string())
    })?;

    for line in lines {
        let center = line.broadened_wavenumber(input.pressure);
        let gaussian_hw = gaussian_half_width(center, input.temperature, input.molecular_mass_kg);
        let lorentz_hw = lorentz_half_width(
            line.air_half_width,
            line.self_half_width,
            input.pressure,
            input.temperature,
            input.mole_fraction,
            line.temp_exponent,
        );
        let (kind, shape) =
            compute_shape(source, gaussian_hw, lorentz_hw, &x_grid).map_err(|source| {
                RadError::computation(
                    "RUN.LINE_SHAPE",
                    format!("line at {} cm-1: {}", line.wavenumber, source),
                )
            })?;
        branches.record(kind);

        let intensity = intensity_factor(
            line.reference_intensity,
            center,
            input.temperature,
            line.lower_state_energy,
            input.q_t,
            input.q_ref,
        );
        scatter_add(
            &mut cross_section,
            input.window.bin_of(center),
            &shape,
            intensity,
        );
    }

    Ok((cross_section, branches))
}

/// Raw 296 K intensities summed at each line's unshifted center bin.
pub fn line_survey(lines: &[Line], window: &SpectralWindow) -> Vec<f64> {
    let mut survey = window.zeroed();
    for line in lines {
        scatter_add(
            &mut survey,
            window.bin_of(line.wavenumber),
            &[line.reference_intensity],
            1.0,
        );
    }
    survey
}
