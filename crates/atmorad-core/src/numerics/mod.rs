pub mod humidity;
pub mod intensity;
pub mod lineshape;
pub mod planck;

pub use humidity::{saturation_vapour_pressure, water_vapour_mixing_ratio};
pub use intensity::{boltzmann_factor, intensity_factor, stimulated_emission};
pub use lineshape::{
    LineShapeError, ProfileKind, gaussian_half_width, gaussian_profile, lorentz_half_width,
    lorentz_profile, olivero_longbothum_width, pseudo_voigt, select_profile, shape_grid,
};
pub use planck::{
    effective_temperature, integrate_spectrum, planck_radiance, planck_spectrum, reduce_resolution,
};

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

pub fn stable_weighted_sum(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.len() != weights.len() {
        return None;
    }

    let mut sum = 0.0;
    let mut correction = 0.0;
    for (&value, &weight) in values.iter().zip(weights) {
        kahan_add(&mut sum, &mut correction, value * weight);
    }

    Some(sum)
}

pub fn stable_weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    if values.len() != weights.len() {
        return None;
    }

    let total_weight = stable_sum(weights);
    if total_weight == 0.0 {
        return None;
    }

    let weighted_sum = stable_weighted_sum(values, weights)?;
    Some(weighted_sum / total_weight)
}

pub fn stable_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(stable_sum(values) / values.len() as f64)
}

/// `count` points `0, step, 2·step, …` without accumulating rounding.
pub fn step_grid(step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|index| index as f64 * step).collect()
}

pub fn interpolate_linear(x: f64, x_grid: &[f64], y_grid: &[f64]) -> Option<f64> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    if !x_grid.windows(2).all(|window| window[0] <= window[1]) {
        return None;
    }

    if x <= x_grid[0] {
        return Some(y_grid[0]);
    }

    let last_index = x_grid.len() - 1;
    if x >= x_grid[last_index] {
        return Some(y_grid[last_index]);
    }

    let upper = x_grid
        .windows(2)
        .position(|window| x <= window[1])
        .map(|index| index + 1)?;
    let lower = upper - 1;
    let x0 = x_grid[lower];
    let x1 = x_grid[upper];
    if x1 == x0 {
        return Some(y_grid[upper]);
    }

    let interpolation = (x - x0) / (x1 - x0);
    Some(y_grid[lower] + interpolation * (y_grid[upper] - y_grid[lower]))
}

/// Root of a continuous `f` bracketed by `[lower, upper]` with
/// `f(lower) <= 0 <= f(upper)`. `Ok(None)` when the bracket is not valid.
pub fn bisect_root<E>(
    mut f: impl FnMut(f64) -> Result<f64, E>,
    mut lower: f64,
    mut upper: f64,
    relative_tolerance: f64,
    max_iterations: usize,
) -> Result<Option<f64>, E> {
    let f_lower = f(lower)?;
    let f_upper = f(upper)?;
    if !(f_lower.is_finite() && f_upper.is_finite()) || f_lower > 0.0 || f_upper < 0.0 {
        return Ok(None);
    }
    if f_lower == 0.0 {
        return Ok(Some(lower));
    }
    if f_upper == 0.0 {
        return Ok(Some(upper));
    }

    for _ in 0..max_iterations {
        let mid = 0.5 * (lower + upper);
        let value = f(mid)?;
        if !value.is_finite() {
            return Ok(None);
        }
        if value == 0.0 {
            return Ok(Some(mid));
        }
        if value < 0.0 {
            lower = mid;
        } else {
            upper = mid;
        }
        if (upper - lower) <= relative_tolerance * upper.abs().max(f64::MIN_POSITIVE) {
            break;
        }
    }

    Ok(Some(0.5 * (lower + upper)))
}

pub fn relative_difference(lhs: f64, rhs: f64, relative_floor: f64) -> f64 {
    let scale = lhs.abs().max(rhs.abs()).max(relative_floor);
    (lhs - rhs).abs() / scale
}

pub fn within_tolerance(
    lhs: f64,
    rhs: f64,
    abs_tol: f64,
    rel_tol: f64,
    relative_floor: f64,
) -> bool {
    let abs_diff = (lhs - rhs).abs();
    abs_diff <= abs_tol || relative_difference(lhs, rhs, relative_floor) <= rel_tol
}
