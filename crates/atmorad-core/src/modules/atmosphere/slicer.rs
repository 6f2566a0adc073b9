//! Subdivides a column into contiguous layers of equal mass.

use super::rules::RuleEngine;
use crate::domain::{RadError, RadResult};
use crate::numerics::bisect_root;
use serde::{Deserialize, Serialize};

/// Upper bound on the number of slices of one column.
pub const MAX_LAYERS: usize = 100_000;

const DEPTH_TOLERANCE: f64 = 1.0e-12;
const DEPTH_ITERATIONS: usize = 200;

/// One layer of the sliced column, with temperature and pressure taken at
/// its mean height. Heights and depth in cm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSlice {
    pub index: usize,
    pub height: f64,
    pub depth: f64,
    pub temperature: f64,
    pub pressure: f64,
}

impl LayerSlice {
    pub fn mean_height(&self) -> f64 {
        self.height + 0.5 * self.depth
    }

    pub fn top(&self) -> f64 {
        self.height + self.depth
    }
}

/// Column mass in kg/m² of a layer at `height` with `depth`, using the
/// density at its mean height.
pub fn layer_mass(engine: &RuleEngine, height: f64, depth: f64) -> RadResult<f64> {
    Ok(engine.density_at(height + 0.5 * depth)? * depth / 100.0)
}

fn slice_at(engine: &RuleEngine, index: usize, height: f64, depth: f64) -> RadResult<LayerSlice> {
    let mean_height = height + 0.5 * depth;
    Ok(LayerSlice {
        index,
        height,
        depth,
        temperature: engine.temperature_at(mean_height)?,
        pressure: engine.pressure_at(mean_height)?,
    })
}

/// Depth of the layer starting at `height` that carries `target_mass`,
/// never reaching past `remaining`. `None` when even `remaining` is too
/// light, which makes it the last layer.
fn equal_mass_depth(
    engine: &RuleEngine,
    height: f64,
    target_mass: f64,
    guess: f64,
    remaining: f64,
) -> RadResult<Option<f64>> {
    let excess = |depth: f64| layer_mass(engine, height, depth).map(|mass| mass - target_mass);
    if excess(remaining)? <= 0.0 {
        return Ok(None);
    }

    let mut lower = 0.0;
    let mut upper = guess.min(remaining);
    while excess(upper)? < 0.0 {
        lower = upper;
        upper = (2.0 * upper).min(remaining);
    }
    let depth = bisect_root(excess, lower, upper, DEPTH_TOLERANCE, DEPTH_ITERATIONS)?;
    depth.map(Some).ok_or_else(|| {
        RadError::computation(
            "RUN.SLICE_DEPTH",
            format!("no equal-mass depth found above {} cm", height),
        )
    })
}

/// Slices `(0, max_height]` into layers carrying the mass of an initial
/// layer `initial_depth` cm thick at the surface. The last layer is clipped
/// to end exactly at `max_height`.
pub fn slice_column(
    engine: &RuleEngine,
    initial_depth: f64,
    max_height: f64,
) -> RadResult<Vec<LayerSlice>> {
    if !(initial_depth.is_finite() && initial_depth > 0.0) {
        return Err(RadError::input_validation(
            "INPUT.INITIAL_DEPTH",
            format!("initial depth {} cm must be positive", initial_depth),
        ));
    }
    if !(max_height.is_finite() && max_height > 0.0) {
        return Err(RadError::input_validation(
            "INPUT.MAX_HEIGHT",
            format!("maximum height {} cm must be positive", max_height),
        ));
    }

    let first_depth = initial_depth.min(max_height);
    let target_mass = layer_mass(engine, 0.0, first_depth)?;
    let mut slices = vec![slice_at(engine, 0, 0.0, first_depth)?];

    loop {
        let Some(last) = slices.last().copied() else {
            break;
        };
        let height = last.top();
        let remaining = max_height - height;
        if remaining <= 0.0 {
            break;
        }
        if slices.len() >= MAX_LAYERS {
            return Err(RadError::input_validation(
                "INPUT.SLICE_LIMIT",
                format!(
                    "more than {} layers needed; increase the initial depth",
                    MAX_LAYERS
                ),
            ));
        }

        let depth = equal_mass_depth(engine, height, target_mass, last.depth, remaining)?
            .filter(|depth| height + depth < max_height);
        match depth {
            Some(depth) => slices.push(slice_at(engine, slices.len(), height, depth)?),
            None => {
                slices.push(slice_at(engine, slices.len(), height, remaining)?);
                break;
            }
        }
    }
    Ok(slices)
}
