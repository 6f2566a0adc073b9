//! Explicit computation context: grid resolution, line intensity cutoff,
//! detail preset and the line-shape cache shared by every layer.

use crate::common::constants::BASE_RESOLUTION;
use crate::domain::{RadError, RadResult, SpectralWindow};
use crate::modules::line_cache::LineShapeCache;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    High,
    Mid,
    Low,
}

impl DetailLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Mid => "mid",
            Self::Low => "low",
        }
    }

    pub const fn resolution(self) -> f64 {
        match self {
            Self::High | Self::Mid => BASE_RESOLUTION,
            Self::Low => 0.1,
        }
    }

    /// Lines whose 296 K intensity is at or below this are never loaded.
    pub const fn intensity_cutoff(self) -> f64 {
        match self {
            Self::High => 1.0e-30,
            Self::Mid => 1.0e-27,
            Self::Low => 1.0e-25,
        }
    }
}

impl Display for DetailLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = RadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "mid" | "medium" => Ok(Self::Mid),
            "low" => Ok(Self::Low),
            other => Err(RadError::input_validation(
                "INPUT.DETAIL_LEVEL",
                format!("unknown detail level '{}' (expected high, mid or low)", other),
            )),
        }
    }
}

#[derive(Debug)]
pub struct Context {
    detail: DetailLevel,
    resolution: f64,
    intensity_cutoff: f64,
    line_cache: LineShapeCache,
}

impl Context {
    pub fn new(detail: DetailLevel) -> Self {
        Self {
            detail,
            resolution: detail.resolution(),
            intensity_cutoff: detail.intensity_cutoff(),
            line_cache: LineShapeCache::in_memory(detail.resolution()),
        }
    }

    /// Overrides the preset resolution; any cache is rebuilt for the new grid.
    pub fn with_resolution(mut self, resolution: f64) -> RadResult<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(RadError::input_validation(
                "INPUT.SPECTRAL_RESOLUTION",
                format!("resolution {} must be positive", resolution),
            ));
        }
        self.resolution = resolution;
        let cache_root = self
            .line_cache
            .directory()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        self.line_cache = match cache_root {
            Some(root) => LineShapeCache::open(root, resolution)?,
            None => LineShapeCache::in_memory(resolution),
        };
        Ok(self)
    }

    pub fn with_intensity_cutoff(mut self, cutoff: f64) -> Self {
        self.intensity_cutoff = cutoff;
        self
    }

    /// Persists line shapes under `root/res<resolution>/` across runs.
    pub fn with_cache_dir(mut self, root: impl AsRef<Path>) -> RadResult<Self> {
        self.line_cache = LineShapeCache::open(root, self.resolution)?;
        Ok(self)
    }

    pub fn detail(&self) -> DetailLevel {
        self.detail
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn intensity_cutoff(&self) -> f64 {
        self.intensity_cutoff
    }

    pub fn line_cache(&self) -> &LineShapeCache {
        &self.line_cache
    }

    pub fn window(&self, range_min: f64, range_max: f64) -> RadResult<SpectralWindow> {
        SpectralWindow::new(range_min, range_max, self.resolution)
    }

    pub fn persist_cache(&self) -> RadResult<()> {
        self.line_cache.persist()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DetailLevel::default())
    }
}
