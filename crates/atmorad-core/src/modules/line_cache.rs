//! Memoized Gaussian and Lorentz right-half curves keyed by half-width.
//!
//! Curves are only valid for one grid step, so a cache belongs to a single
//! resolution and persists under `<dir>/res<resolution>/`. Rows are
//! `halfWidth,value0,value1,...` written with shortest round-trip float
//! formatting so reloaded curves are bit-identical to fresh ones.

use crate::domain::{RadError, RadResult};
use crate::modules::serialization::write_text_atomic;
use crate::numerics::lineshape::{ProfileSource, gaussian_profile, lorentz_profile};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

type CurveMap = HashMap<u64, Arc<Vec<f64>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurveKind {
    Gaussian,
    Lorentz,
}

impl CurveKind {
    const fn file_name(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian.csv",
            Self::Lorentz => "lorentz.csv",
        }
    }

    fn evaluate(self, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        match self {
            Self::Gaussian => gaussian_profile(half_width, x_grid),
            Self::Lorentz => lorentz_profile(half_width, x_grid),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug)]
pub struct LineShapeCache {
    resolution: f64,
    directory: Option<PathBuf>,
    gaussian: RwLock<CurveMap>,
    lorentz: RwLock<CurveMap>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl LineShapeCache {
    pub fn in_memory(resolution: f64) -> Self {
        Self {
            resolution,
            directory: None,
            gaussian: RwLock::new(CurveMap::new()),
            lorentz: RwLock::new(CurveMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Opens (or starts) the persisted cache for `resolution` under `root`.
    pub fn open(root: impl AsRef<Path>, resolution: f64) -> RadResult<Self> {
        let directory = root.as_ref().join(format!("res{}", resolution));
        fs::create_dir_all(&directory).map_err(|source| {
            RadError::io_system(
                "IO.LINE_CACHE",
                format!(
                    "failed to create line-shape cache '{}': {}",
                    directory.display(),
                    source
                ),
            )
        })?;

        let cache = Self {
            directory: Some(directory.clone()),
            ..Self::in_memory(resolution)
        };
        for kind in [CurveKind::Gaussian, CurveKind::Lorentz] {
            let loaded = load_curves(&directory.join(kind.file_name()))?;
            debug!(
                curves = loaded.len(),
                kind = kind.file_name(),
                "loaded line-shape cache"
            );
            *cache.map(kind).write().unwrap_or_else(PoisonError::into_inner) = loaded;
        }
        Ok(cache)
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = [CurveKind::Gaussian, CurveKind::Lorentz]
            .into_iter()
            .map(|kind| self.map(kind).read().unwrap_or_else(PoisonError::into_inner).len())
            .sum();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Writes both curve tables; a purely in-memory cache is a no-op.
    pub fn persist(&self) -> RadResult<()> {
        let Some(directory) = &self.directory else {
            return Ok(());
        };
        for kind in [CurveKind::Gaussian, CurveKind::Lorentz] {
            let path = directory.join(kind.file_name());
            let rendered = {
                let map = self.map(kind).read().unwrap_or_else(PoisonError::into_inner);
                render_curves(&map)
            };
            write_text_atomic(&path, &rendered, "IO.LINE_CACHE")?;
        }
        Ok(())
    }

    fn map(&self, kind: CurveKind) -> &RwLock<CurveMap> {
        match kind {
            CurveKind::Gaussian => &self.gaussian,
            CurveKind::Lorentz => &self.lorentz,
        }
    }

    fn curve(&self, kind: CurveKind, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        // Curves from another grid step would not line up with the bins.
        if x_grid.len() > 1 && x_grid[1] != self.resolution {
            return kind.evaluate(half_width, x_grid);
        }

        let key = half_width.to_bits();
        let requested = x_grid.len();
        {
            let map = self.map(kind).read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = map.get(&key) {
                if cached.len() >= requested {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return cached[..requested].to_vec();
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let curve = kind.evaluate(half_width, x_grid);
        let mut map = self.map(kind).write().unwrap_or_else(PoisonError::into_inner);
        let replace = map
            .get(&key)
            .is_none_or(|existing| existing.len() < curve.len());
        if replace {
            map.insert(key, Arc::new(curve.clone()));
        }
        curve
    }
}

impl ProfileSource for LineShapeCache {
    fn gaussian(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        self.curve(CurveKind::Gaussian, half_width, x_grid)
    }

    fn lorentz(&self, half_width: f64, x_grid: &[f64]) -> Vec<f64> {
        self.curve(CurveKind::Lorentz, half_width, x_grid)
    }
}

fn render_curves(map: &CurveMap) -> String {
    let mut keys: Vec<&u64> = map.keys().collect();
    keys.sort_by(|lhs, rhs| f64::from_bits(**lhs).total_cmp(&f64::from_bits(**rhs)));

    let mut out = String::new();
    for key in keys {
        out.push_str(&f64::from_bits(*key).to_string());
        for value in map[key].iter() {
            out.push(',');
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }
    out
}

fn load_curves(path: &Path) -> RadResult<CurveMap> {
    if !path.is_file() {
        return Ok(CurveMap::new());
    }
    let source = fs::read_to_string(path).map_err(|source| {
        RadError::io_system(
            "IO.LINE_CACHE",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;

    let mut curves = CurveMap::new();
    for (row, text) in source.lines().enumerate() {
        if text.trim().is_empty() {
            continue;
        }
        match parse_row(text) {
            Some((half_width, curve)) => {
                curves.insert(half_width.to_bits(), Arc::new(curve));
            }
            None => warn!(
                path = %path.display(),
                row = row + 1,
                "skipping malformed line-shape cache row"
            ),
        }
    }
    Ok(curves)
}

fn parse_row(text: &str) -> Option<(f64, Vec<f64>)> {
    let mut fields = text.split(',');
    let half_width: f64 = fields.next()?.trim().parse().ok()?;
    let curve = fields
        .map(|field| field.trim().parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    if curve.is_empty() || !half_width.is_finite() {
        return None;
    }
    Some((half_width, curve))
}
