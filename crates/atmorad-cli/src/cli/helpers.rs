use super::CliError;
use anyhow::Context as _;
use atmorad_core::common::{Context, DetailLevel};
use atmorad_core::domain::RadError;
use atmorad_core::modules::atmosphere::MoleculeSpec;
use atmorad_core::modules::linedb::DirectoryLineDatabase;
use atmorad_core::modules::serialization::{read_json, write_text_artifact};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args, Debug, Clone)]
pub(super) struct LineDatabaseFlags {
    /// Line database directory (one folder per global isotope id)
    #[arg(long = "line-db", value_name = "DIR")]
    pub(super) line_db: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub(super) struct ContextFlags {
    /// Detail preset: high, mid or low
    #[arg(long, default_value = "high")]
    pub(super) detail: String,

    /// Grid resolution in cm-1, overriding the preset
    #[arg(long)]
    pub(super) resolution: Option<f64>,

    /// Directory persisting line shapes across runs
    #[arg(long, value_name = "DIR")]
    pub(super) cache_dir: Option<PathBuf>,
}

/// Single homogeneous layer. Heights and depth in cm.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LayerDocument {
    #[serde(default = "default_layer_name")]
    pub(super) name: String,
    #[serde(default)]
    pub(super) height: f64,
    pub(super) depth: f64,
    pub(super) temperature: f64,
    pub(super) pressure: f64,
    pub(super) range_min: f64,
    pub(super) range_max: f64,
    #[serde(default)]
    pub(super) wing: Option<f64>,
    pub(super) molecules: Vec<MoleculeSpec>,
}

fn default_layer_name() -> String {
    "layer".to_string()
}

pub(super) fn build_context(flags: &ContextFlags) -> Result<Context, CliError> {
    let detail: DetailLevel = flags.detail.parse().map_err(CliError::Compute)?;
    let mut context = Context::new(detail);
    if let Some(resolution) = flags.resolution {
        context = context
            .with_resolution(resolution)
            .map_err(CliError::Compute)?;
    }
    if let Some(cache_dir) = &flags.cache_dir {
        context = context
            .with_cache_dir(cache_dir)
            .map_err(CliError::Compute)?;
    }
    Ok(context)
}

pub(super) fn open_line_database(flags: &LineDatabaseFlags) -> Result<DirectoryLineDatabase, CliError> {
    DirectoryLineDatabase::open(&flags.line_db).map_err(CliError::Compute)
}

pub(super) fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    read_json(path).map_err(CliError::Compute)
}

pub(super) fn require_directory(path: &Path) -> Result<(), CliError> {
    if path.is_dir() {
        return Ok(());
    }
    Err(CliError::Compute(RadError::io_system(
        "IO.PROFILE_DIRECTORY",
        format!("profile directory '{}' does not exist", path.display()),
    )))
}

/// Writes `content` to `path`, or to stdout when no path is given.
pub(super) fn emit_text(path: Option<&Path>, content: &str) -> Result<(), CliError> {
    let Some(path) = path else {
        print!("{}", content);
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    write_text_artifact(path, content)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Bin start wavenumbers of a spectrum sampled every `resolution` from `min`.
pub(super) fn grid(min: f64, resolution: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|index| min + index as f64 * resolution)
        .collect()
}
