use crate::domain::{RadError, RadResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

/// Column table with a `#` header line; every column must be as long as
/// `wavenumbers`.
pub fn render_spectrum_table(wavenumbers: &[f64], columns: &[(&str, &[f64])]) -> String {
    let mut out = String::from("# wavenumber");
    for (label, _) in columns {
        out.push(' ');
        out.push_str(label);
    }
    out.push('\n');

    for (index, nu) in wavenumbers.iter().enumerate() {
        out.push_str(&format_fixed_f64(*nu, 12, 4));
        for (_, values) in columns {
            let value = values.get(index).copied().unwrap_or(f64::NAN);
            out.push(' ');
            out.push_str(&format!("{value:>22.14e}"));
        }
        out.push('\n');
    }
    out
}

/// Serializes `value` next to `path` and renames it into place so a reader
/// never sees a half-written record.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> RadResult<()> {
    let payload = serde_json::to_vec_pretty(value).map_err(|source| {
        RadError::internal(
            "SYS.SERIALIZE",
            format!("failed to encode '{}': {}", path.display(), source),
        )
    })?;
    replace_file(path, &payload, "IO.RECORD_WRITE")
}

/// Normalized text artifact written through the same staging file as JSON
/// records; `placeholder` tags any IO failure.
pub fn write_text_atomic(path: &Path, content: &str, placeholder: &'static str) -> RadResult<()> {
    replace_file(path, normalize_text_artifact(content).as_bytes(), placeholder)
}

/// `<file>.partial` beside `path`; never read back.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn replace_file(path: &Path, payload: &[u8], placeholder: &'static str) -> RadResult<()> {
    let staging = staging_path(path);
    fs::write(&staging, payload).map_err(|source| {
        RadError::io_system(
            placeholder,
            format!("failed to write '{}': {}", staging.display(), source),
        )
    })?;
    fs::rename(&staging, path).map_err(|source| {
        RadError::io_system(
            placeholder,
            format!(
                "failed to move '{}' to '{}': {}",
                staging.display(),
                path.display(),
                source
            ),
        )
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> RadResult<T> {
    let source = fs::read_to_string(path).map_err(|source| {
        RadError::io_system(
            "IO.RECORD_READ",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;
    serde_json::from_str(&source).map_err(|source| {
        RadError::input_validation(
            "INPUT.RECORD_FORMAT",
            format!("failed to parse '{}': {}", path.display(), source),
        )
    })
}

/// Like [`read_json`] but a missing file is `Ok(None)`.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> RadResult<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
