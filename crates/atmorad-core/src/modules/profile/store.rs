use super::records::{
    LayerProfileRecord, ProfileCompletion, ProgressMarker, TransmissionCompletion,
    TransmissionRecord,
};
use crate::domain::{RadError, RadResult};
use crate::modules::serialization::{read_json, read_json_if_exists, write_json_atomic};
use crate::modules::transfer::Direction;
use std::fs;
use std::path::{Path, PathBuf};

const PROGRESS_FILE: &str = "progress.json";
const PROFILE_COMPLETE_FILE: &str = "profile-complete.json";
const TRANSMISSION_COMPLETE_FILE: &str = "transmission-complete.json";

/// Directory holding one planet's layer records, markers and transmission
/// output. Every file is written atomically.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> RadResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| {
            RadError::io_system(
                "IO.PROFILE_DIRECTORY",
                format!("failed to create '{}': {}", root.display(), source),
            )
        })?;
        Ok(Self { root })
    }

    /// Store at `<output>/<folder>`.
    pub fn for_planet(output: impl AsRef<Path>, folder: &str) -> RadResult<Self> {
        Self::new(output.as_ref().join(folder))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layer_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("layer-{:04}.json", index + 1))
    }

    pub fn progress_path(&self) -> PathBuf {
        self.root.join(PROGRESS_FILE)
    }

    pub fn profile_completion_path(&self) -> PathBuf {
        self.root.join(PROFILE_COMPLETE_FILE)
    }

    pub fn transmission_path(&self, direction: Direction, step: usize) -> PathBuf {
        self.root
            .join(format!("transmission-{}-{:04}.json", direction.as_str(), step))
    }

    pub fn transmission_completion_path(&self) -> PathBuf {
        self.root.join(TRANSMISSION_COMPLETE_FILE)
    }

    pub fn write_layer(&self, record: &LayerProfileRecord) -> RadResult<()> {
        write_json_atomic(&self.layer_path(record.index), record)
    }

    pub fn read_layer(&self, index: usize) -> RadResult<LayerProfileRecord> {
        let record: LayerProfileRecord = read_json(&self.layer_path(index))?;
        if record.index != index {
            return Err(RadError::input_validation(
                "INPUT.RECORD_FORMAT",
                format!(
                    "'{}' holds layer {} instead of {}",
                    self.layer_path(index).display(),
                    record.index,
                    index
                ),
            ));
        }
        Ok(record)
    }

    pub fn write_progress(&self, marker: &ProgressMarker) -> RadResult<()> {
        write_json_atomic(&self.progress_path(), marker)
    }

    pub fn read_progress(&self) -> RadResult<Option<ProgressMarker>> {
        read_json_if_exists(&self.progress_path())
    }

    pub fn write_profile_completion(&self, marker: &ProfileCompletion) -> RadResult<()> {
        write_json_atomic(&self.profile_completion_path(), marker)
    }

    pub fn read_profile_completion(&self) -> RadResult<Option<ProfileCompletion>> {
        read_json_if_exists(&self.profile_completion_path())
    }

    pub fn write_transmission(&self, record: &TransmissionRecord) -> RadResult<()> {
        write_json_atomic(&self.transmission_path(record.direction, record.step), record)
    }

    pub fn read_transmission(
        &self,
        direction: Direction,
        step: usize,
    ) -> RadResult<TransmissionRecord> {
        read_json(&self.transmission_path(direction, step))
    }

    pub fn write_transmission_completion(&self, marker: &TransmissionCompletion) -> RadResult<()> {
        write_json_atomic(&self.transmission_completion_path(), marker)
    }

    pub fn read_transmission_completion(&self) -> RadResult<Option<TransmissionCompletion>> {
        read_json_if_exists(&self.transmission_completion_path())
    }

    /// Removes every record and marker, leaving an empty store.
    pub fn clear(&self) -> RadResult<()> {
        let entries = fs::read_dir(&self.root).map_err(|source| {
            RadError::io_system(
                "IO.PROFILE_DIRECTORY",
                format!("failed to list '{}': {}", self.root.display(), source),
            )
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| {
                    RadError::io_system(
                        "IO.PROFILE_DIRECTORY",
                        format!("failed to list '{}': {}", self.root.display(), source),
                    )
                })?
                .path();
            let owned = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".json") || name.ends_with(".json.partial"));
            if path.is_file() && owned {
                fs::remove_file(&path).map_err(|source| {
                    RadError::io_system(
                        "IO.RECORD_WRITE",
                        format!("failed to remove '{}': {}", path.display(), source),
                    )
                })?;
            }
        }
        Ok(())
    }
}
