//! Access to spectroscopic line lists, partition functions and isotope
//! parameters.
//!
//! A directory database is laid out one folder per global isotope id:
//! `<root>/<id>/params.json`, `<root>/<id>/partition.json` (object keyed by
//! integer kelvin) and `<root>/<id>/lines.json` (array of lines).

use crate::domain::{IsotopeParams, Line, PartitionTable, RadError, RadResult};
use crate::modules::serialization::{read_json, read_json_if_exists};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub trait LineDatabase: Sync {
    /// Lines with `wave_min <= wavenumber <= wave_max`, ascending. A range
    /// with no data yields an empty list.
    fn fetch_lines(&self, global_id: u32, wave_min: f64, wave_max: f64) -> RadResult<Vec<Line>>;

    fn fetch_partition_table(&self, global_id: u32) -> RadResult<PartitionTable>;

    fn fetch_isotope_params(&self, global_id: u32) -> RadResult<IsotopeParams>;
}

fn select_range(lines: &[Line], wave_min: f64, wave_max: f64) -> Vec<Line> {
    let mut selected: Vec<Line> = lines
        .iter()
        .filter(|line| line.wavenumber >= wave_min && line.wavenumber <= wave_max)
        .copied()
        .collect();
    selected.sort_by(|lhs, rhs| lhs.wavenumber.total_cmp(&rhs.wavenumber));
    selected
}

fn unknown_isotope(global_id: u32) -> RadError {
    RadError::input_validation(
        "INPUT.UNKNOWN_ISOTOPE",
        format!("no parameters for global isotope {}", global_id),
    )
}

#[derive(Debug, Clone, PartialEq)]
struct IsotopeData {
    params: IsotopeParams,
    partition: PartitionTable,
    lines: Vec<Line>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryLineDatabase {
    isotopes: BTreeMap<u32, IsotopeData>,
}

impl InMemoryLineDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_isotope(
        &mut self,
        params: IsotopeParams,
        partition: PartitionTable,
        lines: Vec<Line>,
    ) -> &mut Self {
        self.isotopes.insert(
            params.global_id,
            IsotopeData {
                params,
                partition,
                lines,
            },
        );
        self
    }

    pub fn with_isotope(
        mut self,
        params: IsotopeParams,
        partition: PartitionTable,
        lines: Vec<Line>,
    ) -> Self {
        self.insert_isotope(params, partition, lines);
        self
    }
}

impl LineDatabase for InMemoryLineDatabase {
    fn fetch_lines(&self, global_id: u32, wave_min: f64, wave_max: f64) -> RadResult<Vec<Line>> {
        Ok(self
            .isotopes
            .get(&global_id)
            .map(|data| select_range(&data.lines, wave_min, wave_max))
            .unwrap_or_default())
    }

    fn fetch_partition_table(&self, global_id: u32) -> RadResult<PartitionTable> {
        Ok(self
            .isotopes
            .get(&global_id)
            .map(|data| data.partition.clone())
            .unwrap_or_default())
    }

    fn fetch_isotope_params(&self, global_id: u32) -> RadResult<IsotopeParams> {
        self.isotopes
            .get(&global_id)
            .map(|data| data.params.clone())
            .ok_or_else(|| unknown_isotope(global_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLineDatabase {
    root: PathBuf,
}

impl DirectoryLineDatabase {
    pub const PARAMS_FILE: &'static str = "params.json";
    pub const PARTITION_FILE: &'static str = "partition.json";
    pub const LINES_FILE: &'static str = "lines.json";

    pub fn open(root: impl Into<PathBuf>) -> RadResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RadError::io_system(
                "IO.LINE_DATABASE",
                format!("line database directory '{}' does not exist", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn isotope_dir(&self, global_id: u32) -> PathBuf {
        self.root.join(global_id.to_string())
    }
}

impl LineDatabase for DirectoryLineDatabase {
    fn fetch_lines(&self, global_id: u32, wave_min: f64, wave_max: f64) -> RadResult<Vec<Line>> {
        let path = self.isotope_dir(global_id).join(Self::LINES_FILE);
        let lines: Vec<Line> = read_json_if_exists(&path)?.unwrap_or_default();
        Ok(select_range(&lines, wave_min, wave_max))
    }

    fn fetch_partition_table(&self, global_id: u32) -> RadResult<PartitionTable> {
        let path = self.isotope_dir(global_id).join(Self::PARTITION_FILE);
        Ok(read_json_if_exists(&path)?.unwrap_or_default())
    }

    fn fetch_isotope_params(&self, global_id: u32) -> RadResult<IsotopeParams> {
        let path = self.isotope_dir(global_id).join(Self::PARAMS_FILE);
        if !path.is_file() {
            return Err(unknown_isotope(global_id));
        }
        read_json(&path)
    }
}
