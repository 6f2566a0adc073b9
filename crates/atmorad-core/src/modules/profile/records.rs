//! Versioned JSON records written while building a profile and running the
//! transmission stage.

use crate::common::DetailLevel;
use crate::modules::atmosphere::PlanetConfig;
use crate::modules::transfer::Direction;
use crate::modules::traits::OpticalSlab;
use serde::{Deserialize, Serialize};

pub const FORMAT_VERSION: u32 = 1;

fn format_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeLayerData {
    pub name: String,
    pub concentration: f64,
    /// Present only when molecule-specific data was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absorption_coefficient: Option<Vec<f64>>,
}

/// One computed layer. Heights and depth in cm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerProfileRecord {
    #[serde(default = "format_version")]
    pub format_version: u32,
    pub index: usize,
    pub name: String,
    pub height: f64,
    pub depth: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub resolution: f64,
    pub molecules: Vec<MoleculeLayerData>,
    pub absorption_coefficient: Vec<f64>,
}

impl LayerProfileRecord {
    pub fn molecule_names(&self) -> Vec<String> {
        self.molecules.iter().map(|molecule| molecule.name.clone()).collect()
    }

    /// The record seen through one gas, when its coefficient was stored.
    pub fn molecule_slab(&self, name: &str) -> Option<MoleculeSlab<'_>> {
        let molecule = self.molecules.iter().find(|molecule| molecule.name == name)?;
        Some(MoleculeSlab {
            layer: self,
            absorption_coefficient: molecule.absorption_coefficient.as_deref()?,
        })
    }
}

impl OpticalSlab for LayerProfileRecord {
    fn absorption_coefficient(&self) -> &[f64] {
        &self.absorption_coefficient
    }

    fn depth(&self) -> f64 {
        self.depth
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn mean_height(&self) -> f64 {
        self.height + 0.5 * self.depth
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MoleculeSlab<'a> {
    layer: &'a LayerProfileRecord,
    absorption_coefficient: &'a [f64],
}

impl OpticalSlab for MoleculeSlab<'_> {
    fn absorption_coefficient(&self) -> &[f64] {
        self.absorption_coefficient
    }

    fn depth(&self) -> f64 {
        self.layer.depth
    }

    fn temperature(&self) -> f64 {
        self.layer.temperature
    }

    fn mean_height(&self) -> f64 {
        self.layer.mean_height()
    }
}

/// Advanced only after the layer it counts is on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMarker {
    #[serde(default = "format_version")]
    pub format_version: u32,
    pub completed_layers: usize,
    pub expected_layers: usize,
    pub elapsed_seconds: f64,
    pub resolution: f64,
    pub molecule_specific: bool,
    pub molecules: Vec<String>,
    pub detail: DetailLevel,
    /// Lines at or below this 296 K intensity were left out of every layer.
    pub intensity_cutoff: f64,
    pub planet: PlanetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletion {
    #[serde(flatten)]
    pub progress: ProgressMarker,
    /// Layer base heights in cm, surface first.
    pub layer_heights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeTransmission {
    pub name: String,
    pub concentration: f64,
    pub spectrum: Vec<f64>,
    pub effective_emissivity: f64,
    pub power: f64,
}

/// Spectrum after `step` layers of one pass; step 0 is the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmissionRecord {
    #[serde(default = "format_version")]
    pub format_version: u32,
    pub direction: Direction,
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
    /// Height in cm where the spectrum leaves the last folded layer.
    pub height: f64,
    pub output_resolution: f64,
    pub spectrum: Vec<f64>,
    pub effective_emissivity: f64,
    pub power: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub molecules: Vec<MoleculeTransmission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransmissionCompletion {
    #[serde(default = "format_version")]
    pub format_version: u32,
    /// `[0, layer mean heights..., max height]` in cm.
    pub height_list: Vec<f64>,
    pub max_height: f64,
    pub output_resolution: f64,
    pub surface_temperature: f64,
    pub surface_power: f64,
    pub molecules: Vec<String>,
    pub layer_count: usize,
}

#[cfg(test)]
mod tests {
    use super::{LayerProfileRecord, MoleculeLayerData, TransmissionRecord};
    use crate::modules::transfer::Direction;
    use crate::modules::traits::OpticalSlab;

    fn record() -> LayerProfileRecord {
        LayerProfileRecord {
            format_version: 1,
            index: 2,
            name: "layer 3_10".to_string(),
            height: 1000.0,
            depth: 500.0,
            temperature: 270.0,
            pressure: 800.0,
            range_min: 650.0,
            range_max: 650.03,
            resolution: 0.01,
            molecules: vec![
                MoleculeLayerData {
                    name: "co2".to_string(),
                    concentration: 4.0e-4,
                    absorption_coefficient: Some(vec![1.0e-3, 2.0e-3, 0.0]),
                },
                MoleculeLayerData {
                    name: "ar".to_string(),
                    concentration: 9.3e-3,
                    absorption_coefficient: None,
                },
            ],
            absorption_coefficient: vec![1.0e-3, 2.0e-3, 0.0],
        }
    }

    #[test]
    fn layer_record_is_an_optical_slab() {
        let record = record();
        assert_eq!(record.mean_height(), 1250.0);
        assert_eq!(record.transmittance()[2], 1.0);
        assert_eq!(record.molecule_names(), vec!["co2", "ar"]);

        let co2 = record.molecule_slab("co2").expect("co2 data");
        assert_eq!(co2.transmittance(), record.transmittance());
        assert!(record.molecule_slab("ar").is_none());
    }

    #[test]
    fn records_keep_format_version_and_camel_case_keys() {
        let text = serde_json::to_string(&record()).expect("serialize");
        assert!(text.contains("\"absorptionCoefficient\""));
        assert!(text.contains("\"formatVersion\":1"));
        let back: LayerProfileRecord = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, record());

        let transmission: TransmissionRecord = serde_json::from_str(
            r#"{"direction":"up","step":0,"height":0,"outputResolution":1,
                "spectrum":[1.0],"effectiveEmissivity":0,"power":2}"#,
        )
        .expect("transmission record");
        assert_eq!(transmission.direction, Direction::Up);
        assert_eq!(transmission.format_version, 1);
        assert!(transmission.molecules.is_empty());
    }
}
