//! Planet construction: surface state, gas mixture and atmosphere rules
//! from a JSON configuration document.

use super::rules::{AtmosphereRule, RateProfile, RuleEngine, RuleKind, SurfaceState};
use super::slicer::{LayerSlice, slice_column};
use crate::common::Context;
use crate::common::constants::{
    CM_PER_KM, CM_PER_M, STANDARD_GRAVITY, SURFACE_EFFECTIVE_EMISSIVITY,
};
use crate::domain::{RadError, RadResult, SpectralWindow};
use crate::modules::column::{Abundance, Layer};
use crate::modules::linedb::LineDatabase;
use crate::modules::traits::SpectralComponent;
use crate::numerics::planck::{integrate_spectrum, planck_spectrum};
use serde::{Deserialize, Serialize};

fn default_gravity() -> f64 {
    STANDARD_GRAVITY
}

fn default_emissivity() -> f64 {
    SURFACE_EFFECTIVE_EMISSIVITY
}

fn default_initial_depth() -> f64 {
    100.0
}

fn default_isotope_depth() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeSpec {
    pub name: String,
    #[serde(default = "default_isotope_depth")]
    pub isotope_depth: usize,
    #[serde(flatten)]
    pub abundance: Abundance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureRuleSpec {
    pub name: String,
    /// km
    pub final_height: f64,
    /// K
    pub final_value: f64,
    #[serde(default)]
    pub profile: RateProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionRuleSpec {
    pub name: String,
    pub molecule: String,
    /// km
    pub final_height: f64,
    /// Mole fraction.
    pub final_value: f64,
    /// Explicit start of the rule in km; chains from earlier rules when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_value: Option<f64>,
    #[serde(default)]
    pub profile: RateProfile,
}

/// Everything needed to rebuild a planet; stored with profiles so a resume
/// can be checked against the run that started them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetConfig {
    pub name: String,
    /// Label appended to the profile folder; defaults to the detail level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    /// mbar
    pub surface_pressure: f64,
    /// K
    pub surface_temperature: f64,
    /// km
    pub max_height: f64,
    pub range_min: f64,
    pub range_max: f64,
    /// m
    #[serde(default = "default_initial_depth")]
    pub initial_depth: f64,
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default = "default_emissivity")]
    pub surface_effective_emissivity: f64,
    pub molecules: Vec<MoleculeSpec>,
    #[serde(default)]
    pub temperature_rules: Vec<TemperatureRuleSpec>,
    #[serde(default)]
    pub composition_rules: Vec<CompositionRuleSpec>,
}

impl PlanetConfig {
    fn validate(&self) -> RadResult<()> {
        let positive = [
            ("surfacePressure", self.surface_pressure),
            ("surfaceTemperature", self.surface_temperature),
            ("maxHeight", self.max_height),
            ("initialDepth", self.initial_depth),
            ("gravity", self.gravity),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(RadError::input_validation(
                    "INPUT.PLANET_CONFIG",
                    format!("planet '{}': {} = {} must be positive", self.name, field, value),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.surface_effective_emissivity) {
            return Err(RadError::input_validation(
                "INPUT.PLANET_CONFIG",
                format!(
                    "planet '{}': surfaceEffectiveEmissivity {} is outside [0, 1]",
                    self.name, self.surface_effective_emissivity
                ),
            ));
        }
        if self.molecules.is_empty() {
            return Err(RadError::input_validation(
                "INPUT.PLANET_CONFIG",
                format!("planet '{}' has no molecules", self.name),
            ));
        }
        Ok(())
    }

    pub fn max_height_cm(&self) -> f64 {
        self.max_height * CM_PER_KM
    }

    pub fn initial_depth_cm(&self) -> f64 {
        self.initial_depth * CM_PER_M
    }
}

#[derive(Debug, Clone)]
pub struct Planet {
    config: PlanetConfig,
    engine: RuleEngine,
    initial_layer: Layer,
}

impl Planet {
    /// Builds the surface layer with every molecule and the rule chain.
    pub fn build(config: PlanetConfig, db: &dyn LineDatabase, context: &Context) -> RadResult<Self> {
        config.validate()?;
        let window = context.window(config.range_min, config.range_max)?;
        let mut initial_layer = Layer::new(
            "initial layer",
            0.0,
            config.initial_depth_cm(),
            config.surface_temperature,
            config.surface_pressure,
            window,
        )?;
        for molecule in &config.molecules {
            initial_layer.add_molecule(
                db,
                context,
                &molecule.name,
                molecule.isotope_depth,
                molecule.abundance,
            )?;
        }

        let molar_mass = initial_layer.molar_mass().ok_or_else(|| {
            RadError::input_validation(
                "INPUT.MOLAR_MASS",
                format!("planet '{}' has no molecule with a known molar mass", config.name),
            )
        })?;
        let mut engine = RuleEngine::new(SurfaceState {
            temperature: config.surface_temperature,
            pressure: config.surface_pressure,
            gravity: config.gravity,
            molar_mass: molar_mass / 1000.0,
        });

        for rule in &config.temperature_rules {
            engine.add_temperature_rule(
                rule.name.clone(),
                rule.final_height * CM_PER_KM,
                rule.final_value,
                rule.profile,
            )?;
        }
        for rule in &config.composition_rules {
            let surface_value = initial_layer
                .molecule(&rule.molecule)
                .map(|molecule| molecule.concentration())
                .ok_or_else(|| {
                    RadError::input_validation(
                        "INPUT.UNKNOWN_MOLECULE",
                        format!(
                            "composition rule '{}' names '{}', which the planet does not contain",
                            rule.name, rule.molecule
                        ),
                    )
                })?;
            match (rule.base_height, rule.base_value) {
                (None, None) => engine.add_composition_rule(
                    rule.name.clone(),
                    &rule.molecule,
                    rule.final_height * CM_PER_KM,
                    rule.final_value,
                    surface_value,
                    rule.profile,
                )?,
                (base_height, base_value) => engine.add_rule(AtmosphereRule {
                    name: rule.name.clone(),
                    kind: RuleKind::Composition,
                    base_height: base_height.unwrap_or(0.0) * CM_PER_KM,
                    base_value: base_value.unwrap_or(surface_value),
                    final_height: rule.final_height * CM_PER_KM,
                    final_value: rule.final_value,
                    base_pressure: None,
                    molecule: Some(rule.molecule.trim().to_ascii_lowercase()),
                    profile: rule.profile,
                })?,
            }
        }

        // Fail now rather than half way through a profile.
        engine.temperature_at(config.max_height_cm())?;

        Ok(Self {
            config,
            engine,
            initial_layer,
        })
    }

    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn initial_layer(&self) -> &Layer {
        &self.initial_layer
    }

    pub fn window(&self) -> SpectralWindow {
        self.initial_layer.window()
    }

    pub fn molecule_names(&self) -> Vec<String> {
        self.initial_layer
            .molecules()
            .iter()
            .map(|molecule| molecule.name().to_string())
            .collect()
    }

    /// Folder the planet's profiles live in: `<name> <setting>`.
    pub fn folder_name(&self, context: &Context) -> String {
        let setting = self
            .config
            .setting
            .clone()
            .unwrap_or_else(|| context.detail().to_string());
        format!("{} {}", self.config.name, setting)
    }

    pub fn slice(&self) -> RadResult<Vec<LayerSlice>> {
        slice_column(
            &self.engine,
            self.config.initial_depth_cm(),
            self.config.max_height_cm(),
        )
    }

    /// Layer covering `slice`, with temperature, pressure and composition
    /// evaluated at its mean height.
    pub fn layer_for(
        &self,
        db: &dyn LineDatabase,
        context: &Context,
        slice: &LayerSlice,
        layer_count: usize,
    ) -> RadResult<Layer> {
        let mut layer = self.initial_layer.clone();
        layer.reset_cross_section();
        layer.set_name(format!("layer {}_{}", slice.index + 1, layer_count));
        layer.set_height(slice.height);
        layer.set_depth(slice.depth)?;
        layer.set_temperature(slice.temperature)?;
        layer.set_pressure(db, context, slice.pressure)?;

        let mean_height = slice.mean_height();
        let mut updates = layer
            .molecules()
            .iter()
            .map(|molecule| {
                self.engine
                    .composition_at(mean_height, molecule.name(), molecule.concentration())
                    .map(|concentration| (molecule.name().to_string(), concentration))
            })
            .collect::<RadResult<Vec<_>>>()?;
        // Lower concentrations first so a shifting mixture never trips the
        // total check half way.
        updates.sort_by(|lhs, rhs| {
            let current = |name: &str| layer.molecule(name).map_or(0.0, |m| m.concentration());
            (lhs.1 - current(&lhs.0)).total_cmp(&(rhs.1 - current(&rhs.0)))
        });
        for (name, concentration) in updates {
            layer.set_concentration(&name, concentration)?;
        }
        Ok(layer)
    }

    /// Power emitted by the surface over the window, W/m².
    pub fn surface_power(&self) -> f64 {
        let window = self.window();
        integrate_spectrum(
            &planck_spectrum(&window, self.config.surface_temperature),
            window.resolution,
        ) * self.config.surface_effective_emissivity
    }
}

#[cfg(test)]
mod tests {
    use super::{Planet, PlanetConfig};
    use crate::common::Context;
    use crate::modules::linedb::InMemoryLineDatabase;
    use crate::modules::linedb::fixtures::{co2_params, co2_partition, line_at};
    use crate::modules::traits::{OpticalSlab, SpectralComponent};
    use serde_json::json;

    fn config() -> PlanetConfig {
        serde_json::from_value(json!({
            "name": "testworld",
            "surfacePressure": 1013.25,
            "surfaceTemperature": 288.15,
            "maxHeight": 20,
            "rangeMin": 660,
            "rangeMax": 675,
            "initialDepth": 1000,
            "molecules": [
                {"name": "co2", "ppm": 400},
                {"name": "ar", "percentage": 99}
            ],
            "temperatureRules": [
                {"name": "troposphere", "finalHeight": 11, "finalValue": 216.65},
                {"name": "tropopause", "finalHeight": 20, "finalValue": 216.65}
            ],
            "compositionRules": [
                {"name": "co2 falloff", "molecule": "co2", "finalHeight": 20, "finalValue": 2.0e-4}
            ]
        }))
        .expect("planet config")
    }

    fn database() -> InMemoryLineDatabase {
        InMemoryLineDatabase::new().with_isotope(
            co2_params(),
            co2_partition(),
            vec![line_at(667.0, 3.0e-19), line_at(668.1, 1.0e-19)],
        )
    }

    #[test]
    fn config_defaults_and_round_trip() {
        let config = config();
        assert_eq!(config.gravity, 9.806_65);
        assert_eq!(config.surface_effective_emissivity, 0.971);
        assert_eq!(config.molecules[0].isotope_depth, 1);
        let text = serde_json::to_string(&config).expect("serialize");
        let back: PlanetConfig = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    fn build_derives_molar_mass_and_folder() {
        let context = Context::default();
        let planet = Planet::build(config(), &database(), &context).expect("planet");
        assert_eq!(planet.folder_name(&context), "testworld high");
        assert_eq!(planet.molecule_names(), vec!["co2", "ar"]);
        let molar_mass = planet.engine().surface().molar_mass;
        assert!(molar_mass > 0.0399 && molar_mass < 0.0400);
        assert!(planet.surface_power() > 0.0);
    }

    #[test]
    fn layers_follow_rules_at_mean_height() {
        let context = Context::default();
        let db = database();
        let planet = Planet::build(config(), &db, &context).expect("planet");
        let slices = planet.slice().expect("slices");
        let top = slices.last().expect("top slice");

        let layer = planet
            .layer_for(&db, &context, top, slices.len())
            .expect("top layer");
        assert_eq!(layer.name(), format!("layer {}_{}", slices.len(), slices.len()));
        assert_eq!(layer.temperature(), top.temperature);
        assert_eq!(layer.pressure(), top.pressure);
        let co2 = layer.molecule("co2").expect("co2").concentration();
        let expected = planet
            .engine()
            .composition_at(top.mean_height(), "co2", 4.0e-4)
            .expect("composition");
        assert_eq!(co2, expected);
        assert!(co2 < 4.0e-4);
    }

    #[test]
    fn uncovered_max_height_and_unknown_rule_molecule_fail_early() {
        let context = Context::default();
        let mut short = config();
        short.max_height = 30.0;
        let error = Planet::build(short, &database(), &context).expect_err("uncovered");
        assert_eq!(error.placeholder(), "INPUT.RULE_MISSING");

        let mut stray = config();
        stray.composition_rules[0].molecule = "o3".to_string();
        let error = Planet::build(stray, &database(), &context).expect_err("stray rule");
        assert_eq!(error.placeholder(), "INPUT.UNKNOWN_MOLECULE");
    }
}
