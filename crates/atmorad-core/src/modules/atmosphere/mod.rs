pub mod planet;
pub mod rules;
pub mod slicer;

pub use planet::{CompositionRuleSpec, MoleculeSpec, Planet, PlanetConfig, TemperatureRuleSpec};
pub use rules::{AtmosphereRule, RateProfile, RuleEngine, RuleError, RuleKind, SurfaceState};
pub use slicer::{LayerSlice, MAX_LAYERS, layer_mass, slice_column};
