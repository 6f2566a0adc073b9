//! Checkpointed per-layer absorption profiles and the transmission stage
//! run over them.

pub mod builder;
pub mod records;
pub mod store;

pub use builder::{
    BuildOptions, BuildOutcome, build_profile, layer_record, load_profile, run_transmission_pass,
    transmission_at,
};
pub use records::{
    FORMAT_VERSION, LayerProfileRecord, MoleculeLayerData, MoleculeSlab, MoleculeTransmission,
    ProfileCompletion, ProgressMarker, TransmissionCompletion, TransmissionRecord,
};
pub use store::ProfileStore;
