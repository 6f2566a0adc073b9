pub mod atmosphere;
pub mod column;
pub mod cross_section;
pub mod line_cache;
pub mod linedb;
pub mod profile;
pub mod serialization;
pub mod traits;
pub mod transfer;

pub use traits::{OpticalSlab, SpectralComponent};
