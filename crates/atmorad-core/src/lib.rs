//! Line-by-line infrared absorption and emission through a layered
//! planetary atmosphere.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use common::{Context, DetailLevel};
pub use domain::{RadError, RadErrorCategory, RadResult, SpectralWindow};
