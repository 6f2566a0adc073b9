pub mod constants;
pub mod context;
pub mod molecules;

pub use context::{Context, DetailLevel};
