//! Physical constants and reference state shared by the line-shape,
//! intensity and transfer kernels (SI unless noted).

pub const BOLTZMANN: f64 = 1.380_648_52e-23_f64;
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0_f64;
pub const PLANCK: f64 = 6.626_070_04e-34_f64;
pub const GAS_CONSTANT: f64 = 8.314_459_8_f64;
pub const AVOGADRO: f64 = 6.022_140_857e23_f64;
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8_f64;

/// Second radiation constant in cm·K (`h·c·100/k`).
pub const C2: f64 = PLANCK * SPEED_OF_LIGHT * 100.0 / BOLTZMANN;

pub const T_REF_K: f64 = 296.0_f64;
pub const P_REF_MBAR: f64 = 1_013.25_f64;

pub const BASE_RESOLUTION: f64 = 0.01_f64;
pub const COSMIC_BACKGROUND_K: f64 = 2.7_f64;
pub const STANDARD_GRAVITY: f64 = 9.806_65_f64;
pub const SURFACE_EFFECTIVE_EMISSIVITY: f64 = 0.971_f64;

pub const CELSIUS_OFFSET: f64 = 273.15_f64;

pub const CM_PER_KM: f64 = 1.0e5_f64;
pub const CM_PER_M: f64 = 100.0_f64;

/// Lorentz-to-Gaussian half-width ratio below which the Gaussian branch is used.
pub const GAUSSIAN_DOMINANCE_RATIO: f64 = 0.01_f64;
/// Ratio above which the Lorentz branch is used.
pub const LORENTZ_DOMINANCE_RATIO: f64 = 100.0_f64;
