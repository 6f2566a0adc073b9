//! Height-dependent temperature, pressure and composition rules.
//!
//! Heights are in cm, temperatures in K, pressures in mbar. A rule covers
//! the half-open interval `(base_height, final_height]`; at or below the
//! surface the surface state applies.

use crate::common::constants::GAS_CONSTANT;
use crate::domain::{RadError, RadResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temperature slopes below this (K/m) are treated as isothermal.
const ISOTHERMAL_RATE: f64 = 1.0e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Temperature,
    Composition,
}

impl RuleKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Composition => "composition",
        }
    }
}

/// Interpolation between a rule's base and final value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateProfile {
    #[default]
    Linear,
    /// Geometric interpolation; both end values must be positive.
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("no {kind} rule covers height {height} cm")]
    Missing { kind: &'static str, height: f64 },
    #[error("{kind} rules '{first}' and '{second}' both cover height {height} cm")]
    Overlap {
        kind: &'static str,
        first: String,
        second: String,
        height: f64,
    },
    #[error("rule '{name}' has empty interval ({base} cm, {top} cm]")]
    EmptyInterval { name: String, base: f64, top: f64 },
    #[error("exponential rule '{name}' needs positive end values")]
    NonPositiveExponential { name: String },
    #[error("temperature rule '{name}' reaches non-positive temperature {value} K")]
    NonPositiveTemperature { name: String, value: f64 },
}

impl From<RuleError> for RadError {
    fn from(error: RuleError) -> Self {
        let placeholder = match error {
            RuleError::Missing { .. } => "INPUT.RULE_MISSING",
            RuleError::Overlap { .. } => "INPUT.RULE_OVERLAP",
            RuleError::EmptyInterval { .. } => "INPUT.RULE_INTERVAL",
            RuleError::NonPositiveExponential { .. } => "INPUT.RULE_EXPONENTIAL",
            RuleError::NonPositiveTemperature { .. } => "INPUT.RULE_TEMPERATURE",
        };
        RadError::input_validation(placeholder, error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtmosphereRule {
    pub name: String,
    pub kind: RuleKind,
    pub base_height: f64,
    pub base_value: f64,
    pub final_height: f64,
    pub final_value: f64,
    /// Pressure at `base_height`; set by the engine for temperature rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub molecule: Option<String>,
    #[serde(default)]
    pub profile: RateProfile,
}

impl AtmosphereRule {
    /// Linear slope in value per cm.
    pub fn rate(&self) -> f64 {
        (self.final_value - self.base_value) / (self.final_height - self.base_height)
    }

    pub fn applies_at(&self, height: f64) -> bool {
        self.base_height < height && height <= self.final_height
    }

    fn fraction(&self, height: f64) -> f64 {
        (height - self.base_height) / (self.final_height - self.base_height)
    }

    pub fn value_at(&self, height: f64) -> f64 {
        match self.profile {
            RateProfile::Linear => self.base_value + self.rate() * (height - self.base_height),
            RateProfile::Exponential => {
                self.base_value * (self.final_value / self.base_value).powf(self.fraction(height))
            }
        }
    }

    fn validate(&self) -> Result<(), RuleError> {
        if !(self.final_height > self.base_height) {
            return Err(RuleError::EmptyInterval {
                name: self.name.clone(),
                base: self.base_height,
                top: self.final_height,
            });
        }
        if self.profile == RateProfile::Exponential
            && !(self.base_value > 0.0 && self.final_value > 0.0)
        {
            return Err(RuleError::NonPositiveExponential {
                name: self.name.clone(),
            });
        }
        if self.kind == RuleKind::Temperature {
            for value in [self.base_value, self.final_value] {
                if !(value > 0.0) {
                    return Err(RuleError::NonPositiveTemperature {
                        name: self.name.clone(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    fn same_target(&self, other: &AtmosphereRule) -> bool {
        self.kind == other.kind && self.molecule == other.molecule
    }
}

/// Surface state the rules chain from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    pub temperature: f64,
    pub pressure: f64,
    /// m/s²
    pub gravity: f64,
    /// Mixture molar mass in kg/mol.
    pub molar_mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleEngine {
    surface: SurfaceState,
    rules: Vec<AtmosphereRule>,
}

impl RuleEngine {
    pub fn new(surface: SurfaceState) -> Self {
        Self {
            surface,
            rules: Vec::new(),
        }
    }

    pub fn surface(&self) -> SurfaceState {
        self.surface
    }

    pub fn rules(&self) -> &[AtmosphereRule] {
        &self.rules
    }

    /// Gas constant of the mixture in J/(kg·K).
    pub fn specific_gas_constant(&self) -> f64 {
        GAS_CONSTANT / self.surface.molar_mass
    }

    /// Highest final height among rules with the same target, with its
    /// final value.
    fn chain_end(&self, kind: RuleKind, molecule: Option<&str>) -> Option<(f64, f64)> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == kind && rule.molecule.as_deref() == molecule)
            .map(|rule| (rule.final_height, rule.final_value))
            .max_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0))
    }

    /// Adds a fully specified rule. Temperature rules get their base
    /// pressure from the rules already present.
    pub fn add_rule(&mut self, mut rule: AtmosphereRule) -> RadResult<()> {
        rule.validate()?;
        if let Some(existing) = self.rules.iter().find(|existing| {
            existing.same_target(&rule)
                && existing.base_height < rule.final_height
                && rule.base_height < existing.final_height
        }) {
            return Err(RuleError::Overlap {
                kind: rule.kind.as_str(),
                first: existing.name.clone(),
                second: rule.name.clone(),
                height: existing.base_height.max(rule.base_height),
            }
            .into());
        }
        if rule.kind == RuleKind::Temperature {
            rule.base_pressure = Some(self.pressure_at(rule.base_height)?);
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Appends a temperature rule starting where the previous one ended
    /// (or at the surface).
    pub fn add_temperature_rule(
        &mut self,
        name: impl Into<String>,
        final_height: f64,
        final_value: f64,
        profile: RateProfile,
    ) -> RadResult<()> {
        let (base_height, base_value) = self
            .chain_end(RuleKind::Temperature, None)
            .unwrap_or((0.0, self.surface.temperature));
        self.add_rule(AtmosphereRule {
            name: name.into(),
            kind: RuleKind::Temperature,
            base_height,
            base_value,
            final_height,
            final_value,
            base_pressure: None,
            molecule: None,
            profile,
        })
    }

    /// Appends a composition rule for `molecule`; the chain starts at the
    /// surface with `surface_value`.
    pub fn add_composition_rule(
        &mut self,
        name: impl Into<String>,
        molecule: &str,
        final_height: f64,
        final_value: f64,
        surface_value: f64,
        profile: RateProfile,
    ) -> RadResult<()> {
        let molecule = molecule.trim().to_ascii_lowercase();
        let (base_height, base_value) = self
            .chain_end(RuleKind::Composition, Some(&molecule))
            .unwrap_or((0.0, surface_value));
        self.add_rule(AtmosphereRule {
            name: name.into(),
            kind: RuleKind::Composition,
            base_height,
            base_value,
            final_height,
            final_value,
            base_pressure: None,
            molecule: Some(molecule),
            profile,
        })
    }

    fn applicable(
        &self,
        kind: RuleKind,
        molecule: Option<&str>,
        height: f64,
    ) -> Result<Option<&AtmosphereRule>, RuleError> {
        let mut matching = self.rules.iter().filter(|rule| {
            rule.kind == kind && rule.molecule.as_deref() == molecule && rule.applies_at(height)
        });
        let first = matching.next();
        if let (Some(first), Some(second)) = (first, matching.next()) {
            return Err(RuleError::Overlap {
                kind: kind.as_str(),
                first: first.name.clone(),
                second: second.name.clone(),
                height,
            });
        }
        Ok(first)
    }

    fn temperature_rule(&self, height: f64) -> Result<&AtmosphereRule, RuleError> {
        self.applicable(RuleKind::Temperature, None, height)?
            .ok_or(RuleError::Missing {
                kind: RuleKind::Temperature.as_str(),
                height,
            })
    }

    pub fn temperature_at(&self, height: f64) -> RadResult<f64> {
        if height <= 0.0 {
            return Ok(self.surface.temperature);
        }
        Ok(self.temperature_rule(height)?.value_at(height))
    }

    /// Barometric pressure within the governing temperature rule.
    pub fn pressure_at(&self, height: f64) -> RadResult<f64> {
        if height <= 0.0 {
            return Ok(self.surface.pressure);
        }
        let rule = self.temperature_rule(height)?;
        let base_pressure = rule.base_pressure.unwrap_or(self.surface.pressure);
        let base_temperature = rule.base_value;
        let g_m_over_r = self.surface.gravity * self.surface.molar_mass / GAS_CONSTANT;

        let exponent = match rule.profile {
            RateProfile::Linear => {
                let rate_per_metre = rule.rate() * 100.0;
                if rate_per_metre.abs() < ISOTHERMAL_RATE {
                    let rise_m = (height - rule.base_height) / 100.0;
                    -g_m_over_r * rise_m / base_temperature
                } else {
                    let temperature = rule.value_at(height);
                    (g_m_over_r / rate_per_metre) * (base_temperature / temperature).ln()
                }
            }
            RateProfile::Exponential => {
                // T = Tb·r^s over the rule's span; ∫ dz / T has a closed form.
                let span_m = (rule.final_height - rule.base_height) / 100.0;
                let ratio = rule.final_value / base_temperature;
                let fraction = rule.fraction(height);
                let integral = if (ratio - 1.0).abs() < 1.0e-12 {
                    fraction
                } else {
                    (1.0 - ratio.powf(-fraction)) / ratio.ln()
                };
                -g_m_over_r * span_m * integral / base_temperature
            }
        };
        Ok(base_pressure * exponent.exp())
    }

    /// Concentration of `molecule` at `height`, or `current` when no
    /// composition rule covers it.
    pub fn composition_at(&self, height: f64, molecule: &str, current: f64) -> RadResult<f64> {
        let molecule = molecule.trim().to_ascii_lowercase();
        Ok(self
            .applicable(RuleKind::Composition, Some(&molecule), height)?
            .map_or(current, |rule| rule.value_at(height)))
    }

    /// Ideal-gas density in kg/m³.
    pub fn density_at(&self, height: f64) -> RadResult<f64> {
        let temperature = self.temperature_at(height)?;
        let pressure = self.pressure_at(height)?;
        Ok(pressure * 100.0 / (self.specific_gas_constant() * temperature))
    }
}
