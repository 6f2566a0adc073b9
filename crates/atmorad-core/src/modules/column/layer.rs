use super::molecule::{Abundance, Molecule, validate_concentration};
use super::{LayerConditions, Slab, absorption_coefficient, add_into};
use crate::common::Context;
use crate::common::constants::{GAS_CONSTANT, P_REF_MBAR};
use crate::domain::{ComputeState, RadError, RadResult, SpectralWindow};
use crate::modules::linedb::LineDatabase;
use crate::modules::traits::{OpticalSlab, SpectralComponent};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

/// Line wing half-width in cm⁻¹ used when none is configured.
pub fn default_wing(pressure: f64) -> f64 {
    (pressure / P_REF_MBAR * 5.0).max(0.1)
}

/// Tolerance on the summed mole fractions of a layer.
const CONCENTRATION_SLACK: f64 = 1.0e-9;

/// A homogeneous slab of gas mixture over one spectral window.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    height: f64,
    depth: f64,
    temperature: f64,
    pressure: f64,
    window: SpectralWindow,
    wing: Option<f64>,
    molecules: Vec<Molecule>,
    state: ComputeState,
    cross_section: Option<Vec<f64>>,
    absorption_coefficient: Option<Vec<f64>>,
}

fn validate_state(depth: f64, temperature: f64, pressure: f64) -> RadResult<()> {
    if !(depth.is_finite() && depth > 0.0) {
        return Err(RadError::input_validation(
            "INPUT.LAYER_DEPTH",
            format!("layer depth {} cm must be positive", depth),
        ));
    }
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(RadError::input_validation(
            "INPUT.LAYER_TEMPERATURE",
            format!("layer temperature {} K must be positive", temperature),
        ));
    }
    if !(pressure.is_finite() && pressure >= 0.0) {
        return Err(RadError::input_validation(
            "INPUT.LAYER_PRESSURE",
            format!("layer pressure {} mbar must be non-negative", pressure),
        ));
    }
    Ok(())
}

impl Layer {
    /// Heights and depth in cm, temperature in K, pressure in mbar.
    pub fn new(
        name: impl Into<String>,
        height: f64,
        depth: f64,
        temperature: f64,
        pressure: f64,
        window: SpectralWindow,
    ) -> RadResult<Self> {
        validate_state(depth, temperature, pressure)?;
        window.validate()?;
        Ok(Self {
            name: name.into(),
            height,
            depth,
            temperature,
            pressure,
            window,
            wing: None,
            molecules: Vec::new(),
            state: ComputeState::NotComputed,
            cross_section: None,
            absorption_coefficient: None,
        })
    }

    /// Fixes the line wing instead of deriving it from pressure. Call before
    /// adding molecules so lines are fetched over the widened range.
    pub fn with_wing(mut self, wing: f64) -> RadResult<Self> {
        if !(wing.is_finite() && wing > 0.0) {
            return Err(RadError::input_validation(
                "INPUT.LINE_WING",
                format!("wing width {} cm-1 must be positive", wing),
            ));
        }
        self.wing = Some(wing);
        self.reset_cross_section();
        Ok(self)
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn window(&self) -> SpectralWindow {
        self.window
    }

    pub fn wing(&self) -> f64 {
        self.wing.unwrap_or_else(|| default_wing(self.pressure))
    }

    pub fn conditions(&self) -> LayerConditions {
        LayerConditions {
            temperature: self.temperature,
            pressure: self.pressure,
            window: self.window,
            wing: self.wing(),
        }
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, name: &str) -> Option<&Molecule> {
        let name = name.trim().to_ascii_lowercase();
        self.molecules.iter().find(|molecule| molecule.name() == name)
    }

    pub fn total_concentration(&self) -> f64 {
        self.molecules.iter().map(Molecule::concentration).sum()
    }

    fn check_total(&self, total: f64) -> RadResult<()> {
        if total > 1.0 + CONCENTRATION_SLACK {
            return Err(RadError::input_validation(
                "INPUT.CONCENTRATION_OVERFLOW",
                format!(
                    "molecule concentrations of layer '{}' sum to {} (> 1)",
                    self.name, total
                ),
            ));
        }
        Ok(())
    }

    /// Adds `name` with the first `isotope_depth` isotopes, converting the
    /// abundance at this layer's temperature and pressure.
    pub fn add_molecule(
        &mut self,
        db: &dyn LineDatabase,
        context: &Context,
        name: &str,
        isotope_depth: usize,
        abundance: Abundance,
    ) -> RadResult<()> {
        let concentration = abundance.to_concentration(self.temperature, self.pressure)?;
        self.add_molecule_with_concentration(db, context, name, isotope_depth, concentration)
    }

    pub fn add_molecule_with_concentration(
        &mut self,
        db: &dyn LineDatabase,
        context: &Context,
        name: &str,
        isotope_depth: usize,
        concentration: f64,
    ) -> RadResult<()> {
        if self.molecule(name).is_some() {
            return Err(RadError::input_validation(
                "INPUT.DUPLICATE_MOLECULE",
                format!("molecule '{}' already present in layer '{}'", name, self.name),
            ));
        }
        validate_concentration(concentration)?;
        self.check_total(self.total_concentration() + concentration)?;

        let molecule = Molecule::load(
            db,
            name,
            isotope_depth,
            concentration,
            self.conditions().fetch_range(),
            context.intensity_cutoff(),
        )?;
        self.molecules.push(molecule);
        self.invalidate();
        Ok(())
    }

    pub fn set_concentration(&mut self, name: &str, concentration: f64) -> RadResult<()> {
        validate_concentration(concentration)?;
        let name = name.trim().to_ascii_lowercase();
        let others: f64 = self
            .molecules
            .iter()
            .filter(|molecule| molecule.name() != name)
            .map(Molecule::concentration)
            .sum();
        self.check_total(others + concentration)?;

        let molecule = self
            .molecules
            .iter_mut()
            .find(|molecule| molecule.name() == name)
            .ok_or_else(|| {
                RadError::input_validation(
                    "INPUT.UNKNOWN_MOLECULE",
                    format!("molecule '{}' is not part of layer '{}'", name, self.name),
                )
            })?;
        molecule.set_concentration(concentration)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f64) -> RadResult<()> {
        validate_state(self.depth, temperature, self.pressure)?;
        if temperature != self.temperature {
            self.temperature = temperature;
            self.reset_cross_section();
        }
        Ok(())
    }

    /// Changes pressure; lines are refetched only when a wider wing needs
    /// lines the layer has not loaded yet.
    pub fn set_pressure(
        &mut self,
        db: &dyn LineDatabase,
        context: &Context,
        pressure: f64,
    ) -> RadResult<()> {
        validate_state(self.depth, self.temperature, pressure)?;
        if pressure == self.pressure {
            return Ok(());
        }
        self.pressure = pressure;
        let fetch_range = self.conditions().fetch_range();
        for molecule in &mut self.molecules {
            if !molecule.covers(fetch_range) {
                molecule.reload_lines(db, fetch_range, context.intensity_cutoff())?;
            }
        }
        self.reset_cross_section();
        Ok(())
    }

    pub fn set_window(
        &mut self,
        db: &dyn LineDatabase,
        context: &Context,
        window: SpectralWindow,
    ) -> RadResult<()> {
        window.validate()?;
        self.window = window;
        let fetch_range = self.conditions().fetch_range();
        for molecule in &mut self.molecules {
            molecule.reload_lines(db, fetch_range, context.intensity_cutoff())?;
        }
        self.reset_cross_section();
        Ok(())
    }

    /// Depth only enters the derived optical quantities, so the absorption
    /// coefficient stays valid.
    pub fn set_depth(&mut self, depth: f64) -> RadResult<()> {
        validate_state(depth, self.temperature, self.pressure)?;
        self.depth = depth;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_height(&mut self, height: f64) {
        self.height = height;
    }

    fn invalidate(&mut self) {
        self.state = ComputeState::NotComputed;
        self.cross_section = None;
        self.absorption_coefficient = None;
    }

    /// Computes every molecule (in parallel) and the layer's absorption
    /// coefficient; returns the cached coefficient when nothing changed.
    pub fn compute(&mut self, context: &Context) -> RadResult<&[f64]> {
        match self.state {
            ComputeState::Computed => {}
            ComputeState::Computing => {
                return Err(RadError::internal(
                    "SYS.COMPUTE_STATE",
                    format!("layer '{}' re-entered while computing", self.name),
                ));
            }
            ComputeState::NotComputed => {
                self.window.validate()?;
                self.state = ComputeState::Computing;
                let started = Instant::now();
                let conditions = self.conditions();
                let source = context.line_cache();
                let computed = self
                    .molecules
                    .par_iter_mut()
                    .try_for_each(|molecule| molecule.compute(source, &conditions).map(|_| ()));
                if let Err(error) = computed {
                    self.invalidate();
                    return Err(error);
                }

                let mut cross_section = self.window.zeroed();
                let mut coefficient = self.window.zeroed();
                for molecule in &self.molecules {
                    if let Some(part) = molecule.cross_section() {
                        add_into(&mut cross_section, part);
                        add_into(
                            &mut coefficient,
                            &absorption_coefficient(
                                part,
                                molecule.concentration(),
                                self.pressure,
                                self.temperature,
                            ),
                        );
                    }
                }
                self.cross_section = Some(cross_section);
                self.absorption_coefficient = Some(coefficient);
                self.state = ComputeState::Computed;

                let cache = context.line_cache().stats();
                debug!(
                    layer = %self.name,
                    molecules = self.molecules.len(),
                    cache_hits = cache.hits,
                    cache_misses = cache.misses,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "computed layer"
                );
            }
        }
        Ok(self.absorption_coefficient.as_deref().unwrap_or(&[]))
    }

    /// Absorption coefficient of one molecule alone, once computed.
    pub fn molecule_absorption_coefficient(&self, name: &str) -> Option<Vec<f64>> {
        self.molecule(name)?
            .absorption_coefficient(&self.conditions())
    }

    pub fn slab(&self) -> Option<Slab> {
        self.absorption_coefficient.as_ref().map(|coefficient| Slab {
            absorption_coefficient: coefficient.clone(),
            depth: self.depth,
            temperature: self.temperature,
            height: self.height,
        })
    }

    /// Same slab seen through a single molecule.
    pub fn molecule_slab(&self, name: &str) -> Option<Slab> {
        self.molecule_absorption_coefficient(name)
            .map(|coefficient| Slab {
                absorption_coefficient: coefficient,
                depth: self.depth,
                temperature: self.temperature,
                height: self.height,
            })
    }

    pub fn line_survey(&self) -> Vec<f64> {
        let mut survey = self.window.zeroed();
        for molecule in &self.molecules {
            add_into(&mut survey, &molecule.line_survey(&self.window));
        }
        survey
    }

    /// Concentration-weighted molar mass of the mixture in g/mol.
    pub fn molar_mass(&self) -> Option<f64> {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for molecule in &self.molecules {
            if let Some(molar_mass) = molecule.molar_mass() {
                weighted += molar_mass * molecule.concentration();
                total += molecule.concentration();
            }
        }
        (total > 0.0).then(|| weighted / total)
    }

    /// Ideal-gas density in kg/m³.
    pub fn density(&self) -> Option<f64> {
        let molar_mass_kg = self.molar_mass()? / 1000.0;
        Some(self.pressure * 100.0 * molar_mass_kg / (GAS_CONSTANT * self.temperature))
    }

    /// Column mass in kg/m².
    pub fn mass(&self) -> Option<f64> {
        self.density().map(|density| density * self.depth / 100.0)
    }
}

impl SpectralComponent for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ComputeState {
        self.state
    }

    fn reset_cross_section(&mut self) {
        self.invalidate();
        for molecule in &mut self.molecules {
            molecule.reset_cross_section();
        }
    }

    fn cross_section(&self) -> Option<&[f64]> {
        self.cross_section.as_deref()
    }
}

/// Optical quantities are empty until the layer has been computed.
impl OpticalSlab for Layer {
    fn absorption_coefficient(&self) -> &[f64] {
        self.absorption_coefficient.as_deref().unwrap_or(&[])
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
