use super::isotope::Isotope;
use super::{LayerConditions, absorption_coefficient, add_into};
use crate::common::molecules::{inert_gas, isotopes_for_depth, molecule_by_name};
use crate::domain::{ComputeState, RadError, RadResult, SpectralWindow};
use crate::modules::linedb::LineDatabase;
use crate::modules::traits::SpectralComponent;
use crate::numerics::humidity::water_vapour_mixing_ratio;
use crate::numerics::lineshape::ProfileSource;
use crate::numerics::stable_weighted_mean;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the amount of a gas is given in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Abundance {
    /// Mole fraction in `[0, 1]`.
    Concentration(f64),
    Ppm(f64),
    Ppb(f64),
    Percentage(f64),
    /// Percent relative humidity, only meaningful for water vapour.
    RelativeHumidity(f64),
}

impl Abundance {
    /// Mole fraction at `temperature` K and `pressure` mbar.
    pub fn to_concentration(self, temperature: f64, pressure: f64) -> RadResult<f64> {
        let concentration = match self {
            Self::Concentration(value) => value,
            Self::Ppm(value) => value * 1.0e-6,
            Self::Ppb(value) => value * 1.0e-9,
            Self::Percentage(value) => value / 100.0,
            Self::RelativeHumidity(value) => {
                water_vapour_mixing_ratio(temperature, pressure, value)?
            }
        };
        validate_concentration(concentration)?;
        Ok(concentration)
    }
}

pub(crate) fn validate_concentration(concentration: f64) -> RadResult<()> {
    if !concentration.is_finite() || !(0.0..=1.0).contains(&concentration) {
        return Err(RadError::input_validation(
            "INPUT.CONCENTRATION",
            format!("concentration {} is outside [0, 1]", concentration),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Molecule {
    name: String,
    molecule_id: u32,
    isotope_depth: usize,
    concentration: f64,
    inert_molar_mass: Option<f64>,
    isotopes: Vec<Isotope>,
    state: ComputeState,
    cross_section: Option<Vec<f64>>,
}

impl Molecule {
    /// Resolves `name` in the molecule table and loads its first
    /// `isotope_depth` isotopes (0 loads all of them).
    pub fn load(
        db: &dyn LineDatabase,
        name: &str,
        isotope_depth: usize,
        concentration: f64,
        fetch_range: (f64, f64),
        intensity_cutoff: f64,
    ) -> RadResult<Self> {
        validate_concentration(concentration)?;
        let entry = molecule_by_name(name).ok_or_else(|| {
            RadError::input_validation(
                "INPUT.UNKNOWN_MOLECULE",
                format!("unknown molecule '{}'", name),
            )
        })?;
        let global_ids = isotopes_for_depth(entry.name, isotope_depth).unwrap_or(&[]);

        let inert_molar_mass = inert_gas(entry.molecule_id).map(|gas| gas.molar_mass);
        let isotopes = if inert_molar_mass.is_some() {
            Vec::new()
        } else {
            global_ids
                .iter()
                .map(|global_id| Isotope::load(db, *global_id, fetch_range, intensity_cutoff))
                .collect::<RadResult<Vec<_>>>()?
        };

        Ok(Self {
            name: entry.name.to_string(),
            molecule_id: entry.molecule_id,
            isotope_depth,
            concentration,
            inert_molar_mass,
            isotopes,
            state: ComputeState::NotComputed,
            cross_section: None,
        })
    }

    pub fn molecule_id(&self) -> u32 {
        self.molecule_id
    }

    pub fn isotope_depth(&self) -> usize {
        self.isotope_depth
    }

    pub fn concentration(&self) -> f64 {
        self.concentration
    }

    pub fn is_inert(&self) -> bool {
        self.inert_molar_mass.is_some()
    }

    pub fn isotopes(&self) -> &[Isotope] {
        &self.isotopes
    }

    pub fn set_concentration(&mut self, concentration: f64) -> RadResult<()> {
        validate_concentration(concentration)?;
        if concentration != self.concentration {
            self.concentration = concentration;
            self.reset_cross_section();
        }
        Ok(())
    }

    /// Abundance-weighted isotope molar mass in g/mol; inert gases use the
    /// table value.
    pub fn molar_mass(&self) -> Option<f64> {
        if let Some(molar_mass) = self.inert_molar_mass {
            return Some(molar_mass);
        }
        let masses: Vec<f64> = self.isotopes.iter().map(|iso| iso.params().molar_mass).collect();
        let abundances: Vec<f64> = self.isotopes.iter().map(|iso| iso.params().abundance).collect();
        stable_weighted_mean(&masses, &abundances)
    }

    pub(crate) fn reload_lines(
        &mut self,
        db: &dyn LineDatabase,
        fetch_range: (f64, f64),
        intensity_cutoff: f64,
    ) -> RadResult<()> {
        for isotope in &mut self.isotopes {
            isotope.reload_lines(db, fetch_range, intensity_cutoff)?;
        }
        self.reset_cross_section();
        Ok(())
    }

    pub(crate) fn covers(&self, fetch_range: (f64, f64)) -> bool {
        self.isotopes.iter().all(|isotope| isotope.covers(fetch_range))
    }

    /// Sum of the isotope cross sections; isotopes run in parallel.
    pub fn compute<S: ProfileSource + Sync + ?Sized>(
        &mut self,
        source: &S,
        conditions: &LayerConditions,
    ) -> RadResult<&[f64]> {
        match self.state {
            ComputeState::Computed => {}
            ComputeState::Computing => {
                return Err(RadError::internal(
                    "SYS.COMPUTE_STATE",
                    format!("molecule {} re-entered while computing", self.name),
                ));
            }
            ComputeState::NotComputed => {
                self.state = ComputeState::Computing;
                let concentration = self.concentration;
                let computed = self.isotopes.par_iter_mut().try_for_each(|isotope| {
                    isotope
                        .compute(source, conditions, concentration)
                        .map(|_| ())
                });
                if let Err(error) = computed {
                    self.state = ComputeState::NotComputed;
                    return Err(error);
                }

                let mut cross_section = conditions.window.zeroed();
                for isotope in &self.isotopes {
                    if let Some(part) = isotope.cross_section() {
                        add_into(&mut cross_section, part);
                    }
                }
                self.cross_section = Some(cross_section);
                self.state = ComputeState::Computed;
            }
        }
        Ok(self.cross_section.as_deref().unwrap_or(&[]))
    }

    pub fn absorption_coefficient(&self, conditions: &LayerConditions) -> Option<Vec<f64>> {
        self.cross_section.as_deref().map(|cross_section| {
            absorption_coefficient(
                cross_section,
                self.concentration,
                conditions.pressure,
                conditions.temperature,
            )
        })
    }

    pub fn line_survey(&self, window: &SpectralWindow) -> Vec<f64> {
        let mut survey = window.zeroed();
        for isotope in &self.isotopes {
            add_into(&mut survey, &isotope.line_survey(window));
        }
        survey
    }
}

impl SpectralComponent for Molecule {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ComputeState {
        self.state
    }

    fn reset_cross_section(&mut self) {
        self.state = ComputeState::NotComputed;
        self.cross_section = None;
        for isotope in &mut self.isotopes {
            isotope.reset_cross_section();
        }
    }

    fn cross_section(&self) -> Option<&[f64]> {
        self.cross_section.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Abundance, Molecule};
    use crate::domain::{ComputeState, SpectralWindow};
    use crate::modules::column::LayerConditions;
    use crate::modules::linedb::InMemoryLineDatabase;
    use crate::modules::linedb::fixtures::{co2_params, co2_partition, line_at};
    use crate::modules::traits::SpectralComponent;
    use crate::numerics::lineshape::AnalyticProfiles;

    fn database() -> InMemoryLineDatabase {
        let mut minor = co2_params();
        minor.global_id = 8;
        minor.short_name = "(13C)(16O)2".to_string();
        minor.abundance = 0.011_057;
        minor.molar_mass = 44.993_185;
        InMemoryLineDatabase::new()
            .with_isotope(co2_params(), co2_partition(), vec![line_at(667.0, 3.0e-19)])
            .with_isotope(minor, co2_partition(), vec![line_at(648.5, 2.0e-20)])
    }

    fn conditions() -> LayerConditions {
        LayerConditions {
            temperature: 280.0,
            pressure: 900.0,
            window: SpectralWindow::new(640.0, 680.0, 0.01).expect("window"),
            wing: 5.0,
        }
    }

    #[test]
    fn abundance_units_convert_to_mole_fraction() {
        let ppm = Abundance::Ppm(400.0).to_concentration(288.0, 1013.25).expect("ppm");
        assert!((ppm - 4.0e-4).abs() < 1.0e-18);
        let ppb = Abundance::Ppb(1800.0).to_concentration(288.0, 1013.25).expect("ppb");
        assert!((ppb - 1.8e-6).abs() < 1.0e-18);
        assert_eq!(Abundance::Percentage(21.0).to_concentration(288.0, 1013.25).expect("%"), 0.21);
        let humid = Abundance::RelativeHumidity(50.0)
            .to_concentration(288.15, 1013.25)
            .expect("relative humidity");
        assert!(humid > 0.005 && humid < 0.006);

        let error = Abundance::Percentage(150.0)
            .to_concentration(288.0, 1013.25)
            .expect_err("over unity");
        assert_eq!(error.placeholder(), "INPUT.CONCENTRATION");
    }

    #[test]
    fn abundance_deserializes_from_tagged_json() {
        let ppm: Abundance = serde_json::from_str(r#"{"ppm": 400}"#).expect("ppm json");
        assert_eq!(ppm, Abundance::Ppm(400.0));
        let humidity: Abundance =
            serde_json::from_str(r#"{"relativeHumidity": 60}"#).expect("rh json");
        assert_eq!(humidity, Abundance::RelativeHumidity(60.0));
    }

    #[test]
    fn molecule_cross_section_sums_isotopes() {
        let db = database();
        let conditions = conditions();
        let mut both = Molecule::load(&db, "co2", 2, 4.0e-4, conditions.fetch_range(), 0.0)
            .expect("two isotopes");
        let mut main = Molecule::load(&db, "CO2", 1, 4.0e-4, conditions.fetch_range(), 0.0)
            .expect("one isotope");
        assert_eq!(both.isotopes().len(), 2);

        let total = both.compute(&AnalyticProfiles, &conditions).expect("both").to_vec();
        let major = main.compute(&AnalyticProfiles, &conditions).expect("main").to_vec();
        let minor = both.isotopes()[1].cross_section().expect("minor computed");
        for index in 0..total.len() {
            assert_eq!(total[index], 0.0 + major[index] + minor[index]);
        }
        assert_eq!(both.state(), ComputeState::Computed);
        assert!(both.isotopes().iter().all(|iso| iso.state().is_computed()));
    }

    #[test]
    fn concentration_change_cascades_invalidation() {
        let db = database();
        let conditions = conditions();
        let mut molecule = Molecule::load(&db, "co2", 0, 4.0e-4, conditions.fetch_range(), 0.0)
            .expect("molecule");
        molecule.compute(&AnalyticProfiles, &conditions).expect("compute");

        molecule.set_concentration(8.0e-4).expect("valid concentration");
        assert_eq!(molecule.state(), ComputeState::NotComputed);
        assert!(molecule.isotopes().iter().all(|iso| iso.cross_section().is_none()));
        assert!(molecule.set_concentration(-0.1).is_err());
    }

    #[test]
    fn molar_mass_is_abundance_weighted() {
        let db = database();
        let molecule = Molecule::load(&db, "co2", 2, 4.0e-4, (640.0, 680.0), 0.0)
            .expect("molecule");
        let expected = (43.989_830 * 0.984_204 + 44.993_185 * 0.011_057) / (0.984_204 + 0.011_057);
        let molar_mass = molecule.molar_mass().expect("molar mass");
        assert!((molar_mass - expected).abs() < 1.0e-9);
    }

    #[test]
    fn inert_and_unknown_molecules() {
        let db = database();
        let mut argon = Molecule::load(&db, "ar", 1, 0.0093, (640.0, 680.0), 0.0).expect("argon");
        assert!(argon.is_inert());
        assert_eq!(argon.molar_mass(), Some(39.948));
        let cross_section = argon.compute(&AnalyticProfiles, &conditions()).expect("argon");
        assert!(cross_section.iter().all(|value| *value == 0.0));

        let error = Molecule::load(&db, "unobtainium", 1, 0.1, (640.0, 680.0), 0.0)
            .expect_err("unknown");
        assert_eq!(error.placeholder(), "INPUT.UNKNOWN_MOLECULE");
    }
}
