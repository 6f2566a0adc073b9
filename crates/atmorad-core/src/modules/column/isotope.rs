use super::{LayerConditions, absorption_coefficient};
use crate::common::constants::T_REF_K;
use crate::domain::{
    ComputeState, IsotopeParams, Line, PartitionTable, RadError, RadResult, SpectralWindow,
};
use crate::modules::cross_section::{AccumulationInput, BranchCounts, accumulate_lines, line_survey};
use crate::modules::linedb::LineDatabase;
use crate::modules::traits::SpectralComponent;
use crate::numerics::lineshape::{ProfileSource, molecular_mass_kg};
use tracing::debug;

/// One isotopologue with its line list and cached cross section.
#[derive(Debug, Clone)]
pub struct Isotope {
    params: IsotopeParams,
    partition: PartitionTable,
    lines: Vec<Line>,
    loaded_range: (f64, f64),
    state: ComputeState,
    cross_section: Option<Vec<f64>>,
    branches: BranchCounts,
}

impl Isotope {
    /// Loads parameters, partition function and every line in `fetch_range`
    /// whose reference intensity exceeds `intensity_cutoff`.
    pub fn load(
        db: &dyn LineDatabase,
        global_id: u32,
        fetch_range: (f64, f64),
        intensity_cutoff: f64,
    ) -> RadResult<Self> {
        let params = db.fetch_isotope_params(global_id)?;
        let partition = db.fetch_partition_table(global_id)?;
        let mut isotope = Self::from_parts(params, partition, Vec::new());
        isotope.reload_lines(db, fetch_range, intensity_cutoff)?;
        Ok(isotope)
    }

    pub fn from_parts(params: IsotopeParams, partition: PartitionTable, lines: Vec<Line>) -> Self {
        let loaded_range = lines
            .iter()
            .fold(None, |range: Option<(f64, f64)>, line| {
                Some(match range {
                    Some((min, max)) => (min.min(line.wavenumber), max.max(line.wavenumber)),
                    None => (line.wavenumber, line.wavenumber),
                })
            })
            .unwrap_or((0.0, 0.0));
        let mut isotope = Self {
            params,
            partition,
            lines,
            loaded_range,
            state: ComputeState::NotComputed,
            cross_section: None,
            branches: BranchCounts::default(),
        };
        isotope.sort_lines(0.0);
        isotope
    }

    /// Replaces the line list with the lines of `fetch_range`.
    pub fn reload_lines(
        &mut self,
        db: &dyn LineDatabase,
        fetch_range: (f64, f64),
        intensity_cutoff: f64,
    ) -> RadResult<()> {
        let fetched = db.fetch_lines(self.params.global_id, fetch_range.0, fetch_range.1)?;
        let total = fetched.len();
        self.lines = fetched
            .into_iter()
            .filter(|line| line.reference_intensity > intensity_cutoff)
            .collect();
        self.loaded_range = fetch_range;
        self.sort_lines(0.0);
        self.reset_cross_section();
        debug!(
            isotope = %self.params.short_name,
            global_id = self.params.global_id,
            fetched = total,
            kept = self.lines.len(),
            "loaded isotope lines"
        );
        Ok(())
    }

    pub fn covers(&self, fetch_range: (f64, f64)) -> bool {
        self.loaded_range.0 <= fetch_range.0 && fetch_range.1 <= self.loaded_range.1
    }

    pub fn params(&self) -> &IsotopeParams {
        &self.params
    }

    pub fn global_id(&self) -> u32 {
        self.params.global_id
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn branches(&self) -> BranchCounts {
        self.branches
    }

    fn sort_lines(&mut self, pressure: f64) {
        // Ties are broken on the raw line data so the order never depends on
        // an earlier sort.
        self.lines.sort_by(|lhs, rhs| {
            lhs.broadened_wavenumber(pressure)
                .total_cmp(&rhs.broadened_wavenumber(pressure))
                .then(lhs.wavenumber.total_cmp(&rhs.wavenumber))
                .then(lhs.reference_intensity.total_cmp(&rhs.reference_intensity))
                .then(lhs.lower_state_energy.total_cmp(&rhs.lower_state_energy))
        });
    }

    /// Computes the cross section for `conditions`, or returns the cached
    /// one. A failure leaves the isotope in `NotComputed`.
    pub fn compute<S: ProfileSource + ?Sized>(
        &mut self,
        source: &S,
        conditions: &LayerConditions,
        mole_fraction: f64,
    ) -> RadResult<&[f64]> {
        match self.state {
            ComputeState::Computed => {}
            ComputeState::Computing => {
                return Err(RadError::internal(
                    "SYS.COMPUTE_STATE",
                    format!(
                        "isotope {} re-entered while computing",
                        self.params.short_name
                    ),
                ));
            }
            ComputeState::NotComputed => {
                self.state = ComputeState::Computing;
                match self.accumulate(source, conditions, mole_fraction) {
                    Ok((cross_section, branches)) => {
                        self.cross_section = Some(cross_section);
                        self.branches = branches;
                        self.state = ComputeState::Computed;
                    }
                    Err(error) => {
                        self.state = ComputeState::NotComputed;
                        return Err(error);
                    }
                }
            }
        }
        Ok(self.cross_section.as_deref().unwrap_or(&[]))
    }

    fn accumulate<S: ProfileSource + ?Sized>(
        &mut self,
        source: &S,
        conditions: &LayerConditions,
        mole_fraction: f64,
    ) -> RadResult<(Vec<f64>, BranchCounts)> {
        self.sort_lines(conditions.pressure);
        let (fetch_min, fetch_max) = conditions.fetch_range();
        let lines: Vec<Line> = self
            .lines
            .iter()
            .filter(|line| line.wavenumber >= fetch_min && line.wavenumber <= fetch_max)
            .copied()
            .collect();
        if lines.is_empty() {
            return Ok((conditions.window.zeroed(), BranchCounts::default()));
        }

        let missing_partition = || {
            RadError::computation(
                "RUN.PARTITION_TABLE",
                format!(
                    "isotope {} has no partition function at {} K",
                    self.params.short_name, conditions.temperature
                ),
            )
        };
        let q_t = self
            .partition
            .q_at(conditions.temperature)
            .ok_or_else(missing_partition)?;
        let q_ref = self
            .partition
            .q_at(T_REF_K)
            .or((self.params.q296 > 0.0).then_some(self.params.q296))
            .ok_or_else(missing_partition)?;

        let input = AccumulationInput {
            window: conditions.window,
            temperature: conditions.temperature,
            pressure: conditions.pressure,
            mole_fraction,
            wing: conditions.wing,
            molecular_mass_kg: molecular_mass_kg(self.params.molar_mass),
            q_t,
            q_ref,
        };
        let (cross_section, branches) = accumulate_lines(source, &lines, &input)?;
        if cross_section.iter().any(|value| !value.is_finite()) {
            return Err(RadError::computation(
                "RUN.NON_FINITE",
                format!("isotope {} produced a non-finite cross section", self.params.short_name),
            ));
        }
        debug!(
            isotope = %self.params.short_name,
            lines = lines.len(),
            gaussian = branches.gaussian,
            lorentz = branches.lorentz,
            pseudo_voigt = branches.pseudo_voigt,
            "accumulated isotope cross section"
        );
        Ok((cross_section, branches))
    }

    /// Absorption coefficient of this isotope alone at the molecule's
    /// concentration, once computed.
    pub fn absorption_coefficient(
        &self,
        concentration: f64,
        conditions: &LayerConditions,
    ) -> Option<Vec<f64>> {
        self.cross_section.as_deref().map(|cross_section| {
            absorption_coefficient(
                cross_section,
                concentration,
                conditions.pressure,
                conditions.temperature,
            )
        })
    }

    pub fn line_survey(&self, window: &SpectralWindow) -> Vec<f64> {
        line_survey(&self.lines, window)
    }
}

impl SpectralComponent for Isotope {
    fn name(&self) -> &str {
        &self.params.short_name
    }

    fn state(&self) -> ComputeState {
        self.state
    }

    fn reset_cross_section(&mut self) {
        self.state = ComputeState::NotComputed;
        self.cross_section = None;
        self.branches = BranchCounts::default();
    }

    fn cross_section(&self) -> Option<&[f64]> {
        self.cross_section.as_deref()
    }
}
