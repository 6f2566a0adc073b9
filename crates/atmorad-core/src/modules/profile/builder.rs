//! Resumable profile construction and the transmission stage run over a
//! finished profile.

use super::records::{
    FORMAT_VERSION, LayerProfileRecord, MoleculeLayerData, MoleculeTransmission, ProfileCompletion,
    ProgressMarker, TransmissionCompletion, TransmissionRecord,
};
use super::store::ProfileStore;
use crate::common::Context;
use crate::domain::{RadError, RadResult, SpectralWindow};
use crate::modules::atmosphere::Planet;
use crate::modules::column::Layer;
use crate::modules::linedb::LineDatabase;
use crate::modules::transfer::{
    Direction, check_height_order, downward_source, path_indices, upward_source,
};
use crate::modules::traits::{OpticalSlab, SpectralComponent};
use crate::numerics::planck::{integrate_spectrum, reduce_resolution};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Store each molecule's own absorption coefficient next to the total.
    pub molecule_specific: bool,
    /// Discard a stored profile whose configuration does not match.
    pub overwrite: bool,
    /// Pause once this many layers are complete.
    pub stop_after: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    AlreadyComplete { layers: usize },
    Completed { layers: usize, computed: usize },
    Paused { completed: usize, expected: usize },
}

/// Computes every layer of `planet` into `store`, continuing after the last
/// layer the progress marker records.
pub fn build_profile(
    planet: &Planet,
    db: &dyn LineDatabase,
    context: &Context,
    store: &ProfileStore,
    options: BuildOptions,
) -> RadResult<BuildOutcome> {
    let slices = planet.slice()?;
    let expected = slices.len();
    let mut marker = ProgressMarker {
        format_version: FORMAT_VERSION,
        completed_layers: 0,
        expected_layers: expected,
        elapsed_seconds: 0.0,
        resolution: context.resolution(),
        molecule_specific: options.molecule_specific,
        molecules: planet.molecule_names(),
        detail: context.detail(),
        intensity_cutoff: context.intensity_cutoff(),
        planet: planet.config().clone(),
    };

    if let Some(done) = store.read_profile_completion()? {
        if same_configuration(&done.progress, &marker) {
            info!(
                store = %store.root().display(),
                layers = done.progress.completed_layers,
                "profile already complete"
            );
            return Ok(BuildOutcome::AlreadyComplete {
                layers: done.progress.completed_layers,
            });
        }
        discard_mismatched(store, options, "completed profile")?;
    }

    match store.read_progress()? {
        Some(stored) if same_configuration(&stored, &marker) => {
            marker.completed_layers = stored.completed_layers.min(expected);
            marker.elapsed_seconds = stored.elapsed_seconds;
            info!(
                store = %store.root().display(),
                completed = marker.completed_layers,
                expected,
                "resuming profile"
            );
        }
        Some(_) => discard_mismatched(store, options, "partial profile")?,
        None => info!(store = %store.root().display(), layers = expected, "building profile"),
    }

    let mut computed = 0;
    for slice in &slices[marker.completed_layers..] {
        if options
            .stop_after
            .is_some_and(|limit| marker.completed_layers >= limit)
        {
            info!(
                completed = marker.completed_layers,
                expected, "pausing profile build"
            );
            return Ok(BuildOutcome::Paused {
                completed: marker.completed_layers,
                expected,
            });
        }

        let started = Instant::now();
        let mut layer = planet.layer_for(db, context, slice, expected)?;
        layer.compute(context)?;
        let record = layer_record(slice.index, &layer, options.molecule_specific)?;
        // The marker only moves once the layer is on disk.
        store.write_layer(&record)?;
        let elapsed = started.elapsed().as_secs_f64();
        marker.completed_layers = slice.index + 1;
        marker.elapsed_seconds += elapsed;
        store.write_progress(&marker)?;
        computed += 1;

        info!(
            layer = %record.name,
            height_cm = record.height,
            depth_cm = record.depth,
            temperature_k = record.temperature,
            pressure_mbar = record.pressure,
            elapsed_s = elapsed,
            "layer complete"
        );
    }

    context.persist_cache()?;
    store.write_profile_completion(&ProfileCompletion {
        layer_heights: slices.iter().map(|slice| slice.height).collect(),
        progress: marker.clone(),
    })?;
    info!(
        layers = expected,
        computed,
        elapsed_s = marker.elapsed_seconds,
        "profile complete"
    );
    Ok(BuildOutcome::Completed {
        layers: expected,
        computed,
    })
}

fn same_configuration(stored: &ProgressMarker, requested: &ProgressMarker) -> bool {
    stored.format_version == requested.format_version
        && stored.expected_layers == requested.expected_layers
        && stored.resolution == requested.resolution
        && stored.molecule_specific == requested.molecule_specific
        && stored.molecules == requested.molecules
        && stored.detail == requested.detail
        && stored.intensity_cutoff == requested.intensity_cutoff
        && stored.planet == requested.planet
}

fn discard_mismatched(store: &ProfileStore, options: BuildOptions, what: &str) -> RadResult<()> {
    if !options.overwrite {
        return Err(RadError::input_validation(
            "INPUT.PROFILE_MISMATCH",
            format!(
                "{} in '{}' was built with a different configuration; rerun with overwrite to replace it",
                what,
                store.root().display()
            ),
        ));
    }
    warn!(store = %store.root().display(), "discarding mismatched {}", what);
    store.clear()
}

/// Snapshot of a computed layer.
pub fn layer_record(
    index: usize,
    layer: &Layer,
    molecule_specific: bool,
) -> RadResult<LayerProfileRecord> {
    if !layer.state().is_computed() {
        return Err(RadError::internal(
            "SYS.COMPUTE_STATE",
            format!("layer '{}' must be computed before it is stored", layer.name()),
        ));
    }
    let window = layer.window();
    let molecules = layer
        .molecules()
        .iter()
        .map(|molecule| MoleculeLayerData {
            name: molecule.name().to_string(),
            concentration: molecule.concentration(),
            absorption_coefficient: molecule_specific
                .then(|| layer.molecule_absorption_coefficient(molecule.name()))
                .flatten(),
        })
        .collect();
    Ok(LayerProfileRecord {
        format_version: FORMAT_VERSION,
        index,
        name: layer.name().to_string(),
        height: layer.height(),
        depth: layer.depth(),
        temperature: layer.temperature(),
        pressure: layer.pressure(),
        range_min: window.min,
        range_max: window.max,
        resolution: window.resolution,
        molecules,
        absorption_coefficient: layer.absorption_coefficient().to_vec(),
    })
}

/// Every layer of a completed profile, surface first.
pub fn load_profile(store: &ProfileStore) -> RadResult<Vec<LayerProfileRecord>> {
    let completion = require_profile(store)?;
    (0..completion.progress.completed_layers)
        .map(|index| store.read_layer(index))
        .collect()
}

fn require_profile(store: &ProfileStore) -> RadResult<ProfileCompletion> {
    store.read_profile_completion()?.ok_or_else(|| {
        RadError::input_validation(
            "INPUT.PROFILE_INCOMPLETE",
            format!("no completed profile in '{}'", store.root().display()),
        )
    })
}

/// Folds both sources through the stored profile and writes one record per
/// step of each pass, reduced to `output_resolution`.
pub fn run_transmission_pass(
    store: &ProfileStore,
    output_resolution: f64,
) -> RadResult<TransmissionCompletion> {
    let completion = require_profile(store)?;
    let progress = &completion.progress;
    let planet = &progress.planet;
    let layers = load_profile(store)?;
    check_height_order(&layers)?;
    let window = SpectralWindow::new(planet.range_min, planet.range_max, progress.resolution)?;
    let molecules = if progress.molecule_specific {
        progress.molecules.clone()
    } else {
        Vec::new()
    };
    let reduce = |spectrum: &[f64]| reduce_resolution(spectrum, window.resolution, output_resolution);
    let started = Instant::now();
    info!(
        layers = layers.len(),
        output_resolution,
        molecule_specific = progress.molecule_specific,
        "running transmission pass"
    );

    let surface = downward_source(
        &window,
        planet.surface_temperature,
        planet.surface_effective_emissivity,
    );
    let surface_power = integrate_spectrum(&reduce(&surface)?, output_resolution);
    let passes = [
        (Direction::Down, surface, 0.0, planet.surface_effective_emissivity),
        (Direction::Up, upward_source(&window), planet.max_height_cm(), 1.0),
    ];

    let wavenumbers = window.wavenumbers();
    for (direction, source, source_height, source_emissivity) in passes {
        let mut folded = FoldState {
            total: source.clone(),
            molecules: vec![source; molecules.len()],
        };
        // The source step reports the gases as found in the layer nearest to it.
        let nearest = match direction {
            Direction::Down => layers.first(),
            Direction::Up => layers.last(),
        };
        let attribution = molecules
            .iter()
            .map(|name| (concentration_in(nearest, name), source_emissivity))
            .collect::<Vec<_>>();
        let reduced = reduce(&folded.total)?;
        store.write_transmission(&TransmissionRecord {
            format_version: FORMAT_VERSION,
            direction,
            step: 0,
            layer_name: None,
            height: source_height,
            output_resolution,
            power: integrate_spectrum(&reduced, output_resolution),
            spectrum: reduced,
            effective_emissivity: source_emissivity,
            molecules: folded.molecule_records(&molecules, &attribution, &reduce, output_resolution)?,
        })?;

        let observer = match direction {
            Direction::Down => f64::INFINITY,
            Direction::Up => f64::NEG_INFINITY,
        };
        for (step, index) in path_indices(&layers, observer, direction).into_iter().enumerate() {
            let layer = &layers[index];
            let attribution = folded.fold(layer, &molecules, &wavenumbers)?;
            let reduced = reduce(&folded.total)?;
            store.write_transmission(&TransmissionRecord {
                format_version: FORMAT_VERSION,
                direction,
                step: step + 1,
                layer_name: Some(layer.name.clone()),
                height: match direction {
                    Direction::Down => layer.height + layer.depth,
                    Direction::Up => layer.height,
                },
                output_resolution,
                power: integrate_spectrum(&reduced, output_resolution),
                spectrum: reduced,
                effective_emissivity: layer.effective_emissivity(),
                molecules: folded.molecule_records(
                    &molecules,
                    &attribution,
                    &reduce,
                    output_resolution,
                )?,
            })?;
        }
        debug!(direction = %direction, steps = layers.len() + 1, "transmission pass written");
    }

    let mut height_list = Vec::with_capacity(layers.len() + 2);
    height_list.push(0.0);
    height_list.extend(layers.iter().map(|layer| layer.mean_height()));
    height_list.push(planet.max_height_cm());
    let marker = TransmissionCompletion {
        format_version: FORMAT_VERSION,
        height_list,
        max_height: planet.max_height_cm(),
        output_resolution,
        surface_temperature: planet.surface_temperature,
        surface_power,
        molecules,
        layer_count: layers.len(),
    };
    store.write_transmission_completion(&marker)?;
    info!(
        layers = layers.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "transmission pass complete"
    );
    Ok(marker)
}

fn concentration_in(layer: Option<&LayerProfileRecord>, name: &str) -> f64 {
    layer
        .and_then(|layer| layer.molecules.iter().find(|molecule| molecule.name == name))
        .map_or(0.0, |molecule| molecule.concentration)
}

/// Running spectra of one pass: the full mixture and each tracked gas.
struct FoldState {
    total: Vec<f64>,
    molecules: Vec<Vec<f64>>,
}

impl FoldState {
    /// Applies one layer and returns each gas's concentration and effective
    /// emissivity in it.
    fn fold(
        &mut self,
        layer: &LayerProfileRecord,
        molecules: &[String],
        wavenumbers: &[f64],
    ) -> RadResult<Vec<(f64, f64)>> {
        if layer.absorption_coefficient.len() != wavenumbers.len() {
            return Err(RadError::input_validation(
                "INPUT.SPECTRUM_LENGTH",
                format!(
                    "layer '{}' has {} bins where {} were expected",
                    layer.name,
                    layer.absorption_coefficient.len(),
                    wavenumbers.len()
                ),
            ));
        }
        self.total = layer.transmit(&self.total, wavenumbers);

        let mut attribution = Vec::with_capacity(molecules.len());
        for (name, spectrum) in molecules.iter().zip(self.molecules.iter_mut()) {
            let slab = layer.molecule_slab(name).ok_or_else(|| {
                RadError::input_validation(
                    "INPUT.RECORD_FORMAT",
                    format!("layer '{}' stores no data for molecule '{}'", layer.name, name),
                )
            })?;
            *spectrum = slab.transmit(spectrum, wavenumbers);
            attribution.push((concentration_in(Some(layer), name), slab.effective_emissivity()));
        }
        Ok(attribution)
    }

    fn molecule_records(
        &self,
        molecules: &[String],
        attribution: &[(f64, f64)],
        reduce: &impl Fn(&[f64]) -> RadResult<Vec<f64>>,
        output_resolution: f64,
    ) -> RadResult<Vec<MoleculeTransmission>> {
        molecules
            .iter()
            .zip(&self.molecules)
            .zip(attribution)
            .map(|((name, spectrum), (concentration, effective_emissivity))| {
                let reduced = reduce(spectrum)?;
                Ok(MoleculeTransmission {
                    name: name.clone(),
                    concentration: *concentration,
                    power: integrate_spectrum(&reduced, output_resolution),
                    spectrum: reduced,
                    effective_emissivity: *effective_emissivity,
                })
            })
            .collect()
    }
}

/// Stored spectrum an observer at `height` cm sees looking `direction`.
pub fn transmission_at(
    store: &ProfileStore,
    height: f64,
    direction: Direction,
) -> RadResult<TransmissionRecord> {
    let completion = store.read_transmission_completion()?.ok_or_else(|| {
        RadError::input_validation(
            "INPUT.TRANSMISSION_INCOMPLETE",
            format!("no completed transmission pass in '{}'", store.root().display()),
        )
    })?;
    if !(0.0..=completion.max_height).contains(&height) {
        return Err(RadError::input_validation(
            "INPUT.OBSERVER_HEIGHT",
            format!(
                "observer height {} cm is outside the column [0, {}]",
                height, completion.max_height
            ),
        ));
    }
    let count = completion.layer_count;
    let mean_heights = completion.height_list.get(1..=count).unwrap_or(&[]);
    let step = match direction {
        Direction::Down => mean_heights.iter().filter(|mean| **mean < height).count(),
        Direction::Up => mean_heights.iter().filter(|mean| **mean > height).count(),
    };
    store.read_transmission(direction, step)
}

#[cfg(test)]
mod tests {
    use super::{
        BuildOptions, BuildOutcome, build_profile, load_profile, run_transmission_pass,
        transmission_at,
    };
    use crate::common::Context;
    use crate::modules::atmosphere::{Planet, PlanetConfig};
    use crate::modules::linedb::InMemoryLineDatabase;
    use crate::modules::linedb::fixtures::{co2_params, co2_partition, line_at};
    use crate::modules::profile::ProfileStore;
    use crate::modules::transfer::Direction;
    use serde_json::json;
    use tempfile::TempDir;

    fn config() -> PlanetConfig {
        serde_json::from_value(json!({
            "name": "testworld",
            "surfacePressure": 1013.25,
            "surfaceTemperature": 288.15,
            "maxHeight": 20,
            "rangeMin": 665,
            "rangeMax": 669,
            "initialDepth": 1000,
            "molecules": [
                {"name": "co2", "ppm": 400},
                {"name": "ar", "percentage": 99}
            ],
            "temperatureRules": [
                {"name": "troposphere", "finalHeight": 11, "finalValue": 216.65},
                {"name": "tropopause", "finalHeight": 20, "finalValue": 216.65}
            ]
        }))
        .expect("planet config")
    }

    fn database() -> InMemoryLineDatabase {
        InMemoryLineDatabase::new().with_isotope(
            co2_params(),
            co2_partition(),
            vec![line_at(667.0, 3.0e-19)],
        )
    }

    fn context() -> Context {
        Context::default().with_resolution(0.05).expect("resolution")
    }

    #[test]
    fn complete_profile_is_not_rebuilt() {
        let temp = TempDir::new().expect("tempdir should be created");
        let store = ProfileStore::new(temp.path()).expect("store should open");
        let (db, context) = (database(), context());
        let planet = Planet::build(config(), &db, &context).expect("planet");

        let first = build_profile(&planet, &db, &context, &store, BuildOptions::default())
            .expect("build");
        let BuildOutcome::Completed { layers, computed } = first else {
            panic!("unexpected outcome {first:?}");
        };
        assert_eq!(layers, computed);
        assert_eq!(load_profile(&store).expect("profile").len(), layers);

        let second = build_profile(&planet, &db, &context, &store, BuildOptions::default())
            .expect("rebuild");
        assert_eq!(second, BuildOutcome::AlreadyComplete { layers });
    }

    #[test]
    fn mismatched_configuration_requires_overwrite() {
        let temp = TempDir::new().expect("tempdir should be created");
        let store = ProfileStore::new(temp.path()).expect("store should open");
        let (db, context) = (database(), context());
        let planet = Planet::build(config(), &db, &context).expect("planet");
        let paused = BuildOptions {
            stop_after: Some(1),
            ..BuildOptions::default()
        };
        let outcome = build_profile(&planet, &db, &context, &store, paused).expect("first layer");
        assert!(matches!(outcome, BuildOutcome::Paused { completed: 1, .. }));

        let mut warmer = config();
        warmer.surface_temperature = 300.0;
        let warmer = Planet::build(warmer, &db, &context).expect("warmer planet");
        let error = build_profile(&warmer, &db, &context, &store, BuildOptions::default())
            .expect_err("mismatch");
        assert_eq!(error.placeholder(), "INPUT.PROFILE_MISMATCH");

        let overwrite = BuildOptions {
            overwrite: true,
            ..BuildOptions::default()
        };
        let outcome = build_profile(&warmer, &db, &context, &store, overwrite).expect("overwrite");
        assert!(matches!(outcome, BuildOutcome::Completed { .. }));
        let first = store.read_layer(0).expect("first layer");
        assert!(first.temperature > 290.0);
    }

    #[test]
    fn changed_line_cutoff_invalidates_completed_profile() {
        let temp = TempDir::new().expect("tempdir should be created");
        let store = ProfileStore::new(temp.path()).expect("store should open");
        let (db, context) = (database(), context());
        let planet = Planet::build(config(), &db, &context).expect("planet");
        build_profile(&planet, &db, &context, &store, BuildOptions::default()).expect("build");

        let stricter = Context::default()
            .with_resolution(0.05)
            .expect("resolution")
            .with_intensity_cutoff(1.0e-18);
        let planet = Planet::build(config(), &db, &stricter).expect("planet");
        let error = build_profile(&planet, &db, &stricter, &store, BuildOptions::default())
            .expect_err("cutoff changed");
        assert_eq!(error.placeholder(), "INPUT.PROFILE_MISMATCH");

        let overwrite = BuildOptions {
            overwrite: true,
            ..BuildOptions::default()
        };
        let outcome = build_profile(&planet, &db, &stricter, &store, overwrite).expect("rebuild");
        let BuildOutcome::Completed { layers, computed } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(layers, computed);
        let first = store.read_layer(0).expect("first layer");
        assert!(first.absorption_coefficient.iter().all(|value| *value == 0.0));
        let completion = store
            .read_profile_completion()
            .expect("read")
            .expect("completion");
        assert_eq!(completion.progress.intensity_cutoff, 1.0e-18);
    }

    #[test]
    fn transmission_pass_records_each_step_and_lookup_by_height() {
        let temp = TempDir::new().expect("tempdir should be created");
        let store = ProfileStore::new(temp.path()).expect("store should open");
        let (db, context) = (database(), context());
        let planet = Planet::build(config(), &db, &context).expect("planet");
        let options = BuildOptions {
            molecule_specific: true,
            ..BuildOptions::default()
        };
        build_profile(&planet, &db, &context, &store, options).expect("build");

        let error = transmission_at(&store, 0.0, Direction::Up).expect_err("not run yet");
        assert_eq!(error.placeholder(), "INPUT.TRANSMISSION_INCOMPLETE");

        let done = run_transmission_pass(&store, 0.1).expect("transmission");
        let layers = done.layer_count;
        assert_eq!(done.height_list.len(), layers + 2);
        assert_eq!(done.height_list[0], 0.0);
        assert_eq!(done.height_list[layers + 1], 2.0e6);
        assert_eq!(done.molecules, vec!["co2", "ar"]);

        let surface = transmission_at(&store, 0.0, Direction::Down).expect("surface record");
        assert_eq!(surface.step, 0);
        assert!(surface.layer_name.is_none());
        assert_eq!(surface.spectrum.len(), 40);
        assert!((surface.power - done.surface_power).abs() <= 1.0e-12 * done.surface_power);

        let top = transmission_at(&store, 2.0e6, Direction::Down).expect("top record");
        assert_eq!(top.step, layers);
        assert!((top.height - 2.0e6).abs() < 1.0e-6);
        assert_eq!(top.molecules.len(), 2);
        // Cold upper layers absorb more than they emit in the band.
        assert!(top.power < surface.power);
        assert!(top.molecules[0].concentration > 0.0);
        let argon = &top.molecules[1];
        assert!((argon.power - surface.power).abs() <= 1.0e-9 * surface.power);

        let sky = transmission_at(&store, 0.0, Direction::Up).expect("sky record");
        assert_eq!(sky.step, layers);
        assert!(sky.power > 0.0);
        assert!(transmission_at(&store, 3.0e6, Direction::Up).is_err());
    }
}
