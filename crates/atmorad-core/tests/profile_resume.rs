use atmorad_core::{Context, DetailLevel};
use atmorad_core::domain::{IsotopeParams, Line, PartitionTable};
use atmorad_core::modules::atmosphere::{Planet, PlanetConfig};
use atmorad_core::modules::linedb::InMemoryLineDatabase;
use atmorad_core::modules::profile::{
    BuildOptions, BuildOutcome, ProfileStore, build_profile, load_profile,
};
use serde_json::json;
use tempfile::TempDir;

fn co2_database() -> InMemoryLineDatabase {
    let params = IsotopeParams {
        global_id: 7,
        short_name: "(12C)(16O)2".to_string(),
        molecule_id: 2,
        local_iso_number: 1,
        abundance: 0.984_204,
        q296: 286.09,
        statistical_weight: 1.0,
        molar_mass: 43.989_830,
    };
    let partition =
        PartitionTable::from_pairs([(150, 140.0), (200, 190.0), (250, 240.0), (296, 286.09), (350, 340.0)]);
    let lines = [666.2, 667.0, 667.8]
        .into_iter()
        .map(|wavenumber| Line {
            wavenumber,
            reference_intensity: 2.0e-19,
            einstein_a: 1.5,
            air_half_width: 0.07,
            self_half_width: 0.09,
            lower_state_energy: 200.0,
            temp_exponent: 0.75,
            pressure_shift: -0.006,
        })
        .collect();
    InMemoryLineDatabase::new().with_isotope(params, partition, lines)
}

fn planet_config() -> PlanetConfig {
    serde_json::from_value(json!({
        "name": "resume world",
        "setting": "test",
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
        ],
        "compositionRules": [
            {"name": "co2 falloff", "molecule": "co2", "finalHeight": 20, "finalValue": 3.0e-4}
        ]
    }))
    .expect("planet config should parse")
}

fn context() -> Context {
    Context::default()
        .with_resolution(0.05)
        .expect("resolution should be accepted")
}

#[test]
fn profile_resume_matches_uninterrupted_build() {
    let db = co2_database();
    let options = BuildOptions {
        molecule_specific: true,
        ..BuildOptions::default()
    };

    let straight_dir = TempDir::new().expect("tempdir should be created");
    let straight_context = context();
    let planet = Planet::build(planet_config(), &db, &straight_context).expect("planet should build");
    let straight = ProfileStore::for_planet(straight_dir.path(), &planet.folder_name(&straight_context))
        .expect("store should open");
    let outcome = build_profile(&planet, &db, &straight_context, &straight, options)
        .expect("uninterrupted build should succeed");
    let BuildOutcome::Completed { layers, .. } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert!(layers >= 6, "column should slice into several layers, got {layers}");
    let halfway = layers / 2;

    let resumed_dir = TempDir::new().expect("tempdir should be created");
    let first_context = context();
    let planet = Planet::build(planet_config(), &db, &first_context).expect("planet should build");
    let resumed = ProfileStore::for_planet(resumed_dir.path(), &planet.folder_name(&first_context))
        .expect("store should open");
    let paused = BuildOptions {
        stop_after: Some(halfway),
        ..options
    };
    let outcome = build_profile(&planet, &db, &first_context, &resumed, paused)
        .expect("first half should succeed");
    assert_eq!(
        outcome,
        BuildOutcome::Paused {
            completed: halfway,
            expected: layers
        }
    );
    let progress = resumed
        .read_progress()
        .expect("progress should load")
        .expect("progress should exist");
    assert_eq!(progress.completed_layers, halfway);
    assert!(resumed.read_profile_completion().expect("read").is_none());

    // A fresh process: new context, new line cache.
    let second_context = context();
    let planet = Planet::build(planet_config(), &db, &second_context).expect("planet should build");
    let outcome = build_profile(&planet, &db, &second_context, &resumed, options)
        .expect("resumed build should succeed");
    assert_eq!(
        outcome,
        BuildOutcome::Completed {
            layers,
            computed: layers - halfway
        }
    );

    let expected = load_profile(&straight).expect("uninterrupted profile should load");
    let actual = load_profile(&resumed).expect("resumed profile should load");
    assert_eq!(expected.len(), layers);
    for (lhs, rhs) in expected.iter().zip(&actual) {
        assert_eq!(lhs.name, rhs.name);
        assert_eq!(lhs.height, rhs.height);
        assert_eq!(lhs.temperature, rhs.temperature);
        assert_eq!(lhs.pressure, rhs.pressure);
        assert_eq!(
            lhs.absorption_coefficient, rhs.absorption_coefficient,
            "layer {} should be bit-identical",
            lhs.name
        );
        assert_eq!(lhs.molecules, rhs.molecules);
    }
}

#[test]
fn sliced_layers_conserve_mass_and_thicken_with_height() {
    let db = co2_database();
    let context = context();
    let planet = Planet::build(planet_config(), &db, &context).expect("planet should build");
    let slices = planet.slice().expect("column should slice");

    let first = planet
        .layer_for(&db, &context, &slices[0], slices.len())
        .expect("first layer")
        .mass()
        .expect("first layer mass");
    for pair in slices.windows(2) {
        assert_eq!(pair[0].top(), pair[1].height);
    }
    for pair in slices[..slices.len() - 1].windows(2) {
        assert!(pair[1].depth > pair[0].depth, "thinner air needs deeper layers");
    }
    for slice in &slices[..slices.len() - 1] {
        let mass = planet
            .layer_for(&db, &context, slice, slices.len())
            .expect("layer")
            .mass()
            .expect("mass");
        assert!(
            (mass - first).abs() <= 1.0e-3 * first,
            "layer {} mass {} differs from {}",
            slice.index,
            mass,
            first
        );
    }
}

#[test]
fn resume_rejects_changed_resolution_or_line_cutoff() {
    let db = co2_database();
    let dir = TempDir::new().expect("tempdir should be created");
    let store = ProfileStore::new(dir.path()).expect("store should open");
    let first_context = context();
    let planet = Planet::build(planet_config(), &db, &first_context).expect("planet should build");
    let paused = BuildOptions {
        stop_after: Some(1),
        ..BuildOptions::default()
    };
    build_profile(&planet, &db, &first_context, &store, paused).expect("first layer should build");

    let stricter = context().with_intensity_cutoff(1.0e-18);
    let error = build_profile(&planet, &db, &stricter, &store, BuildOptions::default())
        .expect_err("a different line cutoff must not extend the profile");
    assert_eq!(error.placeholder(), "INPUT.PROFILE_MISMATCH");

    let coarser = Context::default()
        .with_resolution(0.1)
        .expect("resolution should be accepted");
    let error = build_profile(&planet, &db, &coarser, &store, BuildOptions::default())
        .expect_err("a different grid must not extend the profile");
    assert_eq!(error.placeholder(), "INPUT.PROFILE_MISMATCH");

    let progress = store
        .read_progress()
        .expect("progress should load")
        .expect("progress should exist");
    assert_eq!(progress.completed_layers, 1);
    assert_eq!(progress.intensity_cutoff, first_context.intensity_cutoff());

    let outcome = build_profile(&planet, &db, &first_context, &store, BuildOptions::default())
        .expect("matching resume should succeed");
    assert!(matches!(outcome, BuildOutcome::Completed { .. }));

    let low_detail = Context::new(DetailLevel::Low)
        .with_resolution(0.05)
        .expect("resolution should be accepted");
    let error = build_profile(&planet, &db, &low_detail, &store, BuildOptions::default())
        .expect_err("a completed profile from another preset is not reused");
    assert_eq!(error.placeholder(), "INPUT.PROFILE_MISMATCH");
}
