use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn write_line_database(root: &Path) {
    let isotope = root.join("7");
    write_file(
        &isotope.join("params.json"),
        &json!({
            "globalId": 7,
            "shortName": "(12C)(16O)2",
            "moleculeId": 2,
            "localIsoNumber": 1,
            "abundance": 0.984204,
            "q296": 286.09,
            "statisticalWeight": 1.0,
            "molarMass": 43.98983
        })
        .to_string(),
    );
    write_file(
        &isotope.join("partition.json"),
        r#"{"150": 140.0, "200": 190.0, "250": 240.0, "296": 286.09, "350": 340.0}"#,
    );
    write_file(
        &isotope.join("lines.json"),
        &json!([{
            "wavenumber": 667.0,
            "referenceIntensity": 3.0e-19,
            "einsteinA": 1.5,
            "airHalfWidth": 0.07,
            "selfHalfWidth": 0.09,
            "lowerStateEnergy": 200.0,
            "tempExponent": 0.75,
            "pressureShift": -0.006
        }])
        .to_string(),
    );
}

fn planet_document(surface_temperature: f64) -> String {
    json!({
        "name": "cli world",
        "setting": "test",
        "surfacePressure": 1013.25,
        "surfaceTemperature": surface_temperature,
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
    })
    .to_string()
}

fn run_atmorad(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_atmorad"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("atmorad should launch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn slice_command_prints_one_row_per_layer() {
    let temp = TempDir::new().expect("tempdir should be created");
    let db = temp.path().join("lines");
    write_line_database(&db);
    let planet = temp.path().join("planet.json");
    write_file(&planet, &planet_document(288.15));

    let output = run_atmorad(&[
        "slice",
        "--planet",
        planet.to_str().expect("utf-8 path"),
        "--line-db",
        db.to_str().expect("utf-8 path"),
        "--resolution",
        "0.05",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    let rows: Vec<&str> = text.lines().filter(|line| !line.starts_with('#')).collect();
    assert!(rows.len() >= 6, "expected several layers, got:\n{text}");
    let first: Vec<f64> = rows[0]
        .split_whitespace()
        .map(|field| field.parse().expect("numeric field"))
        .collect();
    assert_eq!(first[0], 1.0);
    assert_eq!(first[1], 0.0);
    assert_eq!(first[2], 1000.0);
}

#[test]
fn layer_command_writes_spectrum_table() {
    let temp = TempDir::new().expect("tempdir should be created");
    let db = temp.path().join("lines");
    write_line_database(&db);
    let layer = temp.path().join("layer.json");
    write_file(
        &layer,
        &json!({
            "name": "surface",
            "depth": 10000,
            "temperature": 296,
            "pressure": 1013.25,
            "rangeMin": 660,
            "rangeMax": 675,
            "molecules": [{"name": "co2", "ppm": 400}]
        })
        .to_string(),
    );
    let table = temp.path().join("out/layer.txt");

    let output = run_atmorad(&[
        "layer",
        "--layer",
        layer.to_str().expect("utf-8 path"),
        "--line-db",
        db.to_str().expect("utf-8 path"),
        "--resolution",
        "0.05",
        "--survey",
        "--output",
        table.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let content = fs::read_to_string(&table).expect("table should be written");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("# wavenumber absorption_coefficient transmittance emissivity line_survey")
    );
    assert_eq!(lines.count(), 300);
}

#[test]
fn profile_workflow_builds_resumes_and_transmits() {
    let temp = TempDir::new().expect("tempdir should be created");
    let db = temp.path().join("lines");
    write_line_database(&db);
    let planet = temp.path().join("planet.json");
    write_file(&planet, &planet_document(288.15));
    let profiles = temp.path().join("profiles");
    let db_arg = db.to_str().expect("utf-8 path");
    let planet_arg = planet.to_str().expect("utf-8 path");
    let profiles_arg = profiles.to_str().expect("utf-8 path");

    let build = |extra: &[&str]| {
        let mut args = vec![
            "build-profile",
            "--planet",
            planet_arg,
            "--line-db",
            db_arg,
            "--resolution",
            "0.05",
            "--output",
            profiles_arg,
            "--molecule-specific",
        ];
        args.extend_from_slice(extra);
        run_atmorad(&args)
    };

    let paused = build(&["--stop-after", "2"]);
    assert!(paused.status.success(), "stderr: {}", stderr(&paused));
    assert!(stdout(&paused).contains("Profile paused: 2 of"));

    let resumed = build(&[]);
    assert!(resumed.status.success(), "stderr: {}", stderr(&resumed));
    assert!(stdout(&resumed).contains("Profile complete:"));
    assert!(stderr(&resumed).contains("resuming profile"));

    let again = build(&[]);
    assert!(stdout(&again).contains("Profile already complete"));

    let folder = profiles.join("cli world test");
    let progress: Value = serde_json::from_str(
        &fs::read_to_string(folder.join("progress.json")).expect("progress should exist"),
    )
    .expect("progress should be JSON");
    assert_eq!(progress["completedLayers"], progress["expectedLayers"]);
    assert_eq!(progress["moleculeSpecific"], Value::Bool(true));

    let folder_arg = folder.to_str().expect("utf-8 path");
    let pass = run_atmorad(&[
        "transmission-pass",
        "--profile",
        folder_arg,
        "--output-resolution",
        "0.1",
    ]);
    assert!(pass.status.success(), "stderr: {}", stderr(&pass));
    assert!(stdout(&pass).contains("Transmission pass complete"));

    let spectrum = temp.path().join("top.txt");
    let top = run_atmorad(&[
        "transmit",
        "--profile",
        folder_arg,
        "--height",
        "20",
        "--direction",
        "down",
        "--output",
        spectrum.to_str().expect("utf-8 path"),
    ]);
    assert!(top.status.success(), "stderr: {}", stderr(&top));
    let text = stdout(&top);
    assert!(text.contains("looking down"));
    assert!(text.contains("Effective temperature:"));
    assert!(text.contains("co2: power"));
    let table = fs::read_to_string(&spectrum).expect("spectrum should be written");
    assert!(table.starts_with("# wavenumber radiance co2 ar"));
    assert_eq!(table.lines().count(), 41);
}

#[test]
fn mismatched_resume_needs_overwrite() {
    let temp = TempDir::new().expect("tempdir should be created");
    let db = temp.path().join("lines");
    write_line_database(&db);
    let planet = temp.path().join("planet.json");
    let profiles = temp.path().join("profiles");
    let args = |extra: &'static [&'static str]| {
        let mut args = vec![
            "build-profile".to_string(),
            "--planet".to_string(),
            planet.display().to_string(),
            "--line-db".to_string(),
            db.display().to_string(),
            "--resolution".to_string(),
            "0.05".to_string(),
            "--output".to_string(),
            profiles.display().to_string(),
            "--stop-after".to_string(),
            "1".to_string(),
        ];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        args
    };
    let run = |args: Vec<String>| {
        Command::new(env!("CARGO_BIN_EXE_atmorad"))
            .args(&args)
            .output()
            .expect("atmorad should launch")
    };

    write_file(&planet, &planet_document(288.15));
    assert!(run(args(&[])).status.success());

    write_file(&planet, &planet_document(300.0));
    let refused = run(args(&[]));
    assert_eq!(refused.status.code(), Some(2));
    let diagnostics = stderr(&refused);
    assert!(diagnostics.contains("ERROR: [INPUT.PROFILE_MISMATCH]"));
    assert!(diagnostics.contains("FATAL EXIT CODE: 2"));

    let replaced = run(args(&["--overwrite"]));
    assert!(replaced.status.success(), "stderr: {}", stderr(&replaced));
    assert!(stdout(&replaced).contains("Profile paused: 1 of"));
}

#[test]
fn usage_and_missing_inputs_map_to_exit_codes() {
    let unknown = run_atmorad(&["frobnicate"]);
    assert_eq!(unknown.status.code(), Some(2));
    assert!(stderr(&unknown).contains("[INPUT.CLI_USAGE]"));

    let help = run_atmorad(&["--help"]);
    assert!(help.status.success());
    assert!(stdout(&help).contains("build-profile"));

    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("nowhere");
    let output = run_atmorad(&[
        "transmit",
        "--profile",
        missing.to_str().expect("utf-8 path"),
        "--height",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("[IO.PROFILE_DIRECTORY]"));

    let bad_direction = run_atmorad(&[
        "transmit",
        "--profile",
        missing.to_str().expect("utf-8 path"),
        "--height",
        "0",
        "--direction",
        "sideways",
    ]);
    assert_eq!(bad_direction.status.code(), Some(2));
}
