use super::CliError;
use super::helpers::*;
use atmorad_core::common::constants::{CM_PER_KM, CM_PER_M};
use atmorad_core::domain::RadError;
use atmorad_core::modules::atmosphere::{Planet, PlanetConfig};
use atmorad_core::modules::column::Layer;
use atmorad_core::modules::profile::{
    BuildOptions, BuildOutcome, ProfileStore, build_profile, run_transmission_pass,
    transmission_at,
};
use atmorad_core::modules::serialization::{format_fixed_f64, render_spectrum_table};
use atmorad_core::modules::transfer::Direction;
use atmorad_core::modules::{OpticalSlab, SpectralComponent};
use atmorad_core::numerics::effective_temperature;
use std::path::PathBuf;
use tracing::info;

fn parse_direction(value: &str) -> Result<Direction, String> {
    value
        .parse()
        .map_err(|error: RadError| error.message().to_string())
}

#[derive(clap::Args)]
pub(super) struct SliceArgs {
    /// Planet configuration JSON
    #[arg(long)]
    planet: PathBuf,

    #[command(flatten)]
    database: LineDatabaseFlags,

    #[command(flatten)]
    context: ContextFlags,
}

#[derive(clap::Args)]
pub(super) struct LayerArgs {
    /// Layer description JSON
    #[arg(long)]
    layer: PathBuf,

    #[command(flatten)]
    database: LineDatabaseFlags,

    #[command(flatten)]
    context: ContextFlags,

    /// Spectrum table output path (stdout when absent)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Add a column with unbroadened line intensities
    #[arg(long)]
    survey: bool,
}

#[derive(clap::Args)]
pub(super) struct BuildProfileArgs {
    /// Planet configuration JSON
    #[arg(long)]
    planet: PathBuf,

    #[command(flatten)]
    database: LineDatabaseFlags,

    #[command(flatten)]
    context: ContextFlags,

    /// Root directory holding one folder per planet
    #[arg(long, default_value = "profiles")]
    output: PathBuf,

    /// Store each molecule's absorption coefficient
    #[arg(long)]
    molecule_specific: bool,

    /// Replace a stored profile built with a different configuration
    #[arg(long)]
    overwrite: bool,

    /// Pause once this many layers are complete
    #[arg(long, value_name = "LAYERS")]
    stop_after: Option<usize>,
}

#[derive(clap::Args)]
pub(super) struct TransmissionPassArgs {
    /// Profile folder written by build-profile
    #[arg(long)]
    profile: PathBuf,

    /// Output resolution in cm-1; a whole multiple of the profile grid
    #[arg(long, default_value_t = 1.0)]
    output_resolution: f64,
}

#[derive(clap::Args)]
pub(super) struct TransmitArgs {
    /// Profile folder with a completed transmission pass
    #[arg(long)]
    profile: PathBuf,

    /// Observer height in km
    #[arg(long)]
    height: f64,

    /// Viewing direction: up or down
    #[arg(long, default_value = "down", value_parser = parse_direction)]
    direction: Direction,

    /// Spectrum table output path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_slice_command(args: SliceArgs) -> Result<i32, CliError> {
    let context = build_context(&args.context)?;
    let db = open_line_database(&args.database)?;
    let config: PlanetConfig = load_document(&args.planet)?;
    let planet = Planet::build(config, &db, &context).map_err(CliError::Compute)?;
    let slices = planet.slice().map_err(CliError::Compute)?;

    let mut table =
        String::from("# layer    height_km      depth_m temperature_K pressure_mbar\n");
    for slice in &slices {
        table.push_str(&format!("{:>7}", slice.index + 1));
        for value in [
            slice.height / CM_PER_KM,
            slice.depth / CM_PER_M,
            slice.temperature,
            slice.pressure,
        ] {
            table.push(' ');
            table.push_str(&format_fixed_f64(value, 13, 5));
        }
        table.push('\n');
    }
    print!("{}", table);
    info!(planet = %planet.config().name, layers = slices.len(), "sliced column");
    Ok(0)
}

pub(super) fn run_layer_command(args: LayerArgs) -> Result<i32, CliError> {
    let context = build_context(&args.context)?;
    let db = open_line_database(&args.database)?;
    let document: LayerDocument = load_document(&args.layer)?;
    let window = context
        .window(document.range_min, document.range_max)
        .map_err(CliError::Compute)?;

    let mut layer = Layer::new(
        document.name,
        document.height,
        document.depth,
        document.temperature,
        document.pressure,
        window,
    )
    .map_err(CliError::Compute)?;
    if let Some(wing) = document.wing {
        layer = layer.with_wing(wing).map_err(CliError::Compute)?;
    }
    for molecule in &document.molecules {
        layer
            .add_molecule(
                &db,
                &context,
                &molecule.name,
                molecule.isotope_depth,
                molecule.abundance,
            )
            .map_err(CliError::Compute)?;
    }
    layer.compute(&context).map_err(CliError::Compute)?;
    context.persist_cache().map_err(CliError::Compute)?;

    let transmittance = layer.transmittance();
    let emissivity = layer.emissivity();
    let survey = args.survey.then(|| layer.line_survey());
    let mut columns: Vec<(&str, &[f64])> = vec![
        ("absorption_coefficient", layer.absorption_coefficient()),
        ("transmittance", transmittance.as_slice()),
        ("emissivity", emissivity.as_slice()),
    ];
    if let Some(survey) = &survey {
        columns.push(("line_survey", survey.as_slice()));
    }
    let table = render_spectrum_table(&window.wavenumbers(), &columns);
    emit_text(args.output.as_deref(), &table)?;
    info!(
        layer = %layer.name(),
        bins = window.len(),
        effective_emissivity = layer.effective_emissivity(),
        "layer computed"
    );
    Ok(0)
}

pub(super) fn run_build_profile_command(args: BuildProfileArgs) -> Result<i32, CliError> {
    let context = build_context(&args.context)?;
    let db = open_line_database(&args.database)?;
    let config: PlanetConfig = load_document(&args.planet)?;
    let planet = Planet::build(config, &db, &context).map_err(CliError::Compute)?;
    let store = ProfileStore::for_planet(&args.output, &planet.folder_name(&context))
        .map_err(CliError::Compute)?;
    let options = BuildOptions {
        molecule_specific: args.molecule_specific,
        overwrite: args.overwrite,
        stop_after: args.stop_after,
    };

    match build_profile(&planet, &db, &context, &store, options).map_err(CliError::Compute)? {
        BuildOutcome::AlreadyComplete { layers } => {
            println!("Profile already complete: {} layers", layers);
        }
        BuildOutcome::Completed { layers, computed } => {
            println!("Profile complete: {} layers ({} computed)", layers, computed);
        }
        BuildOutcome::Paused {
            completed,
            expected,
        } => {
            println!("Profile paused: {} of {} layers", completed, expected);
        }
    }
    println!("Profile directory: {}", store.root().display());
    Ok(0)
}

pub(super) fn run_transmission_pass_command(args: TransmissionPassArgs) -> Result<i32, CliError> {
    require_directory(&args.profile)?;
    let store = ProfileStore::new(&args.profile).map_err(CliError::Compute)?;
    let completion =
        run_transmission_pass(&store, args.output_resolution).map_err(CliError::Compute)?;
    println!(
        "Transmission pass complete: {} layers, surface power {:.6} W/m2",
        completion.layer_count, completion.surface_power
    );
    Ok(0)
}

pub(super) fn run_transmit_command(args: TransmitArgs) -> Result<i32, CliError> {
    require_directory(&args.profile)?;
    let store = ProfileStore::new(&args.profile).map_err(CliError::Compute)?;
    let record = transmission_at(&store, args.height * CM_PER_KM, args.direction)
        .map_err(CliError::Compute)?;

    println!(
        "Observer at {} km looking {}: {} layers folded",
        args.height, args.direction, record.step
    );
    println!("Power: {:.6} W/m2", record.power);
    println!(
        "Effective temperature: {:.3} K",
        effective_temperature(record.power)
    );
    for molecule in &record.molecules {
        println!(
            "  {}: power {:.6} W/m2, effective emissivity {:.6}",
            molecule.name, molecule.power, molecule.effective_emissivity
        );
    }

    if let Some(output) = args.output.as_deref() {
        let range_min = store
            .read_profile_completion()
            .map_err(CliError::Compute)?
            .map_or(0.0, |completion| completion.progress.planet.range_min);
        let wavenumbers = grid(range_min, record.output_resolution, record.spectrum.len());
        let mut columns: Vec<(&str, &[f64])> = vec![("radiance", record.spectrum.as_slice())];
        columns.extend(
            record
                .molecules
                .iter()
                .map(|molecule| (molecule.name.as_str(), molecule.spectrum.as_slice())),
        );
        emit_text(Some(output), &render_spectrum_table(&wavenumbers, &columns))?;
    }
    Ok(0)
}
