mod commands;
mod helpers;

use atmorad_core::domain::RadError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_rad_error();
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("atmorad".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            init_tracing(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A second initialisation in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "atmorad",
    version,
    about = "Line-by-line infrared radiative transfer through layered atmospheres"
)]
struct Cli {
    /// Log per-isotope and cache details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Slice a planet's atmosphere into equal-mass layers
    Slice(commands::SliceArgs),
    /// Compute one homogeneous layer and write its spectra
    Layer(commands::LayerArgs),
    /// Build (or resume) a planet's per-layer absorption profile
    BuildProfile(commands::BuildProfileArgs),
    /// Run both transmission passes over a completed profile
    TransmissionPass(commands::TransmissionPassArgs),
    /// Look up the spectrum an observer sees at a height
    Transmit(commands::TransmitArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Slice(args) => commands::run_slice_command(args),
        CliCommand::Layer(args) => commands::run_layer_command(args),
        CliCommand::BuildProfile(args) => commands::run_build_profile_command(args),
        CliCommand::TransmissionPass(args) => commands::run_transmission_pass_command(args),
        CliCommand::Transmit(args) => commands::run_transmit_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(RadError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RadError> for CliError {
    fn from(error: RadError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_rad_error(&self) -> RadError {
        match self {
            Self::Usage(message) => RadError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => RadError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
