mod commands;
mod dispatch;
mod helpers;

use clap::Parser;
use dispatch::BackendArgs;
use winding_core::domain::WindingError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let compatibility_error = error.as_winding_error();
            eprintln!("{}", compatibility_error.diagnostic_line());
            eprintln!("{}", compatibility_error.fatal_exit_line());
            compatibility_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("winding-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_tracing(cli.log_level.as_deref());
            dispatch_parsed(cli.backend, cli.command)
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

#[derive(Parser)]
#[command(
    name = "winding-rs",
    version,
    about = "Helmholtz field sweeps of inductive magnetic sensor coils"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (for example `debug` or `winding_core=trace`)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Sweep the applied field over an air and a core variant and export the result
    Sweep(commands::SweepArgs),
    /// Print the resolved turn count and winding layout of a geometry
    Turns(commands::TurnsArgs),
    /// Extract sensor resistance and inductance from two existing base artifacts
    Extract(commands::ExtractArgs),
    /// Delete generated solver artifacts from a directory
    Cleanup(commands::CleanupArgs),
}

fn dispatch_parsed(backend: BackendArgs, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Sweep(args) => backend.run(args),
        CliCommand::Turns(args) => commands::run_turns_command(args),
        CliCommand::Extract(args) => backend.run(args),
        CliCommand::Cleanup(args) => commands::run_cleanup_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(WindingError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<WindingError> for CliError {
    fn from(error: WindingError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_winding_error(&self) -> WindingError {
        match self {
            Self::Usage(message) => {
                WindingError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => WindingError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
