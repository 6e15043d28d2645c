use super::CliError;
use super::dispatch::BackendCommand;
use super::helpers::*;
use std::path::PathBuf;
use tracing::debug;
use winding_core::common::cleanup::cleanup_directory;
use winding_core::common::config::SweepConfig;
use winding_core::domain::{Variant, VariantPair};
use winding_core::solver::SolverBackend;
use winding_core::sweep::{Impedance, SweepOrchestrator, extract_impedance};

#[derive(clap::Args)]
pub(super) struct GeometryFlags {
    /// Coil geometry JSON; the reference 1 m single-turn air coil when omitted
    #[arg(long, value_name = "PATH")]
    geometry: Option<PathBuf>,

    /// Sweep configuration JSON; built-in defaults when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for generated solver artifacts (overrides the config)
    #[arg(long, value_name = "DIR")]
    artifact_dir: Option<PathBuf>,
}

impl GeometryFlags {
    fn load_config(&self) -> Result<SweepConfig, CliError> {
        let mut config = load_config_arg(self.config.as_deref())?;
        if let Some(artifact_dir) = &self.artifact_dir {
            config.artifact_dir = artifact_dir.clone();
        }
        let working_dir = current_working_dir()?;
        config.artifact_dir = resolve_cli_path(&working_dir, &config.artifact_dir);
        Ok(config)
    }
}

#[derive(clap::Args)]
pub(super) struct SweepArgs {
    #[command(flatten)]
    inputs: GeometryFlags,

    /// Directory the result JSON is written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Number of field points (overrides the config)
    #[arg(long)]
    points: Option<usize>,

    /// Worker threads for the analysis jobs (overrides the config)
    #[arg(long)]
    workers: Option<usize>,

    /// Delete generated solver artifacts after a successful sweep
    #[arg(long)]
    cleanup: bool,
}

#[derive(clap::Args)]
pub(super) struct TurnsArgs {
    /// Coil geometry JSON; the reference 1 m single-turn air coil when omitted
    #[arg(long, value_name = "PATH")]
    geometry: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ExtractArgs {
    #[command(flatten)]
    inputs: GeometryFlags,

    /// Base artifact of the air variant
    #[arg(long, value_name = "PATH")]
    air: PathBuf,

    /// Base artifact of the core variant
    #[arg(long, value_name = "PATH")]
    core: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CleanupArgs {
    /// Directory holding generated artifacts
    #[arg(value_name = "DIR", default_value = "temp")]
    directory: PathBuf,
}

impl BackendCommand for SweepArgs {
    fn run<B: SolverBackend>(self, backend: B) -> Result<i32, CliError> {
        let geometry = load_geometry_arg(self.inputs.geometry.as_deref())?;
        let mut config = self.inputs.load_config()?;
        if let Some(points) = self.points {
            config.num_points = points;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config.cleanup |= self.cleanup;
        debug!(
            backend = backend.name(),
            artifact_dir = %config.artifact_dir.display(),
            "resolved sweep inputs"
        );

        let mut orchestrator = SweepOrchestrator::new(backend, config);
        let result = orchestrator.run(&geometry)?;
        let output = resolve_cli_path(&current_working_dir()?, &self.output);
        let path = result.export_json(&output)?;

        let sensitivity = result.sensitivity_stats();
        let permeability = result.effective_permeability_stats();
        println!(
            "Sweep '{}' ({} turns, {} core): {} points at {} Hz",
            result.name(),
            result.turns(),
            result.core_material(),
            result.len(),
            result.frequency()
        );
        println!(
            "  sensitivity: {:.6e} +/- {:.3e} V/(T Hz)",
            sensitivity.mean, sensitivity.std_dev
        );
        println!(
            "  effective permeability: {:.6} +/- {:.3e}",
            permeability.mean, permeability.std_dev
        );
        for variant in Variant::ALL {
            print_impedance(variant, result.impedance(variant));
        }
        println!("JSON result: {}", path.display());
        Ok(0)
    }
}

impl BackendCommand for ExtractArgs {
    fn run<B: SolverBackend>(self, backend: B) -> Result<i32, CliError> {
        let geometry = load_geometry_arg(self.inputs.geometry.as_deref())?;
        let config = self.inputs.load_config()?;
        let working_dir = current_working_dir()?;
        let air = resolve_cli_path(&working_dir, &self.air);
        let core = resolve_cli_path(&working_dir, &self.core);
        debug!(backend = backend.name(), air = %air.display(), core = %core.display(), "extracting impedance");

        let impedance = extract_impedance(
            &backend,
            &geometry,
            &config,
            VariantPair::new(air.as_path(), core.as_path()),
        )?;
        for variant in Variant::ALL {
            print_impedance(variant, *impedance.get(variant));
        }
        Ok(0)
    }
}

fn print_impedance(variant: Variant, impedance: Impedance) {
    println!(
        "  {:<4} R = {}, L = {}",
        variant,
        format_engineering(impedance.resistance, "Ohm"),
        format_engineering(impedance.inductance, "H")
    );
}

pub(super) fn run_turns_command(args: TurnsArgs) -> Result<i32, CliError> {
    let geometry = load_geometry_arg(args.geometry.as_deref())?;
    let layout = geometry.layout();
    println!("{}", geometry.name());
    println!("  turns: {}", geometry.turns());
    println!(
        "  layout: {} turns per layer x {} layers = {}",
        layout.turns_per_layer,
        layout.layers,
        layout.turns()
    );
    if geometry.turns_overridden() {
        println!("  explicit turn count overrides the layout estimate");
    }
    Ok(0)
}

pub(super) fn run_cleanup_command(args: CleanupArgs) -> Result<i32, CliError> {
    let directory = resolve_cli_path(&current_working_dir()?, &args.directory);
    let removed = cleanup_directory(&directory)?;
    println!("Removed {} artifact(s) from {}", removed, directory.display());
    Ok(0)
}
