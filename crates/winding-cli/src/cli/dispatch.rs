use super::CliError;
use std::path::PathBuf;
use winding_core::solver::SolverBackend;
use winding_core::solver::analytic::AnalyticBackend;
use winding_core::solver::femm::{FemmBackend, FemmConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum BackendKind {
    /// Closed-form reference solver; needs no external program
    Analytic,
    /// FEMM 4.2 driven through generated Lua scripts
    Femm,
}

#[derive(clap::Args, Debug)]
pub(super) struct BackendArgs {
    /// Solver backend used for every session
    #[arg(long, global = true, value_enum, default_value_t = BackendKind::Analytic)]
    backend: BackendKind,

    /// FEMM executable
    #[arg(long, global = true, value_name = "PATH")]
    femm_executable: Option<PathBuf>,

    /// Program that launches FEMM, for example `wine`
    #[arg(long, global = true, value_name = "PATH")]
    femm_launcher: Option<PathBuf>,

    /// Show the FEMM window while scripts run
    #[arg(long, global = true)]
    femm_show_window: bool,

    /// Directory for generated FEMM scripts and query output
    #[arg(long, global = true, value_name = "DIR")]
    femm_scratch_dir: Option<PathBuf>,
}

/// A command that runs against whichever backend was selected.
pub(super) trait BackendCommand {
    fn run<B: SolverBackend>(self, backend: B) -> Result<i32, CliError>;
}

impl BackendArgs {
    pub(super) fn kind(&self) -> BackendKind {
        self.backend
    }

    pub(super) fn femm_config(&self) -> FemmConfig {
        let defaults = FemmConfig::default();
        FemmConfig {
            executable: self
                .femm_executable
                .clone()
                .unwrap_or(defaults.executable),
            launcher: self.femm_launcher.clone().or(defaults.launcher),
            hide_window: !self.femm_show_window,
            scratch_dir: self.femm_scratch_dir.clone().or(defaults.scratch_dir),
        }
    }

    pub(super) fn run<C: BackendCommand>(self, command: C) -> Result<i32, CliError> {
        match self.kind() {
            BackendKind::Analytic => command.run(AnalyticBackend::new()),
            BackendKind::Femm => command.run(FemmBackend::new(self.femm_config())),
        }
    }
}
