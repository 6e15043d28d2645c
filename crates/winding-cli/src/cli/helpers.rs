use super::CliError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use winding_core::common::config::{SweepConfig, load_sweep_config};
use winding_core::domain::WindingError;
use winding_core::geometry::{CoilGeometry, CoilSpec, load_geometry};

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--log-level`.
pub(super) fn init_tracing(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A subscriber may already be installed when the CLI runs in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn current_working_dir() -> Result<PathBuf, CliError> {
    std::env::current_dir()
        .context("failed to read current working directory")
        .map_err(CliError::Internal)
}

pub(super) fn resolve_cli_path(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Loads the geometry file, or the reference air coil when none is given.
pub(super) fn load_geometry_arg(path: Option<&Path>) -> Result<CoilGeometry, CliError> {
    match path {
        Some(path) => load_geometry(path).map_err(|error| CliError::Compute(error.into())),
        None => CoilGeometry::new(CoilSpec::default()).map_err(CliError::Compute),
    }
}

pub(super) fn load_config_arg(path: Option<&Path>) -> Result<SweepConfig, CliError> {
    match path {
        Some(path) => load_sweep_config(path)
            .map_err(|error| CliError::Compute(WindingError::from(error))),
        None => Ok(SweepConfig::default()),
    }
}

pub(super) fn format_engineering(value: f64, unit: &str) -> String {
    const PREFIXES: [(f64, &str); 7] = [
        (1.0e9, "G"),
        (1.0e6, "M"),
        (1.0e3, "k"),
        (1.0, ""),
        (1.0e-3, "m"),
        (1.0e-6, "u"),
        (1.0e-9, "n"),
    ];
    let magnitude = value.abs();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return format!("{} {}", value, unit);
    }
    let (scale, prefix) = PREFIXES
        .iter()
        .copied()
        .find(|(scale, _)| magnitude >= *scale)
        .unwrap_or((1.0e-12, "p"));
    format!("{:.4} {}{}", value / scale, prefix, unit)
}

#[cfg(test)]
mod tests {
    use super::{format_engineering, load_config_arg, load_geometry_arg, resolve_cli_path};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[test]
    fn relative_paths_resolve_against_the_working_directory() {
        let working_dir = Path::new("/work");
        assert_eq!(
            resolve_cli_path(working_dir, Path::new("out")),
            PathBuf::from("/work/out")
        );
        assert_eq!(
            resolve_cli_path(working_dir, Path::new("/abs/out")),
            PathBuf::from("/abs/out")
        );
    }

    #[test]
    fn missing_arguments_fall_back_to_defaults() {
        let geometry = load_geometry_arg(None).expect("default geometry");
        assert_eq!(geometry.turns(), 1);
        let config = load_config_arg(None).expect("default config");
        assert_eq!(config.num_points, 3);
    }

    #[test]
    fn invalid_geometry_files_surface_as_compute_errors() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("coil.json");
        fs::write(&path, r#"{ "odc": 5.0, "ids": 6.0 }"#).expect("geometry should be written");
        let error = load_geometry_arg(Some(&path)).expect_err("mismatched core should fail");
        assert_eq!(
            error.as_winding_error().placeholder(),
            "INPUT.GEOMETRY_CORE_DIAMETER"
        );
    }

    #[test]
    fn engineering_format_picks_a_prefix() {
        assert_eq!(format_engineering(4.15e-6, "H"), "4.1500 uH");
        assert_eq!(format_engineering(0.069, "Ohm"), "69.0000 mOhm");
        assert_eq!(format_engineering(0.0, "V"), "0 V");
    }
}
