//! Sweep configuration accepted at sweep start.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "frequency": 1000.0, "fieldStart": 1e-6, "fieldEnd": 5e-6, "numPoints": 10 }
//! ```

use crate::domain::{WindingError, WindingResult};
use crate::numerics::linspace;
use crate::solver::{LengthUnit, ProblemDefinition, ProblemSymmetry};

use super::constants::DEFAULT_PROBE_CURRENT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTIFACT_DIR: &str = "temp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SweepConfig {
    /// Excitation frequency in Hz.
    pub frequency: f64,
    /// First applied flux density of the sweep, in tesla.
    pub field_start: f64,
    /// Last applied flux density of the sweep, in tesla.
    pub field_end: f64,
    pub num_points: usize,
    pub units: LengthUnit,
    pub symmetry: ProblemSymmetry,
    /// Solver convergence precision.
    pub precision: f64,
    /// Problem depth; zero for axisymmetric problems.
    pub depth: f64,
    /// Minimum mesh angle constraint in degrees.
    pub min_angle: f64,
    /// Delete generated artifacts after a successful sweep.
    pub cleanup: bool,
    pub artifact_dir: PathBuf,
    /// Worker pool size; all available parallelism when unset.
    pub workers: Option<usize>,
    /// Sensor current used by the impedance extraction pass, in amperes.
    pub probe_current: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            frequency: 1.0e3,
            field_start: 1.0e-6,
            field_end: 3.0e-6,
            num_points: 3,
            units: LengthUnit::Millimeters,
            symmetry: ProblemSymmetry::Axisymmetric,
            precision: 1.0e-8,
            depth: 0.0,
            min_angle: 30.0,
            cleanup: false,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            workers: None,
            probe_current: DEFAULT_PROBE_CURRENT,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> WindingResult<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_FREQUENCY",
                format!("frequency must be positive and finite, got {}", self.frequency),
            ));
        }
        if self.num_points == 0 {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_POINTS",
                "a sweep needs at least one field point",
            ));
        }
        if !(self.field_start.is_finite() && self.field_start > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_FIELD_RANGE",
                format!(
                    "field start must be a positive flux density, got {}",
                    self.field_start
                ),
            ));
        }
        if self.num_points > 1 && !(self.field_end.is_finite() && self.field_end > self.field_start)
        {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_FIELD_RANGE",
                format!(
                    "field range must be strictly increasing for {} points, got {} T to {} T",
                    self.num_points, self.field_start, self.field_end
                ),
            ));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_PRECISION",
                format!("solver precision must be positive, got {}", self.precision),
            ));
        }
        if !(self.min_angle.is_finite() && self.min_angle > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_MIN_ANGLE",
                format!("angular constraint must be positive, got {}", self.min_angle),
            ));
        }
        if !(self.depth.is_finite() && self.depth >= 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_DEPTH",
                format!("problem depth must be non-negative, got {}", self.depth),
            ));
        }
        if self.workers == Some(0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_WORKERS",
                "worker count must be at least one",
            ));
        }
        if !(self.probe_current.is_finite() && self.probe_current > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_PROBE_CURRENT",
                format!(
                    "probe current must be positive, got {}",
                    self.probe_current
                ),
            ));
        }
        Ok(())
    }

    /// Requested applied flux densities in ascending order.
    pub fn field_points(&self) -> Vec<f64> {
        linspace(self.field_start, self.field_end, self.num_points)
    }

    pub fn problem_definition(&self) -> ProblemDefinition {
        ProblemDefinition {
            frequency: self.frequency,
            units: self.units,
            symmetry: self.symmetry,
            precision: self.precision,
            depth: self.depth,
            min_angle: self.min_angle,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SweepConfigError {
    #[error("failed to read sweep config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse sweep config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<SweepConfigError> for WindingError {
    fn from(error: SweepConfigError) -> Self {
        match error {
            SweepConfigError::Read { .. } => {
                WindingError::io_system("IO.SWEEP_CONFIG", error.to_string())
            }
            SweepConfigError::Parse { .. } => {
                WindingError::input_validation("INPUT.SWEEP_CONFIG", error.to_string())
            }
        }
    }
}

pub fn load_sweep_config(config_path: impl AsRef<Path>) -> Result<SweepConfig, SweepConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| SweepConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| SweepConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}
