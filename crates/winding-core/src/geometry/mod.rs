//! Coil and transmitter geometry: validated values plus their scene
//! descriptions.

pub mod coil;
pub mod helmholtz;
pub mod material;

pub use coil::{CoilGeometry, CoilSpec, WindingLayout};
pub use helmholtz::HelmholtzSource;

use crate::domain::WindingError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum GeometryFileError {
    #[error("failed to read geometry '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse geometry '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("geometry '{}' is invalid: {source}", path.display())]
    Invalid { path: PathBuf, source: WindingError },
}

impl From<GeometryFileError> for WindingError {
    fn from(error: GeometryFileError) -> Self {
        match error {
            GeometryFileError::Read { .. } => {
                WindingError::io_system("IO.GEOMETRY_FILE", error.to_string())
            }
            GeometryFileError::Parse { .. } => {
                WindingError::input_validation("INPUT.GEOMETRY_FILE", error.to_string())
            }
            GeometryFileError::Invalid { source, .. } => source,
        }
    }
}

/// Reads a JSON [`CoilSpec`] and validates it. Missing keys take the
/// reference-coil defaults.
pub fn load_geometry(path: impl AsRef<Path>) -> Result<CoilGeometry, GeometryFileError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| GeometryFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec: CoilSpec = serde_json::from_str(&source).map_err(|source| GeometryFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    CoilGeometry::new(spec).map_err(|source| GeometryFileError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}
