use crate::domain::{WindingError, WindingResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File patterns of everything a sweep writes into its artifact directory.
pub const ARTIFACT_GLOBS: [&str; 4] = ["*.fem", "*.ans", "*_sensor_*_T_*.json", "*_impedance_*.json"];

pub fn artifact_glob_set(patterns: &[&str]) -> WindingResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| {
            WindingError::internal(
                "SYS.CLEANUP_GLOB",
                format!("invalid artifact glob '{}': {}", pattern, source),
            )
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| {
        WindingError::internal(
            "SYS.CLEANUP_GLOB",
            format!("failed to build artifact glob set: {}", source),
        )
    })
}

/// Removes the given files, skipping ones that are already gone. Failures are
/// logged and skipped; returns how many files were deleted.
pub fn remove_artifacts<'a>(paths: impl IntoIterator<Item = &'a Path>) -> usize {
    let mut removed = 0;
    for path in paths {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted artifact");
                removed += 1;
            }
            Err(error) => warn!(path = %path.display(), %error, "failed to delete artifact"),
        }
    }
    removed
}

/// Deletes every generated artifact directly inside `directory`.
pub fn cleanup_directory(directory: &Path) -> WindingResult<usize> {
    if !directory.is_dir() {
        info!(directory = %directory.display(), "artifact directory does not exist");
        return Ok(0);
    }

    let globs = artifact_glob_set(&ARTIFACT_GLOBS)?;
    let entries = fs::read_dir(directory).map_err(|source| {
        WindingError::io_system(
            "IO.CLEANUP_READ_DIR",
            format!(
                "failed to list artifact directory '{}': {}",
                directory.display(),
                source
            ),
        )
    })?;

    let mut matched: Vec<PathBuf> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if path.is_file() && globs.is_match(file_name) {
            matched.push(path);
        }
    }
    matched.sort();

    let removed = remove_artifacts(matched.iter().map(PathBuf::as_path));
    info!(directory = %directory.display(), removed, "cleaned artifact directory");
    Ok(removed)
}
