use super::jobs::JobDescriptor;
use crate::common::constants::TRANSMITTER_CIRCUIT;
use crate::domain::{FailedJob, WindingError, WindingErrorCategory, WindingResult};
use crate::geometry::{CoilGeometry, HelmholtzSource};
use crate::solver::scene::{SceneObject, write_definition};
use crate::solver::{ProblemDefinition, SolverBackend, SolverSession};
use std::path::Path;
use tracing::debug;

/// Ties a session failure to the job it happened in. Whatever the session
/// reported (solver, I/O or query shape) surfaces as a solver task error
/// naming the job; cancellation and collisions keep their own category.
pub(crate) fn attribute(job: &JobDescriptor, error: WindingError) -> WindingError {
    if error.failed_job().is_some()
        || matches!(
            error.category(),
            WindingErrorCategory::CancelledError | WindingErrorCategory::ArtifactCollisionError
        )
    {
        return error;
    }
    WindingError::solver_task(
        FailedJob {
            variant: job.variant(),
            field_amplitude: job.field_amplitude(),
            artifact: job.artifact_path().to_path_buf(),
        },
        format!("[{}] {}", error.placeholder(), error.message()),
    )
}

/// Closes `session` whether or not `outcome` succeeded; the first error wins.
pub(crate) fn finish<S: SolverSession, T>(session: S, outcome: WindingResult<T>) -> WindingResult<T> {
    let closed = session.close();
    let value = outcome?;
    closed?;
    Ok(value)
}

/// Draws the full model of `coil` inside `source` and persists it as the
/// base artifact of `job`'s lineage.
pub fn define_base<B: SolverBackend>(
    backend: &B,
    problem: &ProblemDefinition,
    coil: &CoilGeometry,
    source: &HelmholtzSource,
    job: &JobDescriptor,
) -> WindingResult<()> {
    let objects: [&dyn SceneObject; 2] = [coil, source];
    let outcome = backend.new_document().and_then(|mut session| {
        let written = write_definition(&mut session, problem, &objects, job.artifact_path());
        finish(session, written)
    });
    outcome.map_err(|error| attribute(job, error))?;
    debug!(
        variant = %job.variant(),
        field = job.field_amplitude(),
        artifact = %job.artifact_path().display(),
        "defined base artifact"
    );
    Ok(())
}

/// Clones the base artifact under `job`'s name with only the transmitter
/// current changed. The base file itself is never rewritten.
pub fn patch_excitation<B: SolverBackend>(
    backend: &B,
    base: &Path,
    source: &HelmholtzSource,
    job: &JobDescriptor,
) -> WindingResult<()> {
    let outcome = backend.open_document(base).and_then(|mut session| {
        let patched = session
            .set_circuit_excitation(TRANSMITTER_CIRCUIT, source.current())
            .and_then(|()| session.persist(job.artifact_path()));
        finish(session, patched)
    });
    outcome.map_err(|error| attribute(job, error))?;
    debug!(
        variant = %job.variant(),
        field = job.field_amplitude(),
        current = source.current(),
        artifact = %job.artifact_path().display(),
        "patched transmitter excitation"
    );
    Ok(())
}
