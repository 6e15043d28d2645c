use super::definition::{attribute, finish};
use super::jobs::JobDescriptor;
use super::{CancellationToken, ProgressSink, SweepState};
use crate::common::constants::SENSOR_CIRCUIT;
use crate::domain::{Variant, VariantPair, WindingError, WindingResult};
use crate::solver::{BlockIntegral, Point, Query, SolverBackend, SolverSession};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::debug;

/// What one analysis job measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobResult {
    pub variant: Variant,
    pub sequence_index: usize,
    /// Requested applied flux density, in tesla.
    pub field_amplitude_applied: f64,
    /// Open-circuit sensor voltage magnitude, in volts.
    pub voltage_magnitude: f64,
    /// Mean axial flux density inside the core region, in tesla.
    pub core_flux_density: f64,
    pub source_path: PathBuf,
}

/// Opens `job`'s artifact, solves it and reads back the core flux density
/// and the sensor voltage.
pub fn analyze_job<B: SolverBackend>(
    backend: &B,
    job: &JobDescriptor,
    core_label: Point,
) -> WindingResult<RawJobResult> {
    let mut session = backend.open_document(job.artifact_path())?;
    let measured = measure(&mut session, core_label);
    let (core_flux_density, voltage_magnitude) = finish(session, measured)?;

    Ok(RawJobResult {
        variant: job.variant(),
        sequence_index: job.sequence_index(),
        field_amplitude_applied: job.field_amplitude(),
        voltage_magnitude,
        core_flux_density,
        source_path: job.artifact_path().to_path_buf(),
    })
}

fn measure<S: SolverSession>(session: &mut S, core_label: Point) -> WindingResult<(f64, f64)> {
    session.solve()?;
    let values = session.query(&[
        Query::BlockIntegral {
            block: core_label,
            integral: BlockIntegral::Volume,
        },
        Query::BlockIntegral {
            block: core_label,
            integral: BlockIntegral::AxialFluxDensity,
        },
        Query::CircuitProperties {
            circuit: SENSOR_CIRCUIT.to_string(),
        },
    ])?;
    let [volume, flux, circuit] = values.as_slice() else {
        return Err(WindingError::solver(
            "RUN.SOLVER_QUERY_COUNT",
            format!("expected 3 query values, got {}", values.len()),
        ));
    };

    let volume = volume.into_complex()?;
    if volume.norm() <= 0.0 {
        return Err(WindingError::solver(
            "RUN.SOLVER_ZERO_VOLUME",
            "core block has zero volume",
        ));
    }
    let core_flux_density = (flux.into_complex()? / volume).norm();
    let voltage_magnitude = circuit.into_circuit()?.voltage.norm();
    Ok((core_flux_density, voltage_magnitude))
}

/// Runs every job on a pool of `workers` threads, each task with its own
/// session. Results are collected on the calling thread in completion order
/// and returned per variant in sequence order. Any failed task fails the
/// whole dispatch; the error of the earliest submitted failing job is
/// returned.
pub fn dispatch_jobs<B: SolverBackend>(
    backend: &B,
    jobs: &[JobDescriptor],
    core_label: Point,
    workers: usize,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
    mut on_state: impl FnMut(SweepState),
) -> WindingResult<VariantPair<Vec<RawJobResult>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|source| {
            WindingError::internal(
                "SYS.WORKER_POOL",
                format!("failed to build worker pool: {}", source),
            )
        })?;

    let total = jobs.len();
    let mut outcomes: Vec<Option<WindingResult<RawJobResult>>> = vec![None; total];
    pool.in_place_scope(|scope| {
        let (sender, receiver) = mpsc::channel();
        for (index, job) in jobs.iter().enumerate() {
            let sender = sender.clone();
            scope.spawn(move |_| {
                let outcome = if cancel.is_cancelled() {
                    Err(WindingError::cancelled(format!(
                        "{} job at {:e} T abandoned before it started",
                        job.variant(),
                        job.field_amplitude()
                    )))
                } else {
                    analyze_job(backend, job, core_label).map_err(|error| attribute(job, error))
                };
                // The receiver outlives every task in this scope.
                let _ = sender.send((index, outcome));
            });
        }
        drop(sender);
        on_state(SweepState::Collecting);

        let mut completed = 0;
        for (index, outcome) in receiver {
            if let (Ok(result), Some(job)) = (&outcome, jobs.get(index)) {
                completed += 1;
                debug!(
                    variant = %result.variant,
                    index = result.sequence_index,
                    field = result.field_amplitude_applied,
                    core_field = result.core_flux_density,
                    voltage = result.voltage_magnitude,
                    "job finished"
                );
                progress.job_completed(completed, total, job);
            }
            if let Some(slot) = outcomes.get_mut(index) {
                *slot = Some(outcome);
            }
        }
    });

    let mut lineages: VariantPair<Vec<RawJobResult>> = VariantPair::default();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        let result = outcome.ok_or_else(|| {
            WindingError::internal(
                "SYS.DISPATCH_LOST_RESULT",
                format!("job {} never reported a result", index),
            )
        })??;
        lineages.get_mut(result.variant).push(result);
    }
    for variant in Variant::ALL {
        lineages
            .get_mut(variant)
            .sort_by_key(|result| result.sequence_index);
    }
    Ok(lineages)
}
