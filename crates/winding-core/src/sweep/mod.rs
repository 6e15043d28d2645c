//! Field sweep orchestration.
//!
//! A sweep defines one base artifact per variant at the first field point,
//! clones it with a re-driven transmitter for every further point, solves
//! all 2N jobs on a worker pool, extracts the sensor impedance from the two
//! base artifacts and reduces everything into one [`SweepResult`].

pub mod aggregate;
pub mod definition;
pub mod dispatch;
pub mod extraction;
pub mod jobs;

pub use aggregate::{ResultAggregator, SweepLabel, SweepResult};
pub use dispatch::RawJobResult;
pub use extraction::{ExtractionPipeline, Impedance};
pub use jobs::{JobDescriptor, JobStore};

use crate::common::cleanup::remove_artifacts;
use crate::common::config::SweepConfig;
use crate::domain::{Variant, VariantPair, WindingError, WindingResult};
use crate::geometry::{CoilGeometry, HelmholtzSource};
use crate::solver::SolverBackend;
use definition::{define_base, patch_excitation};
use dispatch::dispatch_jobs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Init,
    Defining,
    Dispatched,
    Collecting,
    Done,
    Failed,
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> WindingResult<()> {
        if self.is_cancelled() {
            return Err(WindingError::cancelled("sweep cancelled"));
        }
        Ok(())
    }
}

/// Receives sweep progress. `completed` counts successful jobs and increases
/// by one per call; failed jobs are not reported.
pub trait ProgressSink: Send + Sync {
    fn job_completed(&self, completed: usize, total: usize, job: &JobDescriptor);

    fn state_changed(&self, _state: SweepState) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn job_completed(&self, completed: usize, total: usize, job: &JobDescriptor) {
        info!(
            variant = %job.variant(),
            field = job.field_amplitude(),
            "completed {} of {}",
            completed,
            total
        );
    }
}

fn transition(state: &mut SweepState, progress: &dyn ProgressSink, next: SweepState) {
    debug!(from = ?*state, to = ?next, "sweep state changed");
    *state = next;
    progress.state_changed(next);
}

pub struct SweepOrchestrator<B: SolverBackend> {
    backend: B,
    config: SweepConfig,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressSink>,
    state: SweepState,
}

impl<B: SolverBackend> SweepOrchestrator<B> {
    pub fn new(backend: B, config: SweepConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancellationToken::new(),
            progress: Arc::new(LogProgress),
            state: SweepState::Init,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs a complete sweep of `geometry`. A failed sweep leaves the
    /// orchestrator in [`SweepState::Failed`] and produces no result.
    pub fn run(&mut self, geometry: &CoilGeometry) -> WindingResult<SweepResult> {
        self.state = SweepState::Init;
        info!(
            name = geometry.name(),
            material = geometry.core_material(),
            turns = geometry.turns(),
            backend = self.backend.name(),
            points = self.config.num_points,
            "starting sweep"
        );
        let outcome = self.execute(geometry);
        let progress = Arc::clone(&self.progress);
        match &outcome {
            Ok(result) => {
                transition(&mut self.state, progress.as_ref(), SweepState::Done);
                info!(
                    name = result.name(),
                    sensitivity = result.sensitivity_stats().mean,
                    mu_eff = result.effective_permeability_stats().mean,
                    "sweep finished"
                );
            }
            Err(error) => {
                transition(&mut self.state, progress.as_ref(), SweepState::Failed);
                warn!(
                    category = error.category().as_str(),
                    placeholder = error.placeholder(),
                    "sweep failed: {}",
                    error.message()
                );
            }
        }
        outcome
    }

    fn execute(&mut self, geometry: &CoilGeometry) -> WindingResult<SweepResult> {
        let Self {
            backend,
            config,
            cancel,
            progress,
            state,
        } = self;
        let backend: &B = backend;
        let config: &SweepConfig = config;
        let cancel: &CancellationToken = cancel;
        let progress: &dyn ProgressSink = &**progress;

        config.validate()?;
        let fields = config.field_points();
        let Some(&first_field) = fields.first() else {
            return Err(WindingError::input_validation(
                "INPUT.SWEEP_POINTS",
                "a sweep needs at least one field point",
            ));
        };

        transition(state, progress, SweepState::Defining);
        let mut store = JobStore::new(&config.artifact_dir, backend.artifact_extension(), geometry)?;
        let problem = config.problem_definition();
        let source = HelmholtzSource::for_coil(geometry, first_field, config.frequency, config.units)?;
        info!(
            radius = source.radius(),
            current = source.current(),
            "defining base artifacts"
        );
        for variant in Variant::ALL {
            cancel.check()?;
            let base = store.create_job(variant, first_field)?;
            define_base(backend, &problem, &geometry.variant(variant), &source, &base)?;
        }

        let bases = base_paths(&store)?;
        for variant in Variant::ALL {
            for &field in &fields[1..] {
                cancel.check()?;
                let job = store.create_job(variant, field)?;
                let driven = source.with_field(field)?;
                patch_excitation(backend, bases.get(variant), &driven, &job)?;
            }
        }

        cancel.check()?;
        transition(state, progress, SweepState::Dispatched);
        let jobs: Vec<JobDescriptor> = store.jobs().cloned().collect();
        let workers = config.worker_count();
        info!(jobs = jobs.len(), workers, "dispatching analysis jobs");
        let raw = dispatch_jobs(
            backend,
            &jobs,
            geometry.core_label(),
            workers,
            cancel,
            progress,
            |next| transition(state, progress, next),
        )?;

        cancel.check()?;
        let pipeline = ExtractionPipeline::new(
            backend,
            config.frequency,
            config.probe_current,
            geometry.conductor_diameter(),
        );
        let impedance = pipeline.extract_pair(
            &mut store,
            VariantPair::new(bases.air.as_path(), bases.core.as_path()),
        )?;

        let result = ResultAggregator::reduce(
            SweepLabel {
                name: geometry.name().to_string(),
                core_material: geometry.core_material().to_string(),
                turns: geometry.turns(),
                frequency: config.frequency,
            },
            raw,
            impedance,
        )?;

        if config.cleanup {
            let mut generated: Vec<PathBuf> = Vec::with_capacity(jobs.len() * 2);
            for job in &jobs {
                generated.push(job.artifact_path().to_path_buf());
                generated.extend(backend.solution_artifact(job.artifact_path()));
            }
            let removed = remove_artifacts(generated.iter().map(PathBuf::as_path));
            info!(removed, directory = %store.directory().display(), "cleaned up sweep artifacts");
        }
        Ok(result)
    }
}

fn base_paths(store: &JobStore) -> WindingResult<VariantPair<PathBuf>> {
    let base = |variant: Variant| {
        store
            .base(variant)
            .map(|job| job.artifact_path().to_path_buf())
            .ok_or_else(|| {
                WindingError::internal(
                    "SYS.MISSING_BASE",
                    format!("no base artifact was defined for the {} variant", variant),
                )
            })
    };
    Ok(VariantPair::new(base(Variant::Air)?, base(Variant::Core)?))
}

/// Extracts R and L from two existing base artifacts without running a sweep.
pub fn extract_impedance<B: SolverBackend>(
    backend: &B,
    geometry: &CoilGeometry,
    config: &SweepConfig,
    bases: VariantPair<&Path>,
) -> WindingResult<VariantPair<Impedance>> {
    config.validate()?;
    let mut store = JobStore::new(&config.artifact_dir, backend.artifact_extension(), geometry)?;
    ExtractionPipeline::new(
        backend,
        config.frequency,
        config.probe_current,
        geometry.conductor_diameter(),
    )
    .extract_pair(&mut store, bases)
}

#[cfg(test)]
mod tests {
    use super::{CancellationToken, LogProgress, ProgressSink, SweepOrchestrator, SweepState};
    use crate::common::config::SweepConfig;
    use crate::domain::{Variant, WindingErrorCategory};
    use crate::geometry::{CoilGeometry, CoilSpec};
    use crate::solver::analytic::AnalyticBackend;
    use crate::sweep::jobs::JobDescriptor;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct StateLog {
        states: Mutex<Vec<SweepState>>,
    }

    impl ProgressSink for StateLog {
        fn job_completed(&self, _completed: usize, _total: usize, _job: &JobDescriptor) {}

        fn state_changed(&self, state: SweepState) {
            if let Ok(mut states) = self.states.lock() {
                states.push(state);
            }
        }
    }

    fn config(temp: &TempDir) -> SweepConfig {
        SweepConfig {
            artifact_dir: temp.path().to_path_buf(),
            workers: Some(2),
            ..SweepConfig::default()
        }
    }

    #[test]
    fn successful_sweep_walks_every_state() {
        let temp = TempDir::new().expect("tempdir should be created");
        let log = Arc::new(StateLog::default());
        let mut orchestrator = SweepOrchestrator::new(AnalyticBackend::new(), config(&temp))
            .with_progress(log.clone());
        let geometry = CoilGeometry::new(CoilSpec::default()).expect("geometry");

        let result = orchestrator.run(&geometry).expect("sweep should succeed");
        assert_eq!(result.len(), 3);
        assert_eq!(orchestrator.state(), SweepState::Done);
        assert_eq!(
            *log.states.lock().expect("lock"),
            vec![
                SweepState::Defining,
                SweepState::Dispatched,
                SweepState::Collecting,
                SweepState::Done
            ]
        );
        assert_eq!(result.artifacts(Variant::Air).len(), 3);
    }

    #[test]
    fn cancelled_sweep_fails_without_a_result() {
        let temp = TempDir::new().expect("tempdir should be created");
        let token = CancellationToken::new();
        let mut orchestrator = SweepOrchestrator::new(AnalyticBackend::new(), config(&temp))
            .with_cancellation(token.clone())
            .with_progress(Arc::new(LogProgress));
        token.cancel();

        let geometry = CoilGeometry::new(CoilSpec::default()).expect("geometry");
        let error = orchestrator.run(&geometry).expect_err("cancelled sweep should fail");
        assert_eq!(error.category(), WindingErrorCategory::CancelledError);
        assert_eq!(orchestrator.state(), SweepState::Failed);
        assert!(orchestrator.cancellation().is_cancelled());
    }

    #[test]
    fn invalid_config_fails_before_defining() {
        let temp = TempDir::new().expect("tempdir should be created");
        let log = Arc::new(StateLog::default());
        let mut orchestrator = SweepOrchestrator::new(
            AnalyticBackend::new(),
            SweepConfig {
                frequency: 0.0,
                ..config(&temp)
            },
        )
        .with_progress(log.clone());

        let geometry = CoilGeometry::new(CoilSpec::default()).expect("geometry");
        let error = orchestrator.run(&geometry).expect_err("invalid config should fail");
        assert_eq!(error.placeholder(), "INPUT.SWEEP_FREQUENCY");
        assert_eq!(*log.states.lock().expect("lock"), vec![SweepState::Failed]);
    }

    #[test]
    fn cleanup_removes_job_artifacts() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut orchestrator = SweepOrchestrator::new(
            AnalyticBackend::new(),
            SweepConfig {
                cleanup: true,
                ..config(&temp)
            },
        );
        let geometry = CoilGeometry::new(CoilSpec::default()).expect("geometry");
        let result = orchestrator.run(&geometry).expect("sweep should succeed");

        for variant in Variant::ALL {
            assert!(result.artifacts(variant).iter().all(|path| !path.exists()));
        }
        let leftovers = std::fs::read_dir(temp.path()).expect("dir").count();
        assert_eq!(leftovers, 0);
    }
}
