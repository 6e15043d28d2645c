use super::definition::finish;
use super::jobs::JobStore;
use crate::common::cleanup::remove_artifacts;
use crate::common::constants::{SENSOR_CIRCUIT, TRANSMITTER_CIRCUIT, TWO_PI};
use crate::domain::{Variant, VariantPair, WindingError, WindingErrorCategory, WindingResult};
use crate::geometry::material::sensor_wire;
use crate::solver::{Query, SolverBackend, SolverSession};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Series resistance and inductance of the sensor winding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impedance {
    /// Ohms.
    pub resistance: f64,
    /// Henries.
    pub inductance: f64,
}

impl Impedance {
    pub fn from_voltage(voltage: Complex64, current: f64, frequency: f64) -> Self {
        Self {
            resistance: voltage.re / current,
            inductance: voltage.im / (TWO_PI * frequency * current),
        }
    }
}

/// Drives the sensor winding of existing base artifacts with a small probe
/// current and reads its terminal voltage. Each extraction works on a
/// disposable copy and never rewrites the base artifact.
pub struct ExtractionPipeline<'a, B: SolverBackend> {
    backend: &'a B,
    frequency: f64,
    probe_current: f64,
    conductor_diameter: f64,
}

impl<'a, B: SolverBackend> ExtractionPipeline<'a, B> {
    pub fn new(backend: &'a B, frequency: f64, probe_current: f64, conductor_diameter: f64) -> Self {
        Self {
            backend,
            frequency,
            probe_current,
            conductor_diameter,
        }
    }

    /// Extracts R and L of one variant using `scratch` as the disposable
    /// artifact. `scratch` and its solution file are removed afterwards.
    pub fn extract(&self, variant: Variant, base: &Path, scratch: &Path) -> WindingResult<Impedance> {
        let voltage = self.probe_voltage(base, scratch);
        let mut disposable = vec![scratch.to_path_buf()];
        disposable.extend(self.backend.solution_artifact(scratch));
        remove_artifacts(disposable.iter().map(|path| path.as_path()));

        let voltage = voltage.map_err(|error| match error.category() {
            WindingErrorCategory::CancelledError | WindingErrorCategory::ExtractionError => error,
            _ => WindingError::extraction(
                variant,
                format!("[{}] {}", error.placeholder(), error.message()),
            ),
        })?;
        if !(voltage.re.is_finite() && voltage.im.is_finite()) {
            return Err(WindingError::extraction(
                variant,
                format!("sensor voltage {} is not finite", voltage),
            ));
        }

        let impedance = Impedance::from_voltage(voltage, self.probe_current, self.frequency);
        info!(
            %variant,
            resistance = impedance.resistance,
            inductance = impedance.inductance,
            "extracted sensor impedance"
        );
        Ok(impedance)
    }

    /// Extracts both variants in sequence, air first.
    pub fn extract_pair(
        &self,
        store: &mut JobStore,
        bases: VariantPair<&Path>,
    ) -> WindingResult<VariantPair<Impedance>> {
        let air_scratch = store.scratch_artifact(Variant::Air)?;
        let air = self.extract(Variant::Air, bases.air, &air_scratch)?;
        let core_scratch = store.scratch_artifact(Variant::Core)?;
        let core = self.extract(Variant::Core, bases.core, &core_scratch)?;
        Ok(VariantPair::new(air, core))
    }

    fn probe_voltage(&self, base: &Path, scratch: &Path) -> WindingResult<Complex64> {
        let mut session = self.backend.open_document(base)?;
        let measured = self.drive_and_measure(&mut session, scratch);
        finish(session, measured)
    }

    fn drive_and_measure(&self, session: &mut B::Session, scratch: &Path) -> WindingResult<Complex64> {
        session.set_circuit_excitation(TRANSMITTER_CIRCUIT, 0.0)?;
        session.set_circuit_excitation(SENSOR_CIRCUIT, self.probe_current)?;
        session.add_material(&sensor_wire(self.conductor_diameter))?;
        session.persist(scratch)?;
        session.solve()?;
        let values = session.query(&[Query::CircuitProperties {
            circuit: SENSOR_CIRCUIT.to_string(),
        }])?;
        let circuit = values.first().copied().ok_or_else(|| {
            WindingError::solver("RUN.SOLVER_QUERY_COUNT", "no sensor circuit value returned")
        })?;
        Ok(circuit.into_circuit()?.voltage)
    }
}
