use super::dispatch::RawJobResult;
use super::extraction::Impedance;
use super::jobs::artifact_timestamp;
use crate::common::serialization::{sanitize_file_component, write_json_artifact};
use crate::domain::{Variant, VariantPair, WindingError, WindingResult};
use crate::numerics::{SampleStatistics, elementwise_ratio, is_non_decreasing};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reduced outcome of one sweep. Vectors are ordered by ascending applied
/// field and share one length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    name: String,
    core_material: String,
    turns: u32,
    frequency: f64,
    applied_field: Vec<f64>,
    air_field: Vec<f64>,
    core_field: Vec<f64>,
    air_voltage: Vec<f64>,
    core_voltage: Vec<f64>,
    sensitivity: Vec<f64>,
    sensitivity_stats: SampleStatistics,
    effective_permeability: Vec<f64>,
    effective_permeability_stats: SampleStatistics,
    impedance: VariantPair<Impedance>,
    artifacts: VariantPair<Vec<PathBuf>>,
}

/// Identity of the sweep a result belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepLabel {
    pub name: String,
    pub core_material: String,
    pub turns: u32,
    pub frequency: f64,
}

/// Combines per-job raw results and extracted impedances into a
/// [`SweepResult`].
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn reduce(
        label: SweepLabel,
        raw: VariantPair<Vec<RawJobResult>>,
        impedance: VariantPair<Impedance>,
    ) -> WindingResult<SweepResult> {
        let mut raw = raw;
        for variant in Variant::ALL {
            raw.get_mut(variant)
                .sort_by_key(|result| result.sequence_index);
        }
        let points = raw.air.len();
        if points == 0 || raw.core.len() != points {
            return Err(WindingError::internal(
                "SYS.REDUCE_LENGTH",
                format!(
                    "lineages must be non-empty and equally long, got {} air and {} core results",
                    points,
                    raw.core.len()
                ),
            ));
        }
        for (index, (air, core)) in raw.air.iter().zip(&raw.core).enumerate() {
            if air.variant != Variant::Air
                || core.variant != Variant::Core
                || air.sequence_index != index
                || core.sequence_index != index
                || air.field_amplitude_applied != core.field_amplitude_applied
            {
                return Err(WindingError::internal(
                    "SYS.REDUCE_PAIRING",
                    format!(
                        "results at position {} do not pair up: air #{} at {:e} T, core #{} at {:e} T",
                        index,
                        air.sequence_index,
                        air.field_amplitude_applied,
                        core.sequence_index,
                        core.field_amplitude_applied
                    ),
                ));
            }
        }

        let applied_field: Vec<f64> = raw
            .air
            .iter()
            .map(|result| result.field_amplitude_applied)
            .collect();
        if !is_non_decreasing(&applied_field) {
            return Err(WindingError::internal(
                "SYS.REDUCE_ORDER",
                "applied field vector is not ascending",
            ));
        }
        let fields = raw
            .as_ref()
            .map(|_, results| results.iter().map(|r| r.core_flux_density).collect::<Vec<_>>());
        let voltages = raw
            .as_ref()
            .map(|_, results| results.iter().map(|r| r.voltage_magnitude).collect::<Vec<_>>());

        let frequency = label.frequency;
        let scaled_air_field: Vec<f64> = fields.air.iter().map(|field| field * frequency).collect();
        let sensitivity = ratio(&voltages.core, &scaled_air_field, "sensitivity")?;
        let effective_permeability = ratio(&fields.core, &fields.air, "effective permeability")?;
        let sensitivity_stats = statistics(&sensitivity)?;
        let effective_permeability_stats = statistics(&effective_permeability)?;

        let artifacts = raw.as_ref().map(|_, results| {
            results
                .iter()
                .map(|result| result.source_path.clone())
                .collect()
        });

        info!(
            name = %label.name,
            points,
            sensitivity = sensitivity_stats.mean,
            sensitivity_std = sensitivity_stats.std_dev,
            mu_eff = effective_permeability_stats.mean,
            "reduced sweep"
        );
        Ok(SweepResult {
            name: label.name,
            core_material: label.core_material,
            turns: label.turns,
            frequency,
            applied_field,
            air_field: fields.air,
            core_field: fields.core,
            air_voltage: voltages.air,
            core_voltage: voltages.core,
            sensitivity,
            sensitivity_stats,
            effective_permeability,
            effective_permeability_stats,
            impedance,
            artifacts,
        })
    }
}

fn ratio(numerator: &[f64], denominator: &[f64], quantity: &str) -> WindingResult<Vec<f64>> {
    let values = elementwise_ratio(numerator, denominator).ok_or_else(|| {
        WindingError::internal(
            "SYS.REDUCE_LENGTH",
            format!("{} operands differ in length", quantity),
        )
    })?;
    if let Some(index) = values.iter().position(|value| !value.is_finite()) {
        return Err(WindingError::internal(
            "SYS.REDUCE_NON_FINITE",
            format!(
                "{} at point {} is not finite ({} / {})",
                quantity, index, numerator[index], denominator[index]
            ),
        ));
    }
    Ok(values)
}

fn statistics(values: &[f64]) -> WindingResult<SampleStatistics> {
    SampleStatistics::from_samples(values).ok_or_else(|| {
        WindingError::internal("SYS.REDUCE_EMPTY", "cannot reduce an empty vector")
    })
}

impl SweepResult {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core_material(&self) -> &str {
        &self.core_material
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.applied_field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied_field.is_empty()
    }

    pub fn applied_field(&self) -> &[f64] {
        &self.applied_field
    }

    pub fn air_field(&self) -> &[f64] {
        &self.air_field
    }

    pub fn core_field(&self) -> &[f64] {
        &self.core_field
    }

    pub fn air_voltage(&self) -> &[f64] {
        &self.air_voltage
    }

    pub fn core_voltage(&self) -> &[f64] {
        &self.core_voltage
    }

    /// V/(T Hz).
    pub fn sensitivity(&self) -> &[f64] {
        &self.sensitivity
    }

    pub fn sensitivity_stats(&self) -> SampleStatistics {
        self.sensitivity_stats
    }

    pub fn effective_permeability(&self) -> &[f64] {
        &self.effective_permeability
    }

    pub fn effective_permeability_stats(&self) -> SampleStatistics {
        self.effective_permeability_stats
    }

    pub fn impedance(&self, variant: Variant) -> Impedance {
        *self.impedance.get(variant)
    }

    pub fn artifacts(&self, variant: Variant) -> &[PathBuf] {
        self.artifacts.get(variant)
    }

    /// Writes `<name>_T_<timestamp>.json` into `directory` and returns its path.
    pub fn export_json(&self, directory: &Path) -> WindingResult<PathBuf> {
        fs::create_dir_all(directory).map_err(|source| {
            WindingError::io_system(
                "IO.RESULT_DIR",
                format!(
                    "failed to create result directory '{}': {}",
                    directory.display(),
                    source
                ),
            )
        })?;
        let file_name = sanitize_file_component(&format!(
            "{}_T_{}.json",
            self.name,
            artifact_timestamp()
        ));
        let path = directory.join(file_name);
        write_json_artifact(&path, self).map_err(|source| {
            WindingError::io_system(
                "IO.RESULT_WRITE",
                format!("failed to write result '{}': {}", path.display(), source),
            )
        })?;
        info!(path = %path.display(), "exported sweep result");
        Ok(path)
    }
}
