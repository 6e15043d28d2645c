use crate::common::constants::AIR_MATERIAL;
use crate::common::serialization::sanitize_file_component;
use crate::domain::{Variant, VariantPair, WindingError, WindingResult};
use crate::geometry::CoilGeometry;
use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Timestamp component of generated artifact names.
pub fn artifact_timestamp() -> String {
    Local::now().format("%Y-%m-%d%H%M%S").to_string()
}

/// One simulation job: a variant solved at one applied field amplitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    variant: Variant,
    field_amplitude: f64,
    sequence_index: usize,
    artifact_path: PathBuf,
}

impl JobDescriptor {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn field_amplitude(&self) -> f64 {
        self.field_amplitude
    }

    /// Position of this job in its variant lineage; 0 is the base job.
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

type SaltSource = Box<dyn FnMut() -> u64 + Send>;

/// Issues uniquely named artifacts and keeps the ordered job lineage of each
/// variant.
pub struct JobStore {
    directory: PathBuf,
    extension: String,
    geometry_name: String,
    materials: VariantPair<String>,
    issued: HashSet<PathBuf>,
    lineages: VariantPair<Vec<JobDescriptor>>,
    salt: SaltSource,
}

impl JobStore {
    /// Creates the artifact directory if needed.
    pub fn new(
        directory: impl Into<PathBuf>,
        extension: impl Into<String>,
        geometry: &CoilGeometry,
    ) -> WindingResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|source| {
            WindingError::io_system(
                "IO.ARTIFACT_DIR",
                format!(
                    "failed to create artifact directory '{}': {}",
                    directory.display(),
                    source
                ),
            )
        })?;
        Ok(Self {
            directory,
            extension: extension.into(),
            geometry_name: geometry.name().to_string(),
            materials: VariantPair::new(
                AIR_MATERIAL.to_string(),
                geometry.core_material().to_string(),
            ),
            issued: HashSet::new(),
            lineages: VariantPair::default(),
            salt: Box::new(rand::random::<u64>),
        })
    }

    /// Replaces the random salt generator.
    pub fn with_salt_source(mut self, source: impl FnMut() -> u64 + Send + 'static) -> Self {
        self.salt = Box::new(source);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn issue(&mut self, stem: String) -> WindingResult<PathBuf> {
        let salt = (self.salt)();
        let file_name = format!(
            "{}_{:016x}.{}",
            sanitize_file_component(&stem),
            salt,
            self.extension
        );
        let path = self.directory.join(file_name);
        if self.issued.contains(&path) || path.exists() {
            return Err(WindingError::artifact_collision(&path));
        }
        self.issued.insert(path.clone());
        trace!(path = %path.display(), "issued artifact path");
        Ok(path)
    }

    /// Appends a job for `variant` at `field_amplitude` to its lineage.
    pub fn create_job(
        &mut self,
        variant: Variant,
        field_amplitude: f64,
    ) -> WindingResult<JobDescriptor> {
        let stem = format!(
            "{}_{}_sensor_{:e}_T_{}",
            self.geometry_name,
            self.materials.get(variant),
            field_amplitude,
            artifact_timestamp()
        );
        let artifact_path = self.issue(stem)?;
        let lineage = self.lineages.get_mut(variant);
        let job = JobDescriptor {
            variant,
            field_amplitude,
            sequence_index: lineage.len(),
            artifact_path,
        };
        lineage.push(job.clone());
        Ok(job)
    }

    /// Disposable artifact for the impedance extraction of `variant`.
    pub fn scratch_artifact(&mut self, variant: Variant) -> WindingResult<PathBuf> {
        let stem = format!(
            "{}_{}_impedance_{}",
            self.geometry_name,
            self.materials.get(variant),
            artifact_timestamp()
        );
        self.issue(stem)
    }

    pub fn lineage(&self, variant: Variant) -> &[JobDescriptor] {
        self.lineages.get(variant)
    }

    pub fn base(&self, variant: Variant) -> Option<&JobDescriptor> {
        self.lineages.get(variant).first()
    }

    /// Every job, air lineage first, each lineage in sequence order.
    pub fn jobs(&self) -> impl Iterator<Item = &JobDescriptor> {
        Variant::ALL
            .into_iter()
            .flat_map(|variant| self.lineages.get(variant).iter())
    }

    pub fn len(&self) -> usize {
        self.lineages.air.len() + self.lineages.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::JobStore;
    use crate::domain::{Variant, WindingErrorCategory};
    use crate::geometry::{CoilGeometry, CoilSpec};
    use tempfile::TempDir;

    fn geometry() -> CoilGeometry {
        CoilGeometry::new(CoilSpec {
            name: "NDI 610099".to_string(),
            ..CoilSpec::default()
        })
        .expect("geometry should validate")
    }

    #[test]
    fn jobs_form_ordered_lineages() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut store = JobStore::new(temp.path(), "fem", &geometry()).expect("store");
        for field in [1.0e-6, 2.0e-6, 3.0e-6] {
            store.create_job(Variant::Air, field).expect("air job");
            store.create_job(Variant::Core, field).expect("core job");
        }

        assert_eq!(store.len(), 6);
        let air = store.lineage(Variant::Air);
        assert_eq!(
            air.iter().map(|job| job.sequence_index()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(air[2].field_amplitude(), 3.0e-6);
        assert_eq!(
            store.base(Variant::Core).map(|job| job.variant()),
            Some(Variant::Core)
        );
        let order: Vec<Variant> = store.jobs().map(|job| job.variant()).collect();
        assert_eq!(order[..3], [Variant::Air; 3]);
    }

    #[test]
    fn artifact_names_are_sanitized_and_tagged() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut store = JobStore::new(temp.path(), "fem", &geometry()).expect("store");
        let job = store.create_job(Variant::Air, 1.5e-6).expect("job");
        let name = job
            .artifact_path()
            .file_name()
            .and_then(|name| name.to_str())
            .expect("utf-8 file name")
            .to_string();

        assert!(name.starts_with("NDI610099_Air_sensor_1.5e-6_T_"), "{name}");
        assert!(name.ends_with(".fem"));
        assert!(!name.contains(' '));
        assert!(!name.contains(':'));
    }

    #[test]
    fn reissuing_a_path_is_an_artifact_collision() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut store = JobStore::new(temp.path(), "fem", &geometry())
            .expect("store")
            .with_salt_source(|| 7);
        store.create_job(Variant::Core, 1.0e-6).expect("first job");
        // Same stem within the same second and the same salt.
        let mut attempts = 0;
        let error = loop {
            attempts += 1;
            match store.create_job(Variant::Core, 1.0e-6) {
                Err(error) => break error,
                Ok(_) if attempts < 5 => continue,
                Ok(_) => panic!("constant salt should collide"),
            }
        };
        assert_eq!(error.category(), WindingErrorCategory::ArtifactCollisionError);
    }

    #[test]
    fn existing_files_are_never_reused() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut first = JobStore::new(temp.path(), "fem", &geometry())
            .expect("store")
            .with_salt_source(|| 42);
        let job = first.create_job(Variant::Air, 1.0e-6).expect("job");
        std::fs::write(job.artifact_path(), "x").expect("artifact should be written");

        let mut second = JobStore::new(temp.path(), "fem", &geometry())
            .expect("store")
            .with_salt_source(|| 42);
        let mut collided = false;
        for _ in 0..5 {
            if second.create_job(Variant::Air, 1.0e-6).is_err() {
                collided = true;
                break;
            }
        }
        assert!(collided);
    }

    #[test]
    fn scratch_artifacts_use_the_impedance_tag() {
        let temp = TempDir::new().expect("tempdir should be created");
        let mut store = JobStore::new(temp.path(), "json", &geometry()).expect("store");
        let path = store.scratch_artifact(Variant::Core).expect("scratch");
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        assert!(name.contains("_Air_impedance_"));
        assert!(store.is_empty());
    }
}
