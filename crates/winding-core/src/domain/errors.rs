use super::Variant;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type WindingResult<T> = Result<T, WindingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindingErrorCategory {
    InputValidationError,
    ArtifactCollisionError,
    SolverTaskError,
    ExtractionError,
    IoSystemError,
    CancelledError,
    InternalError,
}

impl WindingErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::ArtifactCollisionError => 3,
            Self::SolverTaskError => 4,
            Self::ExtractionError => 5,
            Self::IoSystemError => 6,
            Self::CancelledError => 7,
            Self::InternalError => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::ArtifactCollisionError => "ArtifactCollisionError",
            Self::SolverTaskError => "SolverTaskError",
            Self::ExtractionError => "ExtractionError",
            Self::IoSystemError => "IoSystemError",
            Self::CancelledError => "CancelledError",
            Self::InternalError => "InternalError",
        }
    }
}

/// Identifies the sweep job whose solver session failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedJob {
    pub variant: Variant,
    pub field_amplitude: f64,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindingError {
    category: WindingErrorCategory,
    placeholder: &'static str,
    message: String,
    failed_job: Option<FailedJob>,
}

impl WindingError {
    pub fn new(
        category: WindingErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
            failed_job: None,
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            WindingErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn artifact_collision(path: &Path) -> Self {
        Self::new(
            WindingErrorCategory::ArtifactCollisionError,
            "RUN.ARTIFACT_COLLISION",
            format!(
                "artifact path '{}' was already issued in this run",
                path.display()
            ),
        )
    }

    /// A worker's solver session failed while analyzing `job`.
    pub fn solver_task(job: FailedJob, message: impl Into<String>) -> Self {
        let message = format!(
            "{} job at {:e} T ('{}') failed: {}",
            job.variant,
            job.field_amplitude,
            job.artifact.display(),
            message.into()
        );
        Self {
            category: WindingErrorCategory::SolverTaskError,
            placeholder: "RUN.SOLVER_TASK",
            message,
            failed_job: Some(job),
        }
    }

    pub fn extraction(variant: Variant, message: impl Into<String>) -> Self {
        Self::new(
            WindingErrorCategory::ExtractionError,
            "RUN.EXTRACTION",
            format!("{} impedance extraction failed: {}", variant, message.into()),
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WindingErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(
            WindingErrorCategory::CancelledError,
            "RUN.CANCELLED",
            message,
        )
    }

    /// Solver-side failure not yet attributed to a sweep job.
    pub fn solver(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WindingErrorCategory::SolverTaskError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WindingErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> WindingErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn failed_job(&self) -> Option<&FailedJob> {
        self.failed_job.as_ref()
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for WindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for WindingError {}
