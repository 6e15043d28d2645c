//! Boundary to the external field solver.
//!
//! A [`SolverBackend`] opens [`SolverSession`]s; a session exposes a fixed,
//! typed set of operations. Definition sessions start from
//! [`SolverBackend::new_document`], analysis sessions from
//! [`SolverBackend::open_document`]. Sessions are not shared between threads:
//! every worker opens and closes its own.

pub mod analytic;
pub mod document;
pub mod femm;
pub mod scene;

use crate::domain::{WindingError, WindingResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Inches,
    Millimeters,
    Centimeters,
    Meters,
    Mils,
    Micrometers,
}

impl LengthUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inches => "inches",
            Self::Millimeters => "millimeters",
            Self::Centimeters => "centimeters",
            Self::Meters => "meters",
            Self::Mils => "mils",
            Self::Micrometers => "micrometers",
        }
    }

    pub const fn meters_per_unit(self) -> f64 {
        match self {
            Self::Inches => 0.0254,
            Self::Millimeters => 1.0e-3,
            Self::Centimeters => 1.0e-2,
            Self::Meters => 1.0,
            Self::Mils => 2.54e-5,
            Self::Micrometers => 1.0e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemSymmetry {
    #[serde(rename = "planar")]
    Planar,
    #[serde(rename = "axi")]
    Axisymmetric,
}

impl ProblemSymmetry {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planar => "planar",
            Self::Axisymmetric => "axi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDefinition {
    pub frequency: f64,
    pub units: LengthUnit,
    pub symmetry: ProblemSymmetry,
    pub precision: f64,
    pub depth: f64,
    pub min_angle: f64,
}

/// A point in the (r, z) half plane of an axisymmetric problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub r: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(r: f64, z: f64) -> Self {
        Self { r, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub lower: Point,
    pub upper: Point,
}

impl Rectangle {
    pub const fn new(r1: f64, z1: f64, r2: f64, z2: f64) -> Self {
        Self {
            lower: Point::new(r1, z1),
            upper: Point::new(r2, z2),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.r >= self.lower.r
            && point.r <= self.upper.r
            && point.z >= self.lower.z
            && point.z <= self.upper.z
    }

    pub fn width(&self) -> f64 {
        self.upper.r - self.lower.r
    }

    pub fn height(&self) -> f64 {
        self.upper.z - self.lower.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// Improvised asymptotic boundary (FEMM `makeABC`).
    Asymptotic,
}

/// Lamination / conductor model of a custom material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaminationType {
    NotLaminated,
    MagnetWire,
}

impl LaminationType {
    pub const fn code(self) -> u8 {
        match self {
            Self::NotLaminated => 0,
            Self::MagnetWire => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProperties {
    pub name: String,
    pub mu_x: f64,
    pub mu_y: f64,
    pub coercivity: f64,
    pub current_density: f64,
    /// Electrical conductivity in MS/m.
    pub conductivity: f64,
    pub lamination_thickness: f64,
    pub hysteresis_lag: f64,
    pub lamination_fill: f64,
    pub lamination: LaminationType,
    pub hysteresis_lag_x: f64,
    pub hysteresis_lag_y: f64,
    pub strands: u32,
    /// Strand diameter in model units; only meaningful for magnet wire.
    pub strand_diameter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MaterialDefinition {
    /// A material the solver resolves from its own library by name.
    Library { name: String },
    Custom(MaterialProperties),
}

impl MaterialDefinition {
    pub fn library(name: impl Into<String>) -> Self {
        Self::Library { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Library { name } => name,
            Self::Custom(properties) => &properties.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub name: String,
    /// Circuit current in amperes.
    pub current: f64,
    pub series: bool,
}

impl Circuit {
    pub fn series(name: impl Into<String>, current: f64) -> Self {
        Self {
            name: name.into(),
            current,
            series: true,
        }
    }
}

/// Block properties applied to the block label found at `at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAssignment {
    pub at: Point,
    pub material: String,
    pub auto_mesh: bool,
    pub mesh_size: f64,
    pub circuit: Option<String>,
    pub magnetization_direction: f64,
    pub group: u32,
    pub turns: u32,
}

impl BlockAssignment {
    pub fn passive(at: Point, material: impl Into<String>) -> Self {
        Self {
            at,
            material: material.into(),
            auto_mesh: true,
            mesh_size: 1.0,
            circuit: None,
            magnetization_direction: 0.0,
            group: 0,
            turns: 0,
        }
    }

    pub fn winding(
        at: Point,
        material: impl Into<String>,
        circuit: impl Into<String>,
        turns: u32,
    ) -> Self {
        Self {
            circuit: Some(circuit.into()),
            turns,
            ..Self::passive(at, material)
        }
    }
}

/// Block integrals the orchestrator reads back, with their FEMM codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockIntegral {
    /// Volume integral of the axial flux density component.
    AxialFluxDensity,
    Volume,
}

impl BlockIntegral {
    pub const fn femm_code(self) -> u8 {
        match self {
            Self::AxialFluxDensity => 9,
            Self::Volume => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    BlockIntegral { block: Point, integral: BlockIntegral },
    CircuitProperties { circuit: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitProperties {
    pub current: Complex64,
    pub voltage: Complex64,
    pub flux_linkage: Complex64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryValue {
    Complex(Complex64),
    Circuit(CircuitProperties),
}

impl QueryValue {
    pub fn into_complex(self) -> WindingResult<Complex64> {
        match self {
            Self::Complex(value) => Ok(value),
            Self::Circuit(_) => Err(WindingError::internal(
                "SYS.SOLVER_QUERY_SHAPE",
                "expected a block integral value, got circuit properties",
            )),
        }
    }

    pub fn into_circuit(self) -> WindingResult<CircuitProperties> {
        match self {
            Self::Circuit(value) => Ok(value),
            Self::Complex(_) => Err(WindingError::internal(
                "SYS.SOLVER_QUERY_SHAPE",
                "expected circuit properties, got a block integral value",
            )),
        }
    }
}

/// One solver invocation. Operations are recorded in call order; `persist`
/// writes the current document to `artifact` without changing which document
/// the session has open.
pub trait SolverSession {
    fn define_problem(&mut self, problem: &ProblemDefinition) -> WindingResult<()>;
    fn add_label(&mut self, at: Point) -> WindingResult<()>;
    fn draw_region(&mut self, region: Rectangle) -> WindingResult<()>;
    fn apply_boundary(&mut self, boundary: BoundaryCondition) -> WindingResult<()>;
    fn add_material(&mut self, material: &MaterialDefinition) -> WindingResult<()>;
    fn add_circuit(&mut self, circuit: &Circuit) -> WindingResult<()>;
    fn set_block_property(&mut self, assignment: &BlockAssignment) -> WindingResult<()>;
    fn set_circuit_excitation(&mut self, circuit: &str, current: f64) -> WindingResult<()>;
    fn persist(&mut self, artifact: &Path) -> WindingResult<()>;
    /// Solves the open document and loads the solution for querying.
    fn solve(&mut self) -> WindingResult<()>;
    fn query(&mut self, queries: &[Query]) -> WindingResult<Vec<QueryValue>>;
    fn close(self) -> WindingResult<()>;
}

pub trait SolverBackend: Send + Sync {
    type Session: SolverSession;

    fn name(&self) -> &'static str;

    /// File extension (without dot) of persisted definition artifacts.
    fn artifact_extension(&self) -> &'static str;

    /// Solution file the solver writes next to `artifact`, if any.
    fn solution_artifact(&self, artifact: &Path) -> Option<PathBuf>;

    fn new_document(&self) -> WindingResult<Self::Session>;

    fn open_document(&self, artifact: &Path) -> WindingResult<Self::Session>;
}
