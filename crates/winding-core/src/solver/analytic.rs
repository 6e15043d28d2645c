//! Closed-form axisymmetric backend.
//!
//! Windings are reduced to current loops at their section centres and
//! magnetic blocks to uniformly magnetised rods with a demagnetising factor.
//! The model reproduces Helmholtz sensitivities and winding resistances of
//! thin coils exactly and inductances approximately; it is used for dry runs
//! and tests where no field solver is installed.

use super::document::{ProblemDocument, same_point};
use super::{
    BlockAssignment, BlockIntegral, BoundaryCondition, Circuit, CircuitProperties, LaminationType,
    MaterialDefinition, Point, ProblemDefinition, ProblemSymmetry, Query, QueryValue, Rectangle,
    SolverBackend, SolverSession,
};
use crate::common::constants::{MU_0, PI, TWO_PI};
use crate::domain::{WindingError, WindingResult};
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// Representative linear relative permeabilities of named library materials.
const LIBRARY_PERMEABILITY: [(&str, f64); 6] = [
    ("Air", 1.0),
    ("Copper", 1.0),
    ("Aluminum, 6061-T6", 1.0),
    ("Hiperco-50", 5000.0),
    ("Pure Iron", 5000.0),
    ("Mu Metal", 20000.0),
];

/// Below this ratio of cross-section size to mean radius a winding is
/// treated as a thin ring rather than a multilayer solenoid.
const THIN_RING_RATIO: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct AnalyticBackend {
    library: Arc<BTreeMap<String, f64>>,
}

impl Default for AnalyticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticBackend {
    pub fn new() -> Self {
        let library = LIBRARY_PERMEABILITY
            .iter()
            .map(|(name, mu)| ((*name).to_string(), *mu))
            .collect();
        Self {
            library: Arc::new(library),
        }
    }

    /// Adds or overrides a library material.
    pub fn with_library_material(
        mut self,
        name: impl Into<String>,
        relative_permeability: f64,
    ) -> Self {
        Arc::make_mut(&mut self.library).insert(name.into(), relative_permeability);
        self
    }

    pub fn relative_permeability(&self, name: &str) -> Option<f64> {
        self.library.get(name).copied()
    }
}

impl SolverBackend for AnalyticBackend {
    type Session = AnalyticSession;

    fn name(&self) -> &'static str {
        "analytic"
    }

    fn artifact_extension(&self) -> &'static str {
        "json"
    }

    fn solution_artifact(&self, _artifact: &Path) -> Option<PathBuf> {
        None
    }

    fn new_document(&self) -> WindingResult<Self::Session> {
        Ok(AnalyticSession::new(
            Arc::clone(&self.library),
            ProblemDocument::default(),
        ))
    }

    fn open_document(&self, artifact: &Path) -> WindingResult<Self::Session> {
        let document = ProblemDocument::load(artifact)?;
        trace!(artifact = %artifact.display(), "opened analytic document");
        Ok(AnalyticSession::new(Arc::clone(&self.library), document))
    }
}

#[derive(Debug, Clone)]
struct SolvedBlock {
    label: Point,
    /// Drawn region in meters; `None` for the open background.
    region: Option<Rectangle>,
    relative_permeability: f64,
    circuit: Option<String>,
    turns: f64,
    /// S/m.
    conductivity: f64,
    /// Meters.
    strand_diameter: f64,
}

impl SolvedBlock {
    fn apparent_permeability(&self) -> f64 {
        match self.region {
            Some(region) => apparent_permeability(self.relative_permeability, region),
            None => self.relative_permeability,
        }
    }
}

#[derive(Debug, Clone)]
struct Solution {
    angular_frequency: f64,
    blocks: Vec<SolvedBlock>,
    currents: BTreeMap<String, f64>,
}

impl Solution {
    /// Axial field at the origin from every driven winding outside `excluded`.
    fn applied_field(&self, excluded: Option<&str>) -> f64 {
        self.blocks
            .iter()
            .filter_map(|block| {
                let circuit = block.circuit.as_deref()?;
                if excluded == Some(circuit) {
                    return None;
                }
                let region = block.region?;
                let current = self.currents.get(circuit).copied().unwrap_or(0.0);
                let centre = region_centre(region);
                Some(loop_axial_field(block.turns * current, centre.r, centre.z))
            })
            .sum()
    }

    fn block_integral(&self, at: Point, integral: BlockIntegral) -> WindingResult<Complex64> {
        let block = self
            .blocks
            .iter()
            .find(|block| same_point(block.label, at))
            .ok_or_else(|| {
                WindingError::solver(
                    "RUN.SOLVER_NO_BLOCK",
                    format!("no solved block at ({}, {})", at.r, at.z),
                )
            })?;
        let region = block.region.ok_or_else(|| {
            WindingError::solver(
                "RUN.SOLVER_UNBOUNDED_BLOCK",
                format!(
                    "block at ({}, {}) is the open background and has no finite volume",
                    at.r, at.z
                ),
            )
        })?;

        let volume = annulus_area(region) * region.height();
        let value = match integral {
            BlockIntegral::Volume => volume,
            BlockIntegral::AxialFluxDensity => {
                self.applied_field(None) * block.apparent_permeability() * volume
            }
        };
        Ok(Complex64::new(value, 0.0))
    }

    fn circuit_properties(&self, name: &str) -> WindingResult<CircuitProperties> {
        let current = self.currents.get(name).copied().ok_or_else(|| {
            WindingError::solver(
                "RUN.SOLVER_NO_CIRCUIT",
                format!("circuit '{}' is not defined", name),
            )
        })?;
        let external = self.applied_field(Some(name));

        let mut external_linkage = 0.0;
        let mut resistance = 0.0;
        let mut inductance = 0.0;
        for block in self
            .blocks
            .iter()
            .filter(|block| block.circuit.as_deref() == Some(name))
        {
            let Some(region) = block.region else {
                continue;
            };
            let inner = region.lower.r;
            let outer = region.upper.r;
            let mean_radius = 0.5 * (inner + outer);
            let mean_square_radius = (inner * inner + inner * outer + outer * outer) / 3.0;
            let turn_area = PI * mean_square_radius;

            let core_gain = self.core_gain_inside(inner, region_centre(region).z);
            external_linkage += block.turns * external * (turn_area + core_gain);
            resistance += winding_resistance(
                block.turns,
                mean_radius,
                block.conductivity,
                block.strand_diameter,
            );
            inductance += air_core_inductance(
                block.turns,
                mean_radius,
                region.height(),
                region.width(),
            ) * (1.0 + core_gain / turn_area);
        }

        let flux_linkage = Complex64::new(inductance * current + external_linkage, 0.0);
        let voltage = Complex64::new(resistance * current, 0.0)
            + Complex64::i() * self.angular_frequency * flux_linkage;
        Ok(CircuitProperties {
            current: Complex64::new(current, 0.0),
            voltage,
            flux_linkage,
        })
    }

    /// Excess flux area contributed by magnetic blocks inside a bore of
    /// radius `bore` at height `z`.
    fn core_gain_inside(&self, bore: f64, z: f64) -> f64 {
        self.blocks
            .iter()
            .filter(|block| block.circuit.is_none())
            .filter_map(|block| {
                let region = block.region?;
                let inside = region.upper.r <= bore * (1.0 + 1.0e-9)
                    && region.lower.z <= z
                    && region.upper.z >= z;
                inside.then(|| (block.apparent_permeability() - 1.0) * annulus_area(region))
            })
            .sum()
    }
}

pub struct AnalyticSession {
    library: Arc<BTreeMap<String, f64>>,
    document: ProblemDocument,
    solution: Option<Solution>,
    closed: bool,
}

impl AnalyticSession {
    fn new(library: Arc<BTreeMap<String, f64>>, document: ProblemDocument) -> Self {
        Self {
            library,
            document,
            solution: None,
            closed: false,
        }
    }

    pub fn document(&self) -> &ProblemDocument {
        &self.document
    }

    fn invalidate(&mut self) {
        self.solution = None;
    }

    fn resolve_material(&self, name: &str, scale: f64) -> WindingResult<(f64, f64, f64)> {
        let material = self.document.material(name).ok_or_else(|| {
            WindingError::solver(
                "RUN.SOLVER_UNKNOWN_MATERIAL",
                format!("material '{}' was assigned but never added", name),
            )
        })?;
        match material {
            MaterialDefinition::Library { name } => {
                let mu = self.library.get(name).copied().ok_or_else(|| {
                    WindingError::solver(
                        "RUN.SOLVER_UNKNOWN_MATERIAL",
                        format!("material library has no entry '{}'", name),
                    )
                })?;
                Ok((mu, 0.0, 0.0))
            }
            MaterialDefinition::Custom(properties) => {
                let strand_diameter = match properties.lamination {
                    LaminationType::MagnetWire => properties.strand_diameter * scale,
                    LaminationType::NotLaminated => 0.0,
                };
                Ok((
                    properties.mu_x,
                    properties.conductivity * 1.0e6,
                    strand_diameter,
                ))
            }
        }
    }

    fn solution(&self) -> WindingResult<&Solution> {
        self.solution.as_ref().ok_or_else(|| {
            WindingError::solver(
                "RUN.SOLVER_NOT_SOLVED",
                "query issued before the document was solved",
            )
        })
    }
}

impl SolverSession for AnalyticSession {
    fn define_problem(&mut self, problem: &ProblemDefinition) -> WindingResult<()> {
        self.invalidate();
        self.document.problem = Some(*problem);
        Ok(())
    }

    fn add_label(&mut self, at: Point) -> WindingResult<()> {
        self.invalidate();
        self.document.add_label(at)
    }

    fn draw_region(&mut self, region: Rectangle) -> WindingResult<()> {
        self.invalidate();
        self.document.draw_region(region);
        Ok(())
    }

    fn apply_boundary(&mut self, boundary: BoundaryCondition) -> WindingResult<()> {
        self.invalidate();
        self.document.boundary = Some(boundary);
        Ok(())
    }

    fn add_material(&mut self, material: &MaterialDefinition) -> WindingResult<()> {
        self.invalidate();
        self.document.register_material(material);
        Ok(())
    }

    fn add_circuit(&mut self, circuit: &Circuit) -> WindingResult<()> {
        self.invalidate();
        self.document.add_circuit(circuit);
        Ok(())
    }

    fn set_block_property(&mut self, assignment: &BlockAssignment) -> WindingResult<()> {
        self.invalidate();
        self.document.assign_block(assignment)
    }

    fn set_circuit_excitation(&mut self, circuit: &str, current: f64) -> WindingResult<()> {
        self.invalidate();
        self.document.set_circuit_current(circuit, current)
    }

    fn persist(&mut self, artifact: &Path) -> WindingResult<()> {
        self.document.save(artifact)?;
        trace!(artifact = %artifact.display(), "persisted analytic document");
        Ok(())
    }

    fn solve(&mut self) -> WindingResult<()> {
        let problem = self.document.problem.ok_or_else(|| {
            WindingError::solver("RUN.SOLVER_NO_PROBLEM", "document has no problem definition")
        })?;
        if problem.symmetry != ProblemSymmetry::Axisymmetric {
            return Err(WindingError::solver(
                "RUN.SOLVER_SYMMETRY",
                format!(
                    "closed-form model only solves axisymmetric problems, got '{}'",
                    problem.symmetry.as_str()
                ),
            ));
        }
        if self.document.boundary.is_none() {
            return Err(WindingError::solver(
                "RUN.SOLVER_NO_BOUNDARY",
                "document has no outer boundary condition",
            ));
        }

        let scale = problem.units.meters_per_unit();
        let mut blocks = Vec::with_capacity(self.document.labels.len());
        for label in &self.document.labels {
            let assignment = self.document.block_at(*label).ok_or_else(|| {
                WindingError::solver(
                    "RUN.SOLVER_UNASSIGNED_BLOCK",
                    format!("block label at ({}, {}) has no properties", label.r, label.z),
                )
            })?;
            if let Some(circuit) = &assignment.circuit {
                if self.document.circuit(circuit).is_none() {
                    return Err(WindingError::solver(
                        "RUN.SOLVER_NO_CIRCUIT",
                        format!("block references undefined circuit '{}'", circuit),
                    ));
                }
            }
            let (relative_permeability, conductivity, strand_diameter) =
                self.resolve_material(&assignment.material, scale)?;
            blocks.push(SolvedBlock {
                label: *label,
                region: self
                    .document
                    .region_containing(*label)
                    .map(|region| scale_rectangle(region, scale)),
                relative_permeability,
                circuit: assignment.circuit.clone(),
                turns: f64::from(assignment.turns),
                conductivity,
                strand_diameter,
            });
        }

        let currents = self
            .document
            .circuits
            .iter()
            .map(|circuit| (circuit.name.clone(), circuit.current))
            .collect();

        debug!(
            blocks = blocks.len(),
            frequency = problem.frequency,
            "closed-form solution ready"
        );
        self.solution = Some(Solution {
            angular_frequency: TWO_PI * problem.frequency,
            blocks,
            currents,
        });
        Ok(())
    }

    fn query(&mut self, queries: &[Query]) -> WindingResult<Vec<QueryValue>> {
        let solution = self.solution()?;
        queries
            .iter()
            .map(|query| match query {
                Query::BlockIntegral { block, integral } => solution
                    .block_integral(*block, *integral)
                    .map(QueryValue::Complex),
                Query::CircuitProperties { circuit } => solution
                    .circuit_properties(circuit)
                    .map(QueryValue::Circuit),
            })
            .collect()
    }

    fn close(mut self) -> WindingResult<()> {
        self.closed = true;
        Ok(())
    }
}

impl Drop for AnalyticSession {
    fn drop(&mut self) {
        if !self.closed {
            debug!("analytic session dropped without close");
        }
    }
}

fn scale_rectangle(region: Rectangle, scale: f64) -> Rectangle {
    Rectangle::new(
        region.lower.r * scale,
        region.lower.z * scale,
        region.upper.r * scale,
        region.upper.z * scale,
    )
}

fn region_centre(region: Rectangle) -> Point {
    Point::new(
        0.5 * (region.lower.r + region.upper.r),
        0.5 * (region.lower.z + region.upper.z),
    )
}

fn annulus_area(region: Rectangle) -> f64 {
    let inner = region.lower.r.max(0.0);
    let outer = region.upper.r.max(inner);
    PI * (outer * outer - inner * inner)
}

/// On-axis field of a circular loop of radius `radius` at axial distance `height`.
pub fn loop_axial_field(ampere_turns: f64, radius: f64, height: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    let radius_sq = radius * radius;
    MU_0 * ampere_turns * radius_sq / (2.0 * (radius_sq + height * height).powf(1.5))
}

/// Demagnetising factor of an ellipsoid of revolution with the given
/// length-to-diameter ratio.
pub fn demagnetizing_factor(aspect: f64) -> f64 {
    if aspect <= 0.0 {
        return 1.0;
    }
    if (aspect - 1.0).abs() < 1.0e-6 {
        return 1.0 / 3.0;
    }
    let m_sq = aspect * aspect;
    if aspect > 1.0 {
        let root = (m_sq - 1.0).sqrt();
        (aspect / root * (aspect + root).ln() - 1.0) / (m_sq - 1.0)
    } else {
        let root = (1.0 - m_sq).sqrt();
        (1.0 - aspect / root * aspect.acos()) / (1.0 - m_sq)
    }
}

fn apparent_permeability(relative_permeability: f64, region: Rectangle) -> f64 {
    if (relative_permeability - 1.0).abs() < f64::EPSILON {
        return 1.0;
    }
    let diameter = 2.0 * region.upper.r;
    if diameter <= 0.0 {
        return 1.0;
    }
    let factor = demagnetizing_factor(region.height() / diameter);
    relative_permeability / (1.0 + factor * (relative_permeability - 1.0))
}

/// DC resistance of `turns` turns of round wire of `strand_diameter` at
/// `mean_radius`; zero for ideal conductors.
pub fn winding_resistance(turns: f64, mean_radius: f64, conductivity: f64, strand_diameter: f64) -> f64 {
    if conductivity <= 0.0 || strand_diameter <= 0.0 {
        return 0.0;
    }
    let strand_area = PI * 0.25 * strand_diameter * strand_diameter;
    turns * TWO_PI * mean_radius / (conductivity * strand_area)
}

/// Self inductance of an air-cored winding of rectangular section.
///
/// Thin rings use the ring formula with the section's geometric mean
/// distance; bulkier windings use Wheeler's multilayer approximation.
pub fn air_core_inductance(turns: f64, mean_radius: f64, length: f64, depth: f64) -> f64 {
    if mean_radius <= 0.0 {
        return 0.0;
    }
    let turns_sq = turns * turns;
    if length + depth < THIN_RING_RATIO * mean_radius {
        let gmd = 0.2235 * (length + depth);
        MU_0 * turns_sq * mean_radius * ((8.0 * mean_radius / gmd).ln() - 2.0)
    } else {
        31.6e-6 * turns_sq * mean_radius * mean_radius
            / (6.0 * mean_radius + 9.0 * length + 10.0 * depth)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalyticBackend, demagnetizing_factor, loop_axial_field};
    use crate::common::constants::{MU_0, PI, TWO_PI};
    use crate::solver::{
        BlockAssignment, BlockIntegral, BoundaryCondition, Circuit, LaminationType, LengthUnit,
        MaterialDefinition, MaterialProperties, Point, ProblemDefinition, ProblemSymmetry, Query,
        Rectangle, SolverBackend, SolverSession,
    };
    use tempfile::TempDir;

    const HELMHOLTZ_RADIUS: f64 = 100_100.0;

    fn problem() -> ProblemDefinition {
        ProblemDefinition {
            frequency: 1.0e3,
            units: LengthUnit::Millimeters,
            symmetry: ProblemSymmetry::Axisymmetric,
            precision: 1.0e-8,
            depth: 0.0,
            min_angle: 30.0,
        }
    }

    fn wire(name: &str, conductivity: f64, strand_diameter: f64) -> MaterialDefinition {
        MaterialDefinition::Custom(MaterialProperties {
            name: name.to_string(),
            mu_x: 1.0,
            mu_y: 1.0,
            coercivity: 0.0,
            current_density: 0.0,
            conductivity,
            lamination_thickness: 0.0,
            hysteresis_lag: 0.0,
            lamination_fill: 1.0,
            lamination: LaminationType::MagnetWire,
            hysteresis_lag_x: 0.0,
            hysteresis_lag_y: 0.0,
            strands: 1,
            strand_diameter,
        })
    }

    /// One meter single-turn loop inside a Helmholtz pair driven for `field`.
    fn define_loop(session: &mut impl SolverSession, core_material: &str, field: f64) {
        let r = HELMHOLTZ_RADIUS;
        let current = field * (r / 1000.0) / (MU_0 * (0.8_f64).powf(1.5));
        session.define_problem(&problem()).expect("problem");
        for label in [
            Point::new(500.0, 0.0),
            Point::new(249.975, 0.0),
            Point::new(r, r / 2.0),
            Point::new(r, -r / 2.0),
            Point::new(r / 2.0, r / 2.0),
        ] {
            session.add_label(label).expect("label");
        }
        for region in [
            Rectangle::new(499.95, -0.5, 500.05, 0.5),
            Rectangle::new(0.0, -0.5, 499.95, 0.5),
            Rectangle::new(r - 5.0, r / 2.0 - 5.0, r + 5.0, r / 2.0 + 5.0),
            Rectangle::new(r - 5.0, -r / 2.0 - 5.0, r + 5.0, -r / 2.0 + 5.0),
        ] {
            session.draw_region(region).expect("region");
        }
        session
            .apply_boundary(BoundaryCondition::Asymptotic)
            .expect("boundary");
        for material in [
            MaterialDefinition::library("Air"),
            MaterialDefinition::library(core_material),
            wire("Sensor", 58.0, 1.0),
            wire("Transmitter", 58.0 * 0.65, 0.0),
        ] {
            session.add_material(&material).expect("material");
        }
        session
            .add_circuit(&Circuit::series("icoil_sensor", 0.0))
            .expect("circuit");
        session
            .add_circuit(&Circuit::series("icoil_transmitter", current))
            .expect("circuit");
        for block in [
            BlockAssignment::winding(Point::new(500.0, 0.0), "Sensor", "icoil_sensor", 1),
            BlockAssignment::passive(Point::new(249.975, 0.0), core_material),
            BlockAssignment::winding(Point::new(r, r / 2.0), "Transmitter", "icoil_transmitter", 1),
            BlockAssignment::winding(Point::new(r, -r / 2.0), "Transmitter", "icoil_transmitter", 1),
            BlockAssignment::passive(Point::new(r / 2.0, r / 2.0), "Air"),
        ] {
            session.set_block_property(&block).expect("block");
        }
    }

    fn core_field(session: &mut impl SolverSession) -> f64 {
        let values = session
            .query(&[
                Query::BlockIntegral {
                    block: Point::new(249.975, 0.0),
                    integral: BlockIntegral::Volume,
                },
                Query::BlockIntegral {
                    block: Point::new(249.975, 0.0),
                    integral: BlockIntegral::AxialFluxDensity,
                },
            ])
            .expect("block integrals");
        let volume = values[0].into_complex().expect("volume");
        let flux = values[1].into_complex().expect("flux");
        (flux / volume).norm()
    }

    #[test]
    fn helmholtz_pair_produces_the_requested_centre_field() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Air", 2.0e-6);
        session.solve().expect("solve");

        let field = core_field(&mut session);
        assert!((field - 2.0e-6).abs() / 2.0e-6 < 1.0e-9, "field {field}");
        session.close().expect("close");
    }

    #[test]
    fn open_circuit_loop_sensitivity_matches_faraday() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Air", 1.0e-6);
        session.solve().expect("solve");

        let circuit = session
            .query(&[Query::CircuitProperties {
                circuit: "icoil_sensor".to_string(),
            }])
            .expect("circuit query")[0]
            .into_circuit()
            .expect("circuit properties");
        let sensitivity = circuit.voltage.norm() / (1.0e-6 * 1.0e3);
        let mean_square_radius = (0.49995_f64.powi(2) + 0.49995 * 0.50005 + 0.50005_f64.powi(2)) / 3.0;
        let expected = TWO_PI * PI * mean_square_radius;
        assert!((sensitivity - expected).abs() / expected < 1.0e-9);
        assert!((sensitivity - 4.9348).abs() < 1.0e-3);
    }

    #[test]
    fn driven_sensor_yields_wire_resistance_and_positive_inductance() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Air", 1.0e-6);
        session
            .set_circuit_excitation("icoil_transmitter", 0.0)
            .expect("transmitter off");
        session
            .set_circuit_excitation("icoil_sensor", 1.0e-6)
            .expect("sensor on");
        session.solve().expect("solve");

        let circuit = session
            .query(&[Query::CircuitProperties {
                circuit: "icoil_sensor".to_string(),
            }])
            .expect("circuit query")[0]
            .into_circuit()
            .expect("circuit properties");
        let resistance = circuit.voltage.re / 1.0e-6;
        let inductance = circuit.voltage.im / (TWO_PI * 1.0e3 * 1.0e-6);
        assert!((resistance - 0.0690).abs() < 5.0e-4, "resistance {resistance}");
        assert!(inductance > 3.0e-6 && inductance < 6.0e-6, "inductance {inductance}");
    }

    #[test]
    fn magnetic_core_concentrates_flux() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Hiperco-50", 1.0e-6);
        session.solve().expect("solve");
        assert!(core_field(&mut session) > 1.0e-6);
    }

    #[test]
    fn unknown_library_material_fails_at_solve_time() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Unobtainium", 1.0e-6);

        let error = session.solve().expect_err("solve should fail");
        assert_eq!(error.placeholder(), "RUN.SOLVER_UNKNOWN_MATERIAL");
        assert!(error.message().contains("Unobtainium"));
    }

    #[test]
    fn registered_library_materials_are_solvable() {
        let backend = AnalyticBackend::new().with_library_material("Unobtainium", 42.0);
        assert_eq!(backend.relative_permeability("Unobtainium"), Some(42.0));
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Unobtainium", 1.0e-6);
        session.solve().expect("solve");
    }

    #[test]
    fn queries_before_solve_are_rejected() {
        let backend = AnalyticBackend::new();
        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Air", 1.0e-6);
        let error = session
            .query(&[Query::CircuitProperties {
                circuit: "icoil_sensor".to_string(),
            }])
            .expect_err("query should fail");
        assert_eq!(error.placeholder(), "RUN.SOLVER_NOT_SOLVED");
    }

    #[test]
    fn persisted_documents_reopen_with_the_same_answer() {
        let temp = TempDir::new().expect("tempdir should be created");
        let artifact = temp.path().join("loop.json");
        let backend = AnalyticBackend::new();

        let mut session = backend.new_document().expect("session");
        define_loop(&mut session, "Air", 3.0e-6);
        session.persist(&artifact).expect("persist");
        session.close().expect("close");

        let mut reopened = backend.open_document(&artifact).expect("open");
        reopened.solve().expect("solve");
        let field = core_field(&mut reopened);
        assert!((field - 3.0e-6).abs() / 3.0e-6 < 1.0e-9);
    }

    #[test]
    fn demagnetizing_factor_limits() {
        assert!((demagnetizing_factor(1.0) - 1.0 / 3.0).abs() < 1.0e-12);
        assert!(demagnetizing_factor(1000.0) < 1.0e-4);
        assert!(demagnetizing_factor(0.001) > 0.99);
        let below = demagnetizing_factor(0.999);
        let above = demagnetizing_factor(1.001);
        assert!((below - above).abs() < 1.0e-3);
    }

    #[test]
    fn loop_field_at_its_centre() {
        let field = loop_axial_field(1.0, 0.5, 0.0);
        assert!((field - MU_0 / 1.0).abs() / MU_0 < 1.0e-12);
        assert_eq!(loop_axial_field(1.0, 0.0, 0.0), 0.0);
    }
}
