//! In-memory problem document recorded by sessions that keep the model
//! themselves rather than delegating it to an external process.

use super::{
    BlockAssignment, BoundaryCondition, Circuit, MaterialDefinition, Point, ProblemDefinition,
    Rectangle,
};
use crate::domain::{WindingError, WindingResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const POINT_TOLERANCE: f64 = 1.0e-9;

pub(crate) fn same_point(lhs: Point, rhs: Point) -> bool {
    let scale = lhs.r.abs().max(lhs.z.abs()).max(1.0);
    (lhs.r - rhs.r).abs() <= POINT_TOLERANCE * scale
        && (lhs.z - rhs.z).abs() <= POINT_TOLERANCE * scale
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDocument {
    pub problem: Option<ProblemDefinition>,
    pub labels: Vec<Point>,
    pub regions: Vec<Rectangle>,
    pub boundary: Option<BoundaryCondition>,
    pub materials: Vec<MaterialDefinition>,
    pub circuits: Vec<Circuit>,
    pub blocks: Vec<BlockAssignment>,
}

impl ProblemDocument {
    pub fn load(path: &Path) -> WindingResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| {
            WindingError::solver(
                "RUN.SOLVER_OPEN",
                format!("failed to open document '{}': {}", path.display(), source),
            )
        })?;
        serde_json::from_str(&source).map_err(|source| {
            WindingError::solver(
                "RUN.SOLVER_OPEN",
                format!("document '{}' is malformed: {}", path.display(), source),
            )
        })
    }

    pub fn save(&self, path: &Path) -> WindingResult<()> {
        crate::common::serialization::write_json_artifact(path, self).map_err(|source| {
            WindingError::io_system(
                "IO.SOLVER_PERSIST",
                format!("failed to persist document '{}': {}", path.display(), source),
            )
        })
    }

    /// Labels must precede region drawing.
    pub fn add_label(&mut self, at: Point) -> WindingResult<()> {
        if !self.regions.is_empty() {
            return Err(WindingError::solver(
                "RUN.SOLVER_LABEL_ORDER",
                format!(
                    "block label at ({}, {}) placed after {} region(s) were drawn",
                    at.r,
                    at.z,
                    self.regions.len()
                ),
            ));
        }
        if !self.labels.iter().any(|label| same_point(*label, at)) {
            self.labels.push(at);
        }
        Ok(())
    }

    pub fn draw_region(&mut self, region: Rectangle) {
        self.regions.push(region);
    }

    /// Registers `material`, replacing an earlier definition with the same name.
    pub fn register_material(&mut self, material: &MaterialDefinition) {
        match self
            .materials
            .iter_mut()
            .find(|existing| existing.name() == material.name())
        {
            Some(existing) => *existing = material.clone(),
            None => self.materials.push(material.clone()),
        }
    }

    pub fn add_circuit(&mut self, circuit: &Circuit) {
        match self
            .circuits
            .iter_mut()
            .find(|existing| existing.name == circuit.name)
        {
            Some(existing) => *existing = circuit.clone(),
            None => self.circuits.push(circuit.clone()),
        }
    }

    pub fn assign_block(&mut self, assignment: &BlockAssignment) -> WindingResult<()> {
        if !self.labels.iter().any(|label| same_point(*label, assignment.at)) {
            return Err(WindingError::solver(
                "RUN.SOLVER_NO_LABEL",
                format!(
                    "no block label at ({}, {}) to assign '{}' to",
                    assignment.at.r, assignment.at.z, assignment.material
                ),
            ));
        }
        match self
            .blocks
            .iter_mut()
            .find(|existing| same_point(existing.at, assignment.at))
        {
            Some(existing) => *existing = assignment.clone(),
            None => self.blocks.push(assignment.clone()),
        }
        Ok(())
    }

    pub fn set_circuit_current(&mut self, name: &str, current: f64) -> WindingResult<()> {
        let circuit = self
            .circuits
            .iter_mut()
            .find(|circuit| circuit.name == name)
            .ok_or_else(|| {
                WindingError::solver(
                    "RUN.SOLVER_NO_CIRCUIT",
                    format!("circuit '{}' is not defined", name),
                )
            })?;
        circuit.current = current;
        Ok(())
    }

    pub fn circuit(&self, name: &str) -> Option<&Circuit> {
        self.circuits.iter().find(|circuit| circuit.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&MaterialDefinition> {
        self.materials.iter().find(|material| material.name() == name)
    }

    pub fn block_at(&self, at: Point) -> Option<&BlockAssignment> {
        self.blocks.iter().find(|block| same_point(block.at, at))
    }

    /// Smallest drawn region containing `at`; `None` for the open background.
    pub fn region_containing(&self, at: Point) -> Option<Rectangle> {
        self.regions
            .iter()
            .filter(|region| region.contains(at))
            .min_by(|lhs, rhs| {
                (lhs.width() * lhs.height()).total_cmp(&(rhs.width() * rhs.height()))
            })
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::ProblemDocument;
    use crate::solver::{
        BlockAssignment, Circuit, MaterialDefinition, Point, Rectangle,
    };
    use tempfile::TempDir;

    #[test]
    fn labels_after_regions_are_rejected() {
        let mut document = ProblemDocument::default();
        document
            .add_label(Point::new(1.0, 0.0))
            .expect("first label should be accepted");
        document.draw_region(Rectangle::new(0.0, -1.0, 2.0, 1.0));

        let error = document
            .add_label(Point::new(3.0, 0.0))
            .expect_err("late label should be rejected");
        assert_eq!(error.placeholder(), "RUN.SOLVER_LABEL_ORDER");
    }

    #[test]
    fn block_assignment_requires_an_existing_label() {
        let mut document = ProblemDocument::default();
        let error = document
            .assign_block(&BlockAssignment::passive(Point::new(1.0, 0.0), "Air"))
            .expect_err("assignment without label should fail");
        assert_eq!(error.placeholder(), "RUN.SOLVER_NO_LABEL");
    }

    #[test]
    fn re_registering_a_material_replaces_it() {
        let mut document = ProblemDocument::default();
        document.register_material(&MaterialDefinition::library("Air"));
        document.register_material(&MaterialDefinition::library("Air"));
        assert_eq!(document.materials.len(), 1);
    }

    #[test]
    fn circuit_current_patch_requires_a_defined_circuit() {
        let mut document = ProblemDocument::default();
        document.add_circuit(&Circuit::series("icoil_transmitter", 1.0));
        document
            .set_circuit_current("icoil_transmitter", 2.5)
            .expect("patch should succeed");
        assert_eq!(
            document.circuit("icoil_transmitter").map(|circuit| circuit.current),
            Some(2.5)
        );
        assert!(document.set_circuit_current("missing", 1.0).is_err());
    }

    #[test]
    fn smallest_region_wins_for_nested_regions() {
        let mut document = ProblemDocument::default();
        document.draw_region(Rectangle::new(0.0, -10.0, 10.0, 10.0));
        document.draw_region(Rectangle::new(0.0, -1.0, 1.0, 1.0));

        let region = document
            .region_containing(Point::new(0.5, 0.0))
            .expect("point should be inside a region");
        assert_eq!(region.upper.r, 1.0);
        assert!(document.region_containing(Point::new(20.0, 0.0)).is_none());
    }

    #[test]
    fn documents_survive_a_save_load_cycle() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("doc.json");
        let mut document = ProblemDocument::default();
        document
            .add_label(Point::new(1.0, 0.0))
            .expect("label should be accepted");
        document.register_material(&MaterialDefinition::library("Hiperco-50"));
        document.save(&path).expect("document should save");

        assert_eq!(
            ProblemDocument::load(&path).expect("document should load"),
            document
        );
    }
}
