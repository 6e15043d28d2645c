use super::{
    BlockAssignment, BoundaryCondition, Circuit, MaterialDefinition, Point, ProblemDefinition,
    Rectangle, SolverSession,
};
use crate::common::constants::AIR_MATERIAL;
use crate::domain::WindingResult;
use std::path::Path;

/// Something that can be placed into a definition session, described as data.
pub trait SceneObject {
    fn labels(&self) -> Vec<Point>;
    fn regions(&self) -> Vec<Rectangle>;
    fn materials(&self) -> Vec<MaterialDefinition>;
    fn circuits(&self) -> Vec<Circuit> {
        Vec::new()
    }
    fn block_assignments(&self) -> Vec<BlockAssignment>;
}

/// Drives a full definition session for `objects` and persists it to
/// `artifact`. Every object's labels are placed before any region is drawn;
/// region drawing splits segments and labels anchor the resulting blocks.
pub fn write_definition<S: SolverSession>(
    session: &mut S,
    problem: &ProblemDefinition,
    objects: &[&dyn SceneObject],
    artifact: &Path,
) -> WindingResult<()> {
    session.define_problem(problem)?;

    for object in objects {
        for label in object.labels() {
            session.add_label(label)?;
        }
    }
    for object in objects {
        for region in object.regions() {
            session.draw_region(region)?;
        }
    }
    session.apply_boundary(BoundaryCondition::Asymptotic)?;

    session.add_material(&MaterialDefinition::library(AIR_MATERIAL))?;
    for object in objects {
        for material in object.materials() {
            session.add_material(&material)?;
        }
    }
    for object in objects {
        for circuit in object.circuits() {
            session.add_circuit(&circuit)?;
        }
    }
    for object in objects {
        for assignment in object.block_assignments() {
            session.set_block_property(&assignment)?;
        }
    }

    session.persist(artifact)
}

#[cfg(test)]
mod tests {
    use super::{SceneObject, write_definition};
    use crate::domain::WindingResult;
    use crate::solver::{
        BlockAssignment, BoundaryCondition, Circuit, LengthUnit, MaterialDefinition, Point,
        ProblemDefinition, ProblemSymmetry, Query, QueryValue, Rectangle, SolverSession,
    };
    use std::path::Path;

    #[derive(Default)]
    struct RecordingSession {
        calls: Vec<String>,
    }

    impl SolverSession for RecordingSession {
        fn define_problem(&mut self, _problem: &ProblemDefinition) -> WindingResult<()> {
            self.calls.push("problem".to_string());
            Ok(())
        }
        fn add_label(&mut self, at: Point) -> WindingResult<()> {
            self.calls.push(format!("label {}", at.r));
            Ok(())
        }
        fn draw_region(&mut self, region: Rectangle) -> WindingResult<()> {
            self.calls.push(format!("region {}", region.upper.r));
            Ok(())
        }
        fn apply_boundary(&mut self, _boundary: BoundaryCondition) -> WindingResult<()> {
            self.calls.push("boundary".to_string());
            Ok(())
        }
        fn add_material(&mut self, material: &MaterialDefinition) -> WindingResult<()> {
            self.calls.push(format!("material {}", material.name()));
            Ok(())
        }
        fn add_circuit(&mut self, circuit: &Circuit) -> WindingResult<()> {
            self.calls.push(format!("circuit {}", circuit.name));
            Ok(())
        }
        fn set_block_property(&mut self, assignment: &BlockAssignment) -> WindingResult<()> {
            self.calls.push(format!("block {}", assignment.material));
            Ok(())
        }
        fn set_circuit_excitation(&mut self, circuit: &str, _current: f64) -> WindingResult<()> {
            self.calls.push(format!("excite {circuit}"));
            Ok(())
        }
        fn persist(&mut self, artifact: &Path) -> WindingResult<()> {
            self.calls.push(format!("persist {}", artifact.display()));
            Ok(())
        }
        fn solve(&mut self) -> WindingResult<()> {
            Ok(())
        }
        fn query(&mut self, _queries: &[Query]) -> WindingResult<Vec<QueryValue>> {
            Ok(Vec::new())
        }
        fn close(self) -> WindingResult<()> {
            Ok(())
        }
    }

    struct Block(f64);

    impl SceneObject for Block {
        fn labels(&self) -> Vec<Point> {
            vec![Point::new(self.0, 0.0)]
        }
        fn regions(&self) -> Vec<Rectangle> {
            vec![Rectangle::new(0.0, -1.0, self.0 * 2.0, 1.0)]
        }
        fn materials(&self) -> Vec<MaterialDefinition> {
            vec![MaterialDefinition::library(format!("M{}", self.0))]
        }
        fn circuits(&self) -> Vec<Circuit> {
            vec![Circuit::series(format!("c{}", self.0), 0.0)]
        }
        fn block_assignments(&self) -> Vec<BlockAssignment> {
            vec![BlockAssignment::passive(
                Point::new(self.0, 0.0),
                format!("M{}", self.0),
            )]
        }
    }

    #[test]
    fn definition_places_all_labels_before_any_region() {
        let problem = ProblemDefinition {
            frequency: 1.0e3,
            units: LengthUnit::Millimeters,
            symmetry: ProblemSymmetry::Axisymmetric,
            precision: 1.0e-8,
            depth: 0.0,
            min_angle: 30.0,
        };
        let mut session = RecordingSession::default();
        write_definition(
            &mut session,
            &problem,
            &[&Block(1.0), &Block(2.0)],
            Path::new("out.fem"),
        )
        .expect("definition should be written");

        assert_eq!(
            session.calls,
            vec![
                "problem",
                "label 1",
                "label 2",
                "region 2",
                "region 4",
                "boundary",
                "material Air",
                "material M1",
                "material M2",
                "circuit c1",
                "circuit c2",
                "block M1",
                "block M2",
                "persist out.fem",
            ]
        );
    }
}
