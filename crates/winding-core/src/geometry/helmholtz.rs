use super::coil::CoilGeometry;
use super::material::transmitter_wire;
use crate::common::constants::{
    AIR_MATERIAL, HELMHOLTZ_SCALE, HELMHOLTZ_SECTION_HALF_WIDTH_M, HELMHOLTZ_TURNS, MU_0,
    TRANSMITTER_CIRCUIT, TRANSMITTER_MATERIAL,
};
use crate::domain::{WindingError, WindingResult};
use crate::solver::scene::SceneObject;
use crate::solver::{BlockAssignment, Circuit, LengthUnit, MaterialDefinition, Point, Rectangle};

/// (4/5)^(3/2): centre field of a Helmholtz pair is this times mu0 n I / r.
const HELMHOLTZ_FACTOR: f64 = 0.715_541_752_799_933_2;

/// Current a Helmholtz pair of `turns` turns per section and radius
/// `radius_m` meters needs for a centre flux density of `field` tesla.
pub fn drive_current(field: f64, radius_m: f64, turns: u32) -> f64 {
    field * radius_m / (MU_0 * f64::from(turns) * HELMHOLTZ_FACTOR)
}

/// Centre flux density of a Helmholtz pair carrying `current`.
pub fn centre_field(current: f64, radius_m: f64, turns: u32) -> f64 {
    HELMHOLTZ_FACTOR * MU_0 * f64::from(turns) * current / radius_m
}

/// Helmholtz transmitter sized for a coil and driven for one applied field.
#[derive(Debug, Clone, PartialEq)]
pub struct HelmholtzSource {
    radius: f64,
    meters_per_unit: f64,
    section_half_width: f64,
    turns: u32,
    field: f64,
    frequency: f64,
    current: f64,
}

impl HelmholtzSource {
    /// The pair radius scales with the coil so the uniform-field region
    /// dwarfs the sensor.
    pub fn for_coil(
        coil: &CoilGeometry,
        field: f64,
        frequency: f64,
        units: LengthUnit,
    ) -> WindingResult<Self> {
        let radius = HELMHOLTZ_SCALE * (coil.winding_length() + coil.coil_outer_diameter());
        Self::new(radius, units, field, frequency)
    }

    pub fn new(radius: f64, units: LengthUnit, field: f64, frequency: f64) -> WindingResult<Self> {
        let meters_per_unit = units.meters_per_unit();
        let section_half_width = HELMHOLTZ_SECTION_HALF_WIDTH_M / meters_per_unit;
        if !(radius.is_finite() && radius > 2.0 * section_half_width) {
            return Err(WindingError::input_validation(
                "INPUT.HELMHOLTZ_RADIUS",
                format!(
                    "Helmholtz radius {} must exceed the section width {} ({})",
                    radius,
                    2.0 * section_half_width,
                    units.as_str()
                ),
            ));
        }
        if !(field.is_finite() && field > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.HELMHOLTZ_FIELD",
                format!("applied field must be positive, got {}", field),
            ));
        }
        Ok(Self {
            radius,
            meters_per_unit,
            section_half_width,
            turns: HELMHOLTZ_TURNS,
            field,
            frequency,
            current: drive_current(field, radius * meters_per_unit, HELMHOLTZ_TURNS),
        })
    }

    /// Same pair re-driven for another field amplitude.
    pub fn with_field(&self, field: f64) -> WindingResult<Self> {
        if !(field.is_finite() && field > 0.0) {
            return Err(WindingError::input_validation(
                "INPUT.HELMHOLTZ_FIELD",
                format!("applied field must be positive, got {}", field),
            ));
        }
        Ok(Self {
            field,
            current: drive_current(field, self.radius * self.meters_per_unit, self.turns),
            ..self.clone()
        })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn field(&self) -> f64 {
        self.field
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    fn section_labels(&self) -> [Point; 2] {
        let half = 0.5 * self.radius;
        [Point::new(self.radius, half), Point::new(self.radius, -half)]
    }

    fn background_label(&self) -> Point {
        Point::new(0.5 * self.radius, 0.5 * self.radius)
    }
}

impl SceneObject for HelmholtzSource {
    fn labels(&self) -> Vec<Point> {
        let [upper, lower] = self.section_labels();
        vec![upper, lower, self.background_label()]
    }

    fn regions(&self) -> Vec<Rectangle> {
        let w = self.section_half_width;
        self.section_labels()
            .iter()
            .map(|centre| Rectangle::new(centre.r - w, centre.z - w, centre.r + w, centre.z + w))
            .collect()
    }

    fn materials(&self) -> Vec<MaterialDefinition> {
        vec![transmitter_wire()]
    }

    fn circuits(&self) -> Vec<Circuit> {
        vec![Circuit::series(TRANSMITTER_CIRCUIT, self.current)]
    }

    fn block_assignments(&self) -> Vec<BlockAssignment> {
        let mut blocks: Vec<BlockAssignment> = self
            .section_labels()
            .iter()
            .map(|label| {
                BlockAssignment::winding(
                    *label,
                    TRANSMITTER_MATERIAL,
                    TRANSMITTER_CIRCUIT,
                    self.turns,
                )
            })
            .collect();
        blocks.push(BlockAssignment::passive(
            self.background_label(),
            AIR_MATERIAL,
        ));
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::{HELMHOLTZ_FACTOR, HelmholtzSource, centre_field, drive_current};
    use crate::geometry::{CoilGeometry, CoilSpec};
    use crate::solver::LengthUnit;
    use crate::solver::scene::SceneObject;

    #[test]
    fn helmholtz_factor_is_four_fifths_to_three_halves() {
        assert!((HELMHOLTZ_FACTOR - 0.8_f64.powf(1.5)).abs() < 1.0e-15);
    }

    #[test]
    fn drive_current_inverts_centre_field() {
        let current = drive_current(2.0e-6, 100.1, 1);
        assert!((centre_field(current, 100.1, 1) - 2.0e-6).abs() < 1.0e-18);
    }

    #[test]
    fn radius_scales_with_the_coil() {
        let coil = CoilGeometry::new(CoilSpec::default()).expect("default coil");
        let source = HelmholtzSource::for_coil(&coil, 1.0e-6, 1.0e3, LengthUnit::Millimeters)
            .expect("source should build");
        assert!((source.radius() - 100_110.0).abs() < 1.0e-6);
        assert!((source.current() - drive_current(1.0e-6, 100.11, 1)).abs() < 1.0e-15);
        assert_eq!(source.frequency(), 1.0e3);
    }

    #[test]
    fn re_driving_only_changes_field_and_current() {
        let source = HelmholtzSource::new(1000.0, LengthUnit::Millimeters, 1.0e-6, 50.0)
            .expect("source should build");
        let doubled = source.with_field(2.0e-6).expect("re-drive should succeed");
        assert_eq!(doubled.radius(), source.radius());
        assert!((doubled.current() - 2.0 * source.current()).abs() < 1.0e-12);
        assert!(source.with_field(-1.0).is_err());
    }

    #[test]
    fn sections_are_centred_on_their_labels() {
        let source = HelmholtzSource::new(1000.0, LengthUnit::Millimeters, 1.0e-6, 50.0)
            .expect("source should build");
        let labels = source.labels();
        let regions = source.regions();
        assert_eq!(labels.len(), 3);
        assert_eq!(regions.len(), 2);
        assert!(regions[0].contains(labels[0]));
        assert!(regions[1].contains(labels[1]));
        assert!(regions.iter().all(|region| !region.contains(labels[2])));
        assert_eq!(source.circuits()[0].current, source.current());
    }

    #[test]
    fn section_width_is_physical_in_every_unit_system() {
        let millimeters = HelmholtzSource::new(1000.0, LengthUnit::Millimeters, 1.0e-6, 50.0)
            .expect("millimeter source should build");
        let meters = HelmholtzSource::new(1.0, LengthUnit::Meters, 1.0e-6, 50.0)
            .expect("meter source should build");
        assert!((millimeters.section_half_width - 5.0).abs() < 1.0e-12);
        assert!((meters.section_half_width - 5.0e-3).abs() < 1.0e-15);
        assert!((meters.current() - millimeters.current()).abs() < 1.0e-15);
        assert!((meters.regions()[0].width() * 1.0e3 - millimeters.regions()[0].width()).abs() < 1.0e-9);
    }

    #[test]
    fn undersized_pairs_are_rejected() {
        assert!(HelmholtzSource::new(5.0, LengthUnit::Millimeters, 1.0e-6, 50.0).is_err());
    }
}
