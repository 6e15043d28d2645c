use super::material::sensor_wire;
use crate::common::constants::{AIR_MATERIAL, SENSOR_CIRCUIT, SENSOR_MATERIAL};
use crate::domain::{Variant, WindingError, WindingResult};
use crate::numerics::{NumericTolerance, compare_with_tolerance};
use crate::solver::scene::SceneObject;
use crate::solver::{BlockAssignment, Circuit, MaterialDefinition, Point, Rectangle};
use serde::{Deserialize, Serialize};

const DIAMETER_MATCH_TOLERANCE: NumericTolerance = NumericTolerance {
    abs_tol: 0.0,
    rel_tol: 1.0e-9,
    relative_floor: 1.0,
};

/// User-facing coil description. Dimensions are in model units (millimeters
/// by default); the defaults describe a thin 1 m single-turn air coil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoilSpec {
    pub name: String,
    #[serde(alias = "ls")]
    pub winding_length: f64,
    #[serde(alias = "ids")]
    pub coil_inner_diameter: f64,
    #[serde(alias = "ods")]
    pub coil_outer_diameter: f64,
    #[serde(alias = "lc")]
    pub core_length: f64,
    #[serde(alias = "idc")]
    pub core_inner_diameter: f64,
    #[serde(alias = "odc")]
    pub core_outer_diameter: f64,
    /// Wire diameter including insulation; sets the turn count.
    #[serde(alias = "odw")]
    pub wire_outer_diameter: f64,
    /// Bare copper diameter used for resistance; defaults to the outer diameter.
    #[serde(alias = "odwc")]
    pub conductor_diameter: Option<f64>,
    #[serde(alias = "pf")]
    pub packing_factor: f64,
    #[serde(alias = "ma")]
    pub core_material: String,
    /// Explicit turn count overriding the packing estimate.
    #[serde(alias = "explicitN")]
    pub turns: Option<u32>,
}

impl Default for CoilSpec {
    fn default() -> Self {
        Self {
            name: "default_1meter_diameter_aircoil".to_string(),
            winding_length: 1.0,
            coil_inner_diameter: 999.9,
            coil_outer_diameter: 1000.1,
            core_length: 1.0,
            core_inner_diameter: 0.0,
            core_outer_diameter: 999.9,
            wire_outer_diameter: 1.0,
            conductor_diameter: Some(1.0),
            packing_factor: 1.0,
            core_material: AIR_MATERIAL.to_string(),
            turns: Some(1),
        }
    }
}

/// Rectangular close-packing estimate of how many turns fit the winding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindingLayout {
    pub turns_per_layer: u64,
    pub layers: u64,
}

impl WindingLayout {
    pub fn estimate(
        winding_length: f64,
        radial_thickness: f64,
        wire_outer_diameter: f64,
        packing_factor: f64,
    ) -> Self {
        let turns_per_layer = (packing_factor * winding_length / wire_outer_diameter).floor();
        let layers = (packing_factor * radial_thickness / wire_outer_diameter).floor();
        Self {
            turns_per_layer: turns_per_layer.max(0.0) as u64,
            layers: layers.max(0.0) as u64,
        }
    }

    pub fn turns(&self) -> u64 {
        self.turns_per_layer.saturating_mul(self.layers)
    }
}

/// Validated coil geometry. Construction checks every invariant; the value
/// is immutable afterwards and variants are independent copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoilSpec", into = "CoilSpec")]
pub struct CoilGeometry {
    spec: CoilSpec,
    conductor_diameter: f64,
    layout: WindingLayout,
    turns: u32,
}

impl TryFrom<CoilSpec> for CoilGeometry {
    type Error = WindingError;

    fn try_from(spec: CoilSpec) -> Result<Self, Self::Error> {
        Self::new(spec)
    }
}

impl From<CoilGeometry> for CoilSpec {
    fn from(geometry: CoilGeometry) -> Self {
        geometry.spec
    }
}

fn require_positive(placeholder: &'static str, label: &str, value: f64) -> WindingResult<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(WindingError::input_validation(
        placeholder,
        format!("{} must be positive and finite, got {}", label, value),
    ))
}

fn diameters_match(lhs: f64, rhs: f64) -> bool {
    compare_with_tolerance(lhs, rhs, DIAMETER_MATCH_TOLERANCE).passes
}

impl CoilGeometry {
    pub fn new(spec: CoilSpec) -> WindingResult<Self> {
        if !diameters_match(spec.core_outer_diameter, spec.coil_inner_diameter) {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_CORE_DIAMETER",
                format!(
                    "core outer diameter {} must match coil inner diameter {}",
                    spec.core_outer_diameter, spec.coil_inner_diameter
                ),
            ));
        }
        if spec.core_length < spec.winding_length {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_CORE_LENGTH",
                format!(
                    "core length {} must be at least the winding length {}",
                    spec.core_length, spec.winding_length
                ),
            ));
        }

        if spec.name.trim().is_empty() {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_NAME",
                "geometry name must not be empty",
            ));
        }
        if spec.core_material.trim().is_empty() {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_MATERIAL",
                "core material must not be empty",
            ));
        }
        require_positive("INPUT.GEOMETRY_LENGTH", "winding length", spec.winding_length)?;
        require_positive("INPUT.GEOMETRY_LENGTH", "core length", spec.core_length)?;
        require_positive(
            "INPUT.GEOMETRY_WIRE",
            "wire outer diameter",
            spec.wire_outer_diameter,
        )?;
        let conductor_diameter = spec.conductor_diameter.unwrap_or(spec.wire_outer_diameter);
        require_positive("INPUT.GEOMETRY_WIRE", "conductor diameter", conductor_diameter)?;
        if conductor_diameter > spec.wire_outer_diameter {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_WIRE",
                format!(
                    "conductor diameter {} exceeds wire outer diameter {}",
                    conductor_diameter, spec.wire_outer_diameter
                ),
            ));
        }
        if !(spec.packing_factor.is_finite()
            && spec.packing_factor > 0.0
            && spec.packing_factor <= 1.0)
        {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_PACKING",
                format!(
                    "packing factor must lie in (0, 1], got {}",
                    spec.packing_factor
                ),
            ));
        }
        if !(spec.coil_inner_diameter >= 0.0
            && spec.coil_outer_diameter.is_finite()
            && spec.coil_outer_diameter > spec.coil_inner_diameter)
        {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_COIL_DIAMETER",
                format!(
                    "coil diameters must satisfy 0 <= inner < outer, got {} and {}",
                    spec.coil_inner_diameter, spec.coil_outer_diameter
                ),
            ));
        }
        if !(spec.core_inner_diameter >= 0.0
            && spec.core_inner_diameter < spec.core_outer_diameter)
        {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_CORE_DIAMETER",
                format!(
                    "core diameters must satisfy 0 <= inner < outer, got {} and {}",
                    spec.core_inner_diameter, spec.core_outer_diameter
                ),
            ));
        }

        let layout = WindingLayout::estimate(
            spec.winding_length,
            0.5 * (spec.coil_outer_diameter - spec.coil_inner_diameter),
            spec.wire_outer_diameter,
            spec.packing_factor,
        );
        let turns = match spec.turns {
            Some(explicit) => explicit,
            None => u32::try_from(layout.turns()).map_err(|_| {
                WindingError::input_validation(
                    "INPUT.GEOMETRY_TURNS",
                    format!("derived turn count {} is out of range", layout.turns()),
                )
            })?,
        };
        if turns == 0 {
            return Err(WindingError::input_validation(
                "INPUT.GEOMETRY_TURNS",
                format!(
                    "winding holds no turns ({} per layer x {} layers); give an explicit turn count or a thinner wire",
                    layout.turns_per_layer, layout.layers
                ),
            ));
        }

        Ok(Self {
            spec,
            conductor_diameter,
            layout,
            turns,
        })
    }

    pub fn spec(&self) -> &CoilSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn core_material(&self) -> &str {
        &self.spec.core_material
    }

    pub fn winding_length(&self) -> f64 {
        self.spec.winding_length
    }

    pub fn coil_outer_diameter(&self) -> f64 {
        self.spec.coil_outer_diameter
    }

    pub fn wire_outer_diameter(&self) -> f64 {
        self.spec.wire_outer_diameter
    }

    pub fn conductor_diameter(&self) -> f64 {
        self.conductor_diameter
    }

    pub fn layout(&self) -> WindingLayout {
        self.layout
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn turns_overridden(&self) -> bool {
        self.spec.turns.is_some()
    }

    /// Copy of this geometry with a different core material. The resolved
    /// turn count carries over unchanged.
    pub fn with_material(&self, material: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.spec.core_material = material.into();
        copy
    }

    pub fn variant(&self, variant: Variant) -> Self {
        match variant {
            Variant::Air => self.with_material(AIR_MATERIAL),
            Variant::Core => self.clone(),
        }
    }

    pub fn winding_label(&self) -> Point {
        let spec = &self.spec;
        Point::new(
            0.5 * spec.coil_inner_diameter
                + 0.25 * (spec.coil_outer_diameter - spec.coil_inner_diameter),
            0.0,
        )
    }

    pub fn core_label(&self) -> Point {
        let spec = &self.spec;
        Point::new(
            0.5 * spec.core_inner_diameter
                + 0.25 * (spec.core_outer_diameter - spec.core_inner_diameter),
            0.0,
        )
    }

    pub fn winding_region(&self) -> Rectangle {
        let spec = &self.spec;
        Rectangle::new(
            0.5 * spec.coil_inner_diameter,
            -0.5 * spec.winding_length,
            0.5 * spec.coil_outer_diameter,
            0.5 * spec.winding_length,
        )
    }

    pub fn core_region(&self) -> Rectangle {
        let spec = &self.spec;
        Rectangle::new(
            0.5 * spec.core_inner_diameter,
            -0.5 * spec.core_length,
            0.5 * spec.core_outer_diameter,
            0.5 * spec.core_length,
        )
    }
}

impl SceneObject for CoilGeometry {
    fn labels(&self) -> Vec<Point> {
        vec![self.winding_label(), self.core_label()]
    }

    fn regions(&self) -> Vec<Rectangle> {
        vec![self.winding_region(), self.core_region()]
    }

    fn materials(&self) -> Vec<MaterialDefinition> {
        vec![
            sensor_wire(self.spec.wire_outer_diameter),
            MaterialDefinition::library(self.spec.core_material.clone()),
        ]
    }

    fn circuits(&self) -> Vec<Circuit> {
        vec![Circuit::series(SENSOR_CIRCUIT, 0.0)]
    }

    fn block_assignments(&self) -> Vec<BlockAssignment> {
        vec![
            BlockAssignment::winding(
                self.winding_label(),
                SENSOR_MATERIAL,
                SENSOR_CIRCUIT,
                self.turns,
            ),
            BlockAssignment::passive(self.core_label(), self.spec.core_material.clone()),
        ]
    }
}
