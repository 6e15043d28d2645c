use crate::common::constants::{
    COPPER_CONDUCTIVITY_MS_PER_M, SENSOR_MATERIAL, TRANSMITTER_CONDUCTIVITY_FACTOR,
    TRANSMITTER_MATERIAL,
};
use crate::solver::{LaminationType, MaterialDefinition, MaterialProperties};

/// Non-magnetic conductor with the given conductivity (MS/m).
fn conductor(name: &str, conductivity: f64) -> MaterialProperties {
    MaterialProperties {
        name: name.to_string(),
        mu_x: 1.0,
        mu_y: 1.0,
        coercivity: 0.0,
        current_density: 0.0,
        conductivity,
        lamination_thickness: 0.0,
        hysteresis_lag: 0.0,
        lamination_fill: 1.0,
        lamination: LaminationType::NotLaminated,
        hysteresis_lag_x: 0.0,
        hysteresis_lag_y: 0.0,
        strands: 0,
        strand_diameter: 0.0,
    }
}

/// Single-strand copper magnet wire for the sensor winding.
pub fn sensor_wire(strand_diameter: f64) -> MaterialDefinition {
    MaterialDefinition::Custom(MaterialProperties {
        lamination: LaminationType::MagnetWire,
        strands: 1,
        strand_diameter,
        ..conductor(SENSOR_MATERIAL, COPPER_CONDUCTIVITY_MS_PER_M)
    })
}

pub fn transmitter_wire() -> MaterialDefinition {
    MaterialDefinition::Custom(conductor(
        TRANSMITTER_MATERIAL,
        COPPER_CONDUCTIVITY_MS_PER_M * TRANSMITTER_CONDUCTIVITY_FACTOR,
    ))
}
