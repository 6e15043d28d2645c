//! Physical constants and fixed names shared by the geometry, solver and
//! sweep layers.

pub const PI: f64 = std::f64::consts::PI;
pub const TWO_PI: f64 = 2.0 * PI;

/// Vacuum permeability in H/m (CODATA 2018).
pub const MU_0: f64 = 1.256_637_062_12e-6;

/// Conductivity of annealed copper at 20 C in MS/m.
pub const COPPER_CONDUCTIVITY_MS_PER_M: f64 = 58.0;

/// Transmitter windings are modelled at 65 % of solid copper conductivity.
pub const TRANSMITTER_CONDUCTIVITY_FACTOR: f64 = 0.65;

pub const SENSOR_CIRCUIT: &str = "icoil_sensor";
pub const TRANSMITTER_CIRCUIT: &str = "icoil_transmitter";

pub const AIR_MATERIAL: &str = "Air";
pub const SENSOR_MATERIAL: &str = "Sensor";
pub const TRANSMITTER_MATERIAL: &str = "Transmitter";

/// Helmholtz radius as a multiple of (coil length + coil outer diameter).
pub const HELMHOLTZ_SCALE: f64 = 100.0;
/// Half edge length of each square Helmholtz winding section, in meters.
pub const HELMHOLTZ_SECTION_HALF_WIDTH_M: f64 = 5.0e-3;
pub const HELMHOLTZ_TURNS: u32 = 1;

/// Sensor drive current used for self-impedance extraction, in amperes.
pub const DEFAULT_PROBE_CURRENT: f64 = 1.0e-6;
