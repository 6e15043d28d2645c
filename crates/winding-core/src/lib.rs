//! Helmholtz-driven field sweeps of inductive magnetic sensor coils.
//!
//! [`sweep::SweepOrchestrator`] drives a [`solver::SolverBackend`] through
//! the definition, analysis and impedance extraction of an air and a core
//! variant of one [`geometry::CoilGeometry`].

pub mod common;
pub mod domain;
pub mod geometry;
pub mod numerics;
pub mod solver;
pub mod sweep;
