//! # Thermal Load Calculations
//!
//! The calculation chain, leaf to root:
//!
//! - [`integrator`] - `∫k dT` over a stage from the material tables
//! - [`geometry`] - component shape → conduction paths (material, A/L)
//! - [`power`] - per-part and total power of one component
//! - [`aggregate`] - per-stage and system totals for a whole store
//!
//! Every function here is stateless; the caller owns the component store
//! and decides when a pass runs.

pub mod aggregate;
pub mod geometry;
pub mod integrator;
pub mod power;

// Re-export commonly used types
pub use aggregate::{recompute_all, RecomputeReport, StageLoad, SystemLoad};
pub use geometry::{conduction_paths, ConductionPath};
pub use integrator::conduction_integral;
pub use power::{apply, compute, ComponentFailure, PowerResult};
