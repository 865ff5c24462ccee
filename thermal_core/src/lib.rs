//! # thermal_core - Cryogenic Heat-Load Engine
//!
//! `thermal_core` computes the conductive heat load that mechanical and
//! electrical parts carry into each temperature stage of a cryostat. Each
//! component's power is its cross-section over length times the integral of
//! the material's thermal conductivity across the stage's temperature span.
//! Stage totals and a system total are summed from there.
//!
//! ## Design Philosophy
//!
//! - **Caller-owned state**: the model is a plain value; nothing is global
//! - **Explicit passes**: edits mark results stale, a pass recomputes them
//! - **Isolated failures**: one bad component never blocks the others
//! - **JSON-First**: every type round-trips through serde
//!
//! ## Quick Start
//!
//! ```rust
//! use thermal_core::components::{Component, ComponentKind, SimpleGeometry};
//! use thermal_core::materials::{ConductivityTable, MaterialLibrary};
//! use thermal_core::model::ThermalModel;
//!
//! let library: MaterialLibrary = [ConductivityTable::from_pairs(
//!     "SS304",
//!     &[(0.1, 0.0), (4.2, 0.6), (300.0, 3000.0)],
//! )
//! .unwrap()]
//! .into_iter()
//! .collect();
//!
//! let mut model = ThermalModel::new("Cryo Team");
//! let rod = ComponentKind::Simple(SimpleGeometry {
//!     material: "SS304".to_string(),
//!     od_m: 0.003,
//!     id_m: 0.0,
//!     length_m: 0.2,
//! });
//! model.add_component("1K", Component::new("Support rod", 4, rod).unwrap()).unwrap();
//!
//! let report = model.recompute(&library).unwrap();
//! assert!(report.is_clean());
//! assert!(model.stage_load("1K").unwrap().total_w > 0.0);
//! ```
//!
//! ## Modules
//!
//! - [`materials`] - Conductivity integral tables and the material library
//! - [`stages`] - Temperature stage ladder
//! - [`components`] - Component variants and the component store
//! - [`calculations`] - Integrals, geometry, per-component power, aggregation
//! - [`model`] - Caller-owned model with staleness tracking
//! - [`bundle`] - Persisted JSON record format
//! - [`file_io`] - Atomic saves and file locking
//! - [`settings`] - Engine settings (TOML)
//! - [`errors`] - Structured error types

pub mod bundle;
pub mod calculations;
pub mod components;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod materials;
pub mod model;
pub mod settings;
pub mod stages;

pub use bundle::{compute_records, Bundle, ComponentRecord};
pub use components::{Component, ComponentKind, ComponentStore, PowerState};
pub use errors::{ThermalError, ThermalResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_bundle, load_model, save_bundle, save_model, FileLock};
pub use materials::{ConductivityTable, MaterialLibrary};
pub use model::ThermalModel;
pub use settings::{EngineSettings, ExtrapolationPolicy};
pub use stages::{Stage, StageLadder};
