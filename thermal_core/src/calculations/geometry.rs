//! # Geometry Reduction
//!
//! Reduces a component's declared shape to one or more thermally parallel
//! conduction paths, each with its own material and area-over-length ratio.
//!
//! | Variant | Paths |
//! |---------|-------|
//! | Simple | one annulus `π(OD² − ID²)/4` over `length` |
//! | Coax | case annulus, insulator annulus, core disc, same `length` |
//! | A/L | one path, ratio as given |
//! | Other | none |

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::components::{AreaLengthRatio, CoaxGeometry, ComponentKind, SimpleGeometry};
use crate::errors::{ThermalError, ThermalResult};

/// One conduction path through a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductionPath {
    pub material: String,
    /// Cross-sectional area over length (m)
    pub a_over_l_m: f64,
}

/// Cross-sectional area of a ring (m²)
pub fn annulus_area_m2(outer_d_m: f64, inner_d_m: f64) -> f64 {
    PI * (outer_d_m * outer_d_m - inner_d_m * inner_d_m) / 4.0
}

/// Conduction paths for a component kind.
///
/// # Errors
///
/// * `InvalidGeometry` - non-physical or non-finite dimensions
pub fn conduction_paths(kind: &ComponentKind) -> ThermalResult<Vec<ConductionPath>> {
    match kind {
        ComponentKind::Simple(g) => simple_paths(g),
        ComponentKind::Coax(g) => coax_paths(g),
        ComponentKind::AreaLengthRatio(g) => ratio_paths(g),
        ComponentKind::Other(_) => Ok(Vec::new()),
    }
}

fn simple_paths(g: &SimpleGeometry) -> ThermalResult<Vec<ConductionPath>> {
    require_finite("OD", g.od_m)?;
    require_finite("ID", g.id_m)?;
    require_length(g.length_m)?;
    if g.id_m < 0.0 {
        return Err(ThermalError::invalid_geometry("ID", g.id_m.to_string(), "Inner diameter cannot be negative"));
    }
    if g.od_m <= g.id_m {
        return Err(ThermalError::invalid_geometry(
            "OD",
            g.od_m.to_string(),
            format!("Outer diameter must exceed inner diameter ({})", g.id_m),
        ));
    }
    Ok(vec![ConductionPath {
        material: g.material.clone(),
        a_over_l_m: annulus_area_m2(g.od_m, g.id_m) / g.length_m,
    }])
}

fn coax_paths(g: &CoaxGeometry) -> ThermalResult<Vec<ConductionPath>> {
    require_finite("OD", g.case_od_m)?;
    require_finite("OD_I", g.insulator_od_m)?;
    require_finite("OD_c", g.core_od_m)?;
    require_length(g.length_m)?;
    if g.core_od_m <= 0.0 {
        return Err(ThermalError::invalid_geometry("OD_c", g.core_od_m.to_string(), "Core diameter must be positive"));
    }
    if g.insulator_od_m < g.core_od_m {
        return Err(ThermalError::invalid_geometry(
            "OD_I",
            g.insulator_od_m.to_string(),
            format!("Insulator diameter must be at least the core diameter ({})", g.core_od_m),
        ));
    }
    if g.case_od_m < g.insulator_od_m {
        return Err(ThermalError::invalid_geometry(
            "OD",
            g.case_od_m.to_string(),
            format!("Case diameter must be at least the insulator diameter ({})", g.insulator_od_m),
        ));
    }

    let length = g.length_m;
    Ok(vec![
        ConductionPath {
            material: g.case_material.clone(),
            a_over_l_m: annulus_area_m2(g.case_od_m, g.insulator_od_m) / length,
        },
        ConductionPath {
            material: g.insulator_material.clone(),
            a_over_l_m: annulus_area_m2(g.insulator_od_m, g.core_od_m) / length,
        },
        ConductionPath {
            material: g.core_material.clone(),
            a_over_l_m: annulus_area_m2(g.core_od_m, 0.0) / length,
        },
    ])
}

fn ratio_paths(g: &AreaLengthRatio) -> ThermalResult<Vec<ConductionPath>> {
    require_finite("A/L", g.a_over_l_m)?;
    if g.a_over_l_m <= 0.0 {
        return Err(ThermalError::invalid_geometry("A/L", g.a_over_l_m.to_string(), "A/L must be positive"));
    }
    Ok(vec![ConductionPath {
        material: g.material.clone(),
        a_over_l_m: g.a_over_l_m,
    }])
}

fn require_finite(field: &str, value: f64) -> ThermalResult<()> {
    if !value.is_finite() {
        return Err(ThermalError::invalid_geometry(field, value.to_string(), "Value must be finite"));
    }
    Ok(())
}

fn require_length(length_m: f64) -> ThermalResult<()> {
    require_finite("length", length_m)?;
    if length_m <= 0.0 {
        return Err(ThermalError::invalid_geometry("length", length_m.to_string(), "Length must be positive"));
    }
    Ok(())
}
