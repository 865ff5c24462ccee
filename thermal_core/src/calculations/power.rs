//! # Component Power
//!
//! Conducted heat load of a single component across its stage:
//!
//! ```text
//! P_part  = Σ_paths (A/L)_path × ∫[T_low, T_high] k_path(T) dT
//! P_total = P_part × count
//! ```
//!
//! Declared-power parts skip the thermal computation entirely.

use serde::{Deserialize, Serialize};

use super::geometry::conduction_paths;
use super::integrator::conduction_integral;
use crate::components::{Component, ComponentKind};
use crate::errors::{ThermalError, ThermalResult};
use crate::materials::MaterialLibrary;
use crate::settings::ExtrapolationPolicy;
use crate::stages::Stage;

/// Power figures for one component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    /// Power per part (W)
    pub per_part_w: f64,
    /// Power per part × count (W)
    pub total_w: f64,
}

/// A component whose calculation failed, tagged with its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub stage: String,
    pub component: String,
    pub error: ThermalError,
}

impl std::fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}: {}", self.stage, self.component, self.error)
    }
}

/// Compute the power of a component bridging `stage`. Pure: the component
/// is not modified.
///
/// # Errors
///
/// Geometry and material errors, see [`conduction_paths`] and
/// [`conduction_integral`].
pub fn compute(
    component: &Component,
    stage: &Stage,
    library: &MaterialLibrary,
    policy: ExtrapolationPolicy,
) -> ThermalResult<PowerResult> {
    let per_part_w = match component.kind() {
        ComponentKind::Other(p) => p.power_per_part_w,
        kind => {
            let mut sum = 0.0;
            for path in conduction_paths(kind)? {
                let integral = conduction_integral(library, &path.material, stage.low_k, stage.high_k, policy)?;
                sum += path.a_over_l_m * integral;
            }
            sum
        }
    };
    Ok(PowerResult {
        per_part_w,
        total_w: per_part_w * f64::from(component.count()),
    })
}

/// Compute and store the power of a component. On failure the stored power
/// figures are left untouched and the error is tagged with the component's
/// stage and name.
pub fn apply(
    component: &mut Component,
    stage: &Stage,
    library: &MaterialLibrary,
    policy: ExtrapolationPolicy,
) -> Result<PowerResult, ComponentFailure> {
    match compute(component, stage, library, policy) {
        Ok(result) => {
            component.store_computed(result.per_part_w, result.total_w);
            Ok(result)
        }
        Err(error) => Err(ComponentFailure {
            stage: stage.name.clone(),
            component: component.name().to_string(),
            error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::components::{AreaLengthRatio, CoaxGeometry, DirectPower, PowerState, SimpleGeometry};
    use crate::materials::ConductivityTable;

    const STRICT: ExtrapolationPolicy = ExtrapolationPolicy::Error;

    // Linear cumulative integrals make the stage integral easy to read off
    fn library() -> MaterialLibrary {
        [
            // 10 W/m over 1 K .. 2 K
            ConductivityTable::from_pairs("Ten", &[(0.1, 0.0), (1.0, 5.0), (2.0, 15.0), (300.0, 500.0)]).unwrap(),
            ConductivityTable::from_pairs("Case", &[(0.1, 0.0), (1.0, 1.0), (2.0, 4.0), (300.0, 400.0)]).unwrap(),
            ConductivityTable::from_pairs("Dielectric", &[(0.1, 0.0), (1.0, 0.1), (2.0, 0.3), (300.0, 10.0)]).unwrap(),
            ConductivityTable::from_pairs("Core", &[(0.1, 0.0), (1.0, 2.0), (2.0, 9.0), (300.0, 900.0)]).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    fn stage() -> Stage {
        Stage::new("1K", 1.0, 2.0)
    }

    #[test]
    fn test_simple_rod_power() {
        let rod = Component::new(
            "Rod",
            3,
            ComponentKind::Simple(SimpleGeometry {
                material: "Ten".to_string(),
                od_m: 0.002,
                id_m: 0.0,
                length_m: 0.5,
            }),
        )
        .unwrap();
        let result = compute(&rod, &stage(), &library(), STRICT).unwrap();

        let expected = PI * 0.002_f64.powi(2) / (4.0 * 0.5) * 10.0;
        assert!((result.per_part_w - expected).abs() < 1e-15);
        assert!((result.total_w - 3.0 * expected).abs() < 1e-15);
    }

    #[test]
    fn test_area_length_ratio_power() {
        let part = Component::new(
            "Standoff",
            2,
            ComponentKind::AreaLengthRatio(AreaLengthRatio {
                material: "Ten".to_string(),
                a_over_l_m: 1e-3,
            }),
        )
        .unwrap();
        let result = compute(&part, &stage(), &library(), STRICT).unwrap();
        assert!((result.per_part_w - 1e-2).abs() < 1e-15);
        assert!((result.total_w - 2e-2).abs() < 1e-15);
    }

    #[test]
    fn test_coax_is_sum_of_layers() {
        let geometry = CoaxGeometry {
            case_material: "Case".to_string(),
            insulator_material: "Dielectric".to_string(),
            core_material: "Core".to_string(),
            case_od_m: 0.00219,
            insulator_od_m: 0.00168,
            core_od_m: 0.00051,
            length_m: 0.3,
        };
        let cable = Component::new("SC-219", 8, ComponentKind::Coax(geometry.clone())).unwrap();
        let lib = library();
        let result = compute(&cable, &stage(), &lib, STRICT).unwrap();

        // Each layer as an independent tube of the same material
        let layer = |material: &str, od_m: f64, id_m: f64| {
            let tube = Component::new(
                "layer",
                1,
                ComponentKind::Simple(SimpleGeometry { material: material.to_string(), od_m, id_m, length_m: 0.3 }),
            )
            .unwrap();
            compute(&tube, &stage(), &lib, STRICT).unwrap().per_part_w
        };
        let expected = layer("Case", 0.00219, 0.00168) + layer("Dielectric", 0.00168, 0.00051) + layer("Core", 0.00051, 0.0);
        assert!((result.per_part_w - expected).abs() < 1e-15);
        assert!((result.total_w - 8.0 * expected).abs() < 1e-14);
    }

    #[test]
    fn test_coax_single_layer_matches_simple() {
        // Two layers made of a material with zero integral over the stage
        let lib: MaterialLibrary = library()
            .tables()
            .cloned()
            .chain([ConductivityTable::from_pairs("Null", &[(0.1, 0.0), (300.0, 0.0)]).unwrap()])
            .collect();
        let cable = Component::new(
            "Coax",
            1,
            ComponentKind::Coax(CoaxGeometry {
                case_material: "Null".to_string(),
                insulator_material: "Null".to_string(),
                core_material: "Ten".to_string(),
                case_od_m: 0.002,
                insulator_od_m: 0.0015,
                core_od_m: 0.0005,
                length_m: 0.2,
            }),
        )
        .unwrap();
        let wire = Component::new(
            "Wire",
            1,
            ComponentKind::Simple(SimpleGeometry {
                material: "Ten".to_string(),
                od_m: 0.0005,
                id_m: 0.0,
                length_m: 0.2,
            }),
        )
        .unwrap();

        let coax_power = compute(&cable, &stage(), &lib, STRICT).unwrap().per_part_w;
        let wire_power = compute(&wire, &stage(), &lib, STRICT).unwrap().per_part_w;
        assert!((coax_power - wire_power).abs() < 1e-15);
    }

    #[test]
    fn test_other_needs_no_materials() {
        let amp = Component::new("LNA", 4, ComponentKind::Other(DirectPower { power_per_part_w: 0.05 })).unwrap();
        let result = compute(&amp, &stage(), &MaterialLibrary::new(), STRICT).unwrap();
        assert_eq!(result.per_part_w, 0.05);
        assert!((result.total_w - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_apply_stores_or_tags_failure() {
        let lib = library();
        let mut rod = Component::new(
            "Rod",
            1,
            ComponentKind::Simple(SimpleGeometry {
                material: "Ten".to_string(),
                od_m: 0.002,
                id_m: 0.0,
                length_m: 0.5,
            }),
        )
        .unwrap();
        apply(&mut rod, &stage(), &lib, STRICT).unwrap();
        assert_eq!(rod.power().state, PowerState::Computed);
        let computed = rod.power();

        let cold = Stage::new("100mK", 0.05, 0.1);
        let failure = apply(&mut rod, &cold, &lib, STRICT).unwrap_err();
        assert_eq!(failure.stage, "100mK");
        assert_eq!(failure.component, "Rod");
        assert_eq!(failure.error.error_code(), "OUT_OF_RANGE");
        // Previous figures untouched
        assert_eq!(rod.power(), computed);
    }
}
