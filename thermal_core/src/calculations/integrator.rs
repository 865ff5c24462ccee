//! # Conduction Integral
//!
//! Definite integral of thermal conductivity over a temperature interval:
//!
//! ```text
//! ∫[T_low, T_high] k(T) dT = I(T_high) − I(T_low)
//! ```
//!
//! where `I` is the tabulated cumulative integral of the material. Heat
//! conducted through a path of area `A` and length `L` is then
//! `(A/L) × ∫k dT`.

use crate::errors::{ThermalError, ThermalResult};
use crate::materials::MaterialLibrary;
use crate::settings::ExtrapolationPolicy;

/// Conductivity integral of `material` between `low_k` and `high_k` (W/m).
///
/// # Errors
///
/// * `InvalidRange` - `low_k` is not strictly below `high_k`
/// * `UnknownMaterial` / `OutOfRange` - from the table lookup; `policy`
///   decides whether bounds outside the table fail or clamp
///
/// # Example
///
/// ```rust
/// use thermal_core::calculations::integrator::conduction_integral;
/// use thermal_core::materials::{ConductivityTable, MaterialLibrary};
/// use thermal_core::settings::ExtrapolationPolicy;
///
/// let library: MaterialLibrary = [ConductivityTable::from_pairs(
///     "Manganin",
///     &[(1.0, 0.1), (4.0, 1.0), (300.0, 4500.0)],
/// ).unwrap()].into_iter().collect();
///
/// let integral = conduction_integral(&library, "Manganin", 1.0, 4.0, ExtrapolationPolicy::Error).unwrap();
/// assert!((integral - 0.9).abs() < 1e-12);
/// ```
pub fn conduction_integral(
    library: &MaterialLibrary,
    material: &str,
    low_k: f64,
    high_k: f64,
    policy: ExtrapolationPolicy,
) -> ThermalResult<f64> {
    if low_k.is_nan() || high_k.is_nan() || low_k >= high_k {
        return Err(ThermalError::InvalidRange { low_k, high_k });
    }
    let high = library.integral_at(material, high_k, policy)?;
    let low = library.integral_at(material, low_k, policy)?;
    Ok(high - low)
}
