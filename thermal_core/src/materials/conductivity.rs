//! Tabulated Conductivity Integrals
//!
//! Each material is described by samples of its cumulative conductivity
//! integral `∫k(T)dT` (W/m) measured from some reference temperature. The
//! absolute reference does not matter: only differences between two
//! temperatures are ever used.
//!
//! Values between samples are linearly interpolated. Nothing is
//! extrapolated unless the caller asks for [`ExtrapolationPolicy::Clamp`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{ThermalError, ThermalResult};
use crate::settings::ExtrapolationPolicy;

/// One tabulated point of a cumulative conductivity integral
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConductivitySample {
    /// Temperature (K)
    pub temperature_k: f64,
    /// Cumulative conductivity integral at this temperature (W/m)
    pub integral_w_per_m: f64,
}

impl ConductivitySample {
    pub const fn new(temperature_k: f64, integral_w_per_m: f64) -> Self {
        ConductivitySample {
            temperature_k,
            integral_w_per_m,
        }
    }
}

/// Validated, temperature-ordered integral table for one material.
///
/// Invariants established by [`ConductivityTable::new`]:
/// - at least two samples
/// - all values finite
/// - temperatures strictly increasing
/// - integral values non-decreasing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductivityTable {
    material: String,
    samples: Vec<ConductivitySample>,
}

impl ConductivityTable {
    /// Build a table, rejecting data that breaks the invariants above.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thermal_core::materials::{ConductivitySample, ConductivityTable};
    ///
    /// let table = ConductivityTable::new("Copper", vec![
    ///     ConductivitySample::new(1.0, 0.0),
    ///     ConductivitySample::new(4.0, 600.0),
    /// ]).unwrap();
    /// assert_eq!(table.span(), (1.0, 4.0));
    /// ```
    pub fn new(material: impl Into<String>, samples: Vec<ConductivitySample>) -> ThermalResult<Self> {
        let material = material.into();
        if material.trim().is_empty() {
            return Err(ThermalError::material_table(material, "Material name is empty"));
        }
        if samples.len() < 2 {
            return Err(ThermalError::material_table(
                material,
                format!("At least two samples are required, got {}", samples.len()),
            ));
        }
        if let Some(bad) = samples
            .iter()
            .find(|s| !s.temperature_k.is_finite() || !s.integral_w_per_m.is_finite())
        {
            return Err(ThermalError::material_table(
                material,
                format!(
                    "Non-finite sample ({}, {})",
                    bad.temperature_k, bad.integral_w_per_m
                ),
            ));
        }
        for pair in samples.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.temperature_k <= a.temperature_k {
                return Err(ThermalError::material_table(
                    material,
                    format!(
                        "Temperatures must be strictly increasing ({} K followed by {} K)",
                        a.temperature_k, b.temperature_k
                    ),
                ));
            }
            if b.integral_w_per_m < a.integral_w_per_m {
                return Err(ThermalError::material_table(
                    material,
                    format!(
                        "Cumulative integral decreases between {} K and {} K",
                        a.temperature_k, b.temperature_k
                    ),
                ));
            }
        }
        Ok(ConductivityTable { material, samples })
    }

    /// Convenience constructor from `(temperature_k, integral_w_per_m)` pairs
    pub fn from_pairs(material: impl Into<String>, pairs: &[(f64, f64)]) -> ThermalResult<Self> {
        let samples = pairs
            .iter()
            .map(|&(t, i)| ConductivitySample::new(t, i))
            .collect();
        Self::new(material, samples)
    }

    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn samples(&self) -> &[ConductivitySample] {
        &self.samples
    }

    /// Lowest and highest tabulated temperature (K)
    pub fn span(&self) -> (f64, f64) {
        // new() guarantees at least two samples
        let first = self.samples[0];
        let last = self.samples[self.samples.len() - 1];
        (first.temperature_k, last.temperature_k)
    }

    /// Interpolated cumulative integral at `temperature_k`.
    pub fn integral_at(&self, temperature_k: f64, policy: ExtrapolationPolicy) -> ThermalResult<f64> {
        let (min_k, max_k) = self.span();

        if !(min_k..=max_k).contains(&temperature_k) {
            let out_of_range = ThermalError::OutOfRange {
                material: self.material.clone(),
                temperature_k,
                min_k,
                max_k,
            };
            return match policy {
                ExtrapolationPolicy::Error => Err(out_of_range),
                // NaN has no nearest endpoint
                ExtrapolationPolicy::Clamp if temperature_k.is_nan() => Err(out_of_range),
                ExtrapolationPolicy::Clamp => {
                    let edge = if temperature_k < min_k {
                        self.samples[0]
                    } else {
                        self.samples[self.samples.len() - 1]
                    };
                    warn!(
                        material = %self.material,
                        temperature_k,
                        clamped_to_k = edge.temperature_k,
                        "conductivity lookup clamped to table edge"
                    );
                    Ok(edge.integral_w_per_m)
                }
            };
        }

        // First sample strictly above the query; 1..=len because samples[0] <= T
        let upper = self.samples.partition_point(|s| s.temperature_k <= temperature_k);
        if upper == self.samples.len() {
            return Ok(self.samples[upper - 1].integral_w_per_m);
        }

        let a = self.samples[upper - 1];
        let b = self.samples[upper];
        let frac = (temperature_k - a.temperature_k) / (b.temperature_k - a.temperature_k);
        Ok(a.integral_w_per_m + frac * (b.integral_w_per_m - a.integral_w_per_m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copper() -> ConductivityTable {
        ConductivityTable::from_pairs("Copper", &[(1.0, 0.0), (4.0, 600.0), (10.0, 3000.0), (300.0, 100000.0)])
            .unwrap()
    }

    #[test]
    fn test_exact_sample_lookup() {
        let table = copper();
        assert_eq!(table.integral_at(1.0, ExtrapolationPolicy::Error).unwrap(), 0.0);
        assert_eq!(table.integral_at(4.0, ExtrapolationPolicy::Error).unwrap(), 600.0);
        assert_eq!(table.integral_at(300.0, ExtrapolationPolicy::Error).unwrap(), 100000.0);
    }

    #[test]
    fn test_linear_interpolation() {
        let table = copper();
        // Halfway between 4 K (600) and 10 K (3000)
        let value = table.integral_at(7.0, ExtrapolationPolicy::Error).unwrap();
        assert!((value - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_is_error() {
        let table = copper();
        let err = table.integral_at(0.5, ExtrapolationPolicy::Error).unwrap_err();
        match err {
            ThermalError::OutOfRange { material, temperature_k, min_k, max_k } => {
                assert_eq!(material, "Copper");
                assert_eq!(temperature_k, 0.5);
                assert_eq!(min_k, 1.0);
                assert_eq!(max_k, 300.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(table.integral_at(300.1, ExtrapolationPolicy::Error).is_err());
    }

    #[test]
    fn test_clamp_policy_holds_edges() {
        let table = copper();
        assert_eq!(table.integral_at(0.1, ExtrapolationPolicy::Clamp).unwrap(), 0.0);
        assert_eq!(table.integral_at(400.0, ExtrapolationPolicy::Clamp).unwrap(), 100000.0);
        assert!(table.integral_at(f64::NAN, ExtrapolationPolicy::Clamp).is_err());
    }

    #[test]
    fn test_nan_is_out_of_range() {
        let table = copper();
        let err = table.integral_at(f64::NAN, ExtrapolationPolicy::Error).unwrap_err();
        assert_eq!(err.error_code(), "OUT_OF_RANGE");
    }

    #[test]
    fn test_rejects_non_increasing_temperatures() {
        let err = ConductivityTable::from_pairs("Bad", &[(1.0, 0.0), (1.0, 5.0)]).unwrap_err();
        assert_eq!(err.error_code(), "MATERIAL_TABLE");
        assert!(ConductivityTable::from_pairs("Bad", &[(2.0, 0.0), (1.0, 5.0)]).is_err());
    }

    #[test]
    fn test_rejects_decreasing_integral() {
        let err = ConductivityTable::from_pairs("Bad", &[(1.0, 5.0), (2.0, 4.0)]).unwrap_err();
        assert!(err.to_string().contains("decreases"));
    }

    #[test]
    fn test_rejects_short_and_non_finite_tables() {
        assert!(ConductivityTable::from_pairs("One", &[(1.0, 0.0)]).is_err());
        assert!(ConductivityTable::from_pairs("Inf", &[(1.0, 0.0), (f64::INFINITY, 1.0)]).is_err());
        assert!(ConductivityTable::from_pairs("  ", &[(1.0, 0.0), (2.0, 1.0)]).is_err());
    }
}
