//! # Cryogenic Stages
//!
//! A [`StageLadder`] is the ordered chain of temperature stages from the
//! warmest to the coldest. Each [`Stage`] spans `(low_k, high_k)` and every
//! component bridges exactly one stage, so its conducted load is driven by
//! that stage's temperature difference.
//!
//! Invariants checked by [`StageLadder::validate`]:
//! - at least one stage, names unique and non-empty
//! - `low_k < high_k` for every stage, all bounds finite and non-negative
//! - stage *i*'s `high_k` equals stage *i−1*'s `low_k`
//!
//! ## Example
//!
//! ```rust
//! use thermal_core::stages::StageLadder;
//!
//! let ladder = StageLadder::default();
//! let stage = ladder.get("4K - LHe").unwrap();
//! assert_eq!(stage.low_k, 4.2);
//! assert_eq!(stage.high_k, 169.0);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ThermalError, ThermalResult};

/// One temperature interval of the cooling chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name (e.g., "1K", "300mK")
    pub name: String,
    /// Cold-side temperature (K)
    pub low_k: f64,
    /// Warm-side temperature (K)
    pub high_k: f64,
}

impl Stage {
    pub fn new(name: impl Into<String>, low_k: f64, high_k: f64) -> Self {
        Stage {
            name: name.into(),
            low_k,
            high_k,
        }
    }

    /// Temperature difference across the stage (K)
    pub fn delta_k(&self) -> f64 {
        self.high_k - self.low_k
    }
}

/// Bounds of a stage as stored in a bundle's `stage_details`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageBounds {
    #[serde(rename = "lowT")]
    pub low_k: f64,
    #[serde(rename = "highT")]
    pub high_k: f64,
}

/// Stage names of the default ladder, warmest first
pub const DEFAULT_STAGE_NAMES: [&str; 6] = ["PTC 1", "PTC 2", "4K - LHe", "1K", "300mK", "100mK"];

/// Boundary temperatures of the default ladder (K), warmest first
pub const DEFAULT_STAGE_TEMPS_K: [f64; 7] = [260.0, 240.0, 169.0, 4.2, 2.0, 0.3, 0.1];

/// Ordered chain of stages, warmest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLadder {
    stages: Vec<Stage>,
}

impl StageLadder {
    /// Build a ladder from stages given warmest first, validating with the
    /// given relative boundary tolerance.
    pub fn new(stages: Vec<Stage>, tolerance: f64) -> ThermalResult<Self> {
        let ladder = StageLadder { stages };
        ladder.validate(tolerance)?;
        Ok(ladder)
    }

    /// Build a ladder from a `stage_details` map. Map order carries no
    /// meaning, so stages are ordered by descending `high_k` first.
    pub fn from_details(details: &BTreeMap<String, StageBounds>, tolerance: f64) -> ThermalResult<Self> {
        let mut stages: Vec<Stage> = details
            .iter()
            .map(|(name, b)| Stage::new(name.clone(), b.low_k, b.high_k))
            .collect();
        stages.sort_by(|a, b| b.high_k.total_cmp(&a.high_k));
        Self::new(stages, tolerance)
    }

    /// The `stage_details` view of this ladder
    pub fn to_details(&self) -> BTreeMap<String, StageBounds> {
        self.stages
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    StageBounds {
                        low_k: s.low_k,
                        high_k: s.high_k,
                    },
                )
            })
            .collect()
    }

    /// Check every ladder invariant.
    pub fn validate(&self, tolerance: f64) -> ThermalResult<()> {
        if self.stages.is_empty() {
            return Err(ThermalError::malformed_ladder("Ladder has no stages"));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(ThermalError::malformed_ladder("Stage name is empty"));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(ThermalError::malformed_ladder(format!(
                    "Duplicate stage name '{}'",
                    stage.name
                )));
            }
            if !stage.low_k.is_finite() || !stage.high_k.is_finite() || stage.low_k < 0.0 {
                return Err(ThermalError::malformed_ladder(format!(
                    "Stage '{}' has non-physical bounds ({} K, {} K)",
                    stage.name, stage.low_k, stage.high_k
                )));
            }
            if stage.low_k >= stage.high_k {
                return Err(ThermalError::malformed_ladder(format!(
                    "Stage '{}' low bound {} K is not below high bound {} K",
                    stage.name, stage.low_k, stage.high_k
                )));
            }
        }

        for pair in self.stages.windows(2) {
            let (warm, cold) = (&pair[0], &pair[1]);
            let scale = warm.low_k.abs().max(cold.high_k.abs()).max(1.0);
            if (warm.low_k - cold.high_k).abs() > tolerance * scale {
                return Err(ThermalError::malformed_ladder(format!(
                    "Stage '{}' ends at {} K but stage '{}' starts at {} K",
                    warm.name, warm.low_k, cold.name, cold.high_k
                )));
            }
        }
        Ok(())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Look up a stage or fail with `UnknownStage`
    pub fn require(&self, name: &str) -> ThermalResult<&Stage> {
        self.get(name).ok_or_else(|| ThermalError::unknown_stage(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageLadder {
    /// Pulse-tube stages down to a 100 mK cold plate
    fn default() -> Self {
        let stages = DEFAULT_STAGE_NAMES
            .iter()
            .zip(DEFAULT_STAGE_TEMPS_K.windows(2))
            .map(|(name, temps)| Stage::new(*name, temps[1], temps[0]))
            .collect();
        StageLadder { stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_default_ladder_is_valid() {
        let ladder = StageLadder::default();
        assert_eq!(ladder.len(), 6);
        ladder.validate(TOL).unwrap();

        let first = &ladder.stages()[0];
        assert_eq!(first.name, "PTC 1");
        assert_eq!((first.low_k, first.high_k), (240.0, 260.0));

        let last = &ladder.stages()[5];
        assert_eq!(last.name, "100mK");
        assert_eq!((last.low_k, last.high_k), (0.1, 0.3));
    }

    #[test]
    fn test_delta_k() {
        let ladder = StageLadder::default();
        let lhe = ladder.get("4K - LHe").unwrap();
        assert!((lhe.delta_k() - 164.8).abs() < 1e-9);
    }

    #[test]
    fn test_gap_is_malformed() {
        let stages = vec![Stage::new("A", 4.0, 50.0), Stage::new("B", 1.0, 3.0)];
        let err = StageLadder::new(stages, TOL).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_STAGE_LADDER");
    }

    #[test]
    fn test_inverted_stage_is_malformed() {
        let err = StageLadder::new(vec![Stage::new("A", 4.0, 4.0)], TOL).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_duplicate_names_are_malformed() {
        let stages = vec![Stage::new("A", 4.0, 50.0), Stage::new("A", 1.0, 4.0)];
        assert!(StageLadder::new(stages, TOL).is_err());
    }

    #[test]
    fn test_empty_ladder_is_malformed() {
        assert!(StageLadder::new(Vec::new(), TOL).is_err());
    }

    #[test]
    fn test_details_roundtrip_restores_order() {
        let ladder = StageLadder::default();
        let details = ladder.to_details();
        let rebuilt = StageLadder::from_details(&details, TOL).unwrap();
        assert_eq!(rebuilt, ladder);
    }

    #[test]
    fn test_details_serialize_with_bundle_keys() {
        let bounds = StageBounds { low_k: 4.2, high_k: 169.0 };
        let json = serde_json::to_string(&bounds).unwrap();
        assert_eq!(json, r#"{"lowT":4.2,"highT":169.0}"#);
    }

    #[test]
    fn test_require_unknown_stage() {
        let ladder = StageLadder::default();
        assert_eq!(ladder.require("2K").unwrap_err(), ThermalError::unknown_stage("2K"));
        assert!(ladder.require("1K").is_ok());
    }
}
