//! # Stage Aggregation
//!
//! A calculation pass computes every component and sums the results per
//! stage and across the ladder.
//!
//! Failures are handled at two levels:
//!
//! - **Per component** (bad geometry, unknown material, out-of-range
//!   temperature): the component is left out of its stage total and listed
//!   in [`RecomputeReport::failures`]. The rest of the pass continues.
//! - **Structural** (malformed ladder, component in an unknown stage): the
//!   pass is aborted before any component is touched.
//!
//! Nothing here runs implicitly. Totals reflect the last pass, which may be
//! older than the latest edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::power::{apply, ComponentFailure};
use crate::components::ComponentStore;
use crate::errors::{ThermalError, ThermalResult};
use crate::materials::MaterialLibrary;
use crate::settings::EngineSettings;
use crate::stages::StageLadder;

/// Aggregated load of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLoad {
    pub stage: String,
    /// Sum of power totals of successfully computed components (W)
    pub total_w: f64,
    /// Number of components included in `total_w`
    pub computed: usize,
    /// Names of components left out because their calculation failed
    pub failed: Vec<String>,
    /// Subtotals per record type ("Component", "Coax", "A/L", "Other")
    pub by_kind: BTreeMap<String, f64>,
}

impl StageLoad {
    fn empty(stage: impl Into<String>) -> Self {
        StageLoad {
            stage: stage.into(),
            total_w: 0.0,
            computed: 0,
            failed: Vec::new(),
            by_kind: BTreeMap::new(),
        }
    }
}

/// Aggregated load of the whole ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    /// One entry per stage, ladder order
    pub stages: Vec<StageLoad>,
    /// Sum over all stages (W)
    pub grand_total_w: f64,
}

impl SystemLoad {
    /// All-zero load for a ladder
    pub fn zero(ladder: &StageLadder) -> Self {
        SystemLoad {
            stages: ladder.names().map(StageLoad::empty).collect(),
            grand_total_w: 0.0,
        }
    }

    /// Rebuild a load from stored per-stage totals (a bundle's
    /// `total_power`). Stages missing from `totals` count as zero; totals for
    /// stages outside the ladder are ignored.
    pub fn from_totals(ladder: &StageLadder, totals: &BTreeMap<String, f64>) -> Self {
        let stages: Vec<StageLoad> = ladder
            .names()
            .map(|name| StageLoad {
                total_w: totals.get(name).copied().filter(|t| t.is_finite()).unwrap_or(0.0),
                ..StageLoad::empty(name)
            })
            .collect();
        let grand_total_w = stages.iter().map(|s| s.total_w).sum();
        SystemLoad { stages, grand_total_w }
    }

    /// Read-only projection of one stage
    pub fn stage_load(&self, stage: &str) -> Option<&StageLoad> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Stage name → total (W), the shape of a bundle's `total_power`
    pub fn totals_by_stage(&self) -> BTreeMap<String, f64> {
        self.stages
            .iter()
            .map(|s| (s.stage.clone(), s.total_w))
            .collect()
    }
}

/// Outcome of one calculation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub load: SystemLoad,
    pub failures: Vec<ComponentFailure>,
}

impl RecomputeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Recompute every component in `store` and aggregate per stage.
///
/// Successful components get their power fields overwritten and become
/// `Computed`; failed ones keep their previous figures and stay `Stale`.
/// `settings` supplies the ladder tolerance and the extrapolation policy
/// for table lookups.
///
/// # Errors
///
/// * `MalformedStageLadder` - the ladder breaks its invariants
/// * `UnknownStage` - a component sits in a stage the ladder does not have
pub fn recompute_all(
    store: &mut ComponentStore,
    ladder: &StageLadder,
    library: &MaterialLibrary,
    settings: &EngineSettings,
) -> ThermalResult<RecomputeReport> {
    ladder.validate(settings.ladder_tolerance)?;
    if let Some((stage, _)) = store.iter().find(|(stage, _)| !ladder.contains(stage)) {
        return Err(ThermalError::unknown_stage(stage));
    }

    info!(
        components = store.len(),
        stages = ladder.len(),
        extrapolation = ?settings.extrapolation,
        "starting calculation pass"
    );

    let mut loads: BTreeMap<String, StageLoad> = BTreeMap::new();
    let mut failures = Vec::new();

    for (stage_name, component) in store.iter_mut() {
        let stage = ladder.require(stage_name)?;
        let load = loads
            .entry(stage_name.to_string())
            .or_insert_with(|| StageLoad::empty(stage_name));

        match apply(component, stage, library, settings.extrapolation) {
            Ok(result) => {
                debug!(
                    stage = stage_name,
                    component = component.name(),
                    per_part_w = result.per_part_w,
                    total_w = result.total_w,
                    "component computed"
                );
                load.total_w += result.total_w;
                load.computed += 1;
                *load
                    .by_kind
                    .entry(component.kind().record_type().to_string())
                    .or_insert(0.0) += result.total_w;
            }
            Err(failure) => {
                warn!(
                    stage = stage_name,
                    component = component.name(),
                    code = failure.error.error_code(),
                    "component calculation failed: {}",
                    failure.error
                );
                load.failed.push(component.name().to_string());
                failures.push(failure);
            }
        }
    }

    let stages: Vec<StageLoad> = ladder
        .names()
        .map(|name| loads.remove(name).unwrap_or_else(|| StageLoad::empty(name)))
        .collect();
    let grand_total_w = stages.iter().map(|s| s.total_w).sum();

    info!(grand_total_w, failures = failures.len(), "calculation pass finished");

    Ok(RecomputeReport {
        load: SystemLoad { stages, grand_total_w },
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, ComponentKind, DirectPower, PowerState, SimpleGeometry};
    use crate::materials::ConductivityTable;
    use crate::stages::Stage;

    const TOL: f64 = 1e-9;

    fn library() -> MaterialLibrary {
        [ConductivityTable::from_pairs("Ten", &[(0.1, 0.0), (1.0, 5.0), (2.0, 15.0), (4.2, 30.0), (300.0, 500.0)]).unwrap()]
            .into_iter()
            .collect()
    }

    fn ladder() -> StageLadder {
        StageLadder::new(
            vec![Stage::new("4K", 2.0, 4.2), Stage::new("1K", 1.0, 2.0), Stage::new("100mK", 0.05, 1.0)],
            TOL,
        )
        .unwrap()
    }

    fn other(name: &str, power_per_part_w: f64, count: u32) -> Component {
        Component::new(name, count, ComponentKind::Other(DirectPower { power_per_part_w })).unwrap()
    }

    fn ratio_rod(name: &str, od_m: f64) -> Component {
        Component::new(
            name,
            1,
            ComponentKind::Simple(SimpleGeometry {
                material: "Ten".to_string(),
                od_m,
                id_m: 0.0,
                length_m: 0.1,
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_stage_totals_sum_components() {
        let mut store = ComponentStore::new();
        store.insert("4K", other("Amp", 0.01, 2)).unwrap();
        store.insert("4K", other("Heater", 0.005, 1)).unwrap();
        store.insert("1K", other("Switch", 0.001, 3)).unwrap();

        let report = recompute_all(&mut store, &ladder(), &library(), &EngineSettings::default()).unwrap();
        assert!(report.is_clean());

        let four_k = report.load.stage_load("4K").unwrap();
        assert!((four_k.total_w - 0.025).abs() < 1e-15);
        assert_eq!(four_k.computed, 2);
        assert!((four_k.by_kind["Other"] - 0.025).abs() < 1e-15);

        let one_k = report.load.stage_load("1K").unwrap();
        assert!((one_k.total_w - 0.003).abs() < 1e-15);

        // Empty stage still reported
        assert_eq!(report.load.stage_load("100mK").unwrap().total_w, 0.0);
        assert!((report.load.grand_total_w - 0.028).abs() < 1e-15);
        assert_eq!(report.load.stages.len(), 3);
    }

    #[test]
    fn test_failure_is_excluded_and_reported() {
        let mut store = ComponentStore::new();
        store.insert("1K", ratio_rod("Good", 0.001)).unwrap();
        store.insert("1K", ratio_rod("Bad", -1.0)).unwrap();
        // Table starts at 0.1 K, stage goes down to 0.05 K
        store.insert("100mK", ratio_rod("Cold", 0.001)).unwrap();
        store.insert("100mK", other("Amp", 0.002, 1)).unwrap();

        let report = recompute_all(&mut store, &ladder(), &library(), &EngineSettings::default()).unwrap();
        assert_eq!(report.failures.len(), 2);

        let one_k = report.load.stage_load("1K").unwrap();
        let good = store.get("1K", "Good").unwrap().power();
        assert_eq!(one_k.total_w, good.total_w);
        assert_eq!(one_k.failed, vec!["Bad".to_string()]);
        assert_eq!(store.get("1K", "Bad").unwrap().power().state, PowerState::Stale);

        let cold = report.load.stage_load("100mK").unwrap();
        assert!((cold.total_w - 0.002).abs() < 1e-15);
        let out_of_range = report.failures.iter().find(|f| f.component == "Cold").unwrap();
        assert_eq!(out_of_range.error.error_code(), "OUT_OF_RANGE");
    }

    #[test]
    fn test_unknown_stage_aborts_pass() {
        let mut store = ComponentStore::new();
        store.insert("1K", other("Amp", 0.01, 1)).unwrap();
        store.insert("2K", other("Stray", 0.01, 1)).unwrap();

        let err = recompute_all(&mut store, &ladder(), &library(), &EngineSettings::default()).unwrap_err();
        assert_eq!(err, ThermalError::unknown_stage("2K"));
        // Nothing was computed
        assert_eq!(store.get("1K", "Amp").unwrap().power().state, PowerState::Stale);
    }

    #[test]
    fn test_malformed_ladder_aborts_pass() {
        let broken: StageLadder = serde_json::from_str(
            r#"{"stages":[{"name":"A","low_k":4.0,"high_k":10.0},{"name":"B","low_k":1.0,"high_k":2.0}]}"#,
        )
        .unwrap();
        let mut store = ComponentStore::new();
        let err = recompute_all(&mut store, &broken, &library(), &EngineSettings::default()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_empty_store_yields_zero() {
        let mut store = ComponentStore::new();
        let report = recompute_all(&mut store, &ladder(), &library(), &EngineSettings::default()).unwrap();
        assert_eq!(report.load, SystemLoad::zero(&ladder()));
    }

    #[test]
    fn test_from_totals_follows_ladder() {
        let totals: BTreeMap<String, f64> = [
            ("1K".to_string(), 0.5),
            ("4K".to_string(), 2.0),
            ("Gone".to_string(), 9.0),
            ("100mK".to_string(), f64::NAN),
        ]
        .into_iter()
        .collect();

        let load = SystemLoad::from_totals(&ladder(), &totals);
        let names: Vec<&str> = load.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["4K", "1K", "100mK"]);
        assert_eq!(load.stage_load("100mK").unwrap().total_w, 0.0);
        assert_eq!(load.grand_total_w, 2.5);
    }
}
