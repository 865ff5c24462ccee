//! # Thermal Model
//!
//! The `ThermalModel` is the caller-owned container for everything a
//! calculation session needs: the stage ladder, the component store, the
//! engine settings and the load from the last calculation pass.
//!
//! ## Structure
//!
//! ```text
//! ThermalModel
//! ├── meta: ModelMetadata (schema version, designer, timestamps)
//! ├── settings: EngineSettings (extrapolation policy, ladder tolerance)
//! ├── stages: StageLadder (warmest → coldest)
//! ├── components: ComponentStore (stage → name → Component)
//! └── last_load: SystemLoad (totals of the last successful pass)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use thermal_core::components::{Component, ComponentKind, DirectPower};
//! use thermal_core::materials::MaterialLibrary;
//! use thermal_core::model::ThermalModel;
//!
//! let mut model = ThermalModel::new("Cryo Team");
//! model.add_component(
//!     "4K - LHe",
//!     Component::new("HEMT", 2, ComponentKind::Other(DirectPower { power_per_part_w: 0.004 })).unwrap(),
//! ).unwrap();
//!
//! // Totals only move when a pass runs
//! assert_eq!(model.total_w(), 0.0);
//! model.recompute(&MaterialLibrary::new()).unwrap();
//! assert!((model.total_w() - 0.008).abs() < 1e-12);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculations::{recompute_all, RecomputeReport, StageLoad, SystemLoad};
use crate::components::{Component, ComponentKind, ComponentStore};
use crate::errors::{ThermalError, ThermalResult};
use crate::materials::MaterialLibrary;
use crate::settings::EngineSettings;
use crate::stages::StageLadder;

/// Current schema version for bundle files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Model metadata stored alongside the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Person or team responsible for the budget
    pub designer: String,

    /// When the model was created
    pub created: DateTime<Utc>,

    /// When the model was last modified
    pub modified: DateTime<Utc>,
}

impl ModelMetadata {
    pub fn new(designer: impl Into<String>) -> Self {
        let now = Utc::now();
        ModelMetadata {
            version: SCHEMA_VERSION.to_string(),
            designer: designer.into(),
            created: now,
            modified: now,
        }
    }
}

/// Root container of a thermal budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermalModel {
    pub meta: ModelMetadata,
    pub settings: EngineSettings,
    stages: StageLadder,
    components: ComponentStore,
    last_load: SystemLoad,
}

impl ThermalModel {
    /// Empty model on the default stage ladder.
    pub fn new(designer: impl Into<String>) -> Self {
        let stages = StageLadder::default();
        ThermalModel {
            meta: ModelMetadata::new(designer),
            settings: EngineSettings::default(),
            last_load: SystemLoad::zero(&stages),
            stages,
            components: ComponentStore::new(),
        }
    }

    /// Assemble a model from parts, e.g. when reading a bundle.
    pub fn from_parts(
        meta: ModelMetadata,
        settings: EngineSettings,
        stages: StageLadder,
        components: ComponentStore,
        last_load: SystemLoad,
    ) -> ThermalResult<Self> {
        stages.validate(settings.ladder_tolerance)?;
        Ok(ThermalModel {
            meta,
            settings,
            stages,
            components,
            last_load,
        })
    }

    pub fn stages(&self) -> &StageLadder {
        &self.stages
    }

    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    /// Replace the stage ladder. Every component becomes stale and the last
    /// load is reset, since it was computed for other bounds.
    pub fn set_stages(&mut self, stages: StageLadder) -> ThermalResult<()> {
        stages.validate(self.settings.ladder_tolerance)?;
        self.last_load = SystemLoad::zero(&stages);
        self.stages = stages;
        for (_, component) in self.components.iter_mut() {
            component.mark_stale();
        }
        self.touch();
        Ok(())
    }

    /// Add a component to an existing stage.
    ///
    /// # Errors
    ///
    /// * `UnknownStage` - the stage is not in the ladder
    /// * `DuplicateComponent` - the name is taken within the stage
    pub fn add_component(&mut self, stage: &str, component: Component) -> ThermalResult<()> {
        if !self.stages.contains(stage) {
            return Err(ThermalError::unknown_stage(stage));
        }
        self.components.insert(stage, component)?;
        self.touch();
        Ok(())
    }

    /// Overwrite a component's inputs; its power becomes stale.
    pub fn edit_component(&mut self, stage: &str, name: &str, count: u32, kind: ComponentKind) -> ThermalResult<()> {
        self.components.edit(stage, name, count, kind)?;
        self.touch();
        Ok(())
    }

    pub fn remove_component(&mut self, stage: &str, name: &str) -> ThermalResult<Component> {
        let removed = self.components.remove(stage, name)?;
        self.touch();
        Ok(removed)
    }

    pub fn component(&self, stage: &str, name: &str) -> Option<&Component> {
        self.components.get(stage, name)
    }

    /// `(stage, name)` of every component whose power does not reflect its
    /// current inputs
    pub fn stale_components(&self) -> Vec<(String, String)> {
        self.components
            .iter()
            .filter(|(_, c)| c.needs_recompute())
            .map(|(stage, c)| (stage.to_string(), c.name().to_string()))
            .collect()
    }

    /// Run a calculation pass and keep its load as the current totals.
    ///
    /// On a structural error the previous totals stay in place.
    pub fn recompute(&mut self, library: &MaterialLibrary) -> ThermalResult<RecomputeReport> {
        let report = recompute_all(&mut self.components, &self.stages, library, &self.settings)?;
        self.last_load = report.load.clone();
        self.touch();
        Ok(report)
    }

    /// Totals from the last successful pass
    pub fn last_load(&self) -> &SystemLoad {
        &self.last_load
    }

    /// Stage load from the last successful pass (possibly stale)
    pub fn stage_load(&self, stage: &str) -> Option<&StageLoad> {
        self.last_load.stage_load(stage)
    }

    /// Grand total from the last successful pass (W)
    pub fn total_w(&self) -> f64 {
        self.last_load.grand_total_w
    }

    /// Drop every component and zero all stage totals. The ladder is kept.
    pub fn clear_all(&mut self) {
        self.components.clear();
        self.last_load = SystemLoad::zero(&self.stages);
        self.touch();
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

impl Default for ThermalModel {
    fn default() -> Self {
        ThermalModel::new("")
    }
}
