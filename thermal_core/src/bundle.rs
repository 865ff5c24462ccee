//! # Bundle Records
//!
//! The bundle is the JSON document front ends exchange:
//!
//! ```json
//! {
//!   "components": {
//!     "1K": {
//!       "Leads": {
//!         "Name": "Leads", "Type": "Component", "material": "PhBronze",
//!         "OD": 0.0001, "ID": 0.0, "length": 0.3, "number": 24,
//!         "Power per Part (W)": 0.0, "Power Total (W)": 0.0
//!       }
//!     }
//!   },
//!   "stage_details": { "1K": { "lowT": 2.0, "highT": 4.2 } },
//!   "total_power": { "1K": 0.0 }
//! }
//! ```
//!
//! Records keep their loose shape here ([`ComponentRecord`]): every field is
//! optional and the `Type` discriminant decides which ones are required. A
//! record is turned into a typed [`Component`] only through
//! [`ComponentRecord::to_component`], which reports missing fields as
//! `ValidationError`.
//!
//! | `Type` | Required fields |
//! |--------|-----------------|
//! | `Component` | `material`, `OD`, `length`, `number` (`ID` defaults to 0) |
//! | `Coax` | `mat_C`, `mat_I`, `material` (core), `OD`, `OD_I`, `OD_c`, `length`, `number` |
//! | `A/L` | `material`, `A/L`, `number` |
//! | `Other` | `Power per Part (W)`, `number` |
//!
//! A record without `Type` is read as `Component`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::{recompute_all, ComponentFailure, SystemLoad};
use crate::components::{
    AreaLengthRatio, CoaxGeometry, Component, ComponentKind, ComponentStore, DirectPower, SimpleGeometry,
};
use crate::errors::{ThermalError, ThermalResult};
use crate::materials::MaterialLibrary;
use crate::model::{ModelMetadata, ThermalModel};
use crate::settings::EngineSettings;
use crate::stages::{StageBounds, StageLadder};

/// Stage → component name → record
pub type RecordMap = BTreeMap<String, BTreeMap<String, ComponentRecord>>;

/// Record discriminant (`Type` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordType {
    #[default]
    Component,
    Coax,
    #[serde(rename = "A/L")]
    AreaLength,
    Other,
}

/// One component as stored in a bundle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "Type", default)]
    pub record_type: RecordType,

    /// Material (core material for coax)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    #[serde(rename = "mat_C", default, skip_serializing_if = "Option::is_none")]
    pub case_material: Option<String>,

    #[serde(rename = "mat_I", default, skip_serializing_if = "Option::is_none")]
    pub insulator_material: Option<String>,

    /// Outer diameter (case OD for coax), m
    #[serde(rename = "OD", default, skip_serializing_if = "Option::is_none")]
    pub od: Option<f64>,

    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<f64>,

    #[serde(rename = "OD_I", default, skip_serializing_if = "Option::is_none")]
    pub insulator_od: Option<f64>,

    #[serde(rename = "OD_c", default, skip_serializing_if = "Option::is_none")]
    pub core_od: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,

    #[serde(rename = "A/L", default, skip_serializing_if = "Option::is_none")]
    pub a_over_l: Option<f64>,

    /// Count; fractional values are rejected on conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<f64>,

    #[serde(rename = "Power per Part (W)", default)]
    pub power_per_part_w: Option<f64>,

    #[serde(rename = "Power Total (W)", default)]
    pub power_total_w: Option<f64>,
}

impl ComponentRecord {
    /// Record for a typed component, power fields always filled.
    pub fn from_component(component: &Component) -> Self {
        let power = component.power();
        let mut record = ComponentRecord {
            name: Some(component.name().to_string()),
            number: Some(f64::from(component.count())),
            power_per_part_w: Some(power.per_part_w),
            power_total_w: Some(power.total_w),
            ..ComponentRecord::default()
        };
        match component.kind() {
            ComponentKind::Simple(g) => {
                record.record_type = RecordType::Component;
                record.material = Some(g.material.clone());
                record.od = Some(g.od_m);
                record.id = Some(g.id_m);
                record.length = Some(g.length_m);
            }
            ComponentKind::Coax(g) => {
                record.record_type = RecordType::Coax;
                record.case_material = Some(g.case_material.clone());
                record.insulator_material = Some(g.insulator_material.clone());
                record.material = Some(g.core_material.clone());
                record.od = Some(g.case_od_m);
                record.insulator_od = Some(g.insulator_od_m);
                record.core_od = Some(g.core_od_m);
                record.length = Some(g.length_m);
            }
            ComponentKind::AreaLengthRatio(g) => {
                record.record_type = RecordType::AreaLength;
                record.material = Some(g.material.clone());
                record.a_over_l = Some(g.a_over_l_m);
            }
            ComponentKind::Other(p) => {
                record.record_type = RecordType::Other;
                // Declared power survives an edit that has not been recomputed yet
                record.power_per_part_w = Some(p.power_per_part_w);
            }
        }
        record
    }

    /// Validate the record and build a typed component named `key` (the map
    /// key is the component's identity). Stored power figures are carried
    /// over as stale values.
    pub fn to_component(&self, key: &str) -> ThermalResult<Component> {
        let count = self.count()?;
        let kind = match self.record_type {
            RecordType::Component => ComponentKind::Simple(SimpleGeometry {
                material: required_text(&self.material, "material")?,
                od_m: required_number(self.od, "OD")?,
                id_m: self.id.unwrap_or(0.0),
                length_m: required_number(self.length, "length")?,
            }),
            RecordType::Coax => ComponentKind::Coax(CoaxGeometry {
                case_material: required_text(&self.case_material, "mat_C")?,
                insulator_material: required_text(&self.insulator_material, "mat_I")?,
                core_material: required_text(&self.material, "material")?,
                case_od_m: required_number(self.od, "OD")?,
                insulator_od_m: required_number(self.insulator_od, "OD_I")?,
                core_od_m: required_number(self.core_od, "OD_c")?,
                length_m: required_number(self.length, "length")?,
            }),
            RecordType::AreaLength => ComponentKind::AreaLengthRatio(AreaLengthRatio {
                material: required_text(&self.material, "material")?,
                a_over_l_m: required_number(self.a_over_l, "A/L")?,
            }),
            RecordType::Other => ComponentKind::Other(DirectPower {
                power_per_part_w: required_number(self.power_per_part_w, "Power per Part (W)")?,
            }),
        };

        let component = Component::new(key, count, kind)?;
        Ok(match (self.record_type, self.power_per_part_w, self.power_total_w) {
            (RecordType::Other, _, _) => component,
            (_, Some(per_part), Some(total)) => component.with_stored_power(per_part, total),
            _ => component,
        })
    }

    fn count(&self) -> ThermalResult<u32> {
        let number = required_number(self.number, "number")?;
        if !number.is_finite() || number.fract() != 0.0 || number < 1.0 || number > f64::from(u32::MAX) {
            return Err(ThermalError::validation(
                "number",
                format!("Count must be a whole number of at least 1, got {}", number),
            ));
        }
        Ok(number as u32)
    }
}

fn required_text(value: &Option<String>, field: &str) -> ThermalResult<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        _ => Err(ThermalError::missing_field(field)),
    }
}

fn required_number(value: Option<f64>, field: &str) -> ThermalResult<f64> {
    value.ok_or_else(|| ThermalError::missing_field(field))
}

/// The persisted bundle document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub components: RecordMap,

    #[serde(default)]
    pub stage_details: BTreeMap<String, StageBounds>,

    #[serde(default)]
    pub total_power: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ModelMetadata>,
}

impl Bundle {
    /// Snapshot a model. `total_power` is the load of the last pass.
    pub fn from_model(model: &ThermalModel) -> Self {
        let mut components: RecordMap = BTreeMap::new();
        for (stage, component) in model.components().iter() {
            components
                .entry(stage.to_string())
                .or_default()
                .insert(component.name().to_string(), ComponentRecord::from_component(component));
        }
        // Empty stages are kept so front ends can list them
        for stage in model.stages().names() {
            components.entry(stage.to_string()).or_default();
        }
        Bundle {
            components,
            stage_details: model.stages().to_details(),
            total_power: model.last_load().totals_by_stage(),
            meta: Some(model.meta.clone()),
        }
    }

    /// Rebuild a model. An empty `stage_details` means the default ladder.
    ///
    /// # Errors
    ///
    /// * `MalformedStageLadder` - inconsistent `stage_details`
    /// * `ValidationError` - a record lacks a required field; the field is
    ///   reported as `stage / name / field`
    pub fn into_model(self, settings: EngineSettings) -> ThermalResult<ThermalModel> {
        let ladder = ladder_from_details(&self.stage_details, settings.ladder_tolerance)?;

        let mut store = ComponentStore::new();
        for (stage, records) in &self.components {
            for (name, record) in records {
                let component = record
                    .to_component(name)
                    .map_err(|e| with_record_context(e, stage, name))?;
                store.insert(stage, component)?;
            }
        }

        let last_load = SystemLoad::from_totals(&ladder, &self.total_power);
        let meta = self.meta.unwrap_or_else(|| ModelMetadata::new(""));
        ThermalModel::from_parts(meta, settings, ladder, store, last_load)
    }
}

fn ladder_from_details(details: &BTreeMap<String, StageBounds>, tolerance: f64) -> ThermalResult<StageLadder> {
    if details.is_empty() {
        return Ok(StageLadder::default());
    }
    StageLadder::from_details(details, tolerance)
}

fn with_record_context(error: ThermalError, stage: &str, name: &str) -> ThermalError {
    match error {
        ThermalError::ValidationError { field, reason } => ThermalError::ValidationError {
            field: format!("{} / {} / {}", stage, name, field),
            reason,
        },
        other => other,
    }
}

/// Result of [`compute_records`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordsOutcome {
    /// Input records with power fields updated; failed records are returned
    /// unchanged
    pub components: RecordMap,
    /// Stage → total of successfully computed components (W)
    pub total_power: BTreeMap<String, f64>,
    /// Records that could not be validated or computed
    pub failures: Vec<ComponentFailure>,
}

/// Engine entry point on loose records: validate, compute, and return the
/// records with power fields populated.
///
/// # Errors
///
/// Only structural errors (`MalformedStageLadder`, `UnknownStage`) fail the
/// call. Per-record problems end up in [`RecordsOutcome::failures`].
pub fn compute_records(
    components: &RecordMap,
    stage_details: &BTreeMap<String, StageBounds>,
    library: &MaterialLibrary,
    settings: &EngineSettings,
) -> ThermalResult<RecordsOutcome> {
    let ladder = ladder_from_details(stage_details, settings.ladder_tolerance)?;
    if let Some(stage) = components.keys().find(|stage| !ladder.contains(stage)) {
        return Err(ThermalError::unknown_stage(stage.clone()));
    }

    let mut store = ComponentStore::new();
    let mut failures = Vec::new();
    for (stage, records) in components {
        for (name, record) in records {
            match record.to_component(name) {
                Ok(component) => store.upsert(stage, component),
                Err(error) => {
                    warn!(stage = %stage, component = %name, "invalid record: {}", error);
                    failures.push(ComponentFailure {
                        stage: stage.clone(),
                        component: name.clone(),
                        error,
                    });
                }
            }
        }
    }

    let report = recompute_all(&mut store, &ladder, library, settings)?;
    failures.extend(report.failures.iter().cloned());

    let mut updated = components.clone();
    for (stage, component) in store.iter() {
        let failed = report
            .failures
            .iter()
            .any(|f| f.stage == stage && f.component == component.name());
        if failed {
            continue;
        }
        if let Some(record) = updated.get_mut(stage).and_then(|r| r.get_mut(component.name())) {
            let power = component.power();
            record.power_per_part_w = Some(power.per_part_w);
            record.power_total_w = Some(power.total_w);
        }
    }

    Ok(RecordsOutcome {
        components: updated,
        total_power: report.load.totals_by_stage(),
        failures,
    })
}
