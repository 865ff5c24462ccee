//! # Components
//!
//! Hardware items that bridge one temperature stage: wires and rods
//! ([`SimpleGeometry`]), coaxial cables ([`CoaxGeometry`]), parts described
//! by a known area-over-length ([`AreaLengthRatio`]) and anything with a
//! known dissipation ([`DirectPower`]).
//!
//! Power fields are derived and only written by a calculation pass. Editing
//! a component marks its power [`PowerState::Stale`]; the old numbers stay
//! visible until the next pass.
//!
//! ```text
//! Unset ──create/edit──▶ Stale ──recompute ok──▶ Computed
//!                          ▲                        │
//!                          └─────────edit───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use thermal_core::components::{Component, ComponentKind, SimpleGeometry, PowerState};
//!
//! let wire = Component::new(
//!     "Thermometer leads",
//!     12,
//!     ComponentKind::Simple(SimpleGeometry {
//!         material: "PhBronze".to_string(),
//!         od_m: 0.0001,
//!         id_m: 0.0,
//!         length_m: 0.3,
//!     }),
//! ).unwrap();
//! assert_eq!(wire.power().state, PowerState::Stale);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ThermalError, ThermalResult};

/// Solid or hollow rod / wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleGeometry {
    pub material: String,
    /// Outer diameter (m)
    pub od_m: f64,
    /// Inner diameter (m), 0 for a solid rod
    pub id_m: f64,
    /// Conduction length (m)
    pub length_m: f64,
}

/// Coaxial cable: outer case, dielectric and centre conductor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoaxGeometry {
    pub case_material: String,
    pub insulator_material: String,
    pub core_material: String,
    /// Case outer diameter (m)
    pub case_od_m: f64,
    /// Insulator outer diameter (m)
    pub insulator_od_m: f64,
    /// Core outer diameter (m)
    pub core_od_m: f64,
    /// Cable length between stages (m)
    pub length_m: f64,
}

/// Part with a known effective A/L
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaLengthRatio {
    pub material: String,
    /// Area over length (m)
    pub a_over_l_m: f64,
}

/// Part with a declared heat load
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectPower {
    /// Power per part (W)
    pub power_per_part_w: f64,
}

/// The four component variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentKind {
    Simple(SimpleGeometry),
    Coax(CoaxGeometry),
    AreaLengthRatio(AreaLengthRatio),
    Other(DirectPower),
}

impl ComponentKind {
    /// Discriminant used in bundle records (`Type` field)
    pub fn record_type(&self) -> &'static str {
        match self {
            ComponentKind::Simple(_) => "Component",
            ComponentKind::Coax(_) => "Coax",
            ComponentKind::AreaLengthRatio(_) => "A/L",
            ComponentKind::Other(_) => "Other",
        }
    }

    /// Materials this component conducts through
    pub fn materials(&self) -> Vec<&str> {
        match self {
            ComponentKind::Simple(g) => vec![g.material.as_str()],
            ComponentKind::Coax(g) => vec![
                g.case_material.as_str(),
                g.insulator_material.as_str(),
                g.core_material.as_str(),
            ],
            ComponentKind::AreaLengthRatio(g) => vec![g.material.as_str()],
            ComponentKind::Other(_) => Vec::new(),
        }
    }

    /// Check that every required field is present and numeric.
    ///
    /// Physical plausibility (OD > ID and so on) is checked later, when the
    /// geometry is reduced during a calculation pass.
    fn validate(&self) -> ThermalResult<()> {
        for material in self.materials() {
            if material.trim().is_empty() {
                return Err(ThermalError::missing_field("material"));
            }
        }
        let numbers: Vec<(&str, f64)> = match self {
            ComponentKind::Simple(g) => vec![("OD", g.od_m), ("ID", g.id_m), ("length", g.length_m)],
            ComponentKind::Coax(g) => vec![
                ("OD", g.case_od_m),
                ("OD_I", g.insulator_od_m),
                ("OD_c", g.core_od_m),
                ("length", g.length_m),
            ],
            ComponentKind::AreaLengthRatio(g) => vec![("A/L", g.a_over_l_m)],
            ComponentKind::Other(p) => vec![("Power per Part (W)", p.power_per_part_w)],
        };
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(ThermalError::validation(field, format!("{} is not a finite number", value)));
            }
        }
        if let ComponentKind::Other(p) = self {
            if p.power_per_part_w < 0.0 {
                return Err(ThermalError::validation(
                    "Power per Part (W)",
                    "Declared power cannot be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Lifecycle of a component's derived power fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerState {
    /// Never had power values
    #[default]
    Unset,
    /// Inputs changed since the last successful calculation
    Stale,
    /// Reflects the current inputs
    Computed,
}

/// Derived power figures of a component
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerOutput {
    /// Power per part (W)
    pub per_part_w: f64,
    /// Power per part × count (W)
    pub total_w: f64,
    pub state: PowerState,
}

/// A named hardware item within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    name: String,
    count: u32,
    kind: ComponentKind,
    power: PowerOutput,
}

impl Component {
    /// Create a validated component. Power starts `Stale`; declared-power
    /// parts carry their declared figure from the start.
    pub fn new(name: impl Into<String>, count: u32, kind: ComponentKind) -> ThermalResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ThermalError::missing_field("Name"));
        }
        validate_count(count)?;
        kind.validate()?;

        let mut power = PowerOutput {
            state: PowerState::Stale,
            ..PowerOutput::default()
        };
        if let ComponentKind::Other(p) = &kind {
            power.per_part_w = p.power_per_part_w;
            power.total_w = p.power_per_part_w * f64::from(count);
        }
        Ok(Component { name, count, kind, power })
    }

    /// Rebuild a component with previously stored power figures (e.g. read
    /// back from a bundle). The figures are kept but marked `Stale`.
    pub fn with_stored_power(mut self, per_part_w: f64, total_w: f64) -> Self {
        if per_part_w.is_finite() && total_w.is_finite() {
            self.power.per_part_w = per_part_w;
            self.power.total_w = total_w;
        }
        self.power.state = PowerState::Stale;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn power(&self) -> PowerOutput {
        self.power
    }

    pub fn needs_recompute(&self) -> bool {
        self.power.state != PowerState::Computed
    }

    /// Overwrite the inputs in place. Power figures are left as they were and
    /// marked `Stale` until the next calculation pass.
    pub fn edit(&mut self, count: u32, kind: ComponentKind) -> ThermalResult<()> {
        validate_count(count)?;
        kind.validate()?;
        self.count = count;
        self.kind = kind;
        self.power.state = PowerState::Stale;
        Ok(())
    }

    /// Change only the count.
    pub fn set_count(&mut self, count: u32) -> ThermalResult<()> {
        let kind = self.kind.clone();
        self.edit(count, kind)
    }

    pub(crate) fn mark_stale(&mut self) {
        self.power.state = PowerState::Stale;
    }

    pub(crate) fn store_computed(&mut self, per_part_w: f64, total_w: f64) {
        self.power = PowerOutput {
            per_part_w,
            total_w,
            state: PowerState::Computed,
        };
    }
}

fn validate_count(count: u32) -> ThermalResult<()> {
    if count == 0 {
        return Err(ThermalError::validation("number", "Count must be at least 1"));
    }
    Ok(())
}

/// Caller-owned repository of components keyed by stage, then name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStore {
    stages: BTreeMap<String, BTreeMap<String, Component>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component to a stage.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - empty stage name
    /// * `DuplicateComponent` - the stage already has a component with this name
    pub fn insert(&mut self, stage: &str, component: Component) -> ThermalResult<()> {
        if stage.trim().is_empty() {
            return Err(ThermalError::missing_field("stage"));
        }
        let entries = self.stages.entry(stage.to_string()).or_default();
        if entries.contains_key(component.name()) {
            return Err(ThermalError::DuplicateComponent {
                stage: stage.to_string(),
                name: component.name().to_string(),
            });
        }
        entries.insert(component.name().to_string(), component);
        Ok(())
    }

    /// Insert or overwrite, keeping the stored component's identity.
    pub fn upsert(&mut self, stage: &str, component: Component) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .insert(component.name().to_string(), component);
    }

    pub fn get(&self, stage: &str, name: &str) -> Option<&Component> {
        self.stages.get(stage).and_then(|c| c.get(name))
    }

    /// Edit a component in place; see [`Component::edit`].
    pub fn edit(&mut self, stage: &str, name: &str, count: u32, kind: ComponentKind) -> ThermalResult<()> {
        self.get_mut(stage, name)?.edit(count, kind)
    }

    /// Remove a component, returning it.
    pub fn remove(&mut self, stage: &str, name: &str) -> ThermalResult<Component> {
        self.stages
            .get_mut(stage)
            .and_then(|c| c.remove(name))
            .ok_or_else(|| ThermalError::ComponentNotFound {
                stage: stage.to_string(),
                name: name.to_string(),
            })
    }

    /// Drop every component.
    pub fn clear(&mut self) {
        self.stages.clear();
    }

    /// Components of one stage in name order
    pub fn stage_components(&self, stage: &str) -> impl Iterator<Item = &Component> {
        self.stages.get(stage).into_iter().flat_map(|c| c.values())
    }

    /// All `(stage, component)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Component)> {
        self.stages
            .iter()
            .flat_map(|(stage, c)| c.values().map(move |comp| (stage.as_str(), comp)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Component)> {
        self.stages
            .iter_mut()
            .flat_map(|(stage, c)| c.values_mut().map(move |comp| (stage.as_str(), comp)))
    }

    pub fn len(&self) -> usize {
        self.stages.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_mut(&mut self, stage: &str, name: &str) -> ThermalResult<&mut Component> {
        self.stages
            .get_mut(stage)
            .and_then(|c| c.get_mut(name))
            .ok_or_else(|| ThermalError::ComponentNotFound {
                stage: stage.to_string(),
                name: name.to_string(),
            })
    }
}
