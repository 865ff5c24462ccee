//! # Materials Database
//!
//! Conductivity reference data for cryogenic construction materials.
//!
//! A [`MaterialLibrary`] maps material names to [`ConductivityTable`]s and
//! answers `integral_at(material, T, policy)` queries. It is read once at
//! startup (see [`csv_table`]) and treated as immutable afterwards. The
//! out-of-span policy comes from the caller's `EngineSettings`.
//!
//! ## Example
//!
//! ```rust
//! use thermal_core::materials::{ConductivityTable, MaterialLibrary};
//! use thermal_core::settings::ExtrapolationPolicy;
//!
//! let mut library = MaterialLibrary::new();
//! library.insert(ConductivityTable::from_pairs(
//!     "SS304",
//!     &[(4.0, 0.5), (77.0, 325.0), (300.0, 3060.0)],
//! ).unwrap());
//!
//! let value = library.integral_at("SS304", 77.0, ExtrapolationPolicy::Error).unwrap();
//! assert_eq!(value, 325.0);
//!
//! // Below the table: an error, or the 4 K value when clamping
//! assert!(library.integral_at("SS304", 2.0, ExtrapolationPolicy::Error).is_err());
//! assert_eq!(library.integral_at("SS304", 2.0, ExtrapolationPolicy::Clamp).unwrap(), 0.5);
//! ```

pub mod conductivity;
pub mod csv_table;

pub use conductivity::{ConductivitySample, ConductivityTable};
pub use csv_table::{load_library, read_library};

use std::collections::BTreeMap;

use crate::errors::{ThermalError, ThermalResult};
use crate::settings::ExtrapolationPolicy;

/// Name-keyed collection of conductivity tables.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    tables: BTreeMap<String, ConductivityTable>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a material table. Returns the previous table, if any.
    pub fn insert(&mut self, table: ConductivityTable) -> Option<ConductivityTable> {
        self.tables.insert(table.material().to_string(), table)
    }

    pub fn get(&self, material: &str) -> Option<&ConductivityTable> {
        self.tables.get(material)
    }

    pub fn contains(&self, material: &str) -> bool {
        self.tables.contains_key(material)
    }

    /// Material names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &ConductivityTable> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tabulated temperature span of a material (K)
    pub fn span(&self, material: &str) -> ThermalResult<(f64, f64)> {
        self.table(material).map(ConductivityTable::span)
    }

    /// Interpolated cumulative conductivity integral of `material` at
    /// `temperature_k`.
    ///
    /// # Errors
    ///
    /// * `UnknownMaterial` - no table with this name
    /// * `OutOfRange` - outside the tabulated span under `ExtrapolationPolicy::Error`
    pub fn integral_at(
        &self,
        material: &str,
        temperature_k: f64,
        policy: ExtrapolationPolicy,
    ) -> ThermalResult<f64> {
        self.table(material)?.integral_at(temperature_k, policy)
    }

    fn table(&self, material: &str) -> ThermalResult<&ConductivityTable> {
        self.tables
            .get(material)
            .ok_or_else(|| ThermalError::unknown_material(material))
    }
}

impl FromIterator<ConductivityTable> for MaterialLibrary {
    fn from_iter<I: IntoIterator<Item = ConductivityTable>>(iter: I) -> Self {
        let mut library = MaterialLibrary::new();
        for table in iter {
            library.insert(table);
        }
        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> MaterialLibrary {
        [
            ConductivityTable::from_pairs("SS304", &[(4.0, 0.5), (77.0, 325.0), (300.0, 3060.0)]).unwrap(),
            ConductivityTable::from_pairs("Copper", &[(1.0, 0.0), (300.0, 100000.0)]).unwrap(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_lookup_by_name() {
        let lib = library();
        assert_eq!(lib.len(), 2);
        assert!(lib.contains("SS304"));
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["Copper", "SS304"]);
        assert_eq!(lib.span("SS304").unwrap(), (4.0, 300.0));
    }

    #[test]
    fn test_unknown_material() {
        let lib = library();
        let err = lib.integral_at("Unobtainium", 10.0, ExtrapolationPolicy::Error).unwrap_err();
        assert_eq!(err, ThermalError::unknown_material("Unobtainium"));
        assert!(lib.span("Unobtainium").is_err());
    }

    #[test]
    fn test_policy_is_applied() {
        let lib = library();
        assert!(lib.integral_at("SS304", 2.0, ExtrapolationPolicy::Error).is_err());
        assert_eq!(lib.integral_at("SS304", 2.0, ExtrapolationPolicy::Clamp).unwrap(), 0.5);
    }

    #[test]
    fn test_insert_replaces() {
        let mut lib = library();
        let previous = lib.insert(ConductivityTable::from_pairs("Copper", &[(1.0, 0.0), (10.0, 5.0)]).unwrap());
        assert!(previous.is_some());
        assert_eq!(lib.span("Copper").unwrap(), (1.0, 10.0));
    }
}
