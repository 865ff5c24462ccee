//! CSV Conductivity Tables
//!
//! Loads the material reference table. The file is long-format, one sample
//! per row:
//!
//! ```text
//! material,temperature_k,integral_w_per_m
//! SS304,4.0,0.5
//! SS304,77.0,325.0
//! Copper,1.0,0.0
//! ```
//!
//! Rows for a material may appear in any order; they are sorted by
//! temperature before the table invariants are checked.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{ConductivitySample, ConductivityTable, MaterialLibrary};
use crate::errors::{ThermalError, ThermalResult};

#[derive(Debug, Deserialize)]
struct CsvRow {
    material: String,
    temperature_k: f64,
    integral_w_per_m: f64,
}

/// Read a material library from any CSV source.
pub fn read_library<R: Read>(reader: R) -> ThermalResult<MaterialLibrary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut grouped: BTreeMap<String, Vec<ConductivitySample>> = BTreeMap::new();
    for row in csv_reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| {
            let line = e
                .position()
                .map(|p| format!("line {}", p.line()))
                .unwrap_or_else(|| "unknown line".to_string());
            ThermalError::serialization(format!("Bad conductivity row at {}: {}", line, e))
        })?;
        grouped
            .entry(row.material)
            .or_default()
            .push(ConductivitySample::new(row.temperature_k, row.integral_w_per_m));
    }

    if grouped.is_empty() {
        return Err(ThermalError::material_table("*", "Conductivity table has no rows"));
    }

    let mut library = MaterialLibrary::new();
    for (material, mut samples) in grouped {
        samples.sort_by(|a, b| a.temperature_k.total_cmp(&b.temperature_k));
        library.insert(ConductivityTable::new(material, samples)?);
    }
    Ok(library)
}

/// Load a material library from a CSV file on disk.
pub fn load_library(path: &Path) -> ThermalResult<MaterialLibrary> {
    let file = File::open(path).map_err(|e| {
        ThermalError::file_error("open", path.display().to_string(), e.to_string())
    })?;
    let library = read_library(file)?;
    info!(path = %path.display(), materials = library.len(), "loaded conductivity tables");
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ExtrapolationPolicy;

    #[test]
    fn test_read_grouped_and_sorted() {
        let data = "\
material,temperature_k,integral_w_per_m
SS304,77.0,325.0
Copper,1.0,0.0
SS304,4.0,0.5
# comment line
Copper, 300.0, 100000.0
SS304,300.0,3060.0
";
        let lib = read_library(data.as_bytes()).unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.span("SS304").unwrap(), (4.0, 300.0));
        assert_eq!(lib.integral_at("SS304", 77.0, ExtrapolationPolicy::Error).unwrap(), 325.0);
        assert_eq!(lib.integral_at("Copper", 300.0, ExtrapolationPolicy::Error).unwrap(), 100000.0);
    }

    #[test]
    fn test_duplicate_temperature_rejected() {
        let data = "material,temperature_k,integral_w_per_m\nBrass,4.0,1.0\nBrass,4.0,2.0\n";
        let err = read_library(data.as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "MATERIAL_TABLE");
    }

    #[test]
    fn test_bad_number_reports_line() {
        let data = "material,temperature_k,integral_w_per_m\nBrass,four,1.0\n";
        let err = read_library(data.as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_table_rejected() {
        let data = "material,temperature_k,integral_w_per_m\n";
        assert!(read_library(data.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_library(Path::new("/nonexistent/tc_fullrepo.csv")).unwrap_err();
        assert_eq!(err.error_code(), "FILE_ERROR");
    }
}
