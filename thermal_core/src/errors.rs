//! # Error Types
//!
//! Structured error types for thermal_core. Every failure carries enough
//! context (material, temperature, field, stage) for a front end to show the
//! message next to the offending component.
//!
//! ## Example
//!
//! ```rust
//! use thermal_core::errors::{ThermalError, ThermalResult};
//!
//! fn validate_length(length_m: f64) -> ThermalResult<()> {
//!     if length_m <= 0.0 {
//!         return Err(ThermalError::invalid_geometry(
//!             "length",
//!             length_m.to_string(),
//!             "Length must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for thermal_core operations
pub type ThermalResult<T> = Result<T, ThermalError>;

/// Structured error type for thermal load operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ThermalError {
    /// Material name is not present in the conductivity library
    #[error("Unknown material: {material}")]
    UnknownMaterial { material: String },

    /// Temperature outside the tabulated span of a material
    #[error("Temperature {temperature_k} K is outside the table for '{material}' ({min_k} K to {max_k} K)")]
    OutOfRange {
        material: String,
        temperature_k: f64,
        min_k: f64,
        max_k: f64,
    },

    /// Integration bounds are not strictly increasing
    #[error("Invalid temperature range: low {low_k} K must be below high {high_k} K")]
    InvalidRange { low_k: f64, high_k: f64 },

    /// Non-physical component dimensions
    #[error("Invalid geometry for '{field}': {value} - {reason}")]
    InvalidGeometry {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing or unusable for the component variant
    #[error("Validation failed for '{field}': {reason}")]
    ValidationError { field: String, reason: String },

    /// A component references a stage that is not in the ladder
    #[error("Unknown stage: {stage}")]
    UnknownStage { stage: String },

    /// The stage ladder itself is inconsistent
    #[error("Malformed stage ladder: {reason}")]
    MalformedStageLadder { reason: String },

    /// A component with the same name already exists in the stage
    #[error("Component '{name}' already exists in stage '{stage}'")]
    DuplicateComponent { stage: String, name: String },

    /// No component with this name in the stage
    #[error("Component '{name}' not found in stage '{stage}'")]
    ComponentNotFound { stage: String, name: String },

    /// The material reference data is malformed
    #[error("Material table error for '{material}': {reason}")]
    MaterialTable { material: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Bundle schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl ThermalError {
    /// Create an UnknownMaterial error
    pub fn unknown_material(material: impl Into<String>) -> Self {
        ThermalError::UnknownMaterial {
            material: material.into(),
        }
    }

    /// Create an InvalidGeometry error
    pub fn invalid_geometry(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ThermalError::InvalidGeometry {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a ValidationError
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ThermalError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a ValidationError for a missing required field
    pub fn missing_field(field: impl Into<String>) -> Self {
        ThermalError::validation(field, "required field is missing")
    }

    /// Create an UnknownStage error
    pub fn unknown_stage(stage: impl Into<String>) -> Self {
        ThermalError::UnknownStage { stage: stage.into() }
    }

    /// Create a MalformedStageLadder error
    pub fn malformed_ladder(reason: impl Into<String>) -> Self {
        ThermalError::MalformedStageLadder { reason: reason.into() }
    }

    /// Create a MaterialTable error
    pub fn material_table(material: impl Into<String>, reason: impl Into<String>) -> Self {
        ThermalError::MaterialTable {
            material: material.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ThermalError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        ThermalError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        ThermalError::SerializationError { reason: reason.into() }
    }

    /// Structural errors abort a whole calculation pass instead of a single
    /// component.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ThermalError::UnknownStage { .. } | ThermalError::MalformedStageLadder { .. }
        )
    }

    /// Check if this is a recoverable error (e.g., can retry)
    ///
    /// Calculation errors are deterministic; only a lock held by someone
    /// else can go away on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ThermalError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ThermalError::UnknownMaterial { .. } => "UNKNOWN_MATERIAL",
            ThermalError::OutOfRange { .. } => "OUT_OF_RANGE",
            ThermalError::InvalidRange { .. } => "INVALID_RANGE",
            ThermalError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            ThermalError::ValidationError { .. } => "VALIDATION_ERROR",
            ThermalError::UnknownStage { .. } => "UNKNOWN_STAGE",
            ThermalError::MalformedStageLadder { .. } => "MALFORMED_STAGE_LADDER",
            ThermalError::DuplicateComponent { .. } => "DUPLICATE_COMPONENT",
            ThermalError::ComponentNotFound { .. } => "COMPONENT_NOT_FOUND",
            ThermalError::MaterialTable { .. } => "MATERIAL_TABLE",
            ThermalError::FileError { .. } => "FILE_ERROR",
            ThermalError::FileLocked { .. } => "FILE_LOCKED",
            ThermalError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ThermalError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for ThermalError {
    fn from(e: serde_json::Error) -> Self {
        ThermalError::serialization(e.to_string())
    }
}
