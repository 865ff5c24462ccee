//! # Engine Settings
//!
//! Knobs that change how a calculation pass behaves. Settings have sensible
//! defaults and may be loaded from a TOML file:
//!
//! ```toml
//! extrapolation = "clamp"
//! ladder_tolerance = 1e-9
//! ```
//!
//! Missing keys fall back to their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ThermalError, ThermalResult};

/// What a material lookup does when asked for a temperature outside the
/// tabulated span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrapolationPolicy {
    /// Fail with `OutOfRange`
    #[default]
    Error,
    /// Hold the nearest endpoint value
    Clamp,
}

/// Settings for a calculation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Out-of-span lookup behavior
    pub extrapolation: ExtrapolationPolicy,

    /// Relative tolerance used when checking that adjacent stages share a
    /// boundary temperature
    pub ladder_tolerance: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            extrapolation: ExtrapolationPolicy::Error,
            ladder_tolerance: 1e-9,
        }
    }
}

impl EngineSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> ThermalResult<Self> {
        let settings: EngineSettings =
            toml::from_str(text).map_err(|e| ThermalError::serialization(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> ThermalResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ThermalError::file_error("read settings", path.display().to_string(), e.to_string())
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> ThermalResult<()> {
        if !self.ladder_tolerance.is_finite() || self.ladder_tolerance < 0.0 {
            return Err(ThermalError::validation(
                "ladder_tolerance",
                "must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}
