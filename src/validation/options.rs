//! Validation configuration
//!
//! Coercion is disabled by default. It can be enabled for a whole validator
//! through `ValidationOptions`, or per field through `FieldSpec::coercion`;
//! the field setting wins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::model::{ModelError, ModelResult};

/// Default pattern a string must match to coerce into a NUMBER
pub const DEFAULT_NUMBER_PATTERN: &str = r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$";

/// Settings of the best-effort coercion pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoercionOptions {
    /// Master switch (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Trim surrounding whitespace from strings (default: true)
    #[serde(default = "default_true")]
    pub trim_strings: bool,

    /// Pattern a string must match to become a NUMBER
    #[serde(default = "default_number_pattern")]
    pub number_pattern: String,

    /// Additional tokens read as `true` (case-insensitive)
    #[serde(default)]
    pub extra_true_values: Vec<String>,

    /// Additional tokens read as `false` (case-insensitive)
    #[serde(default)]
    pub extra_false_values: Vec<String>,

    /// Read "1"/"0" as booleans (default: false)
    #[serde(default)]
    pub numeric_booleans: bool,

    /// Read integer strings as epoch seconds for DATE fields (default: false)
    #[serde(default)]
    pub epoch_seconds: bool,

    /// Read integer strings as epoch milliseconds for DATE fields (default: false)
    #[serde(default)]
    pub epoch_millis: bool,
}

fn default_true() -> bool {
    true
}

fn default_number_pattern() -> String {
    DEFAULT_NUMBER_PATTERN.to_string()
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            trim_strings: default_true(),
            number_pattern: default_number_pattern(),
            extra_true_values: Vec::new(),
            extra_false_values: Vec::new(),
            numeric_booleans: false,
            epoch_seconds: false,
            epoch_millis: false,
        }
    }
}

impl CoercionOptions {
    /// Coercion enabled with default settings
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Coercion disabled
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_numeric_booleans(mut self) -> Self {
        self.numeric_booleans = true;
        self
    }

    pub fn with_epoch_seconds(mut self) -> Self {
        self.epoch_seconds = true;
        self
    }

    pub fn with_epoch_millis(mut self) -> Self {
        self.epoch_millis = true;
        self
    }

    pub fn with_boolean_tokens<T, F>(mut self, truthy: T, falsy: F) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        self.extra_true_values = truthy.into_iter().map(Into::into).collect();
        self.extra_false_values = falsy.into_iter().map(Into::into).collect();
        self
    }
}

/// Validator-wide options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Coercion applied to fields without their own setting
    #[serde(default)]
    pub coercion: CoercionOptions,
}

impl ValidationOptions {
    /// Options with coercion enabled for every field
    pub fn with_coercion() -> Self {
        Self {
            coercion: CoercionOptions::enabled(),
        }
    }

    /// Parses options from JSON text
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ModelError::malformed("<options>", format!("Invalid JSON: {}", e)))
    }

    /// Reads options from a JSON file
    pub fn from_json_file(path: &Path) -> ModelResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ModelError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
        })
    }

    /// Resolves the coercion settings for a field: the field's own wins.
    pub fn effective_coercion<'a>(&'a self, field: Option<&'a CoercionOptions>) -> &'a CoercionOptions {
        field.unwrap_or(&self.coercion)
    }
}
