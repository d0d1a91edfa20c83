//! Field specification types
//!
//! Supported data types:
//! - STRING: UTF-8 text
//! - NUMBER: finite 64-bit floating point
//! - DATE: calendar date (ISO 8601 text or a typed date)
//! - BOOLEAN: true/false
//!
//! Each type may be single-valued or a list (`expectMultipleValues`).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::constraint::ConstraintDescriptor;
use super::endpoint::ValuesEndpoint;
use super::errors::{ModelError, ModelResult};
use crate::validation::CoercionOptions;

/// Declared primitive type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    String,
    Number,
    Date,
    Boolean,
}

impl DataType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
        }
    }

    /// Parses a wire token case-insensitively
    pub fn from_wire(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "STRING" => Some(DataType::String),
            "NUMBER" => Some(DataType::Number),
            "DATE" => Some(DataType::Date),
            "BOOLEAN" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        DataType::from_wire(&token).ok_or_else(|| {
            serde::de::Error::unknown_variant(&token, &["STRING", "NUMBER", "DATE", "BOOLEAN"])
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Declarative description of one input field.
///
/// The validator only reads a spec; it is never mutated during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Human readable label
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared primitive type
    pub data_type: DataType,
    /// Whether the value is a list of `data_type`
    #[serde(default)]
    pub expect_multiple_values: bool,
    /// Whether a non-empty value is mandatory
    #[serde(default)]
    pub required: bool,
    /// Constraints in evaluation order
    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,
    /// Optional value domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_endpoint: Option<ValuesEndpoint>,
    /// UI formatting hint; never enforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_hint: Option<String>,
    /// Per-field coercion settings, overriding the validator's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coercion: Option<CoercionOptions>,
}

impl FieldSpec {
    /// Create an optional, single-valued field with no constraints
    pub fn new(display_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            display_name: display_name.into(),
            description: None,
            data_type,
            expect_multiple_values: false,
            required: false,
            constraints: Vec::new(),
            values_endpoint: None,
            format_hint: None,
            coercion: None,
        }
    }

    /// Create an optional string field
    pub fn string(display_name: impl Into<String>) -> Self {
        Self::new(display_name, DataType::String)
    }

    /// Create an optional number field
    pub fn number(display_name: impl Into<String>) -> Self {
        Self::new(display_name, DataType::Number)
    }

    /// Create an optional date field
    pub fn date(display_name: impl Into<String>) -> Self {
        Self::new(display_name, DataType::Date)
    }

    /// Create an optional boolean field
    pub fn boolean(display_name: impl Into<String>) -> Self {
        Self::new(display_name, DataType::Boolean)
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as a list of values
    pub fn multiple(mut self) -> Self {
        self.expect_multiple_values = true;
        self
    }

    /// Append a constraint
    pub fn with_constraint(mut self, constraint: ConstraintDescriptor) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Attach a value domain
    pub fn with_endpoint(mut self, endpoint: ValuesEndpoint) -> Self {
        self.values_endpoint = Some(endpoint);
        self
    }

    /// Override coercion for this field
    pub fn with_coercion(mut self, coercion: CoercionOptions) -> Self {
        self.coercion = Some(coercion);
        self
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }

    /// Finds a constraint by name
    pub fn constraint(&self, name: &str) -> Option<&ConstraintDescriptor> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// Validates the spec itself (not a value): constraint names must be
    /// non-empty and unique within the field.
    pub fn validate_structure(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for constraint in &self.constraints {
            if constraint.name.is_empty() {
                return Err(ModelError::EmptyConstraintName);
            }
            if !seen.insert(constraint.name.as_str()) {
                return Err(ModelError::DuplicateConstraintName(constraint.name.clone()));
            }
        }
        Ok(())
    }

    /// Describes the expected shape for type errors
    pub fn expected_type_description(&self) -> String {
        if self.expect_multiple_values {
            format!("array of {}", self.data_type.type_name())
        } else {
            self.data_type.type_name().to_string()
        }
    }
}
