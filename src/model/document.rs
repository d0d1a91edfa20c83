//! Input spec documents: a protocol version plus the fields of one form or
//! endpoint, as served by a backend.

use serde::{Deserialize, Serialize};

use super::errors::ModelResult;
use super::types::FieldSpec;

/// Protocol version written when a document does not name one
pub const CURRENT_PROTOCOL_VERSION: &str = "2.0";

fn default_protocol_version() -> String {
    CURRENT_PROTOCOL_VERSION.to_string()
}

/// A set of field specifications sharing one protocol version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            fields: Vec::new(),
        }
    }
}

impl InputSpec {
    /// Create a document at the current protocol version
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Finds a field by display name
    pub fn field(&self, display_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.display_name == display_name)
    }

    /// Validates every field's structure
    pub fn validate_structure(&self) -> ModelResult<()> {
        self.fields.iter().try_for_each(FieldSpec::validate_structure)
    }
}
