//! Validation errors and results
//!
//! Validation never fails as a Rust error: every violation, including a
//! malformed constraint, is recorded as a `ValidationError` inside the
//! `ValidationResult`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Value;

/// Constraint names used for pipeline-level failures
pub const REQUIRED: &str = "required";
pub const TYPE: &str = "type";
pub const MEMBERSHIP: &str = "membership";

/// Default pipeline messages
pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const MEMBERSHIP_MESSAGE: &str = "Value is not in the allowed set";

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Required field was empty
    Required,
    /// Value or element had the wrong type
    Type,
    /// Value outside a closed domain
    Membership,
    /// An atomic constraint failed or could not be evaluated
    Constraint,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Required => "required",
            ErrorKind::Type => "type",
            ErrorKind::Membership => "membership",
            ErrorKind::Constraint => "constraint",
        };
        write!(f, "{}", s)
    }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub kind: ErrorKind,
    /// Constraint name, or `required`/`type`/`membership`
    pub constraint_name: String,
    pub message: String,
    /// Offending value (the element for indexed errors)
    pub value: Value,
    /// Element index inside a multi-valued field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ValidationError {
    pub fn new(
        kind: ErrorKind,
        constraint_name: impl Into<String>,
        message: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            kind,
            constraint_name: constraint_name.into(),
            message: message.into(),
            value,
            index: None,
        }
    }

    /// Create a required error
    pub fn required(value: Value) -> Self {
        Self::new(ErrorKind::Required, REQUIRED, REQUIRED_MESSAGE, value)
    }

    /// Create a type error
    pub fn type_mismatch(expected: &str, value: Value) -> Self {
        Self::new(ErrorKind::Type, TYPE, format!("Expected {} type", expected), value)
    }

    /// Create a membership error
    pub fn membership(value: Value) -> Self {
        Self::new(ErrorKind::Membership, MEMBERSHIP, MEMBERSHIP_MESSAGE, value)
    }

    /// Create a constraint error
    pub fn constraint(name: impl Into<String>, message: impl Into<String>, value: Value) -> Self {
        Self::new(ErrorKind::Constraint, name, message, value)
    }

    /// Attach an element index
    pub fn at(mut self, index: Option<usize>) -> Self {
        self.index = index;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]: {}", self.constraint_name, i, self.message),
            None => write!(f, "{}: {}", self.constraint_name, self.message),
        }
    }
}

/// Outcome of validating one value: valid iff there are no errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Result for the given errors, in order
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Errors attributed to one constraint name
    pub fn errors_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.constraint_name == name)
    }

    /// Constraint names in error order
    pub fn constraint_names(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.constraint_name.as_str()).collect()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "valid");
        }
        write!(f, "invalid ({} errors)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}
