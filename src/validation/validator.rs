//! Field validator
//!
//! Runs the phases in a fixed order and accumulates every error:
//!
//! 1. Coerce a copy of the value (when enabled)
//! 2. Required: an empty required value fails with a single error
//! 3. An empty optional value is valid
//! 4. Type: any mismatch ends validation
//! 5. Membership in the value domain, when one is known
//! 6. Every constraint in declaration order

use std::sync::Arc;

use tracing::trace;

use super::coercion::Coercer;
use super::constraints;
use super::custom::{CustomConstraintHandler, CustomConstraintRegistry};
use super::errors::{ValidationError, ValidationResult};
use super::membership::{check_membership, resolve_domain, DomainSnapshotSource};
use super::options::ValidationOptions;
use crate::model::{DataType, FieldSpec, Value};

/// Outcome of the phases before constraint evaluation
enum Gate {
    /// Validation is over
    Done(ValidationResult),
    /// Constraints still run against the coerced value
    Continue {
        value: Value,
        errors: Vec<ValidationError>,
    },
}

/// Validates values against field specifications.
///
/// Holds no per-call state and may be shared across threads.
pub struct FieldValidator {
    options: ValidationOptions,
    coercer: Coercer,
    customs: CustomConstraintRegistry,
    domains: Option<Arc<dyn DomainSnapshotSource>>,
}

impl FieldValidator {
    /// Creates a validator with default options (coercion disabled)
    pub fn new() -> Self {
        Self::with_options(ValidationOptions::default())
    }

    pub fn with_options(options: ValidationOptions) -> Self {
        Self {
            coercer: Coercer::new(&options.coercion),
            options,
            customs: CustomConstraintRegistry::new(),
            domains: None,
        }
    }

    /// Replaces the custom constraint handlers
    pub fn with_custom_constraints(mut self, customs: CustomConstraintRegistry) -> Self {
        self.customs = customs;
        self
    }

    /// Registers a handler for custom constraints named `name`
    pub fn register_custom<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: CustomConstraintHandler + 'static,
    {
        self.customs.register(name, handler);
    }

    /// Supplies snapshots of remote domains for membership checks
    pub fn with_domain_source(mut self, source: Arc<dyn DomainSnapshotSource>) -> Self {
        self.domains = Some(source);
        self
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates `value` against every phase and constraint of `spec`.
    pub fn validate(&self, spec: &FieldSpec, value: &Value) -> ValidationResult {
        let (value, mut errors) = match self.gate(spec, value) {
            Gate::Done(result) => return result,
            Gate::Continue { value, errors } => (value, errors),
        };

        for constraint in &spec.constraints {
            let found = constraints::evaluate(spec, constraint, &value, &self.customs);
            trace!(
                field = %spec.display_name,
                constraint = %constraint.name,
                errors = found.len(),
                "constraint evaluated"
            );
            errors.extend(found);
        }

        ValidationResult::from_errors(errors)
    }

    /// Runs only the required check.
    pub fn validate_required(&self, spec: &FieldSpec, value: &Value) -> ValidationResult {
        let value = self.coerce(spec, value);
        if spec.required && value.is_empty() {
            return ValidationResult::from_errors(vec![ValidationError::required(value)]);
        }
        ValidationResult::valid()
    }

    /// Runs the phases up to membership, then only the constraint named
    /// `name`. An unknown name is reported as an error attributed to it.
    pub fn validate_constraint(&self, spec: &FieldSpec, value: &Value, name: &str) -> ValidationResult {
        let (value, mut errors) = match self.gate(spec, value) {
            Gate::Done(result) => return result,
            Gate::Continue { value, errors } => (value, errors),
        };

        match spec.constraint(name) {
            Some(constraint) => {
                errors.extend(constraints::evaluate(spec, constraint, &value, &self.customs));
            }
            None => errors.push(ValidationError::constraint(
                name,
                format!("Constraint '{}' not found", name),
                value,
            )),
        }

        ValidationResult::from_errors(errors)
    }

    fn coerce(&self, spec: &FieldSpec, value: &Value) -> Value {
        match &spec.coercion {
            Some(field_options) => Coercer::new(field_options).coerce(spec.data_type, value),
            None => self.coercer.coerce(spec.data_type, value),
        }
    }

    fn gate(&self, spec: &FieldSpec, raw: &Value) -> Gate {
        let field = spec.display_name.as_str();

        let value = self.coerce(spec, raw);
        trace!(field, "coercion applied");

        if value.is_empty() {
            if spec.required {
                trace!(field, "required value missing");
                return Gate::Done(ValidationResult::from_errors(vec![ValidationError::required(value)]));
            }
            trace!(field, "empty optional value");
            return Gate::Done(ValidationResult::valid());
        }

        let type_errors = check_type(spec, &value);
        if !type_errors.is_empty() {
            trace!(field, errors = type_errors.len(), "type check failed");
            return Gate::Done(ValidationResult::from_errors(type_errors));
        }

        let errors = match &spec.values_endpoint {
            Some(endpoint) => match resolve_domain(endpoint, self.domains.as_deref()) {
                Some(domain) => check_membership(spec, endpoint, &domain, &value),
                None => {
                    trace!(field, "value domain unavailable, membership skipped");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        trace!(field, errors = errors.len(), "membership checked");

        Gate::Continue { value, errors }
    }
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates `value` with a default validator.
pub fn validate(spec: &FieldSpec, value: &Value) -> ValidationResult {
    FieldValidator::new().validate(spec, value)
}

/// Type errors for `value`; element errors are indexed.
fn check_type(spec: &FieldSpec, value: &Value) -> Vec<ValidationError> {
    let scalar = spec.data_type;
    match (spec.expect_multiple_values, value) {
        (true, Value::List(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !matches_type(scalar, item))
            .map(|(i, item)| ValidationError::type_mismatch(scalar.type_name(), item.clone()).at(Some(i)))
            .collect(),
        (true, _) => vec![ValidationError::type_mismatch(
            &spec.expected_type_description(),
            value.clone(),
        )],
        (false, v) if matches_type(scalar, v) => Vec::new(),
        (false, _) => vec![ValidationError::type_mismatch(scalar.type_name(), value.clone())],
    }
}

fn matches_type(data_type: DataType, value: &Value) -> bool {
    match data_type {
        DataType::String => matches!(value, Value::String(_)),
        DataType::Number => matches!(value, Value::Number(n) if n.is_finite()),
        DataType::Boolean => matches!(value, Value::Boolean(_)),
        DataType::Date => value.as_date().is_some(),
    }
}
