//! Constraint validation pipeline
//!
//! Validates a candidate value against a `FieldSpec` and reports every
//! violation in one `ValidationResult`:
//! - Coercion: optional, best-effort, on a copy
//! - Required and type checks, which end validation on failure
//! - Membership in CLOSED value domains
//! - Atomic constraints, all of them, in declaration order

mod coercion;
mod constraints;
mod custom;
mod errors;
mod membership;
mod options;
mod validator;

pub use coercion::Coercer;
pub use constraints::{compile_pattern, evaluate};
pub use custom::{CustomConstraintHandler, CustomConstraintRegistry, FieldContext};
pub use errors::{ErrorKind, ValidationError, ValidationResult};
pub use membership::{check_membership, loose_equals, resolve_domain, DomainSnapshotSource};
pub use options::{CoercionOptions, ValidationOptions, DEFAULT_NUMBER_PATTERN};
pub use validator::{validate, FieldValidator};
