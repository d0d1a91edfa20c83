//! Field specification model
//!
//! Inert records read by validation and resolution:
//! - `FieldSpec`: type, cardinality, required flag, constraints, domain
//! - `ConstraintDescriptor`: one named rule with a closed `ConstraintKind`
//! - `ValuesEndpoint`: inline or remote value domain
//! - `Value`: the closed value variant being validated
//! - `InputSpec` documents and their directory loader

mod constraint;
mod document;
mod endpoint;
mod errors;
mod loader;
mod types;
mod value;

pub use constraint::{Bound, ConstraintDescriptor, ConstraintKind};
pub use document::{InputSpec, CURRENT_PROTOCOL_VERSION};
pub use endpoint::{
    CacheStrategy, DomainMode, DomainSource, EndpointProtocol, HttpMethod, PaginationStrategy,
    RequestParams, ResponseMapping, ValueAlias, ValuesEndpoint, DEFAULT_LIMIT,
};
pub use errors::{ModelError, ModelResult};
pub use loader::InputSpecLoader;
pub use types::{DataType, FieldSpec};
pub use value::{format_number, parse_date, Value};
