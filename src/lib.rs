//! fieldspec - Declarative field validation and value domain resolution
//!
//! A backend describes each input field as data; this crate applies the
//! description uniformly:
//! - `model`: field, constraint and endpoint records, plus the value type
//! - `validation`: the constraint validation pipeline
//! - `resolver`: cached, paginated, searchable value domains

pub mod model;
pub mod resolver;
pub mod validation;
