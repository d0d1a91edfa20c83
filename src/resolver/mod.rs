//! Value domain resolution
//!
//! Fetches the selectable values of a field's domain:
//! - Inline endpoints are searched and paged locally
//! - Remote endpoints are fetched through a `Transport`
//! - Pages are cached per endpoint cache strategy (SESSION, SHORT_TERM, LONG_TERM)
//!
//! The resolver also serves cached, complete domains to the validator for
//! CLOSED membership checks.

mod cache;
mod errors;
#[allow(clippy::module_inception)]
mod resolver;
mod transport;

pub use cache::{CacheProvider, CacheStats, InMemoryCache};
pub use errors::{ResolutionError, ResolutionResult, TransportError};
pub use resolver::{
    parse_response, FetchValuesOptions, FetchValuesResult, ResolverConfig, ValuesResolver,
};
pub use transport::{Transport, TransportFuture, TransportRequest};
