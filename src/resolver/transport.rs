//! Transport seam
//!
//! The resolver never speaks a wire protocol itself. A `Transport` performs
//! one request against a uri and yields the decoded JSON body; HTTP, gRPC or
//! test doubles plug in here.

use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use super::errors::TransportError;
use crate::model::HttpMethod;

/// Future returned by a transport
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Json, TransportError>> + Send + 'a>>;

/// One request to a remote values endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Query parameters for GET, body fields for POST
    pub params: BTreeMap<String, Json>,
    pub headers: BTreeMap<String, String>,
}

impl TransportRequest {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Json> {
        self.params.get(name)
    }
}

/// Performs requests against remote values endpoints
pub trait Transport: Send + Sync {
    fn perform<'a>(&'a self, uri: &'a str, request: TransportRequest) -> TransportFuture<'a>;
}
