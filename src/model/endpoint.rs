//! Value domain endpoints.
//!
//! An endpoint describes where a field's permitted values come from: an inline
//! list carried in the spec, or a remote source queried through a transport.
//! It also carries the membership mode and the hints the resolver and UI use
//! (cache strategy, pagination, search, debounce).

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::value::Value;

/// Default page size when neither the request nor the endpoint names one
pub const DEFAULT_LIMIT: u32 = 50;

/// Transport protocol hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointProtocol {
    /// Values are listed in the endpoint itself
    Inline,
    #[default]
    Https,
    Http,
    Grpc,
}

/// Whether domain membership is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DomainMode {
    /// Values outside the domain are rejected
    #[default]
    Closed,
    /// The domain is advisory only
    Suggestions,
}

impl DomainMode {
    /// Parses a wire token. Legacy `STRICT`/`LENIENT` map to
    /// `CLOSED`/`SUGGESTIONS`; unknown tokens fall back to `CLOSED`.
    pub fn from_wire(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "SUGGESTIONS" | "LENIENT" => DomainMode::Suggestions,
            _ => DomainMode::Closed,
        }
    }
}

impl<'de> Deserialize<'de> for DomainMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = Option::<String>::deserialize(deserializer)?;
        Ok(token.map_or(DomainMode::Closed, |t| DomainMode::from_wire(&t)))
    }
}

/// HTTP method used for remote endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Pagination strategy of a remote endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaginationStrategy {
    #[default]
    None,
    PageNumber,
}

/// Caching policy for resolved values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStrategy {
    /// Never cached
    #[default]
    None,
    /// Cached without expiry
    Session,
    /// Cached for 5 minutes
    ShortTerm,
    /// Cached for 1 hour
    LongTerm,
}

impl CacheStrategy {
    /// Returns whether results under this policy are cached at all
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, CacheStrategy::None)
    }

    /// Time-to-live for cached entries; `None` means no expiry.
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CacheStrategy::None | CacheStrategy::Session => None,
            CacheStrategy::ShortTerm => Some(Duration::from_secs(5 * 60)),
            CacheStrategy::LongTerm => Some(Duration::from_secs(60 * 60)),
        }
    }
}

/// A canonical value paired with its display label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAlias {
    pub value: Value,
    pub label: String,
}

impl ValueAlias {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Names of the request parameters a remote endpoint expects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u32>,
}

/// Where to find values and pagination data in a remote response.
///
/// Each entry is a field path: an exact top-level key, or a dot-separated
/// path into nested objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    /// Path to the value array; empty means the response is the array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next_field: Option<String>,
}

impl ResponseMapping {
    /// Mapping whose values live under `data_field`
    pub fn with_data_field(data_field: impl Into<String>) -> Self {
        Self {
            data_field: Some(data_field.into()),
            ..Default::default()
        }
    }
}

/// Classification of an endpoint's value source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainSource<'a> {
    /// Values carried inline
    Inline(&'a [ValueAlias]),
    /// Values fetched from a remote address
    Remote(&'a str),
    /// Nothing to resolve from (remote without uri, inline without items)
    Unresolvable,
}

/// Declarative description of a field's value domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesEndpoint {
    #[serde(default)]
    pub protocol: EndpointProtocol,
    #[serde(default)]
    pub mode: DomainMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ValueAlias>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub method: HttpMethod,
    /// Legacy name of the search parameter, used when `requestParams` names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_field: Option<String>,
    #[serde(default)]
    pub pagination_strategy: PaginationStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_params: Option<RequestParams>,
    #[serde(default)]
    pub cache_strategy: CacheStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_search_length: Option<usize>,
}

impl ValuesEndpoint {
    /// Create an inline, closed endpoint
    pub fn inline(items: Vec<ValueAlias>) -> Self {
        Self {
            protocol: EndpointProtocol::Inline,
            items: Some(items),
            ..Default::default()
        }
    }

    /// Create an inline, closed endpoint whose labels equal their values
    pub fn inline_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::inline(
            values
                .into_iter()
                .map(|v| {
                    let value = v.into();
                    let label = value.to_display_string();
                    ValueAlias { value, label }
                })
                .collect(),
        )
    }

    /// Create a remote, closed endpoint
    pub fn remote(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: DomainMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    pub fn with_pagination(mut self, strategy: PaginationStrategy) -> Self {
        self.pagination_strategy = strategy;
        self
    }

    pub fn with_request_params(mut self, params: RequestParams) -> Self {
        self.request_params = Some(params);
        self
    }

    pub fn with_response_mapping(mut self, mapping: ResponseMapping) -> Self {
        self.response_mapping = Some(mapping);
        self
    }

    pub fn with_min_search_length(mut self, len: usize) -> Self {
        self.min_search_length = Some(len);
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = Some(ms);
        self
    }

    /// Classifies where this endpoint's values come from
    pub fn source(&self) -> DomainSource<'_> {
        match (self.protocol, &self.items, &self.uri) {
            (EndpointProtocol::Inline, Some(items), _) => DomainSource::Inline(items),
            (EndpointProtocol::Inline, None, _) => DomainSource::Unresolvable,
            (_, _, Some(uri)) if !uri.is_empty() => DomainSource::Remote(uri),
            _ => DomainSource::Unresolvable,
        }
    }

    /// Returns whether membership in this domain is enforced
    pub fn is_closed(&self) -> bool {
        self.mode == DomainMode::Closed
    }

    /// Minimum search length, zero when unset
    pub fn min_search_length(&self) -> usize {
        self.min_search_length.unwrap_or(0)
    }

    /// Page size used when the caller does not pass one
    pub fn default_limit(&self) -> u32 {
        self.request_params
            .as_ref()
            .and_then(|p| p.default_limit)
            .unwrap_or(DEFAULT_LIMIT)
    }

    /// Search parameter name, falling back to the legacy `searchField`
    pub fn search_param(&self) -> Option<&str> {
        self.request_params
            .as_ref()
            .and_then(|p| p.search_param.as_deref())
            .or(self.search_field.as_deref())
    }

    /// Debounce delay the calling layer should apply between searches.
    /// The resolver itself never waits.
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_defaults_to_closed() {
        let endpoint: ValuesEndpoint = serde_json::from_value(json!({"uri": "/api/x"})).unwrap();
        assert_eq!(endpoint.mode, DomainMode::Closed);
        assert_eq!(endpoint.protocol, EndpointProtocol::Https);
        assert_eq!(endpoint.cache_strategy, CacheStrategy::None);
    }

    #[test]
    fn test_legacy_mode_tokens() {
        assert_eq!(DomainMode::from_wire("STRICT"), DomainMode::Closed);
        assert_eq!(DomainMode::from_wire("lenient"), DomainMode::Suggestions);
        assert_eq!(DomainMode::from_wire("suggestions"), DomainMode::Suggestions);
        assert_eq!(DomainMode::from_wire("SOMETHING_NEW"), DomainMode::Closed);

        let endpoint: ValuesEndpoint =
            serde_json::from_value(json!({"uri": "/api/x", "mode": "LENIENT"})).unwrap();
        assert_eq!(endpoint.mode, DomainMode::Suggestions);
    }

    #[test]
    fn test_inline_source() {
        let endpoint: ValuesEndpoint = serde_json::from_value(json!({
            "protocol": "INLINE",
            "items": [{"value": "ON", "label": "On"}, {"value": "OFF", "label": "Off"}]
        }))
        .unwrap();
        match endpoint.source() {
            DomainSource::Inline(items) => assert_eq!(items.len(), 2),
            other => panic!("expected inline source, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolvable_sources() {
        let inline_without_items = ValuesEndpoint {
            protocol: EndpointProtocol::Inline,
            ..Default::default()
        };
        assert_eq!(inline_without_items.source(), DomainSource::Unresolvable);
        assert_eq!(ValuesEndpoint::default().source(), DomainSource::Unresolvable);
    }

    #[test]
    fn test_cache_ttls() {
        assert!(!CacheStrategy::None.is_cacheable());
        assert_eq!(CacheStrategy::Session.ttl(), None);
        assert_eq!(CacheStrategy::ShortTerm.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(CacheStrategy::LongTerm.ttl(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_search_param_falls_back_to_search_field() {
        let mut endpoint = ValuesEndpoint::remote("/api/x");
        endpoint.search_field = Some("q".into());
        assert_eq!(endpoint.search_param(), Some("q"));

        let endpoint = endpoint.with_request_params(RequestParams {
            search_param: Some("search".into()),
            ..Default::default()
        });
        assert_eq!(endpoint.search_param(), Some("search"));
    }

    #[test]
    fn test_default_limit() {
        assert_eq!(ValuesEndpoint::remote("/x").default_limit(), DEFAULT_LIMIT);
        let endpoint = ValuesEndpoint::remote("/x").with_request_params(RequestParams {
            default_limit: Some(20),
            ..Default::default()
        });
        assert_eq!(endpoint.default_limit(), 20);
    }

    #[test]
    fn test_debounce_hint() {
        assert_eq!(ValuesEndpoint::remote("/x").debounce(), None);
        assert_eq!(
            ValuesEndpoint::remote("/x").with_debounce_ms(300).debounce(),
            Some(Duration::from_millis(300))
        );
    }
}
