//! Values resolver
//!
//! Turns an endpoint description plus a request into a page of selectable
//! values. Inline endpoints are resolved locally. Remote endpoints go through
//! the cache, then the transport; successful pages are cached according to
//! the endpoint's cache strategy and failures are never cached.
//!
//! Concurrent identical requests for a cacheable page are single-flighted:
//! the first caller fetches while the others wait on a per-key lock and then
//! read the cache.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::cache::{CacheProvider, InMemoryCache};
use super::errors::{ResolutionError, ResolutionResult};
use super::transport::{Transport, TransportRequest};
use crate::model::{
    DomainSource, EndpointProtocol, PaginationStrategy, ResponseMapping, Value, ValueAlias,
    ValuesEndpoint, DEFAULT_LIMIT,
};
use crate::validation::DomainSnapshotSource;

/// Caller-supplied request for one page of values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchValuesOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// 1-based page number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl FetchValuesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Search text, if any was given and it is not empty
    fn search_text(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// One page of resolved values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchValuesResult {
    pub values: Vec<ValueAlias>,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl FetchValuesResult {
    /// An empty, final page
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Page size when neither the request nor the endpoint names one (default: 50)
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Headers sent with every transport request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            headers: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Resolves value domains through a transport and a cache
pub struct ValuesResolver {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheProvider<FetchValuesResult>>,
    config: ResolverConfig,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ValuesResolver {
    /// Creates a resolver with a process-local cache
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_cache(transport, Arc::new(InMemoryCache::new()))
    }

    pub fn with_cache(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheProvider<FetchValuesResult>>,
    ) -> Self {
        Self {
            transport,
            cache,
            config: ResolverConfig::default(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves one page of values for `endpoint`.
    pub async fn resolve_values(
        &self,
        endpoint: &ValuesEndpoint,
        options: &FetchValuesOptions,
    ) -> ResolutionResult<FetchValuesResult> {
        if let Some(search) = &options.search {
            if search.chars().count() < endpoint.min_search_length() {
                debug!(search = %search, min = endpoint.min_search_length(), "search too short");
                return Ok(FetchValuesResult::empty());
            }
        }

        let uri = match endpoint.source() {
            DomainSource::Inline(items) => return Ok(self.resolve_inline(endpoint, items, options)),
            DomainSource::Remote(uri) => uri,
            DomainSource::Unresolvable if endpoint.protocol == EndpointProtocol::Inline => {
                return Ok(FetchValuesResult::empty());
            }
            DomainSource::Unresolvable => return Err(ResolutionError::MissingUri),
        };

        if !endpoint.cache_strategy.is_cacheable() {
            return self.fetch(uri, endpoint, options).await;
        }

        let key = self.cache_key(uri, endpoint, options);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "values cache hit");
            return Ok(hit);
        }

        let flight = self.flight_lock(&key);
        let result = {
            let _guard = flight.lock().await;
            match self.cache.get(&key) {
                Some(hit) => {
                    debug!(key = %key, "values cache hit after wait");
                    Ok(hit)
                }
                None => {
                    debug!(key = %key, "values cache miss");
                    let fetched = self.fetch(uri, endpoint, options).await;
                    if let Ok(page) = &fetched {
                        self.cache.set(&key, page.clone(), endpoint.cache_strategy.ttl());
                    }
                    fetched
                }
            }
        };
        self.release_flight(&key, &flight);
        result
    }

    /// Drops every cached page of `endpoint`, returning how many.
    pub fn invalidate_endpoint(&self, endpoint: &ValuesEndpoint) -> usize {
        match endpoint.source() {
            DomainSource::Remote(uri) => {
                let removed = self.cache.remove_prefix(&format!("{}|", uri));
                debug!(uri, removed, "invalidated endpoint cache");
                removed
            }
            _ => 0,
        }
    }

    /// Drops every cached page.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cache key: `uri|page|search|limit` with page defaulting to 1.
    fn cache_key(&self, uri: &str, endpoint: &ValuesEndpoint, options: &FetchValuesOptions) -> String {
        format!(
            "{}|{}|{}|{}",
            uri,
            options.page.unwrap_or(1),
            options.search.as_deref().unwrap_or_default(),
            options.limit.unwrap_or_else(|| self.default_limit(endpoint))
        )
    }

    fn default_limit(&self, endpoint: &ValuesEndpoint) -> u32 {
        endpoint
            .request_params
            .as_ref()
            .and_then(|p| p.default_limit)
            .unwrap_or(self.config.default_limit)
    }

    fn flight_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.entry(key.to_string()).or_default().clone()
    }

    fn release_flight(&self, key: &str, flight: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this caller still hold the lock
        if in_flight.get(key).is_some_and(|f| Arc::ptr_eq(f, flight)) && Arc::strong_count(flight) <= 2 {
            in_flight.remove(key);
        }
    }

    fn build_request(&self, endpoint: &ValuesEndpoint, options: &FetchValuesOptions) -> TransportRequest {
        let mut request = TransportRequest::new(endpoint.method);
        request.headers = self.config.headers.clone();

        if let Some(params) = &endpoint.request_params {
            if endpoint.pagination_strategy == PaginationStrategy::PageNumber {
                if let (Some(name), Some(page)) = (&params.page_param, options.page) {
                    request.params.insert(name.clone(), Json::from(page));
                }
            }
            if let Some(name) = &params.limit_param {
                let limit = options.limit.unwrap_or_else(|| self.default_limit(endpoint));
                request.params.insert(name.clone(), Json::from(limit));
            }
        }
        if let (Some(name), Some(search)) = (endpoint.search_param(), options.search_text()) {
            request.params.insert(name.to_string(), Json::from(search));
        }
        request
    }

    async fn fetch(
        &self,
        uri: &str,
        endpoint: &ValuesEndpoint,
        options: &FetchValuesOptions,
    ) -> ResolutionResult<FetchValuesResult> {
        let request = self.build_request(endpoint, options);
        debug!(uri, method = endpoint.method.as_str(), params = request.params.len(), "fetching values");

        let body = self.transport.perform(uri, request).await.map_err(|source| {
            warn!(uri, error = %source, "values transport failed");
            ResolutionError::Transport {
                uri: uri.to_string(),
                source,
            }
        })?;

        parse_response(&body, endpoint.response_mapping.as_ref())
    }

    /// Filters and pages an inline domain.
    ///
    /// Results are sliced only when the caller asks for a page or a limit, or
    /// the endpoint declares page-number pagination.
    fn resolve_inline(
        &self,
        endpoint: &ValuesEndpoint,
        items: &[ValueAlias],
        options: &FetchValuesOptions,
    ) -> FetchValuesResult {
        let matching: Vec<&ValueAlias> = match options.search_text() {
            Some(search) => {
                let needle = search.to_lowercase();
                items
                    .iter()
                    .filter(|item| {
                        item.label.to_lowercase().contains(&needle)
                            || item.value.to_display_string().to_lowercase().contains(&needle)
                    })
                    .collect()
            }
            None => items.iter().collect(),
        };
        let total = matching.len();

        let paged = options.page.is_some()
            || options.limit.is_some()
            || endpoint.pagination_strategy == PaginationStrategy::PageNumber;
        if !paged {
            return FetchValuesResult {
                values: matching.into_iter().cloned().collect(),
                has_next: false,
                total: Some(total as u64),
                page: None,
            };
        }

        let page = options.page.unwrap_or(1).max(1);
        let limit = options.limit.unwrap_or_else(|| self.default_limit(endpoint)) as usize;
        let start = (page as usize - 1).saturating_mul(limit);
        let values: Vec<ValueAlias> = matching.into_iter().skip(start).take(limit).cloned().collect();

        FetchValuesResult {
            has_next: start.saturating_add(limit) < total,
            values,
            total: Some(total as u64),
            page: Some(page),
        }
    }
}

impl DomainSnapshotSource for ValuesResolver {
    /// Inline items, or the cached unsearched first page of a remote domain
    /// when that page is the whole domain.
    fn snapshot(&self, endpoint: &ValuesEndpoint) -> Option<Vec<ValueAlias>> {
        match endpoint.source() {
            DomainSource::Inline(items) => Some(items.to_vec()),
            DomainSource::Remote(uri) if endpoint.cache_strategy.is_cacheable() => {
                let key = self.cache_key(uri, endpoint, &FetchValuesOptions::default());
                self.cache
                    .get(&key)
                    .filter(|page| !page.has_next)
                    .map(|page| page.values)
            }
            _ => None,
        }
    }
}

/// Looks up a mapped field: an exact key first, then a dotted path.
fn lookup<'a>(body: &'a Json, path: &str) -> Option<&'a Json> {
    if let Some(found) = body.get(path) {
        return Some(found);
    }
    path.split('.')
        .try_fold(body, |node, segment| node.get(segment))
}

fn mapped<'a>(body: &'a Json, field: Option<&String>) -> Option<&'a Json> {
    field
        .filter(|f| !f.is_empty())
        .and_then(|f| lookup(body, f))
        .filter(|v| !v.is_null())
}

/// Parses a response body according to `mapping`.
///
/// A missing or null data node is an empty page; any other non-array is
/// rejected, as is an element that is neither `{value, label}` nor a scalar.
pub fn parse_response(body: &Json, mapping: Option<&ResponseMapping>) -> ResolutionResult<FetchValuesResult> {
    let data_field = mapping.and_then(|m| m.data_field.as_ref()).filter(|f| !f.is_empty());
    let data = match data_field {
        Some(field) => lookup(body, field),
        None => Some(body),
    };

    let values: Vec<ValueAlias> = match data {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items.iter().map(parse_alias).collect::<ResolutionResult<_>>()?,
        Some(other) => {
            return Err(ResolutionError::InvalidResponse(format!(
                "expected an array of values at '{}', got {}",
                data_field.map(String::as_str).unwrap_or("<root>"),
                json_kind(other)
            )));
        }
    };

    let Some(mapping) = mapping else {
        return Ok(FetchValuesResult {
            values,
            ..Default::default()
        });
    };

    Ok(FetchValuesResult {
        values,
        has_next: mapped(body, mapping.has_next_field.as_ref())
            .and_then(Json::as_bool)
            .unwrap_or(false),
        total: mapped(body, mapping.total_field.as_ref()).and_then(as_count),
        page: mapped(body, mapping.page_field.as_ref())
            .and_then(as_count)
            .and_then(|p| u32::try_from(p).ok()),
    })
}

fn parse_alias(item: &Json) -> ResolutionResult<ValueAlias> {
    match item {
        Json::Object(obj) => {
            let raw = obj.get("value").ok_or_else(|| {
                ResolutionError::InvalidResponse("value entry without a 'value' key".into())
            })?;
            let value = scalar(raw)?;
            let label = match obj.get("label") {
                Some(Json::String(s)) => s.clone(),
                Some(Json::Null) | None => value.to_display_string(),
                Some(other) => other.to_string(),
            };
            Ok(ValueAlias { value, label })
        }
        other => {
            let value = scalar(other)?;
            Ok(ValueAlias {
                label: value.to_display_string(),
                value,
            })
        }
    }
}

fn scalar(json: &Json) -> ResolutionResult<Value> {
    match json {
        Json::String(_) | Json::Number(_) | Json::Bool(_) => Value::try_from(json)
            .map_err(|e| ResolutionError::InvalidResponse(e.to_string())),
        other => Err(ResolutionError::InvalidResponse(format!(
            "unsupported value entry: {}",
            json_kind(other)
        ))),
    }
}

fn as_count(json: &Json) -> Option<u64> {
    json.as_u64()
        .or_else(|| json.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CacheStrategy, RequestParams};
    use crate::resolver::{TransportError, TransportFuture};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed body and records every request
    struct Recording {
        body: Json,
        calls: AtomicUsize,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl Recording {
        fn new(body: Json) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> TransportRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recording {
        fn perform<'a>(&'a self, _uri: &'a str, request: TransportRequest) -> TransportFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let body = self.body.clone();
            Box::pin(async move { Ok(body) })
        }
    }

    struct Failing;

    impl Transport for Failing {
        fn perform<'a>(&'a self, _uri: &'a str, _request: TransportRequest) -> TransportFuture<'a> {
            Box::pin(async { Err(TransportError::Network("connection reset".into())) })
        }
    }

    fn countries() -> Json {
        json!({
            "items": [{"value": "FR", "label": "France"}, {"value": "DE", "label": "Germany"}],
            "meta": {"total": 2},
            "hasMore": false
        })
    }

    fn countries_mapping() -> ResponseMapping {
        ResponseMapping {
            data_field: Some("items".into()),
            total_field: Some("meta.total".into()),
            has_next_field: Some("hasMore".into()),
            ..Default::default()
        }
    }

    // ==================== Response Parsing Tests ====================

    #[test]
    fn test_parse_root_array_with_scalars() {
        let result = parse_response(&json!(["A", 2, true]), None).unwrap();
        let labels: Vec<_> = result.values.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "2", "true"]);
        assert!(!result.has_next);
        assert_eq!(result.total, None);
    }

    #[test]
    fn test_parse_mapped_fields() {
        let result = parse_response(&countries(), Some(&countries_mapping())).unwrap();
        assert_eq!(result.values.len(), 2);
        assert_eq!(result.total, Some(2));
        assert!(!result.has_next);
        assert_eq!(result.page, None);
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        let err = parse_response(&json!([{"label": "no value"}]), None).unwrap_err();
        assert_eq!(err.code(), "RESOLUTION_INVALID_RESPONSE");

        let err = parse_response(&json!([[1, 2]]), None).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidResponse(_)));

        let err = parse_response(&json!({"items": "nope"}), Some(&countries_mapping())).unwrap_err();
        assert!(err.to_string().contains("'items'"));
    }

    #[test]
    fn test_parse_missing_data_is_empty() {
        let result = parse_response(&json!({"other": 1}), Some(&countries_mapping())).unwrap();
        assert!(result.values.is_empty());
    }

    // ==================== Request Building Tests ====================

    #[tokio::test]
    async fn test_request_params() {
        let transport = Recording::new(countries());
        let resolver = ValuesResolver::new(transport.clone())
            .with_config(ResolverConfig::default().with_header("X-Client", "fieldspec"));
        let endpoint = ValuesEndpoint::remote("/api/countries")
            .with_pagination(PaginationStrategy::PageNumber)
            .with_request_params(RequestParams {
                page_param: Some("p".into()),
                limit_param: Some("size".into()),
                search_param: Some("q".into()),
                default_limit: Some(20),
            })
            .with_response_mapping(countries_mapping());

        resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new().with_page(2).with_search("fr"))
            .await
            .unwrap();
        let request = transport.last_request();
        assert_eq!(request.param("p"), Some(&json!(2)));
        assert_eq!(request.param("size"), Some(&json!(20)));
        assert_eq!(request.param("q"), Some(&json!("fr")));
        assert_eq!(request.headers.get("X-Client").map(String::as_str), Some("fieldspec"));

        resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.param("p"), None);
        assert_eq!(request.param("q"), None);
    }

    #[tokio::test]
    async fn test_legacy_search_field() {
        let transport = Recording::new(json!([]));
        let resolver = ValuesResolver::new(transport.clone());
        let mut endpoint = ValuesEndpoint::remote("/api/x");
        endpoint.search_field = Some("term".into());

        resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new().with_search("ab"))
            .await
            .unwrap();
        assert_eq!(transport.last_request().param("term"), Some(&json!("ab")));
    }

    // ==================== Resolution Tests ====================

    #[tokio::test]
    async fn test_missing_uri() {
        let resolver = ValuesResolver::new(Recording::new(json!([])));
        let err = resolver
            .resolve_values(&ValuesEndpoint::default(), &FetchValuesOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::MissingUri));
    }

    #[tokio::test]
    async fn test_transport_failure_not_cached() {
        let resolver = ValuesResolver::new(Arc::new(Failing));
        let endpoint = ValuesEndpoint::remote("/api/x").with_cache_strategy(CacheStrategy::Session);
        let err = resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert!(resolver.snapshot(&endpoint).is_none());
    }

    #[tokio::test]
    async fn test_inline_search_and_paging() {
        let resolver = ValuesResolver::new(Recording::new(json!([])));
        let endpoint = ValuesEndpoint::inline(vec![
            ValueAlias::new("FR", "France"),
            ValueAlias::new("FI", "Finland"),
            ValueAlias::new("DE", "Germany"),
        ]);

        let all = resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        assert_eq!(all.values.len(), 3);
        assert!(!all.has_next);

        let searched = resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new().with_search("f"))
            .await
            .unwrap();
        assert_eq!(searched.values.len(), 2);

        let page = resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new().with_limit(2))
            .await
            .unwrap();
        assert_eq!(page.values.len(), 2);
        assert!(page.has_next);
        assert_eq!(page.total, Some(3));
        assert_eq!(page.page, Some(1));

        let last = resolver
            .resolve_values(&endpoint, &FetchValuesOptions::new().with_limit(2).with_page(2))
            .await
            .unwrap();
        assert_eq!(last.values, vec![ValueAlias::new("DE", "Germany")]);
        assert!(!last.has_next);
    }

    #[tokio::test]
    async fn test_snapshot_requires_complete_first_page() {
        let transport = Recording::new(countries());
        let resolver = ValuesResolver::new(transport.clone());
        let endpoint = ValuesEndpoint::remote("/api/countries")
            .with_cache_strategy(CacheStrategy::LongTerm)
            .with_response_mapping(countries_mapping());

        assert!(resolver.snapshot(&endpoint).is_none());
        resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        assert_eq!(resolver.snapshot(&endpoint).map(|v| v.len()), Some(2));

        let partial = Recording::new(json!({"items": ["A"], "hasMore": true}));
        let resolver = ValuesResolver::new(partial);
        resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        assert!(resolver.snapshot(&endpoint).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_endpoint() {
        let transport = Recording::new(json!(["A"]));
        let resolver = ValuesResolver::new(transport.clone());
        let endpoint = ValuesEndpoint::remote("/api/a").with_cache_strategy(CacheStrategy::Session);
        let other = ValuesEndpoint::remote("/api/ab").with_cache_strategy(CacheStrategy::Session);

        resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        resolver.resolve_values(&other, &FetchValuesOptions::new()).await.unwrap();
        assert_eq!(resolver.invalidate_endpoint(&endpoint), 1);

        resolver.resolve_values(&endpoint, &FetchValuesOptions::new()).await.unwrap();
        resolver.resolve_values(&other, &FetchValuesOptions::new()).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

        resolver.clear_cache();
        resolver.resolve_values(&other, &FetchValuesOptions::new()).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }
}
