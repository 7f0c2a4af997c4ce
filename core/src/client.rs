//! Request pipeline shared by every endpoint method.
//!
//! # Design
//! `ApiClient` holds the configuration, the default header set and a
//! `Transport`. `call_api` is one self-contained transaction: merge headers,
//! substitute path parameters, send, decode the JSON body. Nothing is kept
//! between calls, so a client can be shared across threads freely.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{IndexApi, SearchApi, UtilsApi};
use crate::config::Configuration;
use crate::error::Result;
use crate::http::{set_header, HttpMethod, RequestBody};
use crate::transport::{HttpExecutor, Transport};

/// Identifies this client to the server.
pub const USER_AGENT: &str = "manticoresearch/rust";

const JSON_MIME: &str = "application/json";

/// Everything one call needs beyond its path and verb.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub path_params: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub header_params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Documents the expected response shape; does not affect decoding.
    pub response_type: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_param(mut self, name: &str, value: impl ToString) -> Self {
        self.path_params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query_param(mut self, name: &str, value: impl ToString) -> Self {
        self.query_params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.header_params, name, value);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn response_type(mut self, response_type: &str) -> Self {
        self.response_type = Some(response_type.to_string());
        self
    }
}

/// Synchronous client for the search daemon's HTTP API.
pub struct ApiClient {
    configuration: Arc<Configuration>,
    default_headers: Vec<(String, String)>,
    transport: Transport,
}

impl ApiClient {
    /// Build a client that talks HTTP through ureq.
    pub fn new(configuration: Arc<Configuration>) -> Result<Self> {
        let transport = Transport::new(&configuration)?;
        Ok(Self::assemble(configuration, transport))
    }

    /// Build a client on the shared default configuration.
    pub fn from_default() -> Result<Self> {
        Self::new(Configuration::shared())
    }

    /// Build a client whose requests go through `executor`.
    pub fn with_executor(
        configuration: Arc<Configuration>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self> {
        let transport = Transport::with_executor(&configuration, executor)?;
        Ok(Self::assemble(configuration, transport))
    }

    fn assemble(configuration: Arc<Configuration>, transport: Transport) -> Self {
        let mut default_headers = vec![("User-Agent".to_string(), USER_AGENT.to_string())];
        if let Some(token) = configuration.basic_auth_token() {
            default_headers.push(("Authorization".to_string(), format!("Basic {token}")));
        }
        Self {
            configuration,
            default_headers,
            transport,
        }
    }

    /// Add the client-wide custom header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.default_headers, name, value);
        self
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    pub fn client_side_validation(&self) -> bool {
        self.configuration.client_side_validation
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn index(&self) -> IndexApi<'_> {
        IndexApi::new(self)
    }

    pub fn search(&self) -> SearchApi<'_> {
        SearchApi::new(self)
    }

    pub fn utils(&self) -> UtilsApi<'_> {
        UtilsApi::new(self)
    }

    /// Send one request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// `Transport` for non-2xx responses and I/O failures, propagated as the
    /// transport raised them; `Json` when a successful body is not JSON.
    pub fn call_api(&self, path: &str, method: HttpMethod, options: RequestOptions) -> Result<Value> {
        let headers = merge_headers(&self.default_headers, &options.header_params);
        let path = resolve_path(path, &options.path_params);
        let response = self.transport.request(
            method,
            &path,
            &options.query_params,
            headers,
            options.body.as_ref(),
        )?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Layer `overrides` on top of `defaults`; names compare case-insensitively
/// and a later value replaces an earlier one in place.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = defaults.to_vec();
    for (name, value) in overrides {
        set_header(&mut merged, name, value);
    }
    merged
}

/// Substitute every `{name}` in `template` with the percent-encoded value.
/// Placeholders without a value stay as they are.
pub fn resolve_path(template: &str, params: &[(String, String)]) -> String {
    params.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
    })
}

/// Pick the `Accept` value: `application/json` when offered, else the first
/// candidate, else nothing.
pub fn select_header_accept<'a>(accepts: &[&'a str]) -> Option<&'a str> {
    accepts
        .iter()
        .find(|accept| accept.eq_ignore_ascii_case(JSON_MIME))
        .or_else(|| accepts.first())
        .copied()
}

/// Like `select_header_accept`, but an empty list yields `application/json`.
pub fn select_header_content_type<'a>(content_types: &[&'a str]) -> &'a str {
    select_header_accept(content_types).unwrap_or(JSON_MIME)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::test_support::RecordingExecutor;

    fn client_with(executor: &Arc<RecordingExecutor>) -> ApiClient {
        let config = Arc::new(Configuration::new("http://127.0.0.1:9308"));
        ApiClient::with_executor(config, executor.clone()).unwrap()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn default_headers_carry_user_agent_only() {
        let client = client_with(&Arc::new(RecordingExecutor::default()));
        assert_eq!(client.default_headers(), pairs(&[("User-Agent", USER_AGENT)]));
    }

    #[test]
    fn custom_header_is_added_to_defaults() {
        let client = client_with(&Arc::new(RecordingExecutor::default()))
            .with_header("X-Custom-Header", "CustomValue");
        assert_eq!(
            client.default_headers(),
            pairs(&[("User-Agent", USER_AGENT), ("X-Custom-Header", "CustomValue")])
        );
    }

    #[test]
    fn credentials_add_basic_authorization() {
        let config = Configuration::new("http://127.0.0.1:9308").with_credentials("user", "pass");
        let executor = Arc::new(RecordingExecutor::default());
        let client = ApiClient::with_executor(Arc::new(config), executor).unwrap();
        assert!(client
            .default_headers()
            .contains(&("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())));
    }

    #[test]
    fn per_call_headers_win_over_defaults() {
        let merged = merge_headers(
            &pairs(&[("User-Agent", USER_AGENT), ("X-Custom-Header", "CustomValue")]),
            &pairs(&[("user-agent", "other"), ("Authorization", "Bearer token")]),
        );
        assert_eq!(
            merged,
            pairs(&[
                ("User-Agent", "other"),
                ("X-Custom-Header", "CustomValue"),
                ("Authorization", "Bearer token"),
            ])
        );
    }

    #[test]
    fn path_params_are_substituted_and_encoded() {
        let params = pairs(&[("index", "t"), ("id", "1")]);
        assert_eq!(resolve_path("/{index}/_update/{id}", &params), "/t/_update/1");

        let params = pairs(&[("index", "my table")]);
        assert_eq!(resolve_path("/pq/{index}/search", &params), "/pq/my%20table/search");
    }

    #[test]
    fn unresolved_placeholders_are_left_alone() {
        let params = pairs(&[("index", "t")]);
        assert_eq!(resolve_path("/{index}/_update/{id}", &params), "/t/_update/{id}");
    }

    #[test]
    fn select_accept_rules() {
        assert_eq!(select_header_accept(&[]), None);
        assert_eq!(
            select_header_accept(&["text/plain", "application/json"]),
            Some("application/json")
        );
        assert_eq!(
            select_header_accept(&["text/plain", "APPLICATION/JSON"]),
            Some("APPLICATION/JSON")
        );
        assert_eq!(select_header_accept(&["text/plain", "text/html"]), Some("text/plain"));
    }

    #[test]
    fn select_content_type_rules() {
        assert_eq!(select_header_content_type(&[]), "application/json");
        assert_eq!(
            select_header_content_type(&["text/plain", "application/json"]),
            "application/json"
        );
        assert_eq!(select_header_content_type(&["text/plain"]), "text/plain");
    }

    #[test]
    fn call_api_sends_merged_request_and_decodes_json() {
        let executor = Arc::new(RecordingExecutor::default());
        executor.respond(200, r#"{"success": true}"#);
        let client = client_with(&executor);

        let options = RequestOptions::new()
            .path_param("id", 1)
            .query_param("search", "test")
            .header("Authorization", "Bearer token")
            .body(json!({"key": "value"}))
            .response_type("json");
        let result = client
            .call_api("/test_endpoint/{id}", HttpMethod::Get, options)
            .unwrap();
        assert_eq!(result, json!({"success": true}));

        let request = executor.last();
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.url, "http://127.0.0.1:9308/test_endpoint/1?search=test");
        assert_eq!(request.header("User-Agent"), Some(USER_AGENT));
        assert_eq!(request.header("Authorization"), Some("Bearer token"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"key":"value"}"#));
    }

    #[test]
    fn call_api_propagates_transport_error_unchanged() {
        let executor = Arc::new(RecordingExecutor::default());
        executor.respond(409, r#"{"error":"unknown local table(s) 'x' in search request"}"#);
        let client = client_with(&executor);

        let err = client
            .call_api("/search", HttpMethod::Post, RequestOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.to_string(), "unknown local table(s) 'x' in search request");
        assert_eq!(executor.count(), 1);
    }

    #[test]
    fn call_api_reports_status_line_for_non_json_error() {
        let executor = Arc::new(RecordingExecutor::default());
        executor.respond(503, "upstream unavailable");
        let client = client_with(&executor);

        let err = client
            .call_api("/search", HttpMethod::Post, RequestOptions::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn call_api_does_not_swallow_bad_success_body() {
        let executor = Arc::new(RecordingExecutor::default());
        executor.respond(200, "not json");
        let client = client_with(&executor);

        let err = client
            .call_api("/search", HttpMethod::Post, RequestOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Json);
    }

    #[test]
    fn decoded_body_round_trips_representative_values() {
        let values = [
            json!({"a": 1, "b": [true, false, null], "c": {"d": "e"}}),
            json!([1, 2.5, -3]),
            json!("text"),
            json!(42),
            json!(true),
        ];
        for value in values {
            let executor = Arc::new(RecordingExecutor::default());
            executor.respond(200, &value.to_string());
            let client = client_with(&executor);
            let options = RequestOptions::new().body(value.clone());
            let result = client.call_api("/echo", HttpMethod::Post, options).unwrap();
            let sent: Value = serde_json::from_str(executor.last().body.as_deref().unwrap()).unwrap();
            assert_eq!(sent, value);
            assert_eq!(result, value);
        }
    }
}
