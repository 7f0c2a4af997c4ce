//! The `/sql` endpoint.
//!
//! # Design
//! The query travels form-encoded in a `text/plain` body. `RawResponse`
//! picks between the server's native result sets (`mode=raw`) and the
//! search-style object, which is wrapped in a one-element array so every
//! mode returns an array.

use serde_json::Value;
use url::form_urlencoded;

use super::{negotiated, require_text};
use crate::client::ApiClient;
use crate::error::Result;
use crate::http::HttpMethod;

/// Response shape requested from the `/sql` endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RawResponse {
    /// Leave `raw_response` off; the server answers in raw mode.
    #[default]
    Unset,
    /// Ask for the server's native result-set array.
    True,
    /// Ask for the search-style hits object, wrapped in a one-element array.
    False,
}

impl RawResponse {
    fn query_value(self) -> Option<&'static str> {
        match self {
            RawResponse::Unset => None,
            RawResponse::True => Some("true"),
            RawResponse::False => Some("false"),
        }
    }

    fn body_prefix(self) -> &'static str {
        match self {
            RawResponse::Unset | RawResponse::True => "mode=raw&query=",
            RawResponse::False => "query=",
        }
    }
}

impl From<Option<bool>> for RawResponse {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => RawResponse::Unset,
            Some(true) => RawResponse::True,
            Some(false) => RawResponse::False,
        }
    }
}

/// Form-encoded SQL body for `query`.
pub fn sql_body(query: &str, raw_response: RawResponse) -> String {
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("{}{encoded}", raw_response.body_prefix())
}

/// Ad-hoc SQL over HTTP.
pub struct UtilsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UtilsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Execute `query`. With `RawResponse::False` the decoded response is
    /// wrapped in a single-element array.
    pub fn sql(&self, query: &str, raw_response: RawResponse) -> Result<Value> {
        require_text(query, "body", "sql")?;

        let mut options = negotiated(&["text/plain"]).body(sql_body(query, raw_response));
        if let Some(flag) = raw_response.query_value() {
            options = options.query_param("raw_response", flag);
        }

        let response = self.client.call_api("/sql", HttpMethod::Post, options)?;
        Ok(match raw_response {
            RawResponse::False => Value::Array(vec![response]),
            RawResponse::Unset | RawResponse::True => response,
        })
    }
}
