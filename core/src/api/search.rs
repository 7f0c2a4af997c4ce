//! Search and percolate endpoints.
//!
//! # Design
//! Both post JSON. `percolate` also needs the table name, which is
//! substituted into `/pq/{index}/search`.

use serde::Serialize;
use serde_json::Value;

use super::{json_options, require_body, require_text};
use crate::client::ApiClient;
use crate::error::Result;
use crate::http::HttpMethod;

/// Full-text search and percolate queries.
pub struct SearchApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SearchApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Run a search request. An empty request object counts as missing.
    pub fn search<T: Serialize + ?Sized>(&self, search_request: &T) -> Result<Value> {
        let body = require_body(search_request, "search_request", "search")?;
        self.client
            .call_api("/search", HttpMethod::Post, json_options().body(body))
    }

    /// Match a document against the stored queries of percolate table
    /// `index`.
    pub fn percolate<T: Serialize + ?Sized>(
        &self,
        index: &str,
        percolate_request: &T,
    ) -> Result<Value> {
        require_text(index, "index", "percolate")?;
        let body = require_body(percolate_request, "percolate_request", "percolate")?;

        let options = json_options().path_param("index", index).body(body);
        self.client
            .call_api("/pq/{index}/search", HttpMethod::Post, options)
    }
}
