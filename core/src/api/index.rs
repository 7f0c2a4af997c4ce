//! Document mutation endpoints: bulk, insert, delete, replace, update and
//! partial update by id.
//!
//! # Design
//! Every call JSON-encodes its body and negotiates `application/json` both
//! ways. The partial update substitutes `index` and `id` into the path; the
//! rest post to fixed paths.

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use super::{json_options, require_body, require_text};
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// Document mutation endpoints.
pub struct IndexApi<'a> {
    client: &'a ApiClient,
}

impl<'a> IndexApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Run a batch of insert/replace/update/delete operations. Per-item
    /// outcomes come back inside the returned value.
    pub fn bulk<T: Serialize + ?Sized>(&self, body: &T) -> Result<Value> {
        let body = require_body(body, "body", "bulk")?;
        self.post("/bulk", body)
    }

    pub fn insert<T: Serialize + ?Sized>(&self, insert_document_request: &T) -> Result<Value> {
        let body = require_body(insert_document_request, "insert_document_request", "insert")?;
        self.post("/insert", body)
    }

    pub fn delete<T: Serialize + ?Sized>(&self, delete_document_request: &T) -> Result<Value> {
        let body = require_body(delete_document_request, "delete_document_request", "delete")?;
        self.post("/delete", body)
    }

    pub fn replace<T: Serialize + ?Sized>(&self, insert_document_request: &T) -> Result<Value> {
        let body = require_body(insert_document_request, "insert_document_request", "replace")?;
        self.post("/replace", body)
    }

    pub fn update<T: Serialize + ?Sized>(&self, update_document_request: &T) -> Result<Value> {
        let body = require_body(update_document_request, "update_document_request", "update")?;
        self.post("/update", body)
    }

    /// Partially update the document `id` in `index`.
    pub fn update_partial<T: Serialize + ?Sized>(
        &self,
        index: &str,
        id: impl Display,
        replace_document_request: &T,
    ) -> Result<Value> {
        const OP: &str = "update_partial";
        require_text(index, "index", OP)?;
        let id = id.to_string();
        if id.is_empty() {
            return Err(ApiError::missing_parameter("id", OP));
        }
        let body = require_body(replace_document_request, "replace_document_request", OP)?;

        let options = json_options()
            .path_param("index", index)
            .path_param("id", id)
            .body(body);
        self.client
            .call_api("/{index}/_update/{id}", HttpMethod::Post, options)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.client
            .call_api(path, HttpMethod::Post, json_options().body(body))
    }
}
