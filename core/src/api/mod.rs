//! Endpoint groups: thin callers of `ApiClient::call_api`.
//!
//! Each method checks its required arguments before anything else and
//! raises `ApiError::Validation` naming the parameter and operation, so a
//! bad call never reaches the network.

mod index;
mod search;
mod utils;

pub use index::IndexApi;
pub use search::SearchApi;
pub use utils::{RawResponse, UtilsApi};

use serde::Serialize;
use serde_json::Value;

use crate::client::{select_header_accept, select_header_content_type, RequestOptions};
use crate::error::{ApiError, Result};

const JSON_MIME: &str = "application/json";

/// Options carrying negotiated `Accept` and `Content-Type` headers.
fn negotiated(content_types: &[&str]) -> RequestOptions {
    let accept = select_header_accept(&[JSON_MIME]).unwrap_or(JSON_MIME);
    let content_type = select_header_content_type(content_types);
    RequestOptions::new()
        .header("Accept", accept)
        .header("Content-Type", content_type)
}

fn json_options() -> RequestOptions {
    negotiated(&[JSON_MIME])
}

/// Serialize a body argument, rejecting it when it is null or empty.
fn require_body<T: Serialize + ?Sized>(body: &T, param: &str, operation: &str) -> Result<Value> {
    let value = serde_json::to_value(body)?;
    if is_missing(&value) {
        return Err(ApiError::missing_parameter(param, operation));
    }
    Ok(value)
}

/// Reject an empty string argument. Whitespace counts as a value.
fn require_text(value: &str, param: &str, operation: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ApiError::missing_parameter(param, operation));
    }
    Ok(())
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
