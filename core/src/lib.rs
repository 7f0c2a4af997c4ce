//! Synchronous HTTP client for the Manticore Search API.
//!
//! # Overview
//! Typed endpoint methods (`bulk`, `insert`, `search`, `sql`, ...) funnel
//! through one request pipeline that merges headers, substitutes path
//! parameters, sends the request and decodes the JSON reply. Failures are
//! typed: `Validation` before any I/O, `Transport` for non-2xx responses.
//!
//! # Design
//! - `Configuration` is an immutable value; `Configuration::shared()` hands
//!   out one shared `Arc` for the whole process.
//! - `Transport` owns the resolved base URI and delegates the exchange to an
//!   `HttpExecutor` (ureq by default), so tests can substitute the I/O.
//! - Responses are generic `serde_json::Value`s; the server's shape varies
//!   per endpoint and per SQL statement.
//!
//! ```no_run
//! use manticore_client::{ApiClient, Configuration, RawResponse};
//! use std::sync::Arc;
//!
//! let client = ApiClient::new(Arc::new(Configuration::new("localhost:9308")))?;
//! let tables = client.utils().sql("SHOW TABLES", RawResponse::Unset)?;
//! println!("{tables}");
//! # Ok::<(), manticore_client::ApiError>(())
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use crate::api::{IndexApi, RawResponse, SearchApi, UtilsApi};
pub use crate::client::{
    merge_headers, resolve_path, select_header_accept, select_header_content_type, ApiClient,
    RequestOptions, USER_AGENT,
};
pub use crate::config::Configuration;
pub use crate::error::{ApiError, ErrorKind, Result};
pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use crate::transport::{extract_error_message, HttpExecutor, Transport, UreqExecutor};
