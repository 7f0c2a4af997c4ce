//! Connection settings shared by every request a client issues.
//!
//! # Design
//! `Configuration` is a plain value: built once, read by `ApiClient` and
//! `Transport` at construction, never mutated behind the caller's back. The
//! process-wide default lives in a `OnceLock` and is handed out as an `Arc`
//! so clients built from it share one instance.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::level_filters::LevelFilter;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "http://127.0.0.1:9308";

/// Version of the HTTP API this client speaks.
pub const API_VERSION: &str = "0.0.1";

static DEFAULT: OnceLock<Arc<Configuration>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Configuration {
    host: String,
    pub api_key: HashMap<String, String>,
    pub api_key_prefix: HashMap<String, String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_side_validation: bool,
    pub verify_ssl: bool,
    /// PEM file whose certificate replaces the default trust roots.
    pub ssl_ca_cert: Option<String>,
    /// PEM client certificate and key; set both or neither.
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    /// Raises log verbosity from `INFO` to `DEBUG`.
    pub debug: bool,
    pub connection_pool_maxsize: usize,
    pub proxy: Option<String>,
    /// Added to every request when `proxy` is set.
    pub proxy_headers: HashMap<String, String>,
    /// Handed to the HTTP transport; the client itself never times out.
    pub timeout: Option<Duration>,
}

impl Configuration {
    pub fn new(host: &str) -> Self {
        Self {
            host: normalize_host(host),
            api_key: HashMap::new(),
            api_key_prefix: HashMap::new(),
            username: None,
            password: None,
            client_side_validation: true,
            verify_ssl: true,
            ssl_ca_cert: None,
            cert_file: None,
            key_file: None,
            debug: false,
            connection_pool_maxsize: 20,
            proxy: None,
            proxy_headers: HashMap::new(),
            timeout: None,
        }
    }

    /// The shared default configuration, created on first access.
    pub fn shared() -> Arc<Configuration> {
        DEFAULT
            .get_or_init(|| Arc::new(Configuration::new(DEFAULT_HOST)))
            .clone()
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_api_key(mut self, identifier: &str, key: &str, prefix: Option<&str>) -> Self {
        self.api_key.insert(identifier.to_string(), key.to_string());
        if let Some(prefix) = prefix {
            self.api_key_prefix
                .insert(identifier.to_string(), prefix.to_string());
        }
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn set_host(&mut self, host: &str) {
        self.host = normalize_host(host);
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Verbosity the client logs at.
    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }

    /// The configured host. Only a single host is supported, so `index` is
    /// ignored.
    pub fn host_from_settings(&self, _index: usize) -> &str {
        &self.host
    }

    pub fn api_key_with_prefix(&self, identifier: &str) -> Option<String> {
        let key = self.api_key.get(identifier)?;
        match self.api_key_prefix.get(identifier) {
            Some(prefix) => Some(format!("{prefix} {key}")),
            None => Some(key.clone()),
        }
    }

    /// Base64 of `username:password`, when both are set.
    pub fn basic_auth_token(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(STANDARD.encode(format!("{user}:{pass}"))),
            _ => None,
        }
    }

    pub fn debug_report(&self) -> String {
        format!(
            "Rust SDK Debug Report:\n\
             OS: {}\n\
             Client Version: {}\n\
             Version of the API: {API_VERSION}\n",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION"),
        )
    }
}

/// Prefix `http://` when the host carries no scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if has_scheme(host) {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn has_scheme(host: &str) -> bool {
    match host.find("://") {
        Some(pos) if pos > 0 => host[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}
