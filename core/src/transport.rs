//! Single-request HTTP transport and success/failure classification.
//!
//! # Design
//! `Transport` owns the resolved base URI and an `HttpExecutor` that does the
//! actual I/O. It turns a relative path, query pairs, headers and a body into
//! an `HttpRequest`, runs it, and classifies the result: 2xx comes back as an
//! `HttpResponse`, anything else becomes `ApiError::Transport` with the
//! server's `error` field (or a synthesized status line) as the message.

use std::sync::Arc;

use serde_json::Value;
use tracing::level_filters::LevelFilter;
use tracing::{debug, warn};
use ureq::tls::{Certificate, ClientCert, PrivateKey, RootCerts, TlsConfig};
use url::Url;

use crate::config::Configuration;
use crate::error::{ApiError, Result, DEFAULT_STATUS};
use crate::http::{set_header, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// HTTP port the search daemon listens on by default.
pub const DEFAULT_PORT: u16 = 9308;

/// Performs one HTTP exchange. Non-2xx statuses are returned as data, not
/// as errors; only I/O failures are `Err`.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking executor backed by a `ureq::Agent`.
pub struct UreqExecutor {
    agent: ureq::Agent,
    proxy_headers: Vec<(String, String)>,
}

impl UreqExecutor {
    pub fn new(config: &Configuration) -> Result<Self> {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(config.connection_pool_maxsize)
            .timeout_global(config.timeout);

        let mut proxy_headers = Vec::new();
        if let Some(proxy) = &config.proxy {
            let proxy = ureq::Proxy::new(proxy).map_err(|e| ApiError::Validation {
                message: format!("invalid proxy `{proxy}`: {e}"),
            })?;
            builder = builder.proxy(Some(proxy));
            proxy_headers = config
                .proxy_headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            proxy_headers.sort();
        }
        if let Some(tls) = tls_config(config)? {
            builder = builder.tls_config(tls);
        }

        Ok(Self {
            agent: builder.build().new_agent(),
            proxy_headers,
        })
    }

    /// Headers actually sent: proxy headers first, overridden by the
    /// request's own.
    fn outgoing_headers(&self, request: &HttpRequest) -> Vec<(String, String)> {
        let mut headers = self.proxy_headers.clone();
        for (name, value) in &request.headers {
            set_header(&mut headers, name, value);
        }
        headers
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let headers = &self.outgoing_headers(request);
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), headers).call(),
            HttpMethod::Head => with_headers(self.agent.head(url), headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), headers).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(url), headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(url), headers), body),
            HttpMethod::Patch => send(with_headers(self.agent.patch(url), headers), body),
        };

        let mut response = result.map_err(network_error)?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        // Response bodies are read in full, whatever their size.
        let text = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(network_error)?;

        Ok(HttpResponse::new(status, response_headers, text))
    }
}

/// TLS settings, or `None` when the agent defaults already apply.
fn tls_config(config: &Configuration) -> Result<Option<TlsConfig>> {
    let custom_roots = config.ssl_ca_cert.is_some();
    let client_cert = config.cert_file.is_some() || config.key_file.is_some();
    if config.verify_ssl && !custom_roots && !client_cert {
        return Ok(None);
    }

    let mut builder = TlsConfig::builder().disable_verification(!config.verify_ssl);
    if let Some(path) = &config.ssl_ca_cert {
        let ca = read_certificate(path)?;
        builder = builder.root_certs(RootCerts::new_with_certs(&[ca]));
    }
    match (&config.cert_file, &config.key_file) {
        (Some(cert_path), Some(key_path)) => {
            let cert = read_certificate(cert_path)?;
            let pem = read_pem(key_path)?;
            let key = PrivateKey::from_pem(&pem).map_err(|e| ApiError::Validation {
                message: format!("invalid private key in `{key_path}`: {e}"),
            })?;
            builder = builder.client_cert(Some(ClientCert::new_with_certs(&[cert], key)));
        }
        (None, None) => {}
        _ => {
            return Err(ApiError::Validation {
                message: "cert_file and key_file must be set together".to_string(),
            })
        }
    }
    Ok(Some(builder.build()))
}

fn read_pem(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ApiError::Validation {
        message: format!("cannot read `{path}`: {e}"),
    })
}

fn read_certificate(path: &str) -> Result<Certificate<'static>> {
    let pem = read_pem(path)?;
    Certificate::from_pem(&pem).map_err(|e| ApiError::Validation {
        message: format!("invalid certificate in `{path}`: {e}"),
    })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> std::result::Result<::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn network_error(err: ureq::Error) -> ApiError {
    ApiError::transport(err.to_string(), DEFAULT_STATUS)
}

/// Resolved target plus the executor that reaches it.
pub struct Transport {
    base_uri: String,
    base: Url,
    executor: Arc<dyn HttpExecutor>,
    log_level: LevelFilter,
}

impl Transport {
    /// Build a transport that talks HTTP through ureq.
    pub fn new(config: &Configuration) -> Result<Self> {
        let executor = UreqExecutor::new(config)?;
        Self::with_executor(config, Arc::new(executor))
    }

    pub fn with_executor(config: &Configuration, executor: Arc<dyn HttpExecutor>) -> Result<Self> {
        let base_uri = resolve_base_uri(config.host());
        let base = Url::parse(&base_uri).map_err(|e| ApiError::Validation {
            message: format!("invalid host `{}`: {e}", config.host()),
        })?;
        Ok(Self {
            base_uri,
            base,
            executor,
            log_level: config.log_level(),
        })
    }

    /// `scheme://host:port` every request path is joined onto.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Issue one request against `path` (relative, starting with `/`).
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(String, String)],
        mut headers: Vec<(String, String)>,
        body: Option<&RequestBody>,
    ) -> Result<HttpResponse> {
        let mut url = self.base.join(path).map_err(|e| ApiError::Validation {
            message: format!("invalid request path `{path}`: {e}"),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let body = match body {
            Some(body) => {
                if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                    set_header(&mut headers, "Content-Type", "application/json");
                }
                Some(body.encode()?)
            }
            None => None,
        };

        let request = HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        };
        if self.log_level >= LevelFilter::DEBUG {
            debug!(
                method = %request.method,
                url = %request.url,
                body_len = request.body.as_ref().map_or(0, String::len),
                "sending request"
            );
        }

        let response = self.executor.execute(&request)?;
        if self.log_level >= LevelFilter::DEBUG {
            debug!(
                status = response.status,
                body_len = response.body.len(),
                "received response"
            );
        }

        if response.is_success() {
            return Ok(response);
        }
        let message = extract_error_message(&response);
        warn!(status = response.status, %message, url = %request.url, "request failed");
        Err(ApiError::transport(message, response.status))
    }
}

/// Message for a failed response: the `error` field of a JSON body when
/// there is one, otherwise `HTTP <status>: <reason>`.
pub fn extract_error_message(response: &HttpResponse) -> String {
    let field = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("error").cloned());
    match field {
        Some(Value::String(message)) => message,
        Some(Value::Null) | None => status_line(response),
        Some(other) => other.to_string(),
    }
}

fn status_line(response: &HttpResponse) -> String {
    if response.reason.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {}: {}", response.status, response.reason)
    }
}

/// Resolve `scheme://host:port` from a configured host, falling back to
/// `http`, `localhost` and the daemon's default port.
fn resolve_base_uri(host: &str) -> String {
    let parsed = Url::parse(host).ok();
    let scheme = parsed.as_ref().map_or("http", |url| url.scheme());
    let hostname = parsed
        .as_ref()
        .and_then(|url| url.host_str())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    let port = parsed
        .as_ref()
        .and_then(|url| {
            url.port().or_else(|| {
                if authority_has_port(host) {
                    url.port_or_known_default()
                } else {
                    None
                }
            })
        })
        .unwrap_or(DEFAULT_PORT);
    format!("{scheme}://{hostname}:{port}")
}

// `Url` drops a port equal to the scheme default, so look at the raw text.
fn authority_has_port(host: &str) -> bool {
    let rest = host.split_once("://").map_or(host, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host_end = if authority.starts_with('[') {
        authority.find(']').map_or(authority.len(), |i| i + 1)
    } else {
        0
    };
    authority[host_end..].contains(':')
}
