//! HTTP exchange types and the transport seam.
//!
//! # Design
//! `BarkService` describes each push as a plain `HttpRequest` and reads the
//! relay's answer as a plain `HttpResponse`. Executing the round-trip is the
//! job of a `Transport`, so the request building and status handling stay
//! deterministic and can be tested without a network. `ReqwestTransport` is
//! the transport used in production.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BarkError, TransportErrorKind};

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data. `body` always holds the full
/// response text, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes one HTTP round-trip.
///
/// Implementations return every status as data. Only failures below HTTP
/// (resolution, connect, timeout, reading the body) are errors, and those
/// are reported as `BarkError::Transport` with the cause kept as `source`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BarkError>;
}

/// `Transport` backed by a pooled `reqwest::Client` with a fixed timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// A zero `timeout` is rejected: it would fail every request at once.
    pub fn new(timeout: Duration) -> Result<Self, BarkError> {
        if timeout.is_zero() {
            return Err(BarkError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BarkError::Configuration(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BarkError> {
        let method = match request.method {
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error("send request", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("read response", e))?;

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(stage: &'static str, e: reqwest::Error) -> BarkError {
    let kind = if e.is_timeout() {
        TransportErrorKind::Timeout
    } else if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_body() || e.is_decode() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Request
    };
    BarkError::transport(stage, kind, e)
}
