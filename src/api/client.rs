//! PostgREST HTTP transport with connection pooling.

use std::collections::HashMap;
use std::future::Future;

use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};

/// Body marker PostgREST uses when a relation is missing from its schema cache.
const NOT_FOUND_MARKER: &str = "Could not find";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A fully assembled request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// A response with the given status and body bytes.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests to the remote service.
///
/// Implementations return `Ok` for every response that arrived, including
/// error statuses; only failures to get a response at all are `Err`.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// How a response is interpreted by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(Vec<u8>),
    NotFound(String),
    Failure { status: u16, body: String },
}

impl Outcome {
    /// Classify a raw response.
    ///
    /// PostgREST has no structured "relation missing" signal, so absence is
    /// recognized by a 404 status or the `Could not find` message text. This
    /// is the only place that check lives.
    pub fn classify(response: RawResponse) -> Self {
        if (200..300).contains(&response.status) {
            return Outcome::Found(response.body);
        }

        let body = String::from_utf8_lossy(&response.body).into_owned();
        if response.status == 404 || body.contains(NOT_FOUND_MARKER) {
            Outcome::NotFound(body)
        } else {
            Outcome::Failure {
                status: response.status,
                body,
            }
        }
    }

    /// Turn the outcome into the body of a successful response, or the
    /// matching typed error for `url`.
    pub fn into_result(self, url: &str) -> Result<Vec<u8>> {
        match self {
            Outcome::Found(body) => Ok(body),
            Outcome::NotFound(detail) => Err(Error::NotFound {
                url: url.to_string(),
                detail,
            }),
            Outcome::Failure { status, body } => Err(Error::Transport {
                url: url.to_string(),
                status,
                body,
            }),
        }
    }
}

/// reqwest-backed transport with a persistent connection pool.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the pooled client. No request timeout is set.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<RawResponse> {
        let Request {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::debug!(?method, %url, "sending request");

        let mut builder = match method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|source| Error::Request {
            url: url.clone(),
            source,
        })?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| Error::Request { url: url.clone(), source })?;

        tracing::debug!(status, %url, len = bytes.len(), "received response");

        Ok(RawResponse::new(status, bytes.to_vec()))
    }
}
