//! The network edge. Everything above this module talks to a [`Transport`],
//! which makes it easy to swap the HTTP client for an in-memory backend.

use crate::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt, sync::Arc};

mod http;

pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE"
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` unless the value is absent or renders to an empty string.
    pub fn push<V: ToString>(&mut self, key: &'static str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.is_empty() {
                self.0.push((key, value));
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn as_slice(&self) -> &[(&'static str, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A request relative to the API base URL, e.g. `GET books/42`.
///
/// The path is kept as separate segments so an id containing `/` stays one
/// segment. `path` is the joined form, for logging and matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    segments: Vec<String>,
    pub params: QueryParams,
    pub body: Option<Value>
}

impl Request {
    /// Splits `path` on `/`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let segments = path.split('/').map(String::from);
        Request::from_segments(method, segments)
    }

    /// Takes each segment verbatim. Empty segments are dropped.
    pub fn from_segments<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|segment| !segment.is_empty())
            .collect();
        Request {
            method,
            path: segments.join("/"),
            segments,
            params: QueryParams::default(),
            body: None
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

/// A successful (2xx) response. Empty bodies are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value
}

impl RawResponse {
    pub fn ok(body: Value) -> Self {
        RawResponse { status: 200, body }
    }
}

/// Executes requests against the API.
///
/// Non-2xx statuses and network failures come back as `Err(TransportError)`;
/// implementations must not panic on them.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: Request) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> Result<RawResponse, TransportError> {
        (**self).execute(request).await
    }
}
