use super::{Method, RawResponse, Request, Transport};
use crate::TransportError;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// The default transport, backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base_url
        }
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::network)?;
        Ok(HttpTransport { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &Request) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::network(format!("{} cannot be used as a base url", self.base_url))
            })?
            .pop_if_empty()
            .extend(request.segments());
        Ok(url)
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE
    }
}

/// Empty bodies become `null` and non-JSON bodies are kept as a string so
/// error payloads are never lost.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<RawResponse, TransportError> {
        let url = self.url_for(&request)?;
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(method(request.method), url)
            .header("Accept", "application/json");
        if !request.params.is_empty() {
            builder = builder.query(request.params.as_slice());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(TransportError::network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(TransportError::network)?;
        let body = decode_body(&bytes);

        if status.is_success() {
            Ok(RawResponse {
                status: status.as_u16(),
                body
            })
        } else {
            Err(TransportError::new(Some(status.as_u16()), body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base.parse().unwrap())
    }

    #[test]
    fn joins_segments_onto_base_path() {
        let request = Request::new(Method::Get, "books/42");
        let url = transport("http://localhost:5000/api").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/books/42");

        let url = transport("http://localhost:5000/api/").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/books/42");
    }

    #[test]
    fn encodes_ids_as_single_segments() {
        let request = Request::new(Method::Get, "books/a b?c");
        let url = transport("http://localhost/api").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/books/a%20b%3Fc");

        let request = Request::from_segments(Method::Get, vec!["books", "a/b%"]);
        let url = transport("http://localhost/api").url_for(&request).unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/books/a%2Fb%25");
    }

    #[test]
    fn decodes_bodies_leniently() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"ok":true}"#), json!({ "ok": true }));
        assert_eq!(decode_body(b"Bad Gateway"), json!("Bad Gateway"));
    }
}
