use crate::{
    client::ClientImpl,
    config::{parse_base_url, Settings},
    transport::HttpTransport,
    CacheStore, Client, ConfigError, RequestPolicy, Transport, TransportError
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};

pub struct ClientBuilder<T: Transport = HttpTransport> {
    transport: T,
    request_policy: RequestPolicy
}

impl ClientBuilder<HttpTransport> {
    pub fn new<U: AsRef<str>>(url: U) -> Result<Self, ConfigError> {
        let url = parse_base_url(url.as_ref())?;
        Ok(ClientBuilder::with_transport(HttpTransport::new(url)))
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ClientBuilder::with_transport(HttpTransport::new(settings.api_url.clone()))
    }

    /// Applies a per-request timeout to the HTTP transport.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = self.transport.base_url().clone();
        Ok(ClientBuilder {
            transport: HttpTransport::with_timeout(base_url, timeout)?,
            request_policy: self.request_policy
        })
    }
}

impl<T: Transport> ClientBuilder<T> {
    /// Starts from any transport, such as an in-memory backend in tests.
    pub fn with_transport(transport: T) -> Self {
        ClientBuilder {
            transport,
            request_policy: RequestPolicy::CacheFirst
        }
    }

    pub fn with_request_policy(mut self, request_policy: RequestPolicy) -> Self {
        self.request_policy = request_policy;
        self
    }

    pub fn build(self) -> Client<T> {
        let client = ClientImpl {
            transport: self.transport,
            store: Arc::new(CacheStore::new()),
            request_policy: self.request_policy,
            active_subscriptions: Arc::new(Mutex::new(HashMap::new()))
        };

        Client(Arc::new(client))
    }
}
