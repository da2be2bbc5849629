use crate::{
    endpoints::Endpoint, transport::HttpTransport, CacheStore, ConfigError, LibraryError,
    OperationResult, RequestPolicy, Tag, Transport
};
use std::sync::Arc;

mod api;
mod builder;
mod r#impl;
mod mutation;
mod observable;

pub use builder::ClientBuilder;
pub use mutation::MutationHandle;
pub use observable::QueryObservable;
pub use r#impl::ClientImpl;

/// The library API client. Cheap to clone; clones share one cache.
#[repr(transparent)]
pub struct Client<T: Transport = HttpTransport>(pub Arc<ClientImpl<T>>);

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Client(self.0.clone())
    }
}

impl Client {
    pub fn builder<U: AsRef<str>>(url: U) -> Result<ClientBuilder, ConfigError> {
        ClientBuilder::new(url)
    }
}

impl<T: Transport> Client<T> {
    /// Runs a query with the client's default request policy.
    pub async fn query<E: Endpoint>(
        &self,
        args: E::Args
    ) -> Result<OperationResult<E::Output>, LibraryError> {
        self.0.query::<E>(args).await
    }

    pub async fn query_with_policy<E: Endpoint>(
        &self,
        args: E::Args,
        request_policy: RequestPolicy
    ) -> Result<OperationResult<E::Output>, LibraryError> {
        self.0.query_with_policy::<E>(args, request_policy).await
    }

    /// Watches a query. The stream yields a loading state, then the result,
    /// and again every time the query is invalidated.
    pub fn subscribe<E: Endpoint>(
        &self,
        args: E::Args
    ) -> Result<QueryObservable<E::Output, T>, LibraryError> {
        self.0.subscribe::<E>(args)
    }

    /// Runs a mutation. Its tags are invalidated only if it succeeds.
    pub async fn mutate<E: Endpoint>(&self, args: E::Args) -> Result<E::Output, LibraryError> {
        self.0.mutate::<E>(args).await
    }

    pub fn mutation<E: Endpoint>(&self) -> MutationHandle<E, T> {
        MutationHandle::new(self.0.clone())
    }

    pub fn invalidate(&self, tags: &[Tag]) {
        self.0.invalidate(tags)
    }

    pub fn store(&self) -> &CacheStore {
        &self.0.store
    }
}
