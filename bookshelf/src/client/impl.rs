use crate::{
    client::observable::{QueryObservable, Subscription},
    endpoints::Endpoint,
    store::{CacheKey, CacheStore},
    transport::RawResponse,
    LibraryError, OperationResult, RequestPolicy, Tag, Transport, TransportError
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

pub struct ClientImpl<T: Transport> {
    pub(crate) transport: T,
    pub(crate) store: Arc<CacheStore>,
    pub(crate) request_policy: RequestPolicy,
    pub(crate) active_subscriptions: Arc<Mutex<HashMap<CacheKey, Subscription>>>
}

impl<T: Transport> ClientImpl<T> {
    pub(crate) fn clear_observable(&self, key: &CacheKey, index: usize) {
        let mut subscriptions = self.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get_mut(key) {
            subscription.listeners.remove(index);
            if subscription.listeners.is_empty() {
                debug!(%key, "last subscriber left");
                subscriptions.remove(key);
            }
        }
    }

    /// Sends one request for `E`. No caching.
    async fn execute<E: Endpoint>(&self, args: &E::Args) -> Result<RawResponse, LibraryError> {
        let request = E::request(args)?;
        debug!(
            endpoint = E::DESCRIPTOR.name,
            method = %request.method,
            path = %request.path,
            "dispatching"
        );
        self.transport
            .execute(request)
            .await
            .map_err(|e| E::map_error(e, args))
    }

    pub(crate) async fn dispatch<E: Endpoint>(
        &self,
        args: &E::Args
    ) -> Result<E::Output, LibraryError> {
        let response = self.execute::<E>(args).await?;
        E::normalize(response, args)
    }

    pub async fn query<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<OperationResult<E::Output>, LibraryError> {
        self.query_with_policy::<E>(args, self.request_policy).await
    }

    pub async fn query_with_policy<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args,
        request_policy: RequestPolicy
    ) -> Result<OperationResult<E::Output>, LibraryError> {
        debug_assert!(E::DESCRIPTOR.is_query(), "{} is not a query", E::DESCRIPTOR.name);
        let key = CacheKey::new(E::DESCRIPTOR.name, &args)?;
        let client = self.clone();
        self.store
            .fetch(&key, E::DESCRIPTOR.provides, request_policy, move || async move {
                client.dispatch::<E>(&args).await
            })
            .await
    }

    /// The mutation runs on its own task so that invalidation still happens
    /// if the caller stops waiting for it. Any 2xx response invalidates, even
    /// one whose body cannot be decoded, since the server has applied the write.
    pub async fn mutate<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<E::Output, LibraryError> {
        debug_assert!(!E::DESCRIPTOR.is_query(), "{} is not a mutation", E::DESCRIPTOR.name);
        let client = self.clone();
        let task = tokio::spawn(async move {
            let response = match client.execute::<E>(&args).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(
                        endpoint = E::DESCRIPTOR.name,
                        %error,
                        "mutation failed, cache left untouched"
                    );
                    return Err(error);
                }
            };
            client.invalidate(E::DESCRIPTOR.invalidates);
            E::normalize(response, &args).map_err(|error| {
                warn!(
                    endpoint = E::DESCRIPTOR.name,
                    %error,
                    "mutation applied but its response could not be read"
                );
                error
            })
        });
        task.await
            .unwrap_or_else(|e| Err(TransportError::network(e).into()))
    }

    /// Marks every cached query carrying one of `tags` stale and refetches the
    /// ones somebody is subscribed to. The rest are evicted and fetched again
    /// on next use.
    pub fn invalidate(self: &Arc<Self>, tags: &[Tag]) {
        let keys = self.store.invalidate(tags);
        let (watched, unwatched): (Vec<CacheKey>, Vec<CacheKey>) = {
            let subscriptions = self.active_subscriptions.lock();
            keys.into_iter()
                .partition(|key| subscriptions.contains_key(key))
        };
        self.store.evict(&unwatched);
        for key in watched {
            self.rerun_query(&key);
        }
    }

    pub fn rerun_query(self: &Arc<Self>, key: &CacheKey) {
        super::observable::rerun_query(self, key, None);
    }

    pub fn subscribe<E: Endpoint>(
        self: &Arc<Self>,
        args: E::Args
    ) -> Result<QueryObservable<E::Output, T>, LibraryError> {
        super::observable::subscribe::<E, T>(self, args)
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }
}
