use crate::{
    client::ClientImpl, endpoints::Endpoint, store::CacheKey, LibraryError, QueryState, Transport
};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    future::{BoxFuture, FutureExt},
    Stream
};
use stable_vec::StableVec;
use std::{
    any::Any,
    marker::PhantomData,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll}
};

type AnyState = Arc<dyn Any + Send + Sync>;

pub(crate) struct Subscription {
    pub(crate) listeners: StableVec<UnboundedSender<AnyState>>,
    // Captures the endpoint and arguments without generics so subscriptions
    // for every endpoint fit in one map. `None` targets every listener.
    pub(crate) rerun: Arc<dyn Fn(Option<usize>) -> BoxFuture<'static, ()> + Send + Sync>
}

/// A live view of one query. Yields [`QueryState`]s and unsubscribes on drop.
pub struct QueryObservable<V, T: Transport> {
    inner: UnboundedReceiver<AnyState>,
    client: Arc<ClientImpl<T>>,
    key: CacheKey,
    index: usize,
    v: PhantomData<fn() -> V>
}

impl<V, T: Transport> QueryObservable<V, T> {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl<V, T: Transport> Stream for QueryObservable<V, T>
where
    V: Clone + 'static
{
    type Item = QueryState<V>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = &mut self.get_mut().inner;
        loop {
            match Pin::new(&mut *inner).poll_next(cx) {
                Poll::Ready(Some(boxed)) => {
                    if let Some(state) = boxed.downcast_ref::<QueryState<V>>() {
                        return Poll::Ready(Some(state.clone()));
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending
            }
        }
    }
}

impl<V, T: Transport> Drop for QueryObservable<V, T> {
    fn drop(&mut self) {
        self.client.clear_observable(&self.key, self.index)
    }
}

pub(crate) fn subscribe<E: Endpoint, T: Transport>(
    client: &Arc<ClientImpl<T>>,
    args: E::Args
) -> Result<QueryObservable<E::Output, T>, LibraryError> {
    let key = CacheKey::new(E::DESCRIPTOR.name, &args)?;
    let (sender, receiver) = mpsc::unbounded();

    let index = {
        let mut subscriptions = client.active_subscriptions.lock();
        if let Some(subscription) = subscriptions.get_mut(&key) {
            subscription.listeners.push(sender)
        } else {
            let mut listeners = StableVec::new();
            let index = listeners.push(sender);
            let subscription = Subscription {
                listeners,
                rerun: rerun_fn::<E, T>(client, key.clone(), args)
            };
            subscriptions.insert(key.clone(), subscription);
            index
        }
    };

    rerun_query(client, &key, Some(index));
    Ok(QueryObservable {
        inner: receiver,
        client: client.clone(),
        key,
        index,
        v: PhantomData
    })
}

fn rerun_fn<E: Endpoint, T: Transport>(
    client: &Arc<ClientImpl<T>>,
    key: CacheKey,
    args: E::Args
) -> Arc<dyn Fn(Option<usize>) -> BoxFuture<'static, ()> + Send + Sync> {
    let client = client.clone();
    Arc::new(move |target: Option<usize>| {
        let client = client.clone();
        let key = key.clone();
        let args = args.clone();

        async move {
            if !client.store.is_fresh(&key) {
                let previous = client.store.peek::<E::Output>(&key);
                broadcast(&client, &key, QueryState::loading(previous), target);
            }
            let result = client.query::<E>(args).await.map(|res| res.data);
            let previous = client.store.peek::<E::Output>(&key);
            broadcast(&client, &key, QueryState::settled(result, previous), target);
        }
        .boxed()
    })
}

fn broadcast<V, T>(
    client: &ClientImpl<T>,
    key: &CacheKey,
    state: QueryState<V>,
    target: Option<usize>
) where
    V: Send + Sync + 'static,
    T: Transport
{
    let state: AnyState = Arc::new(state);
    let subscriptions = client.active_subscriptions.lock();
    let listeners = match subscriptions.get(key) {
        Some(subscription) => &subscription.listeners,
        None => return
    };
    // a closed channel means the observable is being dropped
    match target {
        Some(index) => {
            if let Some(listener) = listeners.get(index) {
                let _ = listener.unbounded_send(state);
            }
        }
        None => {
            for listener in listeners.values() {
                let _ = listener.unbounded_send(state.clone());
            }
        }
    }
}

pub(crate) fn rerun_query<T: Transport>(
    client: &Arc<ClientImpl<T>>,
    key: &CacheKey,
    target: Option<usize>
) {
    let rerun = {
        let subscriptions = client.active_subscriptions.lock();
        subscriptions.get(key).map(|sub| sub.rerun.clone())
    };
    if let Some(rerun) = rerun {
        tokio::spawn(rerun(target));
    }
}
