use crate::{client::ClientImpl, endpoints::Endpoint, LibraryError, Transport};
use std::{
    marker::PhantomData,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc
    }
};

/// A reusable trigger for one mutation endpoint that tracks whether any of its
/// calls are still running, for views that disable a submit button.
pub struct MutationHandle<E: Endpoint, T: Transport> {
    client: Arc<ClientImpl<T>>,
    pending: Arc<AtomicUsize>,
    e: PhantomData<fn() -> E>
}

impl<E: Endpoint, T: Transport> MutationHandle<E, T> {
    pub(crate) fn new(client: Arc<ClientImpl<T>>) -> Self {
        MutationHandle {
            client,
            pending: Arc::new(AtomicUsize::new(0)),
            e: PhantomData
        }
    }

    pub async fn trigger(&self, args: E::Args) -> Result<E::Output, LibraryError> {
        let _pending = Pending::start(&self.pending);
        self.client.mutate::<E>(args).await
    }

    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}

impl<E: Endpoint, T: Transport> Clone for MutationHandle<E, T> {
    fn clone(&self) -> Self {
        MutationHandle {
            client: self.client.clone(),
            pending: self.pending.clone(),
            e: PhantomData
        }
    }
}

struct Pending(Arc<AtomicUsize>);

impl Pending {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Pending(counter.clone())
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
