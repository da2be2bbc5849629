use super::{CacheKey, CachedValue};
use crate::{LibraryError, TransportError};
use futures::channel::oneshot::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

pub(crate) type FetchResult = Result<CachedValue, LibraryError>;

/// Tracks in-flight fetches so identical requests wait on the first one
/// instead of hitting the network again.
///
/// Flights are keyed by cache key *and* generation: once a key has been
/// invalidated, new callers start a fresh flight instead of joining one that
/// may return pre-invalidation data.
#[derive(Default)]
pub(crate) struct InFlight {
    flights: Mutex<HashMap<(CacheKey, u64), Vec<Sender<FetchResult>>>>
}

pub(crate) struct Joined {
    pub(crate) receiver: Receiver<FetchResult>,
    /// The first caller for a flight is responsible for starting it.
    pub(crate) is_leader: bool
}

impl InFlight {
    pub(crate) fn join(&self, key: &CacheKey, generation: u64) -> Joined {
        let (sender, receiver) = oneshot::channel();
        let mut flights = self.flights.lock();
        let flight_key = (key.clone(), generation);
        let is_leader = match flights.get_mut(&flight_key) {
            Some(listeners) => {
                debug!(%key, "joining in-flight request");
                listeners.push(sender);
                false
            }
            None => {
                flights.insert(flight_key, vec![sender]);
                true
            }
        };
        Joined { receiver, is_leader }
    }

    /// Hands the result to everyone waiting on the flight and closes it.
    pub(crate) fn finish(&self, key: &CacheKey, generation: u64, result: &FetchResult) {
        let listeners = self
            .flights
            .lock()
            .remove(&(key.clone(), generation))
            .unwrap_or_default();
        for sender in listeners {
            // a dropped receiver just means that caller went away
            let _ = sender.send(result.clone());
        }
    }

    pub(crate) fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.flights.lock().keys().any(|(k, _)| k == key)
    }
}

pub(crate) fn interrupted() -> LibraryError {
    TransportError::network("request was interrupted before it completed").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key() -> CacheKey {
        CacheKey::from_parts("getBook", "\"42\"")
    }

    #[tokio::test]
    async fn first_caller_leads_and_everyone_gets_the_result() {
        let in_flight = InFlight::default();
        let first = in_flight.join(&key(), 0);
        let second = in_flight.join(&key(), 0);
        assert!(first.is_leader);
        assert!(!second.is_leader);
        assert!(in_flight.is_in_flight(&key()));

        let value: CachedValue = Arc::new(7u32);
        in_flight.finish(&key(), 0, &Ok(value));
        assert!(!in_flight.is_in_flight(&key()));

        for joined in vec![first, second] {
            let value = joined.receiver.await.unwrap().unwrap();
            assert_eq!(value.downcast_ref::<u32>(), Some(&7));
        }
    }

    #[tokio::test]
    async fn newer_generation_starts_a_new_flight() {
        let in_flight = InFlight::default();
        let old = in_flight.join(&key(), 0);
        let new = in_flight.join(&key(), 1);
        assert!(old.is_leader);
        assert!(new.is_leader);

        in_flight.finish(&key(), 0, &Err(interrupted()));
        assert!(old.receiver.await.unwrap().is_err());
        assert!(in_flight.is_in_flight(&key()));
    }
}
