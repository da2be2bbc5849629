//! The cache & tag store.
//!
//! Results are cached per [`CacheKey`] (endpoint name plus serialized
//! arguments) together with the tags their endpoint provides. Invalidating a
//! tag marks every entry carrying it stale; stale entries are refetched the
//! next time they are asked for, or dropped with [`CacheStore::evict`] when
//! nobody is watching them. Concurrent requests for the same key share one
//! fetch.

use crate::{
    DebugInfo, LibraryError, OperationResult, QueryStatus, RequestPolicy, ResultSource, Tag
};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    any::Any,
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc
    }
};
use tracing::{debug, warn};

mod dedup;

use dedup::{interrupted, InFlight};

pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub endpoint: &'static str,
    pub args: String
}

impl CacheKey {
    pub fn new<A: Serialize>(endpoint: &'static str, args: &A) -> Result<Self, LibraryError> {
        let args = serde_json::to_string(args).map_err(|e| LibraryError::decode(endpoint, e))?;
        Ok(CacheKey { endpoint, args })
    }

    pub fn from_parts(endpoint: &'static str, args: impl Into<String>) -> Self {
        CacheKey {
            endpoint,
            args: args.into()
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

struct CacheEntry {
    status: QueryStatus,
    value: Option<CachedValue>,
    error: Option<LibraryError>,
    stale: bool,
    /// Replaced on every invalidation. Results of fetches started under an
    /// older generation are not written back.
    generation: u64,
    provided_tags: HashSet<Tag>
}

impl CacheEntry {
    fn new(generation: u64) -> Self {
        CacheEntry {
            status: QueryStatus::Loading,
            value: None,
            error: None,
            stale: false,
            generation,
            provided_tags: HashSet::new()
        }
    }

    fn fresh_value(&self) -> Option<&CachedValue> {
        match self.status {
            QueryStatus::Success if !self.stale => self.value.as_ref(),
            _ => None
        }
    }
}

type ResultCache = Mutex<HashMap<CacheKey, CacheEntry>>;
type TagIndex = Mutex<HashMap<Tag, BTreeSet<CacheKey>>>;

/// Process-scoped query cache. Create one per client session and share it
/// through an `Arc`; nothing else writes to it.
#[derive(Default)]
pub struct CacheStore {
    entries: ResultCache,
    tags: TagIndex,
    in_flight: InFlight,
    /// Source of entry generations. Never reused, so an evicted and
    /// recreated entry cannot match a flight started before the eviction.
    generations: AtomicU64
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `key` from the cache or by running `fetcher`.
    ///
    /// The leading fetch for a key runs on its own task, so dropping the
    /// returned future never aborts a request other callers are waiting on.
    /// Must be called from within a tokio runtime.
    ///
    /// Requests share a fetch only within one generation of the entry. A
    /// request made after `key` was invalidated starts its own fetch even if
    /// one from before the invalidation is still running, so for a short
    /// time two requests for the same key can be on the network.
    pub async fn fetch<V, F, Fut>(
        self: &Arc<Self>,
        key: &CacheKey,
        provides: &'static [Tag],
        policy: RequestPolicy,
        fetcher: F
    ) -> Result<OperationResult<V>, LibraryError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, LibraryError>> + Send + 'static
    {
        if policy == RequestPolicy::CacheFirst {
            if let Some(data) = self.peek_fresh::<V>(key) {
                debug!(%key, "cache hit");
                return Ok(OperationResult {
                    data,
                    debug_info: DebugInfo {
                        source: ResultSource::Cache,
                        did_dedup: false
                    }
                });
            }
        }

        let generation = self.register(key, provides);
        let joined = self.in_flight.join(key, generation);
        if joined.is_leader {
            debug!(%key, generation, "cache miss, fetching");
            self.mark_loading(key, generation);
            let store = self.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let result = fetcher()
                    .await
                    .map(|value| Arc::new(value) as CachedValue);
                store.complete(&key, generation, &result);
                store.in_flight.finish(&key, generation, &result);
            });
        }

        let value = joined.receiver.await.unwrap_or_else(|_| Err(interrupted()))?;
        let data = value.downcast_ref::<V>().cloned().ok_or_else(|| {
            LibraryError::decode(key.endpoint, "cached value has an unexpected type")
        })?;
        Ok(OperationResult {
            data,
            debug_info: DebugInfo {
                source: ResultSource::Network,
                did_dedup: !joined.is_leader
            }
        })
    }

    /// Marks every entry providing any of `tags` stale and returns their keys.
    pub fn invalidate(&self, tags: &[Tag]) -> Vec<CacheKey> {
        let keys: BTreeSet<CacheKey> = {
            let index = self.tags.lock();
            tags.iter()
                .filter_map(|tag| index.get(tag))
                .flat_map(|keys| keys.iter().cloned())
                .collect()
        };

        let mut entries = self.entries.lock();
        for key in &keys {
            if let Some(entry) = entries.get_mut(key) {
                entry.stale = true;
                entry.generation = self.next_generation();
            }
        }
        debug!(?tags, count = keys.len(), "invalidated cache entries");
        keys.into_iter().collect()
    }

    /// Drops the stale entries among `keys` that have no fetch running and
    /// removes them from the tag index. Returns how many were dropped.
    pub fn evict(&self, keys: &[CacheKey]) -> usize {
        let mut evicted: Vec<(CacheKey, HashSet<Tag>)> = Vec::new();
        {
            let mut entries = self.entries.lock();
            for key in keys {
                let stale = entries.get(key).map_or(false, |entry| entry.stale);
                if !stale || self.in_flight.is_in_flight(key) {
                    continue;
                }
                if let Some(entry) = entries.remove(key) {
                    evicted.push((key.clone(), entry.provided_tags));
                }
            }
        }

        let mut index = self.tags.lock();
        for (key, provided_tags) in &evicted {
            for tag in provided_tags {
                if let Some(keys) = index.get_mut(tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        index.remove(tag);
                    }
                }
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted unwatched cache entries");
        }
        evicted.len()
    }

    pub fn status(&self, key: &CacheKey) -> Option<QueryStatus> {
        self.entries.lock().get(key).map(|entry| entry.status)
    }

    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.entries.lock().get(key).map_or(false, |entry| entry.stale)
    }

    /// Whether `key` would be served from cache under `CacheFirst`.
    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .get(key)
            .map_or(false, |entry| entry.fresh_value().is_some())
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.is_in_flight(key)
    }

    /// The last error recorded for `key`, if its latest fetch failed.
    pub fn error(&self, key: &CacheKey) -> Option<LibraryError> {
        self.entries.lock().get(key).and_then(|entry| entry.error.clone())
    }

    /// The last successful value for `key`, stale or not.
    pub fn peek<V: Clone + 'static>(&self, key: &CacheKey) -> Option<V> {
        let entries = self.entries.lock();
        let value = entries.get(key)?.value.as_ref()?;
        value.downcast_ref::<V>().cloned()
    }

    pub fn keys_for(&self, tag: Tag) -> Vec<CacheKey> {
        self.tags
            .lock()
            .get(&tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn peek_fresh<V: Clone + 'static>(&self, key: &CacheKey) -> Option<V> {
        let entries = self.entries.lock();
        let value = entries.get(key)?.fresh_value()?;
        let data = value.downcast_ref::<V>().cloned();
        if data.is_none() {
            warn!(%key, "cached value has an unexpected type, refetching");
        }
        data
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Ensures an entry exists and is indexed under its tags. Returns the
    /// entry's current generation.
    fn register(&self, key: &CacheKey, provides: &[Tag]) -> u64 {
        let generation = {
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(self.next_generation()));
            entry.provided_tags.extend(provides.iter().copied());
            entry.generation
        };

        let mut index = self.tags.lock();
        for tag in provides {
            index.entry(*tag).or_default().insert(key.clone());
        }
        generation
    }

    fn mark_loading(&self, key: &CacheKey, generation: u64) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            if entry.generation == generation {
                entry.status = QueryStatus::Loading;
            }
        }
    }

    fn complete(
        &self,
        key: &CacheKey,
        generation: u64,
        result: &Result<CachedValue, LibraryError>
    ) {
        let mut entries = self.entries.lock();
        let entry = match entries.get_mut(key) {
            Some(entry) => entry,
            None => {
                debug!(%key, "entry was evicted, discarding result");
                return;
            }
        };
        if entry.generation != generation {
            warn!(
                %key,
                generation,
                current = entry.generation,
                "discarding result superseded by an invalidation"
            );
            return;
        }

        match result {
            Ok(value) => {
                entry.status = QueryStatus::Success;
                entry.value = Some(value.clone());
                entry.error = None;
                entry.stale = false;
            }
            Err(error) => {
                debug!(%key, %error, "fetch failed");
                entry.status = QueryStatus::Error;
                entry.error = Some(error.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration
    };
    use tokio::time::sleep;

    fn key(args: &str) -> CacheKey {
        CacheKey::from_parts("getBooks", args)
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<u32, LibraryError>> {
        let calls = calls.clone();
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                Ok(value)
            })
        }
    }

    #[test]
    fn cache_key_serializes_arguments() {
        let key = CacheKey::new("getBook", &"42").unwrap();
        assert_eq!(key.args, "\"42\"");
        assert_eq!(key.to_string(), "getBook(\"42\")");
        assert_eq!(CacheKey::new("getBorrowSummary", &()).unwrap().args, "null");
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = store
            .fetch(&key("{}"), &[Tag::Book], RequestPolicy::CacheFirst, counting_fetch(&calls, 1))
            .await
            .unwrap();
        let second = store
            .fetch(&key("{}"), &[Tag::Book], RequestPolicy::CacheFirst, counting_fetch(&calls, 2))
            .await
            .unwrap();

        assert_eq!(first.debug_info.source, ResultSource::Network);
        assert_eq!(second.debug_info.source, ResultSource::Cache);
        assert_eq!(second.data, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.status(&key("{}")), Some(QueryStatus::Success));
    }

    #[tokio::test]
    async fn concurrent_fetches_are_coalesced() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let k = key("{}");
        let policy = RequestPolicy::NetworkOnly;
        let (a, b) = tokio::join!(
            store.fetch(&k, &[Tag::Book], policy, counting_fetch(&calls, 5)),
            store.fetch(&k, &[Tag::Book], policy, counting_fetch(&calls, 6))
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!((a.data, b.data), (5, 5));
        assert!(a.debug_info.did_dedup ^ b.debug_info.did_dedup);
    }

    #[tokio::test]
    async fn different_arguments_fetch_independently() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, second) = (key("{\"page\":1}"), key("{\"page\":2}"));
        let policy = RequestPolicy::CacheFirst;
        let (a, b) = tokio::join!(
            store.fetch(&first, &[Tag::Book], policy, counting_fetch(&calls, 1)),
            store.fetch(&second, &[Tag::Book], policy, counting_fetch(&calls, 2))
        );
        assert_eq!((a.unwrap().data, b.unwrap().data), (1, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.keys_for(Tag::Book).len(), 2);
    }

    #[tokio::test]
    async fn invalidation_marks_only_matching_tags_stale() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let books = key("books");
        let borrows = CacheKey::from_parts("getBorrowsPaginated", "{}");

        store
            .fetch(&books, &[Tag::Book], RequestPolicy::CacheFirst, counting_fetch(&calls, 1))
            .await
            .unwrap();
        store
            .fetch(&borrows, &[Tag::Borrow], RequestPolicy::CacheFirst, counting_fetch(&calls, 1))
            .await
            .unwrap();

        assert_eq!(store.invalidate(&[Tag::Book]), vec![books.clone()]);
        assert!(store.is_stale(&books));
        assert!(!store.is_stale(&borrows));
        // stale entries keep their last value until refetched
        assert_eq!(store.peek::<u32>(&books), Some(1));

        let refetched = store
            .fetch(&books, &[Tag::Book], RequestPolicy::CacheFirst, counting_fetch(&calls, 9))
            .await
            .unwrap();
        assert_eq!(refetched.data, 9);
        assert_eq!(refetched.debug_info.source, ResultSource::Network);
        assert!(!store.is_stale(&books));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn evict_drops_only_stale_idle_entries() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let searched = key("{\"search\":\"dune\"}");
        let borrows = CacheKey::from_parts("getBorrowSummary", "null");
        let policy = RequestPolicy::CacheFirst;

        store
            .fetch(&searched, &[Tag::Book], policy, counting_fetch(&calls, 1))
            .await
            .unwrap();
        store
            .fetch(&borrows, &[Tag::Borrow], policy, counting_fetch(&calls, 2))
            .await
            .unwrap();

        let invalidated = store.invalidate(&[Tag::Book]);
        assert_eq!(store.evict(&[searched.clone(), borrows.clone()]), 1);
        assert_eq!(invalidated, vec![searched.clone()]);
        assert_eq!(store.status(&searched), None);
        assert!(store.keys_for(Tag::Book).is_empty());
        assert_eq!(store.status(&borrows), Some(QueryStatus::Success));
        assert_eq!(store.len(), 1);

        let refetched = store
            .fetch(&searched, &[Tag::Book], policy, counting_fetch(&calls, 3))
            .await
            .unwrap();
        assert_eq!(refetched.data, 3);
        assert_eq!(store.keys_for(Tag::Book), vec![searched]);
    }

    #[tokio::test]
    async fn evict_keeps_entries_with_a_fetch_running() {
        let store = Arc::new(CacheStore::new());
        let k = key("slow");

        let slow = {
            let store = store.clone();
            let k = k.clone();
            tokio::spawn(async move {
                store
                    .fetch(&k, &[Tag::Book], RequestPolicy::CacheFirst, || async {
                        sleep(Duration::from_millis(30)).await;
                        Ok(1u32)
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(5)).await;
        store.invalidate(&[Tag::Book]);

        assert_eq!(store.evict(&[k.clone()]), 0);
        assert_eq!(slow.await.unwrap().unwrap().data, 1);
        assert_eq!(store.peek::<u32>(&k), None);
        assert_eq!(store.evict(&[k.clone()]), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failures_are_recorded_and_not_cached() {
        let store = Arc::new(CacheStore::new());
        let k = key("broken");

        let err = store
            .fetch(&k, &[Tag::Book], RequestPolicy::CacheFirst, || async {
                Err::<u32, _>(LibraryError::not_found("book", "1"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { .. }));
        assert_eq!(store.status(&k), Some(QueryStatus::Error));
        assert!(store.error(&k).is_some());

        let ok = store
            .fetch(&k, &[Tag::Book], RequestPolicy::CacheFirst, || async { Ok(3u32) })
            .await
            .unwrap();
        assert_eq!(ok.data, 3);
        assert!(store.error(&k).is_none());
    }

    #[tokio::test]
    async fn results_started_before_an_invalidation_are_not_stored() {
        let store = Arc::new(CacheStore::new());
        let k = key("race");

        let slow = {
            let store = store.clone();
            let k = k.clone();
            tokio::spawn(async move {
                store
                    .fetch(&k, &[Tag::Book], RequestPolicy::CacheFirst, || async {
                        sleep(Duration::from_millis(30)).await;
                        Ok(1u32)
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(5)).await;
        assert!(store.is_in_flight(&k));
        store.invalidate(&[Tag::Book]);

        // the caller still gets its answer, but the cache does not keep it
        assert_eq!(slow.await.unwrap().unwrap().data, 1);
        assert_eq!(store.peek::<u32>(&k), None);

        let fresh = store
            .fetch(&k, &[Tag::Book], RequestPolicy::CacheFirst, || async { Ok(2u32) })
            .await
            .unwrap();
        assert_eq!(fresh.data, 2);
        assert_eq!(store.peek::<u32>(&k), Some(2));
    }
}
