use crate::LibraryError;
use serde::Serialize;
use std::fmt;

/// Logical resource label grouping cache entries for bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tag {
    Book,
    Borrow
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Book => f.write_str("Book"),
            Tag::Borrow => f.write_str("Borrow")
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum OperationType {
    Query,
    Mutation
}

/// How a query treats existing cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPolicy {
    /// Serve a fresh cached entry if there is one, fetch otherwise.
    CacheFirst,
    /// Always go to the network. Concurrent identical requests are still coalesced.
    NetworkOnly
}

impl Default for RequestPolicy {
    fn default() -> Self {
        RequestPolicy::CacheFirst
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Success,
    Error
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultSource {
    Cache,
    Network
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugInfo {
    pub source: ResultSource,
    /// Whether this caller joined a request another caller had already started.
    pub did_dedup: bool
}

#[derive(Clone, Debug)]
pub struct OperationResult<T> {
    pub data: T,
    pub debug_info: DebugInfo
}

/// What a view sees of a query: the data (possibly from a previous fetch),
/// whether a fetch is running, and the last error.
#[derive(Clone, Debug)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<LibraryError>
}

impl<T> QueryState<T> {
    pub fn loading(previous: Option<T>) -> Self {
        QueryState {
            data: previous,
            is_loading: true,
            error: None
        }
    }

    pub fn settled(result: Result<T, LibraryError>, previous: Option<T>) -> Self {
        match result {
            Ok(data) => QueryState {
                data: Some(data),
                is_loading: false,
                error: None
            },
            Err(error) => QueryState {
                data: previous,
                is_loading: false,
                error: Some(error)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.data.is_some()
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState {
            data: None,
            is_loading: false,
            error: None
        }
    }
}
