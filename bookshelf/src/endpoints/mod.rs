//! Endpoint definitions.
//!
//! Each endpoint is a zero-sized marker type implementing [`Endpoint`]. The
//! request shape, path and cache tags live in a static [`EndpointDescriptor`];
//! the trait adds the typed arguments, the output and the normalizer. One
//! generic executor in the client runs all of them.

use crate::{
    transport::{Method, QueryParams, RawResponse, Request},
    LibraryError, OperationType, Tag, TransportError
};
use serde::Serialize;
use serde_json::Value;

mod books;
mod borrows;

pub use books::{
    CreateBook, DeleteBook, GetBook, GetBooks, GetBooksPaginated, UpdateBook, UpdateBookArgs
};
pub use borrows::{BorrowBook, GetBorrowSummary, GetBorrowsPaginated};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub kind: OperationType,
    pub method: Method,
    /// Relative to the API base, with `{param}` placeholders.
    pub path: &'static str,
    pub provides: &'static [Tag],
    pub invalidates: &'static [Tag]
}

impl EndpointDescriptor {
    /// Splits the path template into segments, replacing each `{name}`
    /// segment whole with its value. Values are never split further.
    pub fn render_segments(&self, params: &[(&str, &str)]) -> Vec<String> {
        self.path
            .split('/')
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .and_then(|name| params.iter().find(|(param, _)| *param == name))
                    .map_or_else(|| segment.to_string(), |(_, value)| value.to_string())
            })
            .collect()
    }

    pub fn is_query(&self) -> bool {
        self.kind == OperationType::Query
    }
}

pub const GET_BOOKS: EndpointDescriptor = EndpointDescriptor {
    name: "getBooks",
    kind: OperationType::Query,
    method: Method::Get,
    path: "books",
    provides: &[Tag::Book],
    invalidates: &[]
};

pub const GET_BOOKS_PAGINATED: EndpointDescriptor = EndpointDescriptor {
    name: "getBooksPaginated",
    kind: OperationType::Query,
    method: Method::Get,
    path: "books",
    provides: &[Tag::Book],
    invalidates: &[]
};

pub const GET_BOOK: EndpointDescriptor = EndpointDescriptor {
    name: "getBook",
    kind: OperationType::Query,
    method: Method::Get,
    path: "books/{id}",
    provides: &[Tag::Book],
    invalidates: &[]
};

pub const CREATE_BOOK: EndpointDescriptor = EndpointDescriptor {
    name: "createBook",
    kind: OperationType::Mutation,
    method: Method::Post,
    path: "books",
    provides: &[],
    invalidates: &[Tag::Book]
};

pub const UPDATE_BOOK: EndpointDescriptor = EndpointDescriptor {
    name: "updateBook",
    kind: OperationType::Mutation,
    method: Method::Put,
    path: "books/{id}",
    provides: &[],
    invalidates: &[Tag::Book]
};

pub const DELETE_BOOK: EndpointDescriptor = EndpointDescriptor {
    name: "deleteBook",
    kind: OperationType::Mutation,
    method: Method::Delete,
    path: "books/{id}",
    provides: &[],
    invalidates: &[Tag::Book]
};

pub const BORROW_BOOK: EndpointDescriptor = EndpointDescriptor {
    name: "borrowBook",
    kind: OperationType::Mutation,
    method: Method::Post,
    path: "borrows",
    provides: &[],
    invalidates: &[Tag::Book, Tag::Borrow]
};

pub const GET_BORROWS_PAGINATED: EndpointDescriptor = EndpointDescriptor {
    name: "getBorrowsPaginated",
    kind: OperationType::Query,
    method: Method::Get,
    path: "borrows",
    provides: &[Tag::Borrow],
    invalidates: &[]
};

pub const GET_BORROW_SUMMARY: EndpointDescriptor = EndpointDescriptor {
    name: "getBorrowSummary",
    kind: OperationType::Query,
    method: Method::Get,
    path: "borrows/summary",
    provides: &[Tag::Borrow],
    invalidates: &[]
};

/// Every endpoint the client knows about.
pub const ENDPOINTS: &[EndpointDescriptor] = &[
    GET_BOOKS,
    GET_BOOKS_PAGINATED,
    GET_BOOK,
    CREATE_BOOK,
    UPDATE_BOOK,
    DELETE_BOOK,
    BORROW_BOOK,
    GET_BORROWS_PAGINATED,
    GET_BORROW_SUMMARY
];

pub fn descriptor(name: &str) -> Option<&'static EndpointDescriptor> {
    ENDPOINTS.iter().find(|endpoint| endpoint.name == name)
}

/// A typed endpoint. Implemented on zero-sized marker structs such as [`GetBook`].
pub trait Endpoint: Send + Sync + 'static {
    /// Serialized into the cache key, so equal arguments must serialize equally.
    type Args: Serialize + Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    const DESCRIPTOR: EndpointDescriptor;

    fn path_params(_args: &Self::Args) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn params(_args: &Self::Args) -> QueryParams {
        QueryParams::default()
    }

    fn body(_args: &Self::Args) -> Result<Option<Value>, LibraryError> {
        Ok(None)
    }

    fn normalize(response: RawResponse, args: &Self::Args) -> Result<Self::Output, LibraryError>;

    fn map_error(error: TransportError, _args: &Self::Args) -> LibraryError {
        error.into()
    }

    fn request(args: &Self::Args) -> Result<Request, LibraryError> {
        let path_params = Self::path_params(args);
        let borrowed: Vec<(&str, &str)> = path_params
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        let request = Request::from_segments(
            Self::DESCRIPTOR.method,
            Self::DESCRIPTOR.render_segments(&borrowed)
        );
        Ok(request.with_params(Self::params(args)).with_body(Self::body(args)?))
    }
}

pub(crate) fn json_body<T: Serialize>(
    endpoint: &'static str,
    value: &T
) -> Result<Option<Value>, LibraryError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| LibraryError::decode(endpoint, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn endpoint_names_are_unique() {
        let names: HashSet<_> = ENDPOINTS.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), ENDPOINTS.len());
        assert_eq!(descriptor("getBook"), Some(&GET_BOOK));
        assert_eq!(descriptor("nope"), None);
    }

    #[test]
    fn queries_provide_and_mutations_invalidate() {
        for endpoint in ENDPOINTS {
            if endpoint.is_query() {
                assert!(!endpoint.provides.is_empty(), "{} provides nothing", endpoint.name);
                assert!(endpoint.invalidates.is_empty());
                assert_eq!(endpoint.method, Method::Get);
            } else {
                assert!(endpoint.provides.is_empty());
                assert!(!endpoint.invalidates.is_empty(), "{} invalidates nothing", endpoint.name);
            }
        }
        assert_eq!(BORROW_BOOK.invalidates, &[Tag::Book, Tag::Borrow]);
    }

    #[test]
    fn renders_path_placeholders() {
        assert_eq!(GET_BOOK.render_segments(&[("id", "42")]), vec!["books", "42"]);
        assert_eq!(GET_BOOKS.render_segments(&[("id", "42")]), vec!["books"]);
    }

    #[test]
    fn ids_stay_a_single_segment() {
        let request = GetBook::request(&"a/b".to_string()).unwrap();
        assert_eq!(request.segments().collect::<Vec<_>>(), vec!["books", "a/b"]);

        let args = UpdateBookArgs {
            id: "../borrows".to_string(),
            updates: Default::default()
        };
        let request = UpdateBook::request(&args).unwrap();
        assert_eq!(request.segments().collect::<Vec<_>>(), vec!["books", "../borrows"]);
    }
}
