//! A caching client for a library-management REST API: a book catalog and a
//! ledger of borrows.
//!
//! # Getting Started
//!
//! Point a client at the API (or let [`Settings::load`] read
//! `BOOKSHELF_API_URL`) and call the typed methods:
//!
//! ```no_run
//! # tokio_test::block_on(async {
//! use bookshelf::{model::BookFilter, Client};
//!
//! let client = Client::builder("http://localhost:5000/api").unwrap().build();
//! let page = client.get_books_paginated(BookFilter::page(1, 10)).await.unwrap();
//! println!("{} books", page.total);
//! # });
//! ```
//!
//! Any [`Transport`] can stand in for HTTP, which is how the tests run
//! against an in-memory library:
//!
//! ```
//! # tokio_test::block_on(async {
//! use bookshelf::{endpoints::GetBooks, model::BookFilter, ClientBuilder, ResultSource};
//! use bookshelf_test::MemoryBackend;
//!
//! let client = ClientBuilder::with_transport(MemoryBackend::seeded()).build();
//!
//! let first = client.query::<GetBooks>(BookFilter::default()).await.unwrap();
//! let second = client.query::<GetBooks>(BookFilter::default()).await.unwrap();
//! assert_eq!(first.debug_info.source, ResultSource::Network);
//! assert_eq!(second.debug_info.source, ResultSource::Cache);
//! # });
//! ```
//!
//! # Caching
//!
//! Every query result is cached under its endpoint name and serialized
//! arguments, and is labelled with the tags its endpoint provides (`Book` or
//! `Borrow`). A successful mutation invalidates the tags it names: the matching
//! entries become stale and are refetched the next time they are read, or
//! straight away if a [`QueryObservable`] is watching them. A failed mutation
//! invalidates nothing.
//!
//! Identical queries issued while one is already in flight wait for that
//! request instead of sending their own.
//!
//! # Responses
//!
//! The server is inconsistent about envelopes. Lists and entities may arrive
//! bare, as `{ data: ... }` or as `{ data: { data: ... } }`; the [`normalize`]
//! module accepts all three and fills in missing pagination fields.

pub mod client;
pub mod config;
pub mod endpoints;
mod error;
pub mod forms;
pub mod model;
pub mod normalize;
pub mod pagination;
pub mod store;
pub mod transport;
mod types;

pub use client::{Client, ClientBuilder, ClientImpl, MutationHandle, QueryObservable};
pub use config::{ConfigError, Settings};
pub use error::*;
pub use store::{CacheKey, CacheStore};
pub use transport::{HttpTransport, Transport};
pub use types::*;
