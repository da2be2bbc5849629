//! Wire types for the library API.
//!
//! Field names follow the server's camelCase JSON. Identities are serialized
//! as `_id`; a plain `id` is accepted when decoding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog entry. `id` is assigned by the server and absent before creation.
///
/// `available` is stored as given and is not kept consistent with `copies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub copies: u32,
    #[serde(default)]
    pub available: bool
}

impl Book {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    Fantasy,
    Romance,
    #[serde(rename = "Dystopian Fiction")]
    DystopianFiction,
    Mystery,
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Biography,
    History,
    #[serde(other)]
    Other
}

impl Genre {
    pub const ALL: [Genre; 10] = [
        Genre::Fiction,
        Genre::Fantasy,
        Genre::Romance,
        Genre::DystopianFiction,
        Genre::Mystery,
        Genre::ScienceFiction,
        Genre::NonFiction,
        Genre::Biography,
        Genre::History,
        Genre::Other
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::Fantasy => "Fantasy",
            Genre::Romance => "Romance",
            Genre::DystopianFiction => "Dystopian Fiction",
            Genre::Mystery => "Mystery",
            Genre::ScienceFiction => "Science Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::Other => "Other"
        }
    }

    /// Case-insensitive lookup by display name. Unknown names are `None`.
    pub fn parse(name: &str) -> Option<Genre> {
        let name = name.trim();
        Genre::ALL
            .iter()
            .copied()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update body for `PUT /books/{id}`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self == &BookUpdate::default()
    }
}

impl From<Book> for BookUpdate {
    fn from(book: Book) -> Self {
        BookUpdate {
            title: Some(book.title),
            author: Some(book.author),
            genre: Some(book.genre),
            isbn: Some(book.isbn),
            description: book.description,
            copies: Some(book.copies),
            available: Some(book.available)
        }
    }
}

/// Arguments to the book list endpoints. Also used as part of the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>
}

impl BookFilter {
    pub fn page(page: u32, limit: u32) -> Self {
        BookFilter {
            page: Some(page),
            limit: Some(limit),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Active,
    Returned,
    Overdue
}

impl BorrowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BorrowStatus::Active => "active",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Overdue => "overdue"
        }
    }
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The book side of a borrow record. The server either embeds a summary or
/// only sends the raw id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookRef {
    Summary(BookSummary),
    Id(String)
}

impl BookRef {
    pub fn id(&self) -> &str {
        match self {
            BookRef::Summary(summary) => &summary.id,
            BookRef::Id(id) => id
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            BookRef::Summary(summary) => Some(&summary.title),
            BookRef::Id(_) => None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub book: BookRef,
    pub borrower_name: String,
    pub borrower_email: String,
    pub quantity: u32,
    #[serde(default)]
    pub borrow_date: String,
    pub due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    pub status: BorrowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fine: Option<f64>
}

/// Body of `POST /borrows`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBorrow {
    pub book_id: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub borrower_name: String,
    pub borrower_email: String
}

/// What the server echoes back after a successful borrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "book")]
    pub book_id: BookRef,
    pub quantity: u32,
    pub due_date: String
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BorrowStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_email: Option<String>
}

/// One row of `GET /borrows/summary`: how much of a book is out on loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryEntry {
    pub book: SummaryBook,
    #[serde(alias = "quantity")]
    pub total_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryBook {
    pub title: String,
    #[serde(default)]
    pub isbn: String
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Matching items across all pages.
    pub total: u64,
    /// 1-indexed. May exceed `pages` if a page past the end was requested.
    pub page: u32,
    pub pages: u32,
    /// Items on this page.
    pub count: u64
}

impl<T> Paginated<T> {
    /// `page` clamped into `[1, pages]`.
    pub fn clamped_page(&self) -> u32 {
        self.page.clamp(1, self.pages.max(1))
    }

    pub fn is_past_end(&self) -> bool {
        self.page > self.pages.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Paginated {
            items: Vec::new(),
            total: 0,
            page: 1,
            pages: 1,
            count: 0
        }
    }
}
