use async_trait::async_trait;
use bookshelf::{
    model::{Book, BookRef, BookSummary, BorrowRecord, BorrowStatus, NewBorrow},
    transport::{Method, RawResponse, Request},
    Transport, TransportError
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{collections::HashMap, sync::Arc, time::Duration};

/// How the backend wraps its payloads. Real deployments have been seen
/// sending all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    Bare,
    Data,
    NestedData
}

#[derive(Default)]
struct State {
    books: Vec<Book>,
    borrows: Vec<BorrowRecord>,
    next_id: u32,
    calls: HashMap<String, usize>,
    fail_next: Option<(u16, String)>
}

/// An in-memory library API. Clones share the same data.
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    shape: EnvelopeShape,
    latency: Option<Duration>
}

type Reply = Result<RawResponse, TransportError>;

fn error(status: u16, message: &str) -> TransportError {
    TransportError::new(Some(status), json!({ "success": false, "message": message }))
}

fn call_key(method: Method, path: &str) -> String {
    format!("{} {}", method, path.trim_matches('/'))
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            state: Arc::new(Mutex::new(State::default())),
            shape: EnvelopeShape::Data,
            latency: None
        }
    }

    /// A backend stocked with [`sample_books`](crate::sample_books).
    pub fn seeded() -> Self {
        Self::with_books(crate::sample_books())
    }

    /// Books without an id get one assigned.
    pub fn with_books(books: Vec<Book>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for book in books {
                state.insert_book(book);
            }
        }
        backend
    }

    pub fn with_envelope(mut self, shape: EnvelopeShape) -> Self {
        self.shape = shape;
        self
    }

    /// Delays every response, which makes overlapping requests observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next request fail with `status` and `message`.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.state.lock().fail_next = Some((status, message.to_string()));
    }

    /// How many requests were made for `method` and `path` (e.g. `books/1`).
    pub fn calls(&self, method: Method, path: &str) -> usize {
        let key = call_key(method, path);
        self.state.lock().calls.get(&key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    pub fn books(&self) -> Vec<Book> {
        self.state.lock().books.clone()
    }

    pub fn book(&self, id: &str) -> Option<Book> {
        self.state.lock().find_book(id).cloned()
    }

    pub fn borrows(&self) -> Vec<BorrowRecord> {
        self.state.lock().borrows.clone()
    }

    fn wrap(&self, payload: Value) -> Value {
        match self.shape {
            EnvelopeShape::Bare => payload,
            EnvelopeShape::Data => json!({ "success": true, "data": payload }),
            EnvelopeShape::NestedData => {
                json!({ "success": true, "data": { "success": true, "data": payload } })
            }
        }
    }

    /// Lists carry their metadata next to the item array. A bare list has
    /// nowhere to put it.
    fn wrap_page(&self, items: Value, meta: Map<String, Value>) -> Value {
        let with_meta = |items: Value| {
            let mut object = meta.clone();
            object.insert("success".to_string(), json!(true));
            object.insert("data".to_string(), items);
            Value::Object(object)
        };
        match self.shape {
            EnvelopeShape::Bare => items,
            EnvelopeShape::Data => with_meta(items),
            EnvelopeShape::NestedData => json!({ "success": true, "data": with_meta(items) })
        }
    }

    fn ok<T: Serialize>(&self, payload: &T) -> Reply {
        let payload = serde_json::to_value(payload).map_err(|e| error(500, &e.to_string()))?;
        Ok(RawResponse::ok(self.wrap(payload)))
    }

    fn route(&self, state: &mut State, request: &Request) -> Reply {
        let segments: Vec<&str> = request.segments().collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["books"]) => self.list_books(state, request),
            (Method::Post, ["books"]) => {
                let book: Book = decode_body(request)?;
                if book.title.trim().is_empty() {
                    return Err(error(400, "Title is required"));
                }
                let book = state.insert_book(book);
                self.ok(&book)
            }
            (Method::Get, ["books", id]) => match state.find_book(id) {
                Some(book) => self.ok(book),
                None => Err(error(404, "Book not found"))
            },
            (Method::Put, ["books", id]) => {
                let updates: Map<String, Value> = decode_body(request)?;
                let book = state.find_book_mut(id).ok_or_else(|| error(404, "Book not found"))?;
                let mut merged =
                    serde_json::to_value(&*book).map_err(|e| error(500, &e.to_string()))?;
                if let Value::Object(ref mut fields) = merged {
                    fields.extend(updates);
                }
                *book = serde_json::from_value(merged).map_err(|e| error(400, &e.to_string()))?;
                let book = book.clone();
                self.ok(&book)
            }
            (Method::Delete, ["books", id]) => {
                let before = state.books.len();
                state.books.retain(|book| book.id.as_deref() != Some(*id));
                if state.books.len() == before {
                    return Err(error(404, "Book not found"));
                }
                Ok(RawResponse::ok(json!({ "success": true, "message": "Book deleted" })))
            }
            (Method::Post, ["borrows"]) => self.borrow(state, request),
            (Method::Get, ["borrows"]) => self.list_borrows(state, request),
            (Method::Get, ["borrows", "summary"]) => self.ok(&summary(&state.borrows)),
            _ => Err(error(404, "Route not found"))
        }
    }

    fn list_books(&self, state: &State, request: &Request) -> Reply {
        let params = &request.params;
        let search = params.get("search").map(str::to_lowercase);
        let books: Vec<&Book> = state
            .books
            .iter()
            .filter(|book| match search {
                Some(ref needle) => {
                    book.title.to_lowercase().contains(needle.as_str())
                        || book.author.to_lowercase().contains(needle.as_str())
                }
                None => true
            })
            .filter(|book| params.get("genre").map_or(true, |g| book.genre.as_str() == g))
            .filter(|book| {
                params
                    .get("available")
                    .map_or(true, |a| book.available.to_string() == a)
            })
            .collect();
        self.paginate(&books, request)
    }

    fn list_borrows(&self, state: &State, request: &Request) -> Reply {
        let params = &request.params;
        let borrows: Vec<&BorrowRecord> = state
            .borrows
            .iter()
            .filter(|b| params.get("status").map_or(true, |s| b.status.as_str() == s))
            .filter(|b| params.get("borrowerEmail").map_or(true, |e| b.borrower_email == e))
            .collect();
        self.paginate(&borrows, request)
    }

    /// Without `page` and `limit` the whole list is returned unwrapped by
    /// pagination metadata.
    fn paginate<T: Serialize>(&self, items: &[T], request: &Request) -> Reply {
        let number = |name: &str| request.params.get(name).and_then(|v| v.parse::<usize>().ok());
        let (page, limit) = match (number("page"), number("limit")) {
            (None, None) => return self.ok(&items),
            (page, limit) => (page.unwrap_or(1).max(1), limit.unwrap_or(10).max(1))
        };

        let total = items.len();
        let pages = (total + limit - 1) / limit;
        let slice: Vec<&T> = items.iter().skip((page - 1) * limit).take(limit).collect();
        let count = slice.len();
        let items = serde_json::to_value(&slice).map_err(|e| error(500, &e.to_string()))?;

        let mut meta = Map::new();
        meta.insert("total".to_string(), json!(total));
        meta.insert("page".to_string(), json!(page));
        meta.insert("pages".to_string(), json!(pages));
        meta.insert("count".to_string(), json!(count));
        Ok(RawResponse::ok(self.wrap_page(items, meta)))
    }

    fn borrow(&self, state: &mut State, request: &Request) -> Reply {
        let borrow: NewBorrow = decode_body(request)?;
        let id = state.next_id();
        let book = state
            .find_book_mut(&borrow.book_id)
            .ok_or_else(|| error(404, "Book not found"))?;
        if borrow.quantity == 0 || book.copies < borrow.quantity {
            return Err(error(400, "Not enough copies available"));
        }
        book.copies -= borrow.quantity;
        book.available = book.copies > 0;

        let summary = BookSummary {
            id: borrow.book_id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone()
        };
        let due_date = borrow.due_date.to_string();
        state.borrows.push(BorrowRecord {
            id: id.clone(),
            book: BookRef::Summary(summary),
            borrower_name: borrow.borrower_name,
            borrower_email: borrow.borrower_email,
            quantity: borrow.quantity,
            borrow_date: Utc::now().date_naive().to_string(),
            due_date: due_date.clone(),
            return_date: None,
            status: BorrowStatus::Active,
            fine: None
        });

        let echo = json!({
            "_id": id,
            "book": borrow.book_id,
            "quantity": borrow.quantity,
            "dueDate": due_date
        });
        Ok(RawResponse::ok(self.wrap(echo)))
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(request: &Request) -> Result<T, TransportError> {
    let body = request.body.clone().unwrap_or(Value::Null);
    serde_json::from_value(body).map_err(|e| error(400, &format!("Invalid request body: {}", e)))
}

fn summary(borrows: &[BorrowRecord]) -> Vec<Value> {
    let mut rows: Vec<(String, String, u32, u32)> = Vec::new();
    for borrow in borrows {
        let (title, isbn) = match borrow.book {
            BookRef::Summary(ref book) => (book.title.clone(), book.isbn.clone()),
            BookRef::Id(ref id) => (id.clone(), String::new())
        };
        match rows.iter_mut().find(|row| row.1 == isbn && row.0 == title) {
            Some(row) => {
                row.2 += borrow.quantity;
                row.3 += 1;
            }
            None => rows.push((title, isbn, borrow.quantity, 1))
        }
    }
    rows.into_iter()
        .map(|(title, isbn, quantity, count)| {
            json!({
                "book": { "title": title, "isbn": isbn },
                "totalQuantity": quantity,
                "count": count
            })
        })
        .collect()
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn insert_book(&mut self, mut book: Book) -> Book {
        match book.id {
            Some(ref id) => {
                if let Ok(n) = id.parse::<u32>() {
                    self.next_id = self.next_id.max(n);
                }
            }
            None => book.id = Some(self.next_id())
        }
        self.books.push(book.clone());
        book
    }

    fn find_book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id.as_deref() == Some(id))
    }

    fn find_book_mut(&mut self, id: &str) -> Option<&mut Book> {
        self.books.iter_mut().find(|book| book.id.as_deref() == Some(id))
    }
}

#[async_trait]
impl Transport for MemoryBackend {
    async fn execute(&self, request: Request) -> Result<RawResponse, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        *state
            .calls
            .entry(call_key(request.method, &request.path))
            .or_insert(0) += 1;
        if let Some((status, message)) = state.fail_next.take() {
            return Err(error(status, &message));
        }
        self.route(&mut state, &request)
    }
}
