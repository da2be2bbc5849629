//! Test support for `bookshelf`: an in-memory library API and sample data.

mod backend;
mod fixtures;

pub use backend::{EnvelopeShape, MemoryBackend};
pub use fixtures::{new_book, sample_books};

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf::transport::{Method, QueryParams, Request, Transport};
    use serde_json::json;

    #[tokio::test]
    async fn paginates_with_metadata() {
        let backend = MemoryBackend::seeded();
        let mut params = QueryParams::new();
        params.push("page", Some(3)).push("limit", Some(3));
        let response = backend
            .execute(Request::new(Method::Get, "books").with_params(params))
            .await
            .unwrap();

        assert_eq!(response.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(response.body["total"], json!(8));
        assert_eq!(response.body["pages"], json!(3));
        assert_eq!(backend.calls(Method::Get, "books"), 1);
    }

    #[tokio::test]
    async fn borrowing_decrements_copies() {
        let backend = MemoryBackend::seeded();
        let body = json!({
            "bookId": "5",
            "quantity": 1,
            "dueDate": "2030-01-01",
            "borrowerName": "Ada",
            "borrowerEmail": "ada@example.com"
        });
        backend
            .execute(Request::new(Method::Post, "borrows").with_body(Some(body.clone())))
            .await
            .unwrap();
        let book = backend.book("5").unwrap();
        assert_eq!(book.copies, 0);
        assert!(!book.available);

        let err = backend
            .execute(Request::new(Method::Post, "borrows").with_body(Some(body)))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
        assert_eq!(err.message(), "Not enough copies available");
        assert_eq!(backend.borrows().len(), 1);
    }

    #[tokio::test]
    async fn envelope_shapes() {
        let request = || Request::new(Method::Get, "books/1");
        let bare = MemoryBackend::seeded().with_envelope(EnvelopeShape::Bare);
        assert_eq!(bare.execute(request()).await.unwrap().body["_id"], json!("1"));

        let nested = MemoryBackend::seeded().with_envelope(EnvelopeShape::NestedData);
        let body = nested.execute(request()).await.unwrap().body;
        assert_eq!(body["data"]["data"]["_id"], json!("1"));
    }

    #[tokio::test]
    async fn fail_next_fails_once() {
        let backend = MemoryBackend::seeded();
        backend.fail_next(503, "Service unavailable");
        assert!(backend.execute(Request::new(Method::Get, "books")).await.is_err());
        assert!(backend.execute(Request::new(Method::Get, "books")).await.is_ok());
        assert_eq!(backend.total_calls(), 2);
    }
}
