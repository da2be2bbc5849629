use super::{
    json_body, Endpoint, EndpointDescriptor, CREATE_BOOK, DEFAULT_LIMIT, DEFAULT_PAGE,
    DELETE_BOOK, GET_BOOK, GET_BOOKS, GET_BOOKS_PAGINATED, UPDATE_BOOK
};
use crate::{
    model::{Book, BookFilter, BookUpdate, Paginated},
    normalize::{normalize_entity, normalize_list, normalize_page},
    transport::{QueryParams, RawResponse},
    LibraryError, TransportError
};
use serde::Serialize;
use serde_json::Value;

fn filter_params(filter: &BookFilter, page: Option<u32>, limit: Option<u32>) -> QueryParams {
    let mut params = QueryParams::new();
    params
        .push("page", page)
        .push("limit", limit)
        .push("search", filter.search.as_deref())
        .push("genre", filter.genre)
        .push("available", filter.available);
    params
}

fn entity_or_decode_error(endpoint: &'static str, body: &Value) -> Result<Book, LibraryError> {
    normalize_entity(endpoint, body)
        .ok_or_else(|| LibraryError::decode(endpoint, "no book in response"))
}

/// `GET /books`, unpaginated. `page`/`limit` are only sent when non-zero.
pub struct GetBooks;

impl Endpoint for GetBooks {
    type Args = BookFilter;
    type Output = Vec<Book>;

    const DESCRIPTOR: EndpointDescriptor = GET_BOOKS;

    fn params(args: &BookFilter) -> QueryParams {
        let non_zero = |n: Option<u32>| n.filter(|n| *n > 0);
        filter_params(args, non_zero(args.page), non_zero(args.limit))
    }

    fn normalize(response: RawResponse, _args: &BookFilter) -> Result<Vec<Book>, LibraryError> {
        Ok(normalize_list(GET_BOOKS.name, &response.body))
    }
}

/// `GET /books?page&limit`. Page defaults to 1 and limit to 10.
pub struct GetBooksPaginated;

impl Endpoint for GetBooksPaginated {
    type Args = BookFilter;
    type Output = Paginated<Book>;

    const DESCRIPTOR: EndpointDescriptor = GET_BOOKS_PAGINATED;

    fn params(args: &BookFilter) -> QueryParams {
        filter_params(
            args,
            Some(args.page.unwrap_or(DEFAULT_PAGE)),
            Some(args.limit.unwrap_or(DEFAULT_LIMIT))
        )
    }

    fn normalize(
        response: RawResponse,
        _args: &BookFilter
    ) -> Result<Paginated<Book>, LibraryError> {
        Ok(normalize_page(GET_BOOKS_PAGINATED.name, &response.body))
    }
}

/// `GET /books/{id}`. Anything that isn't a book, including a 404, is `NotFound`.
pub struct GetBook;

impl Endpoint for GetBook {
    type Args = String;
    type Output = Book;

    const DESCRIPTOR: EndpointDescriptor = GET_BOOK;

    fn path_params(id: &String) -> Vec<(&'static str, String)> {
        vec![("id", id.clone())]
    }

    fn normalize(response: RawResponse, id: &String) -> Result<Book, LibraryError> {
        normalize_entity(GET_BOOK.name, &response.body)
            .ok_or_else(|| LibraryError::not_found("book", id.as_str()))
    }

    fn map_error(error: TransportError, id: &String) -> LibraryError {
        if error.status == Some(404) {
            LibraryError::not_found("book", id.as_str())
        } else {
            error.into()
        }
    }
}

/// `POST /books`. The book's `id` should be unset.
pub struct CreateBook;

impl Endpoint for CreateBook {
    type Args = Book;
    type Output = Book;

    const DESCRIPTOR: EndpointDescriptor = CREATE_BOOK;

    fn body(book: &Book) -> Result<Option<Value>, LibraryError> {
        json_body(CREATE_BOOK.name, book)
    }

    fn normalize(response: RawResponse, _args: &Book) -> Result<Book, LibraryError> {
        entity_or_decode_error(CREATE_BOOK.name, &response.body)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateBookArgs {
    pub id: String,
    pub updates: BookUpdate
}

/// `PUT /books/{id}` with a partial body.
pub struct UpdateBook;

impl Endpoint for UpdateBook {
    type Args = UpdateBookArgs;
    type Output = Book;

    const DESCRIPTOR: EndpointDescriptor = UPDATE_BOOK;

    fn path_params(args: &UpdateBookArgs) -> Vec<(&'static str, String)> {
        vec![("id", args.id.clone())]
    }

    fn body(args: &UpdateBookArgs) -> Result<Option<Value>, LibraryError> {
        json_body(UPDATE_BOOK.name, &args.updates)
    }

    fn normalize(response: RawResponse, _args: &UpdateBookArgs) -> Result<Book, LibraryError> {
        entity_or_decode_error(UPDATE_BOOK.name, &response.body)
    }

    fn map_error(error: TransportError, args: &UpdateBookArgs) -> LibraryError {
        if error.status == Some(404) {
            LibraryError::not_found("book", args.id.as_str())
        } else {
            error.into()
        }
    }
}

/// `DELETE /books/{id}`. The response body is ignored.
pub struct DeleteBook;

impl Endpoint for DeleteBook {
    type Args = String;
    type Output = ();

    const DESCRIPTOR: EndpointDescriptor = DELETE_BOOK;

    fn path_params(id: &String) -> Vec<(&'static str, String)> {
        vec![("id", id.clone())]
    }

    fn normalize(_response: RawResponse, _id: &String) -> Result<(), LibraryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Genre, transport::Method};
    use serde_json::json;

    #[test]
    fn unpaginated_list_omits_zero_page_and_limit() {
        let filter = BookFilter {
            page: Some(0),
            limit: Some(5),
            search: Some(String::new()),
            genre: Some(Genre::DystopianFiction),
            available: Some(true)
        };
        let request = GetBooks::request(&filter).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "books");
        assert_eq!(
            request.params.as_slice(),
            &[
                ("limit", "5".to_string()),
                ("genre", "Dystopian Fiction".to_string()),
                ("available", "true".to_string())
            ]
        );
    }

    #[test]
    fn paginated_list_defaults_page_and_limit() {
        let request = GetBooksPaginated::request(&BookFilter::default()).unwrap();
        assert_eq!(request.params.get("page"), Some("1"));
        assert_eq!(request.params.get("limit"), Some("10"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn get_book_maps_missing_to_not_found() {
        let id = "42".to_string();
        assert_eq!(GetBook::request(&id).unwrap().path, "books/42");

        let err = GetBook::normalize(RawResponse::ok(Value::Null), &id).unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { ref id, .. } if id == "42"));

        let err = GetBook::map_error(
            TransportError::new(Some(404), json!({ "message": "Book not found" })),
            &id
        );
        assert!(matches!(err, LibraryError::NotFound { .. }));

        let err = GetBook::map_error(TransportError::new(Some(500), Value::Null), &id);
        assert!(matches!(err, LibraryError::Transport(_)));
    }

    #[test]
    fn update_sends_only_changed_fields() {
        let args = UpdateBookArgs {
            id: "3".into(),
            updates: BookUpdate {
                copies: Some(0),
                available: Some(false),
                ..Default::default()
            }
        };
        let request = UpdateBook::request(&args).unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "books/3");
        assert_eq!(request.body, Some(json!({ "copies": 0, "available": false })));
    }

    #[test]
    fn create_rejects_unrecognisable_response() {
        let book = Book {
            id: None,
            title: "X".into(),
            author: "Y".into(),
            genre: Genre::Fiction,
            isbn: "Z".into(),
            description: None,
            copies: 2,
            available: true
        };
        let err = CreateBook::normalize(RawResponse::ok(json!({ "success": true })), &book)
            .unwrap_err();
        assert!(matches!(err, LibraryError::Decode { endpoint: "createBook", .. }));
    }
}
