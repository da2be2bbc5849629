use super::{
    json_body, Endpoint, EndpointDescriptor, BORROW_BOOK, DEFAULT_LIMIT, DEFAULT_PAGE,
    GET_BORROWS_PAGINATED, GET_BORROW_SUMMARY
};
use crate::{
    model::{Borrow, BorrowFilter, BorrowRecord, BorrowSummaryEntry, NewBorrow, Paginated},
    normalize::{normalize_entity, normalize_list, normalize_page},
    transport::{QueryParams, RawResponse},
    LibraryError
};
use serde_json::Value;

/// `POST /borrows`. The server decrements the book's copies, so this
/// invalidates both books and borrows.
pub struct BorrowBook;

impl Endpoint for BorrowBook {
    type Args = NewBorrow;
    type Output = Borrow;

    const DESCRIPTOR: EndpointDescriptor = BORROW_BOOK;

    fn body(args: &NewBorrow) -> Result<Option<Value>, LibraryError> {
        json_body(BORROW_BOOK.name, args)
    }

    fn normalize(response: RawResponse, _args: &NewBorrow) -> Result<Borrow, LibraryError> {
        normalize_entity(BORROW_BOOK.name, &response.body)
            .ok_or_else(|| LibraryError::decode(BORROW_BOOK.name, "no borrow in response"))
    }
}

pub struct GetBorrowsPaginated;

impl Endpoint for GetBorrowsPaginated {
    type Args = BorrowFilter;
    type Output = Paginated<BorrowRecord>;

    const DESCRIPTOR: EndpointDescriptor = GET_BORROWS_PAGINATED;

    fn params(args: &BorrowFilter) -> QueryParams {
        let mut params = QueryParams::new();
        params
            .push("page", Some(args.page.unwrap_or(DEFAULT_PAGE)))
            .push("limit", Some(args.limit.unwrap_or(DEFAULT_LIMIT)))
            .push("status", args.status)
            .push("borrowerEmail", args.borrower_email.as_deref());
        params
    }

    fn normalize(
        response: RawResponse,
        _args: &BorrowFilter
    ) -> Result<Paginated<BorrowRecord>, LibraryError> {
        Ok(normalize_page(GET_BORROWS_PAGINATED.name, &response.body))
    }
}

pub struct GetBorrowSummary;

impl Endpoint for GetBorrowSummary {
    type Args = ();
    type Output = Vec<BorrowSummaryEntry>;

    const DESCRIPTOR: EndpointDescriptor = GET_BORROW_SUMMARY;

    fn normalize(
        response: RawResponse,
        _args: &()
    ) -> Result<Vec<BorrowSummaryEntry>, LibraryError> {
        Ok(normalize_list(GET_BORROW_SUMMARY.name, &response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::BorrowStatus, transport::Method};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn borrow_posts_json_body() {
        let args = NewBorrow {
            book_id: "1".into(),
            quantity: 2,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            borrower_name: "A".into(),
            borrower_email: "a@x.com".into()
        };
        let request = BorrowBook::request(&args).unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "borrows");
        assert_eq!(request.body.unwrap()["bookId"], json!("1"));
    }

    #[test]
    fn borrow_list_params_use_wire_names() {
        let filter = BorrowFilter {
            page: Some(3),
            limit: None,
            status: Some(BorrowStatus::Overdue),
            borrower_email: Some("a@x.com".into())
        };
        let request = GetBorrowsPaginated::request(&filter).unwrap();
        assert_eq!(
            request.params.as_slice(),
            &[
                ("page", "3".to_string()),
                ("limit", "10".to_string()),
                ("status", "overdue".to_string()),
                ("borrowerEmail", "a@x.com".to_string())
            ]
        );
    }

    #[test]
    fn summary_accepts_bare_or_wrapped_rows() {
        let rows = json!([
            { "book": { "title": "Dune", "isbn": "978" }, "totalQuantity": 3 },
            { "book": { "title": "Emma" }, "quantity": 1, "count": 1 }
        ]);
        for body in vec![rows.clone(), json!({ "data": rows.clone() })] {
            let summary = GetBorrowSummary::normalize(RawResponse::ok(body), &()).unwrap();
            assert_eq!(summary.len(), 2);
            assert_eq!(summary[0].total_quantity, 3);
            assert_eq!(summary[1].book.isbn, "");
        }
        assert_eq!(GetBorrowSummary::request(&()).unwrap().path, "borrows/summary");
    }
}
