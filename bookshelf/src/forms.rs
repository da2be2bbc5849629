//! Client-side validation for the create/edit book and borrow forms.
//!
//! A form that fails validation never reaches the network; the caller gets a
//! [`ValidationError`] keyed by field name instead.

use crate::{
    model::{Book, BookUpdate, Genre, NewBorrow},
    ValidationError
};
use chrono::NaiveDate;

/// Raw book form input, as typed by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub description: String,
    pub copies: i64,
    pub available: bool
}

impl Default for BookForm {
    fn default() -> Self {
        BookForm {
            title: String::new(),
            author: String::new(),
            genre: String::new(),
            isbn: String::new(),
            description: String::new(),
            copies: 1,
            available: true
        }
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        BookForm {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.to_string(),
            isbn: book.isbn.clone(),
            description: book.description.clone().unwrap_or_default(),
            copies: i64::from(book.copies),
            available: book.available
        }
    }
}

fn required(
    errors: &mut ValidationError,
    field: &'static str,
    value: &str,
    message: &str
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, message);
    }
    value.to_string()
}

impl BookForm {
    /// Produces a book ready for `createBook`.
    pub fn validate(&self) -> Result<Book, ValidationError> {
        let mut errors = ValidationError::new();
        let title = required(&mut errors, "title", &self.title, "Title is required");
        let author = required(&mut errors, "author", &self.author, "Author is required");
        let isbn = required(&mut errors, "isbn", &self.isbn, "ISBN is required");

        let genre = match self.genre.trim() {
            "" => {
                errors.add("genre", "Genre is required");
                Genre::Other
            }
            name => Genre::parse(name).unwrap_or_else(|| {
                errors.add("genre", format!("Unknown genre '{}'", name));
                Genre::Other
            })
        };

        let copies = u32::try_from(self.copies).unwrap_or_else(|_| {
            errors.add("copies", "Copies must be a positive number");
            0
        });

        let description = Some(self.description.trim().to_string()).filter(|d| !d.is_empty());
        errors.into_result(Book {
            id: None,
            title,
            author,
            genre,
            isbn,
            description,
            copies,
            available: self.available
        })
    }

    /// Produces a full update for `updateBook`.
    pub fn validate_update(&self) -> Result<BookUpdate, ValidationError> {
        self.validate().map(BookUpdate::from)
    }
}

/// Raw borrow form input. `available_copies` is the book's current count,
/// when the view knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowForm {
    pub book_id: String,
    pub quantity: i64,
    pub due_date: String,
    pub borrower_name: String,
    pub borrower_email: String,
    pub available_copies: Option<u32>
}

fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false
    }
}

impl BorrowForm {
    pub fn validate(&self, today: NaiveDate) -> Result<NewBorrow, ValidationError> {
        let mut errors = ValidationError::new();
        let book_id = required(&mut errors, "bookId", &self.book_id, "Book is required");

        let quantity = match u32::try_from(self.quantity) {
            Ok(q) if q >= 1 => q,
            _ => {
                errors.add("quantity", "Quantity must be at least 1");
                0
            }
        };
        if let Some(available) = self.available_copies {
            if quantity > available {
                errors.add("quantity", format!("Only {} copies available", available));
            }
        }

        let due_date = match NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d") {
            Ok(date) if date < today => {
                errors.add("dueDate", "Due date cannot be in the past");
                date
            }
            Ok(date) => date,
            Err(_) => {
                errors.add("dueDate", "Due date must be a date (YYYY-MM-DD)");
                today
            }
        };

        let borrower_name = required(
            &mut errors,
            "borrowerName",
            &self.borrower_name,
            "Borrower name is required"
        );
        let borrower_email = self.borrower_email.trim().to_string();
        if !looks_like_email(&borrower_email) {
            errors.add("borrowerEmail", "Enter a valid email address");
        }

        errors.into_result(NewBorrow {
            book_id,
            quantity,
            due_date,
            borrower_name,
            borrower_email
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn book_form() -> BookForm {
        BookForm {
            title: " 1984 ".into(),
            author: "George Orwell".into(),
            genre: "dystopian fiction".into(),
            isbn: "9780451524935".into(),
            ..Default::default()
        }
    }

    fn borrow_form() -> BorrowForm {
        BorrowForm {
            book_id: "b1".into(),
            quantity: 1,
            due_date: "2024-06-15".into(),
            borrower_name: "Ada".into(),
            borrower_email: "ada@example.com".into(),
            available_copies: Some(2)
        }
    }

    #[test]
    fn valid_book_form_trims_and_parses() {
        let book = book_form().validate().unwrap();
        assert_eq!(book.title, "1984");
        assert_eq!(book.genre, Genre::DystopianFiction);
        assert_eq!(book.copies, 1);
        assert_eq!(book.description, None);
        assert!(book.id.is_none());
    }

    #[test]
    fn blank_book_form_reports_every_required_field() {
        let form = BookForm {
            copies: -1,
            ..Default::default()
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.field("title"), Some("Title is required"));
        assert_eq!(err.field("author"), Some("Author is required"));
        assert_eq!(err.field("genre"), Some("Genre is required"));
        assert_eq!(err.field("isbn"), Some("ISBN is required"));
        assert_eq!(err.field("copies"), Some("Copies must be a positive number"));
        assert_eq!(err.len(), 5);
    }

    #[test]
    fn zero_copies_is_allowed() {
        let form = BookForm {
            copies: 0,
            available: false,
            ..book_form()
        };
        let update = form.validate_update().unwrap();
        assert_eq!(update.copies, Some(0));
        assert_eq!(update.available, Some(false));
    }

    #[test]
    fn unknown_genre_is_rejected() {
        let form = BookForm {
            genre: "Poetry".into(),
            ..book_form()
        };
        assert_eq!(form.validate().unwrap_err().field("genre"), Some("Unknown genre 'Poetry'"));
    }

    #[test]
    fn valid_borrow_form() {
        let borrow = borrow_form().validate(today()).unwrap();
        assert_eq!(borrow.quantity, 1);
        assert_eq!(borrow.due_date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        // due today is fine
        let form = BorrowForm {
            due_date: "2024-06-01".into(),
            ..borrow_form()
        };
        assert!(form.validate(today()).is_ok());
    }

    #[test]
    fn borrow_form_rejects_bad_input() {
        let form = BorrowForm {
            quantity: 3,
            due_date: "2024-05-31".into(),
            borrower_name: "  ".into(),
            borrower_email: "ada.example.com".into(),
            ..borrow_form()
        };
        let err = form.validate(today()).unwrap_err();
        assert_eq!(err.field("quantity"), Some("Only 2 copies available"));
        assert_eq!(err.field("dueDate"), Some("Due date cannot be in the past"));
        assert_eq!(err.field("borrowerName"), Some("Borrower name is required"));
        assert_eq!(err.field("borrowerEmail"), Some("Enter a valid email address"));

        let form = BorrowForm {
            quantity: 0,
            due_date: "15/06/2024".into(),
            available_copies: None,
            ..borrow_form()
        };
        let err = form.validate(today()).unwrap_err();
        assert_eq!(err.field("quantity"), Some("Quantity must be at least 1"));
        assert!(err.field("dueDate").is_some());
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b"));
        assert!(!looks_like_email("a@b@c"));
        assert!(!looks_like_email("@b"));
        assert!(!looks_like_email("a b@c"));
    }
}
