use bookshelf::model::{Book, Genre};

fn book(
    id: &str,
    title: &str,
    author: &str,
    genre: Genre,
    isbn: &str,
    description: &str,
    copies: u32
) -> Book {
    Book {
        id: Some(id.to_string()),
        title: title.to_string(),
        author: author.to_string(),
        genre,
        isbn: isbn.to_string(),
        description: Some(description.to_string()),
        copies,
        available: copies > 0
    }
}

/// Eight classics, two of them with no copies left (ids 3 and 7).
pub fn sample_books() -> Vec<Book> {
    vec![
        book(
            "1",
            "The Great Gatsby",
            "F. Scott Fitzgerald",
            Genre::Fiction,
            "978-0-7432-7356-5",
            "A classic American novel set in the Jazz Age.",
            5
        ),
        book(
            "2",
            "To Kill a Mockingbird",
            "Harper Lee",
            Genre::Fiction,
            "978-0-06-112008-4",
            "Racial injustice and childhood innocence in the American South.",
            3
        ),
        book(
            "3",
            "1984",
            "George Orwell",
            Genre::DystopianFiction,
            "978-0-452-28423-4",
            "Totalitarian control and surveillance.",
            0
        ),
        book(
            "4",
            "Pride and Prejudice",
            "Jane Austen",
            Genre::Romance,
            "978-0-14-143951-8",
            "A romantic novel of manners.",
            2
        ),
        book(
            "5",
            "The Catcher in the Rye",
            "J.D. Salinger",
            Genre::Fiction,
            "978-0-316-76948-0",
            "Teenage rebellion and alienation.",
            1
        ),
        book(
            "6",
            "The Lord of the Rings",
            "J.R.R. Tolkien",
            Genre::Fantasy,
            "978-0-547-92822-7",
            "The quest to destroy the One Ring.",
            4
        ),
        book(
            "7",
            "Harry Potter and the Sorcerer's Stone",
            "J.K. Rowling",
            Genre::Fantasy,
            "978-0-439-35548-4",
            "A young wizard's first year at school.",
            0
        ),
        book(
            "8",
            "The Chronicles of Narnia",
            "C.S. Lewis",
            Genre::Fantasy,
            "978-0-06-440537-9",
            "Children discover the magical world of Narnia.",
            3
        )
    ]
}

/// A book that doesn't exist on the server yet.
pub fn new_book(title: &str) -> Book {
    Book {
        id: None,
        title: title.to_string(),
        author: "Ursula K. Le Guin".to_string(),
        genre: Genre::ScienceFiction,
        isbn: "978-0-441-47812-5".to_string(),
        description: None,
        copies: 2,
        available: true
    }
}
