use bookshelf::{
    model::{Book, BorrowRecord, BorrowSummaryEntry, Paginated},
    pagination::Pager
};

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn table(headers: &[&str], widths: &[usize], rows: Vec<Vec<String>>) {
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", truncate(cell, *width), width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };
    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        println!("{}", line(row));
    }
}

pub fn books(books: &[Book]) {
    if books.is_empty() {
        println!("No books found.");
        return;
    }
    let rows = books
        .iter()
        .map(|book| {
            vec![
                book.id().unwrap_or("-").to_string(),
                book.title.clone(),
                book.author.clone(),
                book.genre.to_string(),
                book.copies.to_string(),
                if book.available { "yes" } else { "no" }.to_string()
            ]
        })
        .collect();
    table(
        &["ID", "TITLE", "AUTHOR", "GENRE", "COPIES", "AVAILABLE"],
        &[8, 32, 20, 17, 6, 9],
        rows
    );
}

pub fn book(book: &Book) {
    println!("{}", book.title);
    println!("  by {}", book.author);
    println!("  genre:     {}", book.genre);
    println!("  isbn:      {}", book.isbn);
    println!("  copies:    {}", book.copies);
    println!("  available: {}", if book.available { "yes" } else { "no" });
    if let Some(ref description) = book.description {
        println!();
        println!("{}", description);
    }
}

pub fn borrows(borrows: &[BorrowRecord]) {
    if borrows.is_empty() {
        println!("No borrow records found.");
        return;
    }
    let rows = borrows
        .iter()
        .map(|borrow| {
            vec![
                borrow.book.title().unwrap_or(borrow.book.id()).to_string(),
                borrow.borrower_name.clone(),
                borrow.borrower_email.clone(),
                borrow.quantity.to_string(),
                borrow.due_date.clone(),
                borrow.status.to_string()
            ]
        })
        .collect();
    table(
        &["BOOK", "BORROWER", "EMAIL", "QTY", "DUE", "STATUS"],
        &[28, 18, 24, 3, 10, 8],
        rows
    );
}

pub fn summary(summary: &[BorrowSummaryEntry]) {
    if summary.is_empty() {
        println!("Nothing is borrowed right now.");
        return;
    }
    let rows = summary
        .iter()
        .map(|entry| {
            vec![
                entry.book.title.clone(),
                entry.book.isbn.clone(),
                entry.total_quantity.to_string()
            ]
        })
        .collect();
    table(&["TITLE", "ISBN", "TOTAL QUANTITY"], &[36, 18, 14], rows);
}

pub fn footer<T>(page: &Paginated<T>, pager: &Pager) {
    println!();
    println!("{}", Pager::label(page));
    let mut hints = Vec::new();
    if pager.has_prev() {
        hints.push(format!("--page {} for the previous page", pager.page - 1));
    }
    if pager.has_next(page) {
        hints.push(format!("--page {} for the next page", pager.page + 1));
    }
    if !hints.is_empty() {
        println!("{}", hints.join(", "));
    }
}
