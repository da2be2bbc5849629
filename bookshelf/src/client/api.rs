use crate::{
    endpoints::{
        BorrowBook, CreateBook, DeleteBook, GetBook, GetBooks, GetBooksPaginated,
        GetBorrowSummary, GetBorrowsPaginated, UpdateBook, UpdateBookArgs
    },
    model::{
        Book, BookFilter, BookUpdate, Borrow, BorrowFilter, BorrowRecord, BorrowSummaryEntry,
        NewBorrow, Paginated
    },
    Client, LibraryError, Transport
};

/// One method per endpoint. Queries go through the cache; the debug info is
/// dropped, use [`Client::query`] to keep it.
impl<T: Transport> Client<T> {
    pub async fn get_books(&self, filter: BookFilter) -> Result<Vec<Book>, LibraryError> {
        Ok(self.query::<GetBooks>(filter).await?.data)
    }

    pub async fn get_books_paginated(
        &self,
        filter: BookFilter
    ) -> Result<Paginated<Book>, LibraryError> {
        Ok(self.query::<GetBooksPaginated>(filter).await?.data)
    }

    pub async fn get_book<S: Into<String>>(&self, id: S) -> Result<Book, LibraryError> {
        Ok(self.query::<GetBook>(id.into()).await?.data)
    }

    pub async fn create_book(&self, book: Book) -> Result<Book, LibraryError> {
        self.mutate::<CreateBook>(book).await
    }

    pub async fn update_book<S: Into<String>>(
        &self,
        id: S,
        updates: BookUpdate
    ) -> Result<Book, LibraryError> {
        let args = UpdateBookArgs {
            id: id.into(),
            updates
        };
        self.mutate::<UpdateBook>(args).await
    }

    pub async fn delete_book<S: Into<String>>(&self, id: S) -> Result<(), LibraryError> {
        self.mutate::<DeleteBook>(id.into()).await
    }

    pub async fn borrow_book(&self, borrow: NewBorrow) -> Result<Borrow, LibraryError> {
        self.mutate::<BorrowBook>(borrow).await
    }

    pub async fn get_borrows_paginated(
        &self,
        filter: BorrowFilter
    ) -> Result<Paginated<BorrowRecord>, LibraryError> {
        Ok(self.query::<GetBorrowsPaginated>(filter).await?.data)
    }

    pub async fn get_borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, LibraryError> {
        Ok(self.query::<GetBorrowSummary>(()).await?.data)
    }
}
