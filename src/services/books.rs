//! Catalog management

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, book_id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(book_id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// New catalog entries start with every copy available.
    pub async fn create(&self, request: CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
        let book = self.repository.books.create(&request, now).await?;
        tracing::info!(book_id = book.book_id, title = %book.title, copies = book.total_copies, "book added");
        Ok(book)
    }
}
