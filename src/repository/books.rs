//! Books repository: catalog rows plus the inventory ledger.
//!
//! The copy counters are mutated exclusively through `commit_borrow_on` and
//! `commit_return_on`, conditional single-statement updates that are safe
//! under concurrent callers. The executor-generic helpers let the composite
//! state transitions run the same ledger statements inside their own
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook},
    repository::BookStore,
};

/// Atomic check-and-decrement of `available_copies`.
pub(crate) async fn commit_borrow_on<'e, E>(executor: E, book_id: i32) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE books
        SET available_copies = available_copies - 1
        WHERE book_id = $1 AND available_copies > 0
        "#,
    )
    .bind(book_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::OutOfStock(format!(
            "No available copies for book {}",
            book_id
        )));
    }
    Ok(())
}

/// Atomic increment of `available_copies`, capped at `total_copies`.
pub(crate) async fn commit_return_on<'e, E>(executor: E, book_id: i32) -> AppResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE books
        SET available_copies = available_copies + 1
        WHERE book_id = $1 AND available_copies < total_copies
        "#,
    )
    .bind(book_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        // All copies already accounted for; a capped return is not an error.
        tracing::warn!(book_id, "return on a book with all copies already in stock");
    }
    Ok(())
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn get_by_id(&self, book_id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE book_id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn create(&self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, author, category, isbn, library_section, shelf_location,
                total_copies, available_copies, book_condition, year_published,
                description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(&book.library_section)
        .bind(&book.shelf_location)
        .bind(book.total_copies)
        .bind(book.book_condition)
        .bind(book.year_published)
        .bind(&book.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn try_reserve_copy(&self, book_id: i32) -> AppResult<bool> {
        let available: Option<i32> =
            sqlx::query_scalar("SELECT available_copies FROM books WHERE book_id = $1")
                .bind(book_id)
                .fetch_optional(&self.pool)
                .await?;

        match available {
            Some(n) => Ok(n > 0),
            None => Err(AppError::NotFound(format!(
                "Book with id {} not found",
                book_id
            ))),
        }
    }

    async fn commit_borrow(&self, book_id: i32) -> AppResult<()> {
        commit_borrow_on(&self.pool, book_id).await
    }

    async fn commit_return(&self, book_id: i32) -> AppResult<()> {
        commit_return_on(&self.pool, book_id).await
    }
}
