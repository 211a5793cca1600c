//! Borrows repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::Borrow,
        enums::{BookCondition, BorrowStatus},
    },
    repository::{books, BorrowStore},
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowStore for BorrowsRepository {
    async fn get_by_id(&self, borrow_id: i32) -> AppResult<Borrow> {
        sqlx::query_as::<_, Borrow>("SELECT * FROM borrows WHERE borrow_id = $1")
            .bind(borrow_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))
    }

    async fn complete_return(
        &self,
        borrow_id: i32,
        now: DateTime<Utc>,
        condition_after: Option<BookCondition>,
        penalty_amount: Option<Decimal>,
    ) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        let borrow = sqlx::query_as::<_, Borrow>(
            "SELECT * FROM borrows WHERE borrow_id = $1 FOR UPDATE",
        )
        .bind(borrow_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;

        if borrow.return_date.is_some() || borrow.status == BorrowStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Borrow {} was already returned",
                borrow_id
            )));
        }

        // A non-positive penalty is a no-op, not an error.
        let penalty = penalty_amount.filter(|p| *p > Decimal::ZERO);

        let updated = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows
            SET return_date = $2,
                status = 'Returned',
                condition_after = COALESCE($3, condition_after),
                penalty_amount = COALESCE($4, penalty_amount)
            WHERE borrow_id = $1
            RETURNING *
            "#,
        )
        .bind(borrow_id)
        .bind(now)
        .bind(condition_after)
        .bind(penalty)
        .fetch_one(&mut *tx)
        .await?;

        // Restock inside the same transaction: the borrow update and the
        // ledger increment succeed or fail together.
        books::commit_return_on(&mut *tx, borrow.book_id).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>> {
        let flipped = sqlx::query_as::<_, Borrow>(
            r#"
            UPDATE borrows
            SET status = 'Overdue'
            WHERE due_date < $1
              AND return_date IS NULL
              AND status NOT IN ('Returned', 'Overdue', 'Damaged')
            RETURNING *
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(flipped)
    }

    async fn list_for_user_recent_first(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        let borrows = sqlx::query_as::<_, Borrow>(
            "SELECT * FROM borrows WHERE user_id = $1 ORDER BY borrow_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(borrows)
    }

    async fn list_active_for_user(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        let borrows = sqlx::query_as::<_, Borrow>(
            r#"
            SELECT * FROM borrows
            WHERE user_id = $1 AND return_date IS NULL
            ORDER BY due_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(borrows)
    }
}
