//! Reservations repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::Borrow,
        enums::ReservationStatus,
        reservation::{NewReservation, Reservation},
    },
    repository::{books, ReservationStore},
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStore for ReservationsRepository {
    async fn get_by_id(&self, reservation_id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })
    }

    async fn has_pending(&self, user_id: &str, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND book_id = $2 AND status = 'Pending'
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn delete_expired_pending(
        &self,
        user_id: &str,
        book_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM reservations
            WHERE user_id = $1 AND book_id = $2 AND status = 'Pending' AND expires_at < $3
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn create(&self, reservation: &NewReservation) -> AppResult<Reservation> {
        let result = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                user_id, book_id, preferred_pickup_date, expires_at, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&reservation.user_id)
        .bind(reservation.book_id)
        .bind(reservation.preferred_pickup_date)
        .bind(reservation.expires_at)
        .bind(reservation.status)
        .bind(reservation.created_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            // The partial unique index on (user_id, book_id) catches racing
            // reserves that both passed the pending check.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::Conflict(format!(
                    "User {} already has a pending reservation for book {}",
                    reservation.user_id, reservation.book_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn approve_into_borrow(
        &self,
        reservation_id: i32,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Borrow> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent approvals of the same reservation.
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE reservation_id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
        })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Reservation {} is {}, not Pending",
                reservation_id, reservation.status
            )));
        }

        // Ledger decrement; an OutOfStock error aborts the transaction and
        // leaves the reservation Pending.
        books::commit_borrow_on(&mut *tx, reservation.book_id).await?;

        let condition_before: crate::models::enums::BookCondition = sqlx::query_scalar(
            "SELECT book_condition FROM books WHERE book_id = $1",
        )
        .bind(reservation.book_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE reservations SET status = 'Approved' WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        let borrow = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (
                reservation_id, user_id, book_id, borrow_date, due_date,
                status, condition_before, penalty_amount
            )
            VALUES ($1, $2, $3, $4, $5, 'Pending', $6, 0)
            RETURNING *
            "#,
        )
        .bind(reservation_id)
        .bind(&reservation.user_id)
        .bind(reservation.book_id)
        .bind(now)
        .bind(due_date)
        .bind(condition_before)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrow)
    }

    async fn set_status_if_pending(
        &self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE reservations SET status = $2 WHERE reservation_id = $1 AND status = 'Pending'",
        )
        .bind(reservation_id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_expired_pending(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE status = 'Pending' AND expires_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_pending(&self) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE status = 'Pending' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }
}
