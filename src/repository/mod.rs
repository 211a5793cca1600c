//! Repository layer: per-entity store contracts and their implementations.
//!
//! Every component receives its storage dependency at construction instead
//! of reaching for a shared global handle, so the whole lending engine can
//! run against either Postgres or the in-memory store used by the tests.

pub mod books;
pub mod borrows;
pub mod memory;
pub mod notifications;
pub mod reservations;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, CreateBook},
        borrow::Borrow,
        enums::{BookCondition, ReservationStatus, UserType},
        notification::Notification,
        reservation::{NewReservation, Reservation},
        user::{CreateUser, User},
    },
};

/// Book storage plus the inventory ledger operations.
///
/// `commit_borrow` and `commit_return` are the only writers of
/// `available_copies`; both are atomic read-modify-writes so that two racing
/// approvals can never double-decrement.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get_by_id(&self, book_id: i32) -> AppResult<Book>;
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn create(&self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book>;
    /// Read-only availability check. Reservation alone never consumes stock.
    async fn try_reserve_copy(&self, book_id: i32) -> AppResult<bool>;
    /// Atomically decrement `available_copies`; `OutOfStock` when none left.
    async fn commit_borrow(&self, book_id: i32) -> AppResult<()>;
    /// Atomically increment `available_copies`, capped at `total_copies`.
    async fn commit_return(&self, book_id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get_by_id(&self, reservation_id: i32) -> AppResult<Reservation>;
    async fn has_pending(&self, user_id: &str, book_id: i32) -> AppResult<bool>;
    /// Lazy garbage collection: delete expired-but-unprocessed `Pending`
    /// rows for this user/book pair so they cannot shadow a new reservation.
    async fn delete_expired_pending(
        &self,
        user_id: &str,
        book_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
    async fn create(&self, reservation: &NewReservation) -> AppResult<Reservation>;
    /// All-or-nothing approval: ledger decrement, reservation flip to
    /// `Approved` and borrow insert are applied as one atomic unit. Any
    /// failure (including `OutOfStock`) leaves the reservation `Pending`.
    async fn approve_into_borrow(
        &self,
        reservation_id: i32,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Borrow>;
    /// Conditional status flip; returns false when the row was no longer
    /// `Pending` (idempotence guard for the expiry sweep and disapproval).
    async fn set_status_if_pending(
        &self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> AppResult<bool>;
    async fn list_expired_pending(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
    async fn list_pending(&self) -> AppResult<Vec<Reservation>>;
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Reservation>>;
}

#[async_trait]
pub trait BorrowStore: Send + Sync {
    async fn get_by_id(&self, borrow_id: i32) -> AppResult<Borrow>;
    /// Atomic return: sets `return_date` and final status and restocks the
    /// copy in one unit. Rejects a second return with `AlreadyReturned`.
    async fn complete_return(
        &self,
        borrow_id: i32,
        now: DateTime<Utc>,
        condition_after: Option<BookCondition>,
        penalty_amount: Option<Decimal>,
    ) -> AppResult<Borrow>;
    /// Flip every held borrow past its due date to `Overdue` and return the
    /// flipped rows. Idempotent by construction of the filter.
    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>>;
    /// Full borrow history, most recent first (penalty streak walk order).
    async fn list_for_user_recent_first(&self, user_id: &str) -> AppResult<Vec<Borrow>>;
    async fn list_active_for_user(&self, user_id: &str) -> AppResult<Vec<Borrow>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, user_id: &str) -> AppResult<User>;
    async fn create(&self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User>;
    async fn set_active(&self, user_id: &str, active: bool) -> AppResult<()>;
    async fn list_by_type(&self, user_type: UserType) -> AppResult<Vec<User>>;
    /// Semester-end bulk disable; returns the number of accounts disabled.
    async fn disable_all_active(&self, user_type: UserType) -> AppResult<u64>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert unless an identical `(user_id, message)` row already exists.
    /// Returns false when the duplicate was suppressed.
    async fn insert_if_absent(
        &self,
        user_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>>;
    async fn list_unread(&self, user_id: &str) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, notification_id: i64) -> AppResult<()>;
}

/// Main repository struct bundling the per-entity stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub borrows: Arc<dyn BorrowStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Repository {
    /// Create a Postgres-backed repository from a connection pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            reservations: Arc::new(reservations::ReservationsRepository::new(pool.clone())),
            borrows: Arc::new(borrows::BorrowsRepository::new(pool.clone())),
            notifications: Arc::new(notifications::NotificationsRepository::new(pool)),
        }
    }

    /// Create an in-memory repository (tests and local experiments)
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(memory::MemoryStore::new()))
    }

    /// Build a repository over an existing in-memory store, keeping a handle
    /// to it for fixture setup.
    pub fn from_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            books: store.clone(),
            users: store.clone(),
            reservations: store.clone(),
            borrows: store.clone(),
            notifications: store,
        }
    }
}
