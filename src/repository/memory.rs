//! In-memory store implementing every store contract.
//!
//! A single mutex over the whole dataset gives the same atomicity the
//! Postgres implementation gets from conditional updates and transactions:
//! each operation is one critical section, so racing approvals observe a
//! consistent ledger. Used by the test suite and handy for local runs
//! without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook},
        borrow::Borrow,
        enums::{BookCondition, BorrowStatus, ReservationStatus, UserType},
        notification::Notification,
        reservation::{NewReservation, Reservation},
        user::{CreateUser, User},
    },
    repository::{BookStore, BorrowStore, NotificationStore, ReservationStore, UserStore},
};

#[derive(Default)]
struct Inner {
    books: BTreeMap<i32, Book>,
    users: BTreeMap<String, User>,
    reservations: BTreeMap<i32, Reservation>,
    borrows: BTreeMap<i32, Borrow>,
    notifications: BTreeMap<i64, Notification>,
    next_book_id: i32,
    next_reservation_id: i32,
    next_borrow_id: i32,
    next_notification_id: i64,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_book_id: 1,
                next_reservation_id: 1,
                next_borrow_id: 1,
                next_notification_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No await ever happens while the guard is held.
        self.inner.lock().expect("memory store mutex poisoned")
    }

    /// Insert a borrow row directly, bypassing the approval transition.
    /// Test fixture hook for histories with arbitrary dates and statuses.
    pub fn insert_borrow_raw(&self, borrow: Borrow) -> Borrow {
        let mut inner = self.lock();
        let mut borrow = borrow;
        borrow.borrow_id = inner.next_borrow_id;
        inner.next_borrow_id += 1;
        inner.borrows.insert(borrow.borrow_id, borrow.clone());
        borrow
    }
}

fn book_not_found(book_id: i32) -> AppError {
    AppError::NotFound(format!("Book with id {} not found", book_id))
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get_by_id(&self, book_id: i32) -> AppResult<Book> {
        self.lock()
            .books
            .get(&book_id)
            .cloned()
            .ok_or_else(|| book_not_found(book_id))
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.lock().books.values().cloned().collect())
    }

    async fn create(&self, book: &CreateBook, now: DateTime<Utc>) -> AppResult<Book> {
        let mut inner = self.lock();
        let book_id = inner.next_book_id;
        inner.next_book_id += 1;
        let created = Book {
            book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            isbn: book.isbn.clone(),
            library_section: book.library_section.clone(),
            shelf_location: book.shelf_location.clone(),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
            book_condition: book.book_condition,
            year_published: book.year_published,
            description: book.description.clone(),
            created_at: now,
        };
        inner.books.insert(book_id, created.clone());
        Ok(created)
    }

    async fn try_reserve_copy(&self, book_id: i32) -> AppResult<bool> {
        let inner = self.lock();
        let book = inner.books.get(&book_id).ok_or_else(|| book_not_found(book_id))?;
        Ok(book.available_copies > 0)
    }

    async fn commit_borrow(&self, book_id: i32) -> AppResult<()> {
        let mut inner = self.lock();
        commit_borrow_locked(&mut inner, book_id)
    }

    async fn commit_return(&self, book_id: i32) -> AppResult<()> {
        let mut inner = self.lock();
        commit_return_locked(&mut inner, book_id)
    }
}

fn commit_borrow_locked(inner: &mut Inner, book_id: i32) -> AppResult<()> {
    let book = inner.books.get_mut(&book_id).ok_or_else(|| book_not_found(book_id))?;
    if book.available_copies == 0 {
        return Err(AppError::OutOfStock(format!(
            "No available copies for book {}",
            book_id
        )));
    }
    book.available_copies -= 1;
    Ok(())
}

fn commit_return_locked(inner: &mut Inner, book_id: i32) -> AppResult<()> {
    let book = inner.books.get_mut(&book_id).ok_or_else(|| book_not_found(book_id))?;
    if book.available_copies < book.total_copies {
        book.available_copies += 1;
    } else {
        tracing::warn!(book_id, "return on a book with all copies already in stock");
    }
    Ok(())
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn get_by_id(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.lock()
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
            })
    }

    async fn has_pending(&self, user_id: &str, book_id: i32) -> AppResult<bool> {
        Ok(self.lock().reservations.values().any(|r| {
            r.user_id == user_id && r.book_id == book_id && r.status == ReservationStatus::Pending
        }))
    }

    async fn delete_expired_pending(
        &self,
        user_id: &str,
        book_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut inner = self.lock();
        let stale: Vec<i32> = inner
            .reservations
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.book_id == book_id
                    && r.status == ReservationStatus::Pending
                    && r.expires_at < now
            })
            .map(|r| r.reservation_id)
            .collect();
        for id in &stale {
            inner.reservations.remove(id);
        }
        Ok(stale.len() as u64)
    }

    async fn create(&self, reservation: &NewReservation) -> AppResult<Reservation> {
        let mut inner = self.lock();
        // Same constraint the Postgres schema enforces with a partial
        // unique index: at most one pending reservation per user/book pair.
        if reservation.status == ReservationStatus::Pending
            && inner.reservations.values().any(|r| {
                r.user_id == reservation.user_id
                    && r.book_id == reservation.book_id
                    && r.status == ReservationStatus::Pending
            })
        {
            return Err(AppError::Conflict(format!(
                "User {} already has a pending reservation for book {}",
                reservation.user_id, reservation.book_id
            )));
        }
        let reservation_id = inner.next_reservation_id;
        inner.next_reservation_id += 1;
        let created = Reservation {
            reservation_id,
            user_id: reservation.user_id.clone(),
            book_id: reservation.book_id,
            preferred_pickup_date: reservation.preferred_pickup_date,
            expires_at: reservation.expires_at,
            status: reservation.status,
            created_at: reservation.created_at,
        };
        inner.reservations.insert(reservation_id, created.clone());
        Ok(created)
    }

    async fn approve_into_borrow(
        &self,
        reservation_id: i32,
        now: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Borrow> {
        // One critical section = one transaction: nothing is applied unless
        // every step succeeds.
        let mut inner = self.lock();

        let reservation = inner
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation with id {} not found", reservation_id))
            })?;

        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Reservation {} is {}, not Pending",
                reservation_id, reservation.status
            )));
        }

        commit_borrow_locked(&mut inner, reservation.book_id)?;

        let condition_before = inner
            .books
            .get(&reservation.book_id)
            .map(|b| b.book_condition)
            .unwrap_or(BookCondition::Good);

        if let Some(r) = inner.reservations.get_mut(&reservation_id) {
            r.status = ReservationStatus::Approved;
        }

        let borrow_id = inner.next_borrow_id;
        inner.next_borrow_id += 1;
        let borrow = Borrow {
            borrow_id,
            reservation_id,
            user_id: reservation.user_id.clone(),
            book_id: reservation.book_id,
            borrow_date: now,
            due_date,
            return_date: None,
            status: BorrowStatus::Pending,
            condition_before,
            condition_after: None,
            penalty_amount: Decimal::ZERO,
        };
        inner.borrows.insert(borrow_id, borrow.clone());
        Ok(borrow)
    }

    async fn set_status_if_pending(
        &self,
        reservation_id: i32,
        status: ReservationStatus,
    ) -> AppResult<bool> {
        let mut inner = self.lock();
        match inner.reservations.get_mut(&reservation_id) {
            Some(r) if r.status == ReservationStatus::Pending => {
                r.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_expired_pending(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        Ok(self
            .lock()
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.expires_at < now)
            .cloned()
            .collect())
    }

    async fn list_pending(&self) -> AppResult<Vec<Reservation>> {
        Ok(self
            .lock()
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .lock()
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn get_by_id(&self, borrow_id: i32) -> AppResult<Borrow> {
        self.lock()
            .borrows
            .get(&borrow_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))
    }

    async fn complete_return(
        &self,
        borrow_id: i32,
        now: DateTime<Utc>,
        condition_after: Option<BookCondition>,
        penalty_amount: Option<Decimal>,
    ) -> AppResult<Borrow> {
        let mut inner = self.lock();

        let borrow = inner
            .borrows
            .get(&borrow_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;

        if borrow.return_date.is_some() || borrow.status == BorrowStatus::Returned {
            return Err(AppError::AlreadyReturned(format!(
                "Borrow {} was already returned",
                borrow_id
            )));
        }

        commit_return_locked(&mut inner, borrow.book_id)?;

        let penalty = penalty_amount.filter(|p| *p > Decimal::ZERO);
        let entry = inner
            .borrows
            .get_mut(&borrow_id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow with id {} not found", borrow_id)))?;
        entry.return_date = Some(now);
        entry.status = BorrowStatus::Returned;
        if let Some(condition) = condition_after {
            entry.condition_after = Some(condition);
        }
        if let Some(penalty) = penalty {
            entry.penalty_amount = penalty;
        }
        Ok(entry.clone())
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Borrow>> {
        let mut inner = self.lock();
        let mut flipped = Vec::new();
        for borrow in inner.borrows.values_mut() {
            let held = borrow.return_date.is_none()
                && !matches!(
                    borrow.status,
                    BorrowStatus::Returned | BorrowStatus::Overdue | BorrowStatus::Damaged
                );
            if held && borrow.due_date < now {
                borrow.status = BorrowStatus::Overdue;
                flipped.push(borrow.clone());
            }
        }
        Ok(flipped)
    }

    async fn list_for_user_recent_first(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        let mut borrows: Vec<Borrow> = self
            .lock()
            .borrows
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        borrows.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date));
        Ok(borrows)
    }

    async fn list_active_for_user(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        let mut borrows: Vec<Borrow> = self
            .lock()
            .borrows
            .values()
            .filter(|b| b.user_id == user_id && b.return_date.is_none())
            .cloned()
            .collect();
        borrows.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(borrows)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, user_id: &str) -> AppResult<User> {
        self.lock()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }

    async fn create(&self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        let mut inner = self.lock();
        if inner.users.contains_key(&user.user_id) {
            return Err(AppError::Conflict(format!(
                "User id {} already exists",
                user.user_id
            )));
        }
        let created = User {
            user_id: user.user_id.clone(),
            user_type: user.user_type,
            last_name: user.last_name.clone(),
            first_name: user.first_name.clone(),
            email: user.email.clone(),
            program: user.program.clone(),
            year_level: user.year_level.clone(),
            is_active: true,
            created_at: now,
        };
        inner.users.insert(created.user_id.clone(), created.clone());
        Ok(created)
    }

    async fn set_active(&self, user_id: &str, active: bool) -> AppResult<()> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        user.is_active = active;
        Ok(())
    }

    async fn list_by_type(&self, user_type: UserType) -> AppResult<Vec<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| u.user_type == user_type)
            .cloned()
            .collect())
    }

    async fn disable_all_active(&self, user_type: UserType) -> AppResult<u64> {
        let mut inner = self.lock();
        let mut count = 0;
        for user in inner.users.values_mut() {
            if user.user_type == user_type && user.is_active {
                user.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_if_absent(
        &self,
        user_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut inner = self.lock();
        let duplicate = inner
            .notifications
            .values()
            .any(|n| n.user_id == user_id && n.message == message);
        if duplicate {
            return Ok(false);
        }
        let notification_id = inner.next_notification_id;
        inner.next_notification_id += 1;
        inner.notifications.insert(
            notification_id,
            Notification {
                notification_id,
                user_id: user_id.to_string(),
                message: message.to_string(),
                is_read: false,
                created_at: now,
            },
        );
        Ok(true)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        Ok(self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_unread(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        Ok(self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, notification_id: i64) -> AppResult<()> {
        let mut inner = self.lock();
        let notification = inner.notifications.get_mut(&notification_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "Notification with id {} not found",
                notification_id
            ))
        })?;
        notification.is_read = true;
        Ok(())
    }
}
