//! Reservation state machine: Pending -> {Approved, Cancelled, Expired}

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        borrow::Borrow,
        enums::ReservationStatus,
        reservation::{NewReservation, Reservation, ReserveBook},
    },
    repository::Repository,
    services::{notifications::NotificationsService, templates},
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    notifications: NotificationsService,
    lending: LendingConfig,
}

impl ReservationsService {
    pub fn new(
        repository: Repository,
        notifications: NotificationsService,
        lending: LendingConfig,
    ) -> Self {
        Self {
            repository,
            notifications,
            lending,
        }
    }

    /// Place a reservation (user action surface).
    ///
    /// Reservation alone never consumes inventory; the availability check is
    /// advisory and the copy is only committed at approval time.
    pub async fn reserve(&self, request: ReserveBook, now: DateTime<Utc>) -> AppResult<Reservation> {
        let user = self.repository.users.get_by_id(&request.user_id).await?;
        if !user.is_active {
            return Err(AppError::InvalidState(format!(
                "Account {} is suspended",
                user.user_id
            )));
        }

        let book = self.repository.books.get_by_id(request.book_id).await?;

        // Lazy GC before the duplicate check: a pending row whose hold
        // window closed without a sweep must not shadow the new reservation.
        let removed = self
            .repository
            .reservations
            .delete_expired_pending(&user.user_id, book.book_id, now)
            .await?;
        if removed > 0 {
            tracing::debug!(user_id = %user.user_id, book_id = book.book_id, removed, "purged expired reservations");
        }

        if self
            .repository
            .reservations
            .has_pending(&user.user_id, book.book_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "User {} already has a pending reservation for \"{}\"",
                user.user_id, book.title
            )));
        }

        if !self.repository.books.try_reserve_copy(book.book_id).await? {
            return Err(AppError::OutOfStock(format!(
                "No available copies of \"{}\"",
                book.title
            )));
        }

        let expires_at =
            request.preferred_pickup_date + Duration::hours(self.lending.reservation_hold_hours);
        // A hold window that has already closed can never be approved.
        let status = if now > expires_at {
            ReservationStatus::Expired
        } else {
            ReservationStatus::Pending
        };

        let reservation = self
            .repository
            .reservations
            .create(&NewReservation {
                user_id: user.user_id.clone(),
                book_id: book.book_id,
                preferred_pickup_date: request.preferred_pickup_date,
                expires_at,
                status,
                created_at: now,
            })
            .await?;

        self.notifications
            .notify_best_effort(
                &user.user_id,
                "ReservationPending",
                &[("BookTitle", book.title.clone())],
                now,
            )
            .await;
        self.notifications
            .notify_admins(
                "NewReservationRequest",
                &[
                    ("UserName", user.full_name()),
                    ("BookTitle", book.title.clone()),
                ],
                now,
            )
            .await;

        Ok(reservation)
    }

    /// Approve a pending reservation (admin action surface), handing a copy
    /// out and opening the paired borrow. Ledger decrement, reservation flip
    /// and borrow insert happen in a single storage transaction; on
    /// `OutOfStock` the reservation stays `Pending`.
    pub async fn approve(&self, reservation_id: i32, now: DateTime<Utc>) -> AppResult<Borrow> {
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Reservation {} is {}, not Pending",
                reservation_id, reservation.status
            )));
        }

        let due_date = now + Duration::days(self.lending.loan_period_days);
        let borrow = self
            .repository
            .reservations
            .approve_into_borrow(reservation_id, now, due_date)
            .await?;

        tracing::info!(
            reservation_id,
            borrow_id = borrow.borrow_id,
            user_id = %borrow.user_id,
            "reservation approved"
        );

        let book_title = match self.repository.books.get_by_id(reservation.book_id).await {
            Ok(book) => book.title,
            Err(e) => {
                tracing::error!(book_id = reservation.book_id, error = %e, "book lookup for notification failed");
                return Ok(borrow);
            }
        };
        let user_name = match self.repository.users.get_by_id(&reservation.user_id).await {
            Ok(user) => user.full_name(),
            Err(_) => reservation.user_id.clone(),
        };

        self.notifications
            .notify_best_effort(
                &reservation.user_id,
                "ReservationApproved",
                &[
                    ("BookTitle", book_title.clone()),
                    (
                        "PreferredPickupDate",
                        templates::fmt_date(reservation.preferred_pickup_date),
                    ),
                ],
                now,
            )
            .await;
        self.notifications
            .notify_best_effort(
                &reservation.user_id,
                "DueDate",
                &[
                    ("BookTitle", book_title.clone()),
                    ("DueDate", templates::fmt_date(borrow.due_date)),
                ],
                now,
            )
            .await;
        self.notifications
            .notify_admins(
                "ReservationStatusChangedAdmin",
                &[
                    ("BookTitle", book_title),
                    ("UserName", user_name),
                    ("Status", "Approved".to_string()),
                ],
                now,
            )
            .await;

        Ok(borrow)
    }

    /// Decline a pending reservation (admin action surface). No inventory
    /// effect: approval is the only step that consumes stock.
    pub async fn disapprove(&self, reservation_id: i32, now: DateTime<Utc>) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "Reservation {} is {}, not Pending",
                reservation_id, reservation.status
            )));
        }

        let flipped = self
            .repository
            .reservations
            .set_status_if_pending(reservation_id, ReservationStatus::Cancelled)
            .await?;
        if !flipped {
            // Lost a race with an approval or the expiry sweeper.
            return Err(AppError::InvalidState(format!(
                "Reservation {} is no longer Pending",
                reservation_id
            )));
        }

        tracing::info!(reservation_id, user_id = %reservation.user_id, "reservation declined");

        if let Ok(book) = self.repository.books.get_by_id(reservation.book_id).await {
            self.notifications
                .notify_best_effort(
                    &reservation.user_id,
                    "ReservationDeclined",
                    &[("BookTitle", book.title)],
                    now,
                )
                .await;
        }

        let mut declined = reservation;
        declined.status = ReservationStatus::Cancelled;
        Ok(declined)
    }

    pub async fn get_user_reservations(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.reservations.list_for_user(user_id).await
    }

    pub async fn list_pending(&self) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list_pending().await
    }
}
