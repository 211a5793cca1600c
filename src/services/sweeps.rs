//! Periodic sweep bodies. Each sweep is a single idempotent pass that the
//! scheduler runs on an interval and that admins can trigger by hand.

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::enums::ReservationStatus,
    repository::Repository,
    services::{notifications::NotificationsService, penalties::PenaltyService},
};

#[derive(Clone)]
pub struct SweepService {
    repository: Repository,
    notifications: NotificationsService,
    penalties: PenaltyService,
}

impl SweepService {
    pub fn new(
        repository: Repository,
        notifications: NotificationsService,
        penalties: PenaltyService,
    ) -> Self {
        Self {
            repository,
            notifications,
            penalties,
        }
    }

    /// Flip every held borrow past its due date to `Overdue` and notify the
    /// borrower. Already-flipped rows are excluded by the storage filter, so
    /// running the sweep twice sends nothing twice.
    pub async fn mark_overdue_borrows(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let flipped = self.repository.borrows.mark_overdue(now).await?;
        if flipped.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = flipped.len(), "borrows marked overdue");
        for borrow in &flipped {
            let title = match self.repository.books.get_by_id(borrow.book_id).await {
                Ok(book) => book.title,
                Err(e) => {
                    tracing::error!(book_id = borrow.book_id, error = %e, "book lookup failed during overdue sweep");
                    continue;
                }
            };
            self.notifications
                .notify_best_effort(
                    &borrow.user_id,
                    "OverdueBook",
                    &[("BookTitle", title)],
                    now,
                )
                .await;
        }
        Ok(flipped.len())
    }

    /// Expire pending reservations whose hold window has closed. The flip is
    /// conditional on the row still being `Pending`, so a concurrent approval
    /// wins and the sweep skips that row.
    pub async fn expire_reservations(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let stale = self.repository.reservations.list_expired_pending(now).await?;
        let mut expired = 0;
        for reservation in stale {
            let flipped = self
                .repository
                .reservations
                .set_status_if_pending(reservation.reservation_id, ReservationStatus::Expired)
                .await?;
            if !flipped {
                continue;
            }
            expired += 1;
            if let Ok(book) = self.repository.books.get_by_id(reservation.book_id).await {
                self.notifications
                    .notify_best_effort(
                        &reservation.user_id,
                        "ReservationExpired",
                        &[("BookTitle", book.title)],
                        now,
                    )
                    .await;
            }
        }
        if expired > 0 {
            tracing::info!(expired, "pending reservations expired");
        }
        Ok(expired)
    }

    /// Recompute every student's penalty standing.
    pub async fn evaluate_penalties(&self, now: DateTime<Utc>) -> AppResult<usize> {
        self.penalties.evaluate_all(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::{
        config::LendingConfig,
        models::{
            book::CreateBook,
            enums::{BookCondition, BorrowStatus, UserType},
            reservation::ReserveBook,
            user::CreateUser,
        },
        services::{email::MockMailer, reservations::ReservationsService},
    };

    struct Harness {
        sweeps: SweepService,
        reservations: ReservationsService,
        repository: Repository,
    }

    async fn harness() -> Harness {
        let repository = Repository::in_memory();
        repository
            .users
            .create(
                &CreateUser {
                    user_id: "S-1001".to_string(),
                    user_type: UserType::Student,
                    last_name: "Reyes".to_string(),
                    first_name: "Ana".to_string(),
                    email: "ana@example.edu".to_string(),
                    program: None,
                    year_level: None,
                },
                Utc::now(),
            )
            .await
            .expect("user fixture");
        repository
            .books
            .create(
                &CreateBook {
                    title: "Dune".to_string(),
                    author: "Frank Herbert".to_string(),
                    category: "Science Fiction".to_string(),
                    isbn: "9780441013593".to_string(),
                    library_section: "Fiction".to_string(),
                    shelf_location: "F-12".to_string(),
                    total_copies: 3,
                    book_condition: BookCondition::Good,
                    year_published: 1965,
                    description: None,
                },
                Utc::now(),
            )
            .await
            .expect("book fixture");

        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_, _, _| Ok(()));
        let notifications = NotificationsService::new(repository.clone(), Arc::new(mailer));
        let penalties = PenaltyService::new(repository.clone(), notifications.clone(), 3);
        let sweeps = SweepService::new(repository.clone(), notifications.clone(), penalties);
        let reservations = ReservationsService::new(
            repository.clone(),
            notifications,
            LendingConfig::default(),
        );
        Harness {
            sweeps,
            reservations,
            repository,
        }
    }

    async fn reserve(h: &Harness, pickup: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
        h.reservations
            .reserve(
                ReserveBook {
                    user_id: "S-1001".to_string(),
                    book_id: 1,
                    preferred_pickup_date: pickup,
                },
                now,
            )
            .await
            .unwrap()
            .reservation_id
    }

    #[tokio::test]
    async fn overdue_sweep_flips_once_and_keeps_the_copy_out() {
        let h = harness().await;
        let borrowed_at = Utc::now() - Duration::days(30);
        let reservation_id = reserve(&h, borrowed_at + Duration::days(1), borrowed_at).await;
        let borrow = h.reservations.approve(reservation_id, borrowed_at).await.unwrap();

        let now = Utc::now();
        assert_eq!(h.sweeps.mark_overdue_borrows(now).await.unwrap(), 1);
        assert_eq!(
            h.sweeps.mark_overdue_borrows(now).await.unwrap(),
            0,
            "second pass finds nothing to flip"
        );

        let stored = h.repository.borrows.get_by_id(borrow.borrow_id).await.unwrap();
        assert_eq!(stored.status, BorrowStatus::Overdue);
        assert!(stored.return_date.is_none());

        // Overdue means still out on loan; the ledger is untouched.
        let book = h.repository.books.get_by_id(1).await.unwrap();
        assert_eq!(book.available_copies, 2);

        let notifications = h
            .repository
            .notifications
            .list_for_user("S-1001")
            .await
            .unwrap();
        let overdue_notes = notifications
            .iter()
            .filter(|n| n.message.contains("overdue"))
            .count();
        assert_eq!(overdue_notes, 1);
    }

    #[tokio::test]
    async fn expiry_sweep_only_touches_stale_pending_rows() {
        let h = harness().await;
        h.repository
            .users
            .create(
                &CreateUser {
                    user_id: "S-1002".to_string(),
                    user_type: UserType::Student,
                    last_name: "Cruz".to_string(),
                    first_name: "Ben".to_string(),
                    email: "ben@example.edu".to_string(),
                    program: None,
                    year_level: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();
        let created_at = Utc::now() - Duration::days(3);

        // Stale: hold window closed two days ago. Fresh: still open.
        reserve(&h, created_at + Duration::hours(1), created_at).await;
        let fresh = h
            .reservations
            .reserve(
                ReserveBook {
                    user_id: "S-1002".to_string(),
                    book_id: 1,
                    preferred_pickup_date: Utc::now() + Duration::days(1),
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .reservation_id;

        let expired = h.sweeps.expire_reservations(Utc::now()).await.unwrap();
        assert_eq!(expired, 1);
        assert_eq!(h.sweeps.expire_reservations(Utc::now()).await.unwrap(), 0);

        let fresh_row = h.repository.reservations.get_by_id(fresh).await.unwrap();
        assert_eq!(fresh_row.status, crate::models::enums::ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn penalty_sweep_suspends_after_three_overdue_loans() {
        let h = harness().await;
        let long_ago = Utc::now() - Duration::days(90);

        for i in 0..3 {
            let at = long_ago + Duration::days(i * 10);
            let reservation_id = reserve(&h, at + Duration::days(1), at).await;
            h.reservations.approve(reservation_id, at).await.unwrap();
        }
        let now = Utc::now();
        assert_eq!(h.sweeps.mark_overdue_borrows(now).await.unwrap(), 3);

        let suspended = h.sweeps.evaluate_penalties(now).await.unwrap();
        assert_eq!(suspended, 1);
        let user = h.repository.users.get_by_id("S-1001").await.unwrap();
        assert!(!user.is_active);
    }
}
