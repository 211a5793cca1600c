//! End-to-end lending lifecycle over the in-memory repository:
//! reserve -> approve -> overdue -> penalty suspension -> return -> reinstatement.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{seq::SliceRandom, Rng};

use bookease_server::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        book::CreateBook,
        borrow::{Borrow, ReturnBorrow},
        enums::{BookCondition, BorrowStatus, ReservationStatus, UserType},
        reservation::ReserveBook,
        user::CreateUser,
    },
    repository::Repository,
    services::{email::Mailer, Services},
};

/// Mailer that always succeeds; delivery is out of scope here.
struct NullMailer;

#[async_trait::async_trait]
impl Mailer for NullMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> AppResult<()> {
        Ok(())
    }
}

fn services() -> (Services, Repository) {
    let repository = Repository::in_memory();
    let services = Services::new(
        repository.clone(),
        LendingConfig::default(),
        Arc::new(NullMailer),
    );
    (services, repository)
}

async fn seed_student(repository: &Repository, user_id: &str) {
    repository
        .users
        .create(
            &CreateUser {
                user_id: user_id.to_string(),
                user_type: UserType::Student,
                last_name: "Reyes".to_string(),
                first_name: "Ana".to_string(),
                email: format!("{}@example.edu", user_id),
                program: Some("BS Computer Science".to_string()),
                year_level: Some("3".to_string()),
            },
            Utc::now(),
        )
        .await
        .expect("student fixture");
}

async fn seed_book(repository: &Repository, title: &str, copies: i32) -> i32 {
    repository
        .books
        .create(
            &CreateBook {
                title: title.to_string(),
                author: "Frank Herbert".to_string(),
                category: "Science Fiction".to_string(),
                isbn: "9780441013593".to_string(),
                library_section: "Fiction".to_string(),
                shelf_location: "F-12".to_string(),
                total_copies: copies,
                book_condition: BookCondition::Good,
                year_published: 1965,
                description: None,
            },
            Utc::now(),
        )
        .await
        .expect("book fixture")
        .book_id
}

async fn borrow_at(
    services: &Services,
    user_id: &str,
    book_id: i32,
    at: DateTime<Utc>,
) -> Borrow {
    let reservation = services
        .reservations
        .reserve(
            ReserveBook {
                user_id: user_id.to_string(),
                book_id,
                preferred_pickup_date: at + Duration::days(1),
            },
            at,
        )
        .await
        .expect("reserve");
    services
        .reservations
        .approve(reservation.reservation_id, at)
        .await
        .expect("approve")
}

#[tokio::test]
async fn full_lifecycle_suspension_and_reinstatement() {
    let (services, repository) = services();
    seed_student(&repository, "S-1001").await;
    let book_id = seed_book(&repository, "Dune", 5).await;

    // Three loans, all left out past their due dates.
    let term_start = Utc::now() - Duration::days(60);
    let mut open_borrows = Vec::new();
    for i in 0..3 {
        let at = term_start + Duration::days(i * 14);
        open_borrows.push(borrow_at(&services, "S-1001", book_id, at).await);
    }

    let now = Utc::now();
    assert_eq!(services.sweeps.mark_overdue_borrows(now).await.unwrap(), 3);

    // Penalty sweep suspends the account at the threshold.
    assert_eq!(services.sweeps.evaluate_penalties(now).await.unwrap(), 1);
    let user = repository.users.get_by_id("S-1001").await.unwrap();
    assert!(!user.is_active);

    // Suspended users cannot reserve.
    let err = services
        .reservations
        .reserve(
            ReserveBook {
                user_id: "S-1001".to_string(),
                book_id,
                preferred_pickup_date: now + Duration::days(1),
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Returning every overdue copy restocks and clears the streak: the
    // most recent borrow becomes a return, and the walk stops there only
    // if that return was on time. An overdue return is still late, so we
    // return all three and then open and return one timely loan.
    for borrow in &open_borrows {
        services
            .borrows
            .return_borrow(
                borrow.borrow_id,
                ReturnBorrow {
                    condition_after: Some(BookCondition::Good),
                    penalty_amount: None,
                },
                now,
            )
            .await
            .unwrap();
    }
    let book = repository.books.get_by_id(book_id).await.unwrap();
    assert_eq!(book.available_copies, 5, "every copy back on the shelf");

    // Still suspended: the returns were all past due.
    let user = repository.users.get_by_id("S-1001").await.unwrap();
    assert!(!user.is_active);

    // Admin unblocks so the student can borrow again; a timely return then
    // keeps the account active through the next penalty sweep.
    services.users.unblock("S-1001", now).await.unwrap();
    let borrow = borrow_at(&services, "S-1001", book_id, now).await;
    services
        .borrows
        .return_borrow(
            borrow.borrow_id,
            ReturnBorrow {
                condition_after: None,
                penalty_amount: None,
            },
            now + Duration::days(2),
        )
        .await
        .unwrap();

    assert_eq!(services.sweeps.evaluate_penalties(now).await.unwrap(), 0);
    let user = repository.users.get_by_id("S-1001").await.unwrap();
    assert!(user.is_active);
}

#[tokio::test]
async fn expiry_sweep_closes_unapproved_reservations() {
    let (services, repository) = services();
    seed_student(&repository, "S-1001").await;
    let book_id = seed_book(&repository, "Dune", 1).await;

    let created_at = Utc::now() - Duration::days(2);
    let reservation = services
        .reservations
        .reserve(
            ReserveBook {
                user_id: "S-1001".to_string(),
                book_id,
                preferred_pickup_date: created_at + Duration::hours(2),
            },
            created_at,
        )
        .await
        .unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);

    assert_eq!(services.sweeps.expire_reservations(Utc::now()).await.unwrap(), 1);

    let stored = repository
        .reservations
        .get_by_id(reservation.reservation_id)
        .await
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Expired);

    // An expired reservation can never be approved.
    let err = services
        .reservations
        .approve(reservation.reservation_id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

/// Randomized walk over the whole surface: however the operations
/// interleave, the ledger invariant `0 <= available <= total` holds and the
/// final count equals total minus copies still out.
#[tokio::test]
async fn ledger_invariant_holds_under_random_interleaving() {
    let (services, repository) = services();
    let total_copies = 4;
    let book_id = seed_book(&repository, "Dune", total_copies).await;
    for i in 0..6 {
        seed_student(&repository, &format!("S-10{:02}", i)).await;
    }

    let mut rng = rand::thread_rng();
    let mut open: Vec<Borrow> = Vec::new();
    let users: Vec<String> = (0..6).map(|i| format!("S-10{:02}", i)).collect();

    for step in 0..200 {
        let now = Utc::now() + Duration::minutes(step);
        if rng.gen_bool(0.6) {
            let user_id = users.choose(&mut rng).unwrap().clone();
            let reserve = services
                .reservations
                .reserve(
                    ReserveBook {
                        user_id,
                        book_id,
                        preferred_pickup_date: now + Duration::days(1),
                    },
                    now,
                )
                .await;
            if let Ok(reservation) = reserve {
                match services.reservations.approve(reservation.reservation_id, now).await {
                    Ok(borrow) => open.push(borrow),
                    Err(AppError::OutOfStock(_)) => {}
                    Err(e) => panic!("unexpected approve error: {}", e),
                }
            }
        } else if !open.is_empty() {
            let idx = rng.gen_range(0..open.len());
            let borrow = open.swap_remove(idx);
            services
                .borrows
                .return_borrow(
                    borrow.borrow_id,
                    ReturnBorrow {
                        condition_after: None,
                        penalty_amount: None,
                    },
                    now,
                )
                .await
                .expect("open borrows return exactly once");
        }

        let book = repository.books.get_by_id(book_id).await.unwrap();
        assert!(book.available_copies >= 0);
        assert!(book.available_copies <= book.total_copies);
        assert_eq!(
            book.available_copies,
            total_copies - open.len() as i32,
            "ledger must equal total minus open borrows"
        );
    }
}

#[tokio::test]
async fn overdue_then_returned_row_keeps_final_status() {
    let (services, repository) = services();
    seed_student(&repository, "S-1001").await;
    let book_id = seed_book(&repository, "Dune", 1).await;

    let at = Utc::now() - Duration::days(20);
    let borrow = borrow_at(&services, "S-1001", book_id, at).await;
    services.sweeps.mark_overdue_borrows(Utc::now()).await.unwrap();

    let returned = services
        .borrows
        .return_borrow(
            borrow.borrow_id,
            ReturnBorrow {
                condition_after: Some(BookCondition::Fair),
                penalty_amount: Some(rust_decimal::Decimal::new(1500, 2)),
            },
            Utc::now(),
        )
        .await
        .unwrap();

    assert_eq!(returned.status, BorrowStatus::Returned);
    assert!(returned.return_date.unwrap() > returned.due_date);
    assert!(returned.is_late(), "late return still counts in penalty walks");
}
