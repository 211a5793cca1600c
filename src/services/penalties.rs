//! Penalty evaluator: recomputes each user's suspension state from the
//! current borrow history instead of maintaining a persisted counter, so a
//! missed update is corrected on the next evaluation.

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{borrow::Borrow, enums::UserType},
    repository::Repository,
    services::notifications::NotificationsService,
};

#[derive(Clone)]
pub struct PenaltyService {
    repository: Repository,
    notifications: NotificationsService,
    threshold: usize,
}

/// Length of the current penalty streak: consecutive late borrows counted
/// from the most recent one, stopping at the first on-time borrow. A single
/// timely return therefore clears all older penalty history.
fn current_streak(borrows_recent_first: &[Borrow]) -> usize {
    let mut streak = 0;
    for borrow in borrows_recent_first {
        if borrow.is_late() {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

impl PenaltyService {
    pub fn new(
        repository: Repository,
        notifications: NotificationsService,
        threshold: usize,
    ) -> Self {
        Self {
            repository,
            notifications,
            threshold,
        }
    }

    /// Re-evaluate one user. Returns true when the user ends up suspended.
    pub async fn evaluate_user(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let user = self.repository.users.get_by_id(user_id).await?;
        let borrows = self
            .repository
            .borrows
            .list_for_user_recent_first(user_id)
            .await?;

        let suspend = current_streak(&borrows) >= self.threshold;

        if suspend && user.is_active {
            self.repository.users.set_active(user_id, false).await?;
            tracing::info!(user_id, "account suspended: penalty threshold reached");
            self.notifications
                .notify_best_effort(user_id, "AccountDeactivated", &[], now)
                .await;
        } else if !suspend && !user.is_active {
            self.repository.users.set_active(user_id, true).await?;
            tracing::info!(user_id, "account reinstated: penalty streak cleared");
            self.notifications
                .notify_best_effort(user_id, "AccountActivated", &[], now)
                .await;
        }

        Ok(suspend)
    }

    /// Evaluate every student account. One failing user never aborts the
    /// rest of the walk. Returns the number of suspended accounts.
    pub async fn evaluate_all(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let students = self.repository.users.list_by_type(UserType::Student).await?;
        let mut suspended = 0;
        for user in students {
            match self.evaluate_user(&user.user_id, now).await {
                Ok(true) => suspended += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(user_id = %user.user_id, error = %e, "penalty evaluation failed, continuing");
                }
            }
        }
        Ok(suspended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use rust_decimal::Decimal;

    use crate::{
        models::{
            borrow::Borrow,
            enums::{BookCondition, BorrowStatus, UserType},
            user::CreateUser,
        },
        repository::memory::MemoryStore,
        services::email::MockMailer,
    };

    fn borrow_fixture(user_id: &str, age_days: i64, status: BorrowStatus, late: bool) -> Borrow {
        let now = Utc::now();
        let borrow_date = now - Duration::days(age_days);
        let due_date = borrow_date + Duration::days(7);
        let return_date = match status {
            BorrowStatus::Returned => {
                // Late returns land one day past due; timely ones on the due date.
                Some(if late { due_date + Duration::days(1) } else { due_date })
            }
            _ => None,
        };
        Borrow {
            borrow_id: 0,
            reservation_id: 1,
            user_id: user_id.to_string(),
            book_id: 1,
            borrow_date,
            due_date,
            return_date,
            status,
            condition_before: BookCondition::Good,
            condition_after: None,
            penalty_amount: Decimal::ZERO,
        }
    }

    async fn service_with_history(history_recent_first: &[Borrow]) -> (PenaltyService, Repository) {
        let store = Arc::new(MemoryStore::new());
        let repository = Repository::from_memory(store.clone());
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
        for borrow in history_recent_first {
            store.insert_borrow_raw(borrow.clone());
        }
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_, _, _| Ok(()));
        let notifications = NotificationsService::new(repository.clone(), Arc::new(mailer));
        (
            PenaltyService::new(repository.clone(), notifications, 3),
            repository,
        )
    }

    #[tokio::test]
    async fn three_consecutive_overdues_suspend() {
        // Most recent first: [Overdue, Overdue, Overdue, Returned-on-time]
        let history = [
            borrow_fixture("S-1001", 10, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 20, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 30, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 40, BorrowStatus::Returned, false),
        ];
        let (service, repository) = service_with_history(&history).await;

        let suspended = service.evaluate_user("S-1001", Utc::now()).await.unwrap();
        assert!(suspended);
        let user = repository.users.get_by_id("S-1001").await.unwrap();
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn recent_timely_return_clears_older_overdues() {
        // Most recent first: [Returned-on-time, Overdue, Overdue, Overdue]
        let history = [
            borrow_fixture("S-1001", 10, BorrowStatus::Returned, false),
            borrow_fixture("S-1001", 20, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 30, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 40, BorrowStatus::Overdue, false),
        ];
        let (service, repository) = service_with_history(&history).await;
        repository.users.set_active("S-1001", false).await.unwrap();

        let suspended = service.evaluate_user("S-1001", Utc::now()).await.unwrap();
        assert!(!suspended);
        let user = repository.users.get_by_id("S-1001").await.unwrap();
        assert!(user.is_active, "suspension must lift once the streak resets");
    }

    #[tokio::test]
    async fn late_returns_count_toward_the_streak() {
        let history = [
            borrow_fixture("S-1001", 10, BorrowStatus::Returned, true),
            borrow_fixture("S-1001", 20, BorrowStatus::Returned, true),
            borrow_fixture("S-1001", 30, BorrowStatus::Overdue, false),
        ];
        let (service, _repository) = service_with_history(&history).await;

        let suspended = service.evaluate_user("S-1001", Utc::now()).await.unwrap();
        assert!(suspended);
    }

    #[tokio::test]
    async fn zero_borrows_always_reinstates() {
        let (service, repository) = service_with_history(&[]).await;
        repository.users.set_active("S-1001", false).await.unwrap();

        let suspended = service.evaluate_user("S-1001", Utc::now()).await.unwrap();
        assert!(!suspended);
        let user = repository.users.get_by_id("S-1001").await.unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn evaluate_all_skips_nothing_and_counts_suspensions() {
        let history = [
            borrow_fixture("S-1001", 10, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 20, BorrowStatus::Overdue, false),
            borrow_fixture("S-1001", 30, BorrowStatus::Overdue, false),
        ];
        let (service, repository) = service_with_history(&history).await;
        repository
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

        let suspended = service.evaluate_all(Utc::now()).await.unwrap();
        assert_eq!(suspended, 1);
    }
}
