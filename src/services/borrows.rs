//! Borrow state machine: Pending -> {Returned, Overdue -> Returned}

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::borrow::{Borrow, ReturnBorrow},
    repository::Repository,
    services::{notifications::NotificationsService, penalties::PenaltyService},
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
    notifications: NotificationsService,
    penalties: PenaltyService,
}

impl BorrowsService {
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

    /// Close out a borrow (admin action surface): record the return, restock
    /// the copy, then re-evaluate the borrower's penalty standing. The
    /// re-evaluation is what lifts a suspension after a timely return.
    pub async fn return_borrow(
        &self,
        borrow_id: i32,
        request: ReturnBorrow,
        now: DateTime<Utc>,
    ) -> AppResult<Borrow> {
        let returned = self
            .repository
            .borrows
            .complete_return(borrow_id, now, request.condition_after, request.penalty_amount)
            .await?;

        tracing::info!(
            borrow_id,
            user_id = %returned.user_id,
            book_id = returned.book_id,
            "borrow returned"
        );

        if let Ok(book) = self.repository.books.get_by_id(returned.book_id).await {
            self.notifications
                .notify_best_effort(
                    &returned.user_id,
                    "BookReturned",
                    &[("BookTitle", book.title)],
                    now,
                )
                .await;
        }

        if let Err(e) = self.penalties.evaluate_user(&returned.user_id, now).await {
            tracing::error!(user_id = %returned.user_id, error = %e, "post-return penalty evaluation failed");
        }

        Ok(returned)
    }

    pub async fn get_borrow(&self, borrow_id: i32) -> AppResult<Borrow> {
        self.repository.borrows.get_by_id(borrow_id).await
    }

    pub async fn get_user_borrows(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository
            .borrows
            .list_for_user_recent_first(user_id)
            .await
    }

    pub async fn get_active_borrows(&self, user_id: &str) -> AppResult<Vec<Borrow>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.borrows.list_active_for_user(user_id).await
    }
}
