//! Notification dispatcher: renders templates, stores in-app rows exactly
//! once per (user, message) pair, and mirrors them out by email best-effort.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{enums::UserType, notification::Notification},
    repository::Repository,
    services::{email::Mailer, templates},
};

const EMAIL_SUBJECT: &str = "BookEase Library Notification";

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    mailer: Arc<dyn Mailer>,
}

impl NotificationsService {
    pub fn new(repository: Repository, mailer: Arc<dyn Mailer>) -> Self {
        Self { repository, mailer }
    }

    /// Render `template_key` and deliver it to the user. The in-app row is
    /// the durable copy: a duplicate of an existing (user, message) pair is
    /// suppressed, and an email failure is logged but never propagated.
    pub async fn notify(
        &self,
        user_id: &str,
        template_key: &str,
        params: &[(&str, String)],
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let message = templates::render(template_key, params)?;

        let inserted = self
            .repository
            .notifications
            .insert_if_absent(user_id, &message, now)
            .await?;

        if !inserted {
            tracing::debug!(user_id, template_key, "duplicate notification suppressed");
            return Ok(());
        }

        match self.repository.users.get_by_id(user_id).await {
            Ok(user) => {
                if let Err(e) = self.mailer.send(&user.email, EMAIL_SUBJECT, &message).await {
                    tracing::warn!(user_id, error = %e, "email delivery failed");
                }
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "could not load user for email delivery");
            }
        }

        Ok(())
    }

    /// State transitions never fail because a notification could not be
    /// written; this variant logs instead of propagating.
    pub async fn notify_best_effort(
        &self,
        user_id: &str,
        template_key: &str,
        params: &[(&str, String)],
        now: DateTime<Utc>,
    ) {
        if let Err(e) = self.notify(user_id, template_key, params, now).await {
            tracing::error!(user_id, template_key, error = %e, "notification failed");
        }
    }

    /// Broadcast a message to every admin account.
    pub async fn notify_admins(
        &self,
        template_key: &str,
        params: &[(&str, String)],
        now: DateTime<Utc>,
    ) {
        let admins = match self.repository.users.list_by_type(UserType::Admin).await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::error!(template_key, error = %e, "could not load admins for broadcast");
                return;
            }
        };
        for admin in admins {
            self.notify_best_effort(&admin.user_id, template_key, params, now)
                .await;
        }
    }

    pub async fn get_user_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.notifications.list_for_user(user_id).await
    }

    pub async fn get_unread_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.notifications.list_unread(user_id).await
    }

    pub async fn mark_read(&self, notification_id: i64) -> AppResult<()> {
        self.repository.notifications.mark_read(notification_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{enums::UserType, user::CreateUser},
        services::email::MockMailer,
    };

    async fn service_with_mailer(mailer: MockMailer) -> NotificationsService {
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
        NotificationsService::new(repository, Arc::new(mailer))
    }

    #[tokio::test]
    async fn identical_notify_twice_stores_one_row() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_, _, _| Ok(()));
        let service = service_with_mailer(mailer).await;
        let now = Utc::now();
        let params = [("BookTitle", "Dune".to_string())];

        service
            .notify("S-1001", "ReservationPending", &params, now)
            .await
            .expect("first notify");
        service
            .notify("S-1001", "ReservationPending", &params, now)
            .await
            .expect("duplicate notify is still Ok");

        let stored = service.get_user_notifications("S-1001").await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_notify() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_, _, _| Err(AppError::Internal("smtp down".to_string())));
        let service = service_with_mailer(mailer).await;

        service
            .notify(
                "S-1001",
                "BookReturned",
                &[("BookTitle", "Dune".to_string())],
                Utc::now(),
            )
            .await
            .expect("notify must not propagate email failures");

        let stored = service.get_user_notifications("S-1001").await.unwrap();
        assert_eq!(stored.len(), 1, "in-app row is the durable copy");
    }

    #[tokio::test]
    async fn unknown_template_is_rejected_before_storing() {
        let service = service_with_mailer(MockMailer::new()).await;
        let err = service
            .notify("S-1001", "NoSuchTemplate", &[], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TemplateNotFound(_)));
        let stored = service.get_user_notifications("S-1001").await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn mark_read_flips_the_flag() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_, _, _| Ok(()));
        let service = service_with_mailer(mailer).await;
        let now = Utc::now();

        service
            .notify(
                "S-1001",
                "BookReturned",
                &[("BookTitle", "Dune".to_string())],
                now,
            )
            .await
            .unwrap();

        let unread = service.get_unread_notifications("S-1001").await.unwrap();
        assert_eq!(unread.len(), 1);

        service.mark_read(unread[0].notification_id).await.unwrap();
        let unread = service.get_unread_notifications("S-1001").await.unwrap();
        assert!(unread.is_empty());
    }
}
