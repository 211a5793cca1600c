//! Account management: creation, lookup, manual unblock and the
//! semester-end bulk disable.

use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        enums::UserType,
        user::{CreateUser, User},
    },
    repository::Repository,
    services::notifications::NotificationsService,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    notifications: NotificationsService,
}

impl UsersService {
    pub fn new(repository: Repository, notifications: NotificationsService) -> Self {
        Self {
            repository,
            notifications,
        }
    }

    pub async fn create_user(&self, request: CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        let user = self.repository.users.create(&request, now).await?;
        tracing::info!(user_id = %user.user_id, user_type = %user.user_type, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await
    }

    /// Manual admin override of a suspension. Note the next penalty sweep
    /// re-suspends the account if its streak still meets the threshold.
    pub async fn unblock(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<User> {
        self.repository.users.set_active(user_id, true).await?;
        tracing::info!(user_id, "account manually reactivated");
        self.notifications
            .notify_best_effort(user_id, "AccountActivated", &[], now)
            .await;
        self.repository.users.get_by_id(user_id).await
    }

    /// Semester-end bulk disable of every active student account. Skips
    /// per-user notifications: reactivation is done in bulk at enrollment.
    pub async fn disable_all_students(&self) -> AppResult<u64> {
        let disabled = self
            .repository
            .users
            .disable_all_active(UserType::Student)
            .await?;
        tracing::info!(disabled, "student accounts disabled for the term");
        Ok(disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{error::AppError, services::email::MockMailer};

    fn student(user_id: &str) -> CreateUser {
        CreateUser {
            user_id: user_id.to_string(),
            user_type: UserType::Student,
            last_name: "Reyes".to_string(),
            first_name: "Ana".to_string(),
            email: format!("{}@example.edu", user_id),
            program: Some("BS Computer Science".to_string()),
            year_level: Some("2".to_string()),
        }
    }

    async fn service() -> (UsersService, Repository) {
        let repository = Repository::in_memory();
        let mut mailer = MockMailer::new();
        mailer.expect_send().returning(|_, _, _| Ok(()));
        let notifications = NotificationsService::new(repository.clone(), Arc::new(mailer));
        (
            UsersService::new(repository.clone(), notifications),
            repository,
        )
    }

    #[tokio::test]
    async fn new_accounts_start_active() {
        let (service, _repository) = service().await;
        let user = service.create_user(student("S-1001"), Utc::now()).await.unwrap();
        assert!(user.is_active);
        assert_eq!(user.full_name(), "Ana Reyes");
    }

    #[tokio::test]
    async fn duplicate_user_id_is_a_conflict() {
        let (service, _repository) = service().await;
        service.create_user(student("S-1001"), Utc::now()).await.unwrap();

        let err = service
            .create_user(student("S-1001"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unblock_reactivates_and_notifies() {
        let (service, repository) = service().await;
        service.create_user(student("S-1001"), Utc::now()).await.unwrap();
        repository.users.set_active("S-1001", false).await.unwrap();

        let user = service.unblock("S-1001", Utc::now()).await.unwrap();
        assert!(user.is_active);

        let notifications = repository.notifications.list_for_user("S-1001").await.unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn unblock_unknown_user_is_not_found() {
        let (service, _repository) = service().await;
        let err = service.unblock("S-9999", Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn bulk_disable_only_touches_active_students() {
        let (service, repository) = service().await;
        service.create_user(student("S-1001"), Utc::now()).await.unwrap();
        service.create_user(student("S-1002"), Utc::now()).await.unwrap();
        repository.users.set_active("S-1002", false).await.unwrap();
        service
            .create_user(
                CreateUser {
                    user_id: "A-0001".to_string(),
                    user_type: UserType::Admin,
                    last_name: "Santos".to_string(),
                    first_name: "Lea".to_string(),
                    email: "lea@example.edu".to_string(),
                    program: None,
                    year_level: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let disabled = service.disable_all_students().await.unwrap();
        assert_eq!(disabled, 1, "already-inactive students are not recounted");

        let admin = repository.users.get_by_id("A-0001").await.unwrap();
        assert!(admin.is_active, "admins are never bulk-disabled");
    }
}
