//! Notifications repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::notification::Notification,
    repository::NotificationStore,
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationsRepository {
    async fn insert_if_absent(
        &self,
        user_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        // The unique index on (user_id, message) makes dedup a storage
        // guarantee rather than a check-then-insert race.
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, message, is_read, created_at)
            VALUES ($1, $2, false, $3)
            ON CONFLICT (user_id, message) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn list_unread(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND NOT is_read
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn mark_read(&self, notification_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE notification_id = $1",
        )
        .bind(notification_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Notification with id {} not found",
                notification_id
            )));
        }
        Ok(())
    }
}
