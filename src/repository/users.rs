//! Users repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::UserType,
        user::{CreateUser, User},
    },
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn get_by_id(&self, user_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }

    async fn create(&self, user: &CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                user_id, user_type, last_name, first_name, email,
                program, year_level, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, true, $8)
            RETURNING *
            "#,
        )
        .bind(&user.user_id)
        .bind(user.user_type)
        .bind(&user.last_name)
        .bind(&user.first_name)
        .bind(&user.email)
        .bind(&user.program)
        .bind(&user.year_level)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            // Duplicate user id or email; surface the same error kind the
            // in-memory store reports.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("User id {} already exists", user.user_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_active(&self, user_id: &str, active: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User with id {} not found",
                user_id
            )));
        }
        Ok(())
    }

    async fn list_by_type(&self, user_type: UserType) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE user_type = $1 ORDER BY user_id",
        )
        .bind(user_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn disable_all_active(&self, user_type: UserType) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET is_active = false WHERE user_type = $1 AND is_active",
        )
        .bind(user_type)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
