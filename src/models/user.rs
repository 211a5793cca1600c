//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::UserType;

/// User model from database.
///
/// `is_active` is the suspension flag: it is written only by the penalty
/// evaluator and the admin block/unblock operations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub user_id: String,
    pub user_type: UserType,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub program: Option<String>,
    pub year_level: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 20))]
    pub user_id: String,
    pub user_type: UserType,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(email)]
    pub email: String,
    pub program: Option<String>,
    pub year_level: Option<String>,
}
