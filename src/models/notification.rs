//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// In-app notification. The `(user_id, message)` pair is unique: two
/// notifications with identical rendered text for the same user never
/// coexist (dedup by content).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
