//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::BookCondition;

/// Book model from database.
///
/// Invariant: `0 <= available_copies <= total_copies`. Both counters are
/// owned by the inventory ledger (`repository::books`) and must never be
/// written by any other code path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub category: String,
    pub isbn: String,
    pub library_section: String,
    pub shelf_location: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub book_condition: BookCondition,
    pub year_published: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 255))]
    pub author: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 20))]
    pub isbn: String,
    pub library_section: String,
    pub shelf_location: String,
    #[validate(range(min = 1))]
    pub total_copies: i32,
    pub book_condition: BookCondition,
    pub year_published: i32,
    pub description: Option<String>,
}
