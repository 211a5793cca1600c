//! Borrow (active loan) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{BookCondition, BorrowStatus};

/// Borrow model from database.
///
/// Invariant: `return_date` is set iff the copy has been handed back;
/// an `Overdue` row with `return_date IS NULL` is still out on loan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub borrow_id: i32,
    pub reservation_id: i32,
    pub user_id: String,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub condition_before: BookCondition,
    pub condition_after: Option<BookCondition>,
    #[schema(value_type = f64)]
    pub penalty_amount: Decimal,
}

impl Borrow {
    /// Whether this borrow counts as late for penalty evaluation: either
    /// flagged by the overdue sweeper, or returned after its due date.
    pub fn is_late(&self) -> bool {
        self.status == BorrowStatus::Overdue
            || self.return_date.map(|r| r > self.due_date).unwrap_or(false)
    }
}

/// Return borrow request (admin action surface)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnBorrow {
    pub condition_after: Option<BookCondition>,
    #[schema(value_type = Option<f64>)]
    pub penalty_amount: Option<Decimal>,
}
