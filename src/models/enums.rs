//! Shared domain enums (statuses carried over from the original schema)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a reservation. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "reservation_status")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Approved => "Approved",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Expired => "Expired",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BorrowStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a borrowed copy. `Pending` means currently held and not yet
/// due or returned; an `Overdue` copy is still out on loan until returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "borrow_status")]
pub enum BorrowStatus {
    Pending,
    Returned,
    Overdue,
    Damaged,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Pending => "Pending",
            BorrowStatus::Returned => "Returned",
            BorrowStatus::Overdue => "Overdue",
            BorrowStatus::Damaged => "Damaged",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserType
// ---------------------------------------------------------------------------

/// User account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "user_type")]
pub enum UserType {
    Admin,
    Student,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Admin => "Admin",
            UserType::Student => "Student",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(UserType::Admin),
            "Student" => Ok(UserType::Student),
            other => Err(format!("unknown user type: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// BookCondition
// ---------------------------------------------------------------------------

/// Physical condition of a copy, recorded before and after a borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "book_condition")]
pub enum BookCondition {
    New,
    Good,
    Fair,
    Poor,
    Damaged,
}

impl BookCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookCondition::New => "New",
            BookCondition::Good => "Good",
            BookCondition::Fair => "Fair",
            BookCondition::Poor => "Poor",
            BookCondition::Damaged => "Damaged",
        }
    }
}

impl std::fmt::Display for BookCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
