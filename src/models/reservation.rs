//! Reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::ReservationStatus;

/// Reservation model from database.
///
/// A user may hold at most one `Pending` reservation per book at a time.
/// `expires_at` is derived at creation from the preferred pickup date plus
/// the configured hold window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub reservation_id: i32,
    pub user_id: String,
    pub book_id: i32,
    pub preferred_pickup_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// Reserve book request (user action surface)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReserveBook {
    #[validate(length(min = 1, max = 20))]
    pub user_id: String,
    pub book_id: i32,
    pub preferred_pickup_date: DateTime<Utc>,
}

/// Fields for a new reservation row, computed by the reservation state
/// machine before insert.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: String,
    pub book_id: i32,
    pub preferred_pickup_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}
