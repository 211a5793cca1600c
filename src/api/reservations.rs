//! Reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::Borrow,
        reservation::{Reservation, ReserveBook},
    },
    AppState,
};

/// Place a book reservation
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = ReserveBook,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Duplicate pending reservation or no copies available"),
        (status = 422, description = "Account suspended")
    )
)]
pub async fn reserve_book(
    State(state): State<AppState>,
    Json(request): Json<ReserveBook>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reservation = state
        .services
        .reservations
        .reserve(request, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// List pending reservations (admin review queue)
#[utoipa::path(
    get,
    path = "/reservations/pending",
    tag = "reservations",
    responses(
        (status = 200, description = "Pending reservations", body = Vec<Reservation>)
    )
)]
pub async fn list_pending(State(state): State<AppState>) -> AppResult<Json<Vec<Reservation>>> {
    let pending = state.services.reservations.list_pending().await?;
    Ok(Json(pending))
}

/// Approve a pending reservation, opening the paired borrow
#[utoipa::path(
    post,
    path = "/reservations/{id}/approve",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 201, description = "Borrow opened", body = Borrow),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "No copies available"),
        (status = 422, description = "Reservation is not pending")
    )
)]
pub async fn approve_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    let borrow = state
        .services
        .reservations
        .approve(reservation_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Decline a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/disapprove",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation declined", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Reservation is not pending")
    )
)]
pub async fn disapprove_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state
        .services
        .reservations
        .disapprove(reservation_id, Utc::now())
        .await?;
    Ok(Json(reservation))
}

/// List a user's reservations
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "reservations",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's reservations", body = Vec<Reservation>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_reservations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state
        .services
        .reservations
        .get_user_reservations(&user_id)
        .await?;
    Ok(Json(reservations))
}
