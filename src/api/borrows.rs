//! Borrow endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppResult,
    models::borrow::{Borrow, ReturnBorrow},
    AppState,
};

/// Record the return of a borrowed copy
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "borrows",
    params(
        ("id" = i32, Path, description = "Borrow ID")
    ),
    request_body = ReturnBorrow,
    responses(
        (status = 200, description = "Copy returned", body = Borrow),
        (status = 404, description = "Borrow not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    Path(borrow_id): Path<i32>,
    Json(request): Json<ReturnBorrow>,
) -> AppResult<Json<Borrow>> {
    let borrow = state
        .services
        .borrows
        .return_borrow(borrow_id, request, Utc::now())
        .await?;
    Ok(Json(borrow))
}

/// Get a single borrow record
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    params(
        ("id" = i32, Path, description = "Borrow ID")
    ),
    responses(
        (status = 200, description = "Borrow details", body = Borrow),
        (status = 404, description = "Borrow not found")
    )
)]
pub async fn get_borrow(
    State(state): State<AppState>,
    Path(borrow_id): Path<i32>,
) -> AppResult<Json<Borrow>> {
    let borrow = state.services.borrows.get_borrow(borrow_id).await?;
    Ok(Json(borrow))
}

/// List a user's borrow history, most recent first
#[utoipa::path(
    get,
    path = "/users/{id}/borrows",
    tag = "borrows",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's borrows", body = Vec<Borrow>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_borrows(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Borrow>>> {
    let borrows = state.services.borrows.get_user_borrows(&user_id).await?;
    Ok(Json(borrows))
}

/// List a user's borrows still out on loan, soonest due first
#[utoipa::path(
    get,
    path = "/users/{id}/borrows/active",
    tag = "borrows",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's active borrows", body = Vec<Borrow>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_active_borrows(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Borrow>>> {
    let borrows = state.services.borrows.get_active_borrows(&user_id).await?;
    Ok(Json(borrows))
}
