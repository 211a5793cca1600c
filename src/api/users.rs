//! User account endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User},
    AppState,
};

/// Bulk disable response
#[derive(Serialize, ToSchema)]
pub struct DisableAllResponse {
    /// Number of accounts disabled
    pub disabled: u64,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user = state
        .services
        .users
        .create_user(request, chrono::Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user account
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(&user_id).await?;
    Ok(Json(user))
}

/// Reactivate a suspended account (admin override)
#[utoipa::path(
    post,
    path = "/users/{id}/unblock",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account reactivated", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn unblock_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state
        .services
        .users
        .unblock(&user_id, chrono::Utc::now())
        .await?;
    Ok(Json(user))
}

/// Disable every active student account (semester end)
#[utoipa::path(
    post,
    path = "/users/disable-all",
    tag = "users",
    responses(
        (status = 200, description = "Accounts disabled", body = DisableAllResponse)
    )
)]
pub async fn disable_all_students(
    State(state): State<AppState>,
) -> AppResult<Json<DisableAllResponse>> {
    let disabled = state.services.users.disable_all_students().await?;
    Ok(Json(DisableAllResponse { disabled }))
}
