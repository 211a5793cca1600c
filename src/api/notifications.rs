//! Notification endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{error::AppResult, models::notification::Notification, AppState};

/// List a user's notifications
#[utoipa::path(
    get,
    path = "/users/{id}/notifications",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's notifications", body = Vec<Notification>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .services
        .notifications
        .get_user_notifications(&user_id)
        .await?;
    Ok(Json(notifications))
}

/// List a user's unread notifications
#[utoipa::path(
    get,
    path = "/users/{id}/notifications/unread",
    tag = "notifications",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's unread notifications", body = Vec<Notification>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_unread_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .services
        .notifications
        .get_unread_notifications(&user_id)
        .await?;
    Ok(Json(notifications))
}

/// Mark a notification as read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(
        ("id" = i64, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Notification marked read"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
) -> AppResult<StatusCode> {
    state
        .services
        .notifications
        .mark_read(notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
