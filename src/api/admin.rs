//! Admin maintenance endpoints: manual sweep triggers.
//!
//! Each endpoint runs one sweep pass inline with the request, independently
//! of the background scheduler. The sweeps are idempotent, so racing a
//! scheduled tick is harmless.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

/// Sweep outcome
#[derive(Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of rows the sweep acted on
    pub affected: usize,
}

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps/overdue",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse)
    )
)]
pub async fn run_overdue_sweep(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let affected = state.services.sweeps.mark_overdue_borrows(Utc::now()).await?;
    Ok(Json(SweepResponse { affected }))
}

/// Run the reservation expiry sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps/expiry",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse)
    )
)]
pub async fn run_expiry_sweep(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let affected = state.services.sweeps.expire_reservations(Utc::now()).await?;
    Ok(Json(SweepResponse { affected }))
}

/// Run the penalty evaluation sweep now
#[utoipa::path(
    post,
    path = "/admin/sweeps/penalties",
    tag = "admin",
    responses(
        (status = 200, description = "Sweep completed", body = SweepResponse)
    )
)]
pub async fn run_penalty_sweep(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let affected = state.services.sweeps.evaluate_penalties(Utc::now()).await?;
    Ok(Json(SweepResponse { affected }))
}
