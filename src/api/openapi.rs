//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, books, borrows, health, notifications, reservations, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BookEase API",
        version = "1.0.0",
        description = "Library lending lifecycle REST API",
        contact(name = "BookEase Team", email = "contact@bookease.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        // Users
        users::create_user,
        users::get_user,
        users::unblock_user,
        users::disable_all_students,
        // Reservations
        reservations::reserve_book,
        reservations::list_pending,
        reservations::approve_reservation,
        reservations::disapprove_reservation,
        reservations::get_user_reservations,
        // Borrows
        borrows::return_borrow,
        borrows::get_borrow,
        borrows::get_user_borrows,
        borrows::get_active_borrows,
        // Notifications
        notifications::get_user_notifications,
        notifications::get_unread_notifications,
        notifications::mark_notification_read,
        // Admin
        admin::run_overdue_sweep,
        admin::run_expiry_sweep,
        admin::run_penalty_sweep,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            users::DisableAllResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReserveBook,
            // Borrows
            crate::models::borrow::Borrow,
            crate::models::borrow::ReturnBorrow,
            // Notifications
            crate::models::notification::Notification,
            // Enums
            crate::models::enums::ReservationStatus,
            crate::models::enums::BorrowStatus,
            crate::models::enums::UserType,
            crate::models::enums::BookCondition,
            // Admin
            admin::SweepResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "User account management"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "borrows", description = "Borrow lifecycle"),
        (name = "notifications", description = "In-app notifications"),
        (name = "admin", description = "Manual sweep triggers")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
