//! BookEase Server - Library Lending System
//!
//! REST API server plus the background sweep scheduler.

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookease_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{email::SmtpMailer, scheduler, Services},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookease_server={},tower_http=debug", config.logging.level).into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting BookEase Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::postgres(pool);
    let mailer = Arc::new(SmtpMailer::new(config.email.clone()));
    let services = Services::new(repository, config.lending.clone(), mailer);

    // Start the background sweep scheduler
    let scheduler_handle = if config.scheduler.enabled {
        Some(scheduler::start(services.sweeps.clone(), &config.scheduler))
    } else {
        tracing::warn!("scheduler disabled, sweeps must be triggered manually");
        None
    };

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the sweeps after the last request has drained.
    if let Some(handle) = scheduler_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        // Users
        .route("/users", post(api::users::create_user))
        .route("/users/disable-all", post(api::users::disable_all_students))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id/unblock", post(api::users::unblock_user))
        .route("/users/:id/reservations", get(api::reservations::get_user_reservations))
        .route("/users/:id/borrows", get(api::borrows::get_user_borrows))
        .route("/users/:id/borrows/active", get(api::borrows::get_active_borrows))
        .route("/users/:id/notifications", get(api::notifications::get_user_notifications))
        .route("/users/:id/notifications/unread", get(api::notifications::get_unread_notifications))
        // Reservations
        .route("/reservations", post(api::reservations::reserve_book))
        .route("/reservations/pending", get(api::reservations::list_pending))
        .route("/reservations/:id/approve", post(api::reservations::approve_reservation))
        .route("/reservations/:id/disapprove", post(api::reservations::disapprove_reservation))
        // Borrows
        .route("/borrows/:id", get(api::borrows::get_borrow))
        .route("/borrows/:id/return", post(api::borrows::return_borrow))
        // Notifications
        .route("/notifications/:id/read", post(api::notifications::mark_notification_read))
        // Admin sweep triggers
        .route("/admin/sweeps/overdue", post(api::admin::run_overdue_sweep))
        .route("/admin/sweeps/expiry", post(api::admin::run_expiry_sweep))
        .route("/admin/sweeps/penalties", post(api::admin::run_penalty_sweep))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
