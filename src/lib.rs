//! BookEase Library Lending Server
//!
//! A Rust implementation of the BookEase lending lifecycle engine,
//! providing a REST JSON API for reservations, borrows, penalties and
//! notifications, with background sweepers for overdue and expiry handling.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
