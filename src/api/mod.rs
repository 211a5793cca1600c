//! API handlers for BookEase REST endpoints

pub mod admin;
pub mod books;
pub mod borrows;
pub mod health;
pub mod notifications;
pub mod openapi;
pub mod reservations;
pub mod users;
