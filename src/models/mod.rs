//! Data models for the BookEase server

pub mod book;
pub mod borrow;
pub mod enums;
pub mod notification;
pub mod reservation;
pub mod user;
