//! Campus Library Management System
//!
//! A Rust REST backend for a campus library: book and journal cataloguing
//! with rack locations, borrow-record lifecycle (issue, return, fines,
//! extensions), seat check-in/check-out tracking, and notifications.

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
