//! Clinic server
//!
//! REST backend for a small clinic: staff log in with email and password,
//! receptionists register patients, doctors read and update them. Doctor
//! profiles are resolved through a Redis cache-aside layer in front of
//! PostgreSQL.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
