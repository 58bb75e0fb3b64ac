//! Error types for the clinic server

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Default `Retry-After` for retryable errors; the rate limiter sets its own.
const RETRY_AFTER_SECONDS: &str = "1";

/// External services the store layer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Database,
    Cache,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::Database => f.write_str("database"),
            Dependency::Cache => f.write_str("cache"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Corrupt cache entry {key}: {reason}")]
    CacheCorrupt { key: String, reason: String },

    #[error("{dependency} did not respond within {after:?}")]
    DependencyTimeout {
        dependency: Dependency,
        after: Duration,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No rows affected: {0}")]
    NoOpWrite(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the caller may retry the same request later. Retryable
    /// responses carry a `Retry-After` header.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DependencyTimeout { .. } | Error::RateLimited)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NO_CONTENT,
            Error::NoOpWrite(_) => StatusCode::CONFLICT,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::DependencyTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Database(_)
            | Error::Cache(_)
            | Error::CacheCorrupt { .. }
            | Error::Internal(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<bb8_redis::redis::RedisError> for Error {
    fn from(err: bb8_redis::redis::RedisError) -> Self {
        Error::Cache(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Unauthorized(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let retryable = self.is_retryable();

        // Not-found reads answer with an empty body.
        if status == StatusCode::NO_CONTENT {
            tracing::debug!(error = %self, "Responding with empty body");
            return status.into_response();
        }

        let message = match &self {
            Error::Database(_)
            | Error::Cache(_)
            | Error::CacheCorrupt { .. }
            | Error::Internal(_)
            | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            Error::DependencyTimeout { .. } => {
                tracing::warn!(error = %self, "Dependency timed out");
                "Service temporarily unavailable, please retry".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));

        let mut response = (status, body).into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
        }
        response
    }
}
