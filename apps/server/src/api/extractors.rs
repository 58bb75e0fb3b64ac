//! Custom Axum extractors.
//!
//! Rejections use the crate [`Error`] so malformed input gets the same
//! `{code, message}` envelope as every other validation failure.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::TokenId;
use crate::Error;

/// A JSON object body, kept as a raw map so handlers can see which keys were sent.
pub struct JsonObject(pub Map<String, JsonValue>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| Error::Validation(format!("Failed to read request body: {e}")))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Validation("Request body is empty".to_string()));
        }

        match serde_json::from_slice::<JsonValue>(&bytes) {
            Ok(JsonValue::Object(map)) => Ok(JsonObject(map)),
            Ok(_) => Err(Error::Validation(
                "Request body must be a JSON object".to_string(),
            )),
            Err(e) => Err(Error::Validation(format!("Invalid JSON body: {e}"))),
        }
    }
}

/// `limit` and `offset` query parameters; absent parameters are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_param(params: &HashMap<String, String>, name: &str) -> Result<Option<i64>, Error> {
    match params.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::Validation(format!("{name} must be an integer"))),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::Validation(format!("Invalid query string: {e}")))?;

        Ok(Pagination {
            limit: parse_param(&params, "limit")?,
            offset: parse_param(&params, "offset")?,
        })
    }
}

/// `:token_id` path segment, validated as a six-digit token.
pub struct TokenPath(pub TokenId);

#[async_trait]
impl<S> FromRequestParts<S> for TokenPath
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::Validation("Invalid token ID".to_string()))?;
        Ok(TokenPath(raw.parse()?))
    }
}

/// `:doctor_id` path segment, validated as a UUID.
pub struct DoctorPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for DoctorPath
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::Validation("Invalid doctor ID".to_string()))?;
        Uuid::parse_str(raw.trim())
            .map(DoctorPath)
            .map_err(|_| Error::Validation("Invalid doctor ID".to_string()))
    }
}
