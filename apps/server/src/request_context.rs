//! Per-request context injected by `request_id_middleware`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Server-assigned id, also returned in `x-request-id`
    pub request_id: String,
    /// Id the client sent in `x-request-id`, when it differs from ours
    pub correlation_id: Option<String>,
}

/// Falls back to an empty context on routers mounted without the middleware.
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
