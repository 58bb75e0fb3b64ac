//! Authentication primitives.
//!
//! Staff log in with email and password; the server issues an HS256 JWT that
//! protected routes validate on every request.

use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::Role, state::AppState, Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub userid: Uuid,
    pub role: Role,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AuthManager {
    pub fn new(secret: &str, token_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            email: email.to_string(),
            userid: user_id,
            role,
            sub: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    pub fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Claims> {
        let authz = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| Error::Unauthorized("Authorization header required".to_string()))?;

        let authz = authz.to_str().map_err(|_| {
            Error::Unauthorized("Authorization header is not valid UTF-8".to_string())
        })?;

        let token = authz
            .strip_prefix("Bearer ")
            .or_else(|| authz.strip_prefix("bearer "))
            .ok_or_else(|| {
                Error::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
            })?;

        self.verify(token.trim())
            .map_err(|_| Error::Unauthorized("Invalid token".to_string()))
    }
}

lazy_static::lazy_static! {
    /// Compared against when an account does not exist, so unknown and known
    /// emails cost the same bcrypt round.
    static ref UNKNOWN_ACCOUNT_HASH: String =
        bcrypt::hash("clinic-unknown-account", bcrypt::DEFAULT_COST).unwrap_or_default();
}

/// The hash actually compared: the stored one, or the unknown-account hash when empty.
fn comparison_hash(stored: &str) -> (String, bool) {
    if stored.is_empty() {
        (UNKNOWN_ACCOUNT_HASH.clone(), false)
    } else {
        (stored.to_string(), true)
    }
}

/// Check a password against a bcrypt hash. An empty or malformed hash never matches,
/// but an empty one still runs a full comparison.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || {
        let (hash, account_exists) = comparison_hash(&hash);
        bcrypt::verify(password, &hash).map(|matches| matches && account_exists)
    })
    .await;

    match verified {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

/// Claims of the caller, inserted by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                Error::Unauthorized("Authorization header required".to_string()).into_response()
            })
    }
}

/// Middleware for protected routes: attach `Claims` or reject with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if req.method() == axum::http::Method::OPTIONS {
        return next.run(req).await;
    }

    match state.auth.authenticate_headers(req.headers()) {
        Ok(claims) => {
            tracing::Span::current().record("user_id", tracing::field::display(claims.userid));
            req.extensions_mut().insert::<Claims>(claims);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(path = %req.uri().path(), error = %err, "Rejected unauthenticated request");
            let mut response = err.into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
    }
}
