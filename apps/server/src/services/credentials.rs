//! Staff credential lookup and login

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use super::with_deadline;
use crate::auth::{verify_password, AuthManager};
use crate::db::ClinicStore;
use crate::error::Dependency;
use crate::models::credentials::MISSING_CREDENTIALS;
use crate::models::{LoginRequest, LoginResponse, Role, StoredCredentials};
use crate::{Error, Result};

const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

pub struct CredentialService {
    store: Arc<dyn ClinicStore>,
    store_timeout: Duration,
}

impl CredentialService {
    pub fn new(store: Arc<dyn ClinicStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Credentials for `email` in the table selected by `role`.
    ///
    /// An unknown account yields a nil id and an empty hash, which never verifies.
    pub async fn resolve(&self, role: Role, email: &str) -> Result<StoredCredentials> {
        let found = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.fetch_credentials(role, email),
        )
        .await?;

        Ok(found.unwrap_or_else(|| StoredCredentials {
            id: Uuid::nil(),
            email: email.to_string(),
            password_hash: String::new(),
        }))
    }

    pub async fn login(&self, request: &LoginRequest, auth: &AuthManager) -> Result<LoginResponse> {
        let email = request.email.trim();
        if request.validate().is_err() || email.is_empty() {
            return Err(Error::Validation(MISSING_CREDENTIALS.to_string()));
        }
        let credentials = self.resolve(request.role, email).await?;

        if !verify_password(&request.password, &credentials.password_hash).await {
            tracing::info!(role = %request.role, "Login rejected");
            return Err(Error::Unauthorized(INCORRECT_CREDENTIALS.to_string()));
        }

        let token = auth.issue(credentials.id, &credentials.email, request.role)?;
        tracing::info!(user_id = %credentials.id, role = %request.role, "Login succeeded");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: auth.token_ttl().num_seconds(),
        })
    }
}
