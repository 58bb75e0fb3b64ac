//! Staff login handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::api::response::ApiResponse;
use crate::models::LoginRequest;
use crate::state::AppState;
use crate::{Error, Result};

/// POST /api/v1/login
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|e| Error::Validation(e.body_text()))?;
    let response = state
        .credential_service
        .login(&request, &state.auth)
        .await?;

    Ok(ApiResponse::with_status(
        StatusCode::OK,
        "Login successful",
        response,
    ))
}
