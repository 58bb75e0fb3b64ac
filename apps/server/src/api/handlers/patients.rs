//! Patient record handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::api::extractors::{DoctorPath, JsonObject, Pagination, TokenPath};
use crate::api::response::ApiResponse;
use crate::auth::AuthenticatedUser;
use crate::models::WriteOutcome;
use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::{Error, Result};

const NOOP_UPDATE: &str = "No data present for provided token ID or data already exists";

/// GET /api/v1/patients
pub async fn list_patients(
    State(state): State<AppState>,
    pagination: Pagination,
) -> Result<impl IntoResponse> {
    let page = state
        .patient_service
        .list(pagination.limit, pagination.offset)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// GET /api/v1/patients/:token_id
pub async fn get_patient(
    State(state): State<AppState>,
    TokenPath(token_id): TokenPath,
) -> Result<impl IntoResponse> {
    let patient = state.patient_service.get_by_token(token_id).await?;
    Ok(ApiResponse::ok(patient))
}

/// GET /api/v1/doctors/:doctor_id/patients
pub async fn list_doctor_patients(
    State(state): State<AppState>,
    DoctorPath(doctor_id): DoctorPath,
    pagination: Pagination,
) -> Result<impl IntoResponse> {
    let page = state
        .patient_service
        .list_by_doctor(doctor_id, pagination.limit, pagination.offset)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// POST /api/v1/patients
pub async fn create_patient(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ctx: RequestContext,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse> {
    let token_id = state.patient_service.create(&body).await?;
    tracing::info!(
        %token_id,
        user_id = %claims.userid,
        request_id = %ctx.request_id,
        "Patient registered"
    );

    Ok(ApiResponse::with_status(
        StatusCode::CREATED,
        "patient data inserted into DB successfully!",
        json!({ "token_id": token_id }),
    ))
}

/// PUT /api/v1/patients/:token_id
pub async fn update_patient(
    State(state): State<AppState>,
    TokenPath(token_id): TokenPath,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse> {
    let outcome = state.patient_service.update(token_id, &body).await?;
    updated_response(outcome)
}

/// PATCH /api/v1/patients/:token_id
pub async fn patch_patient(
    State(state): State<AppState>,
    TokenPath(token_id): TokenPath,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse> {
    let outcome = state.patient_service.patch(token_id, &body).await?;
    updated_response(outcome)
}

/// DELETE /api/v1/patients/:token_id
pub async fn delete_patient(
    State(state): State<AppState>,
    TokenPath(token_id): TokenPath,
) -> Result<impl IntoResponse> {
    match state.patient_service.delete(token_id).await? {
        WriteOutcome::Applied { .. } => Ok(StatusCode::NO_CONTENT),
        WriteOutcome::NoOp => Err(Error::NoOpWrite(format!(
            "No patient with token ID {token_id}"
        ))),
    }
}

fn updated_response(outcome: WriteOutcome) -> Result<ApiResponse<()>> {
    match outcome {
        WriteOutcome::Applied { .. } => Ok(ApiResponse::message(
            StatusCode::OK,
            "Patient data updated successfully!",
        )),
        WriteOutcome::NoOp => Err(Error::NoOpWrite(NOOP_UPDATE.to_string())),
    }
}
