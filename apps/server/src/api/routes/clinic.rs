//! Clinic API routes under `/api/v1`
//!
//! Login and the single-patient read are public. Everything else requires a
//! bearer token and is wrapped in `auth_middleware`.

use crate::api::handlers::{login, patients};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login::login))
        .route("/patients/:token_id", get(patients::get_patient))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:token_id",
            axum::routing::put(patients::update_patient)
                .patch(patients::patch_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/doctors/:doctor_id/patients",
            get(patients::list_doctor_patients),
        )
}
