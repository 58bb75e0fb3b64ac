//! Staff login (POST /api/v1/login)

#[allow(unused)]
mod support;

use axum::http::{Method, StatusCode};
use clinic::models::Role;
use serde_json::json;
use support::{
    assert_status, doctor_id, envelope, message, receptionist_id, TestApp, DOCTOR_EMAIL,
    RECEPTIONIST_EMAIL, STAFF_PASSWORD,
};

#[tokio::test]
async fn receptionist_login_issues_token_with_claims() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, _, body) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({
                "email": RECEPTIONIST_EMAIL,
                "password": STAFF_PASSWORD,
                "role": "receptionist",
            })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::OK, "login");

    let json = envelope(status, &body)?;
    assert_eq!(json["data"]["token_type"], "Bearer");
    assert_eq!(json["data"]["expires_in"], 30 * 60);

    let token = json["data"]["token"].as_str().unwrap_or_default();
    let claims = app.state.auth.verify(token)?;
    assert_eq!(claims.email, RECEPTIONIST_EMAIL);
    assert_eq!(claims.sub, RECEPTIONIST_EMAIL);
    assert_eq!(claims.userid, receptionist_id());
    assert_eq!(claims.role, Role::Receptionist);
    Ok(())
}

#[tokio::test]
async fn doctor_login_uses_doctor_credentials() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let token = app.doctor_token().await?;
    let claims = app.state.auth.verify(&token)?;
    assert_eq!(claims.userid, doctor_id());
    assert_eq!(claims.role, Role::Doctor);

    // A doctor's email is not a receptionist account.
    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({
                "email": DOCTOR_EMAIL,
                "password": STAFF_PASSWORD,
                "role": "receptionist",
            })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::UNAUTHORIZED, "wrong role");
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, _, wrong_password) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({
                "email": RECEPTIONIST_EMAIL,
                "password": "wrong",
                "role": "receptionist",
            })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::UNAUTHORIZED, "wrong password");
    let wrong_password = envelope(status, &wrong_password)?;

    let (status, _, unknown) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({
                "email": "nobody@clinic.test",
                "password": STAFF_PASSWORD,
                "role": "receptionist",
            })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::UNAUTHORIZED, "unknown email");
    let unknown = envelope(status, &unknown)?;

    assert_eq!(message(&wrong_password), message(&unknown));
    assert!(message(&unknown).contains("Incorrect email or password"));
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_a_bad_request() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({ "email": RECEPTIONIST_EMAIL, "password": STAFF_PASSWORD, "role": "admin" })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::BAD_REQUEST, "unknown role");

    let (status, _, _) = app
        .request(
            Method::POST,
            "/api/v1/login",
            Some(json!({ "email": "", "password": "", "role": "doctor" })),
            None,
        )
        .await?;
    assert_status(status, StatusCode::BAD_REQUEST, "empty credentials");
    Ok(())
}

#[tokio::test]
async fn issued_token_unlocks_protected_routes() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let token = app.receptionist_token().await?;

    let (status, _, _) = app
        .request(Method::GET, "/api/v1/patients", None, Some(&token))
        .await?;
    assert_status(status, StatusCode::OK, "list with token");

    let other_issuer = clinic::auth::AuthManager::new("another-secret", chrono::Duration::minutes(5));
    let forged = other_issuer.issue(receptionist_id(), RECEPTIONIST_EMAIL, Role::Receptionist)?;
    let (status, _, _) = app
        .request(Method::GET, "/api/v1/patients", None, Some(&forged))
        .await?;
    assert_status(status, StatusCode::UNAUTHORIZED, "token signed with another secret");
    Ok(())
}

#[tokio::test]
async fn unknown_email_takes_as_long_as_a_wrong_password() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let hash = tokio::task::spawn_blocking(|| bcrypt::hash(STAFF_PASSWORD, bcrypt::DEFAULT_COST))
        .await??;
    app.store
        .add_staff(uuid::Uuid::new_v4(), "slow@clinic.test", hash, Role::Receptionist)
        .await;

    let attempt = |email: &'static str| {
        app.request(
            Method::POST,
            "/api/v1/login",
            Some(json!({ "email": email, "password": "wrong", "role": "receptionist" })),
            None,
        )
    };

    // The first unknown-account login computes the shared comparison hash.
    attempt("warmup@clinic.test").await?;

    let started = std::time::Instant::now();
    let (status, _, _) = attempt("slow@clinic.test").await?;
    let known = started.elapsed();
    assert_status(status, StatusCode::UNAUTHORIZED, "known account, wrong password");

    let started = std::time::Instant::now();
    let (status, _, _) = attempt("nobody@clinic.test").await?;
    let unknown = started.elapsed();
    assert_status(status, StatusCode::UNAUTHORIZED, "unknown account");

    assert!(
        unknown * 10 > known,
        "unknown account answered in {unknown:?}, known account in {known:?}"
    );
    Ok(())
}
