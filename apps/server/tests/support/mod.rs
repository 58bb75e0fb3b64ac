pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use clinic::{
    api::create_router,
    cache::{CacheBackend, InMemoryCache},
    db::InMemoryClinicStore,
    models::Role,
    AppState, Config,
};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryClinicStore>,
    pub cache: Arc<InMemoryCache>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        Self::with_cache(configure, InMemoryCache::new()).await
    }

    /// Build the app over a caller-supplied cache (slow, unavailable, pre-seeded).
    pub async fn with_cache(
        configure: impl FnOnce(&mut Config),
        cache: InMemoryCache,
    ) -> anyhow::Result<Self> {
        init_tracing();

        let mut config = base_config();
        configure(&mut config);

        let store = Arc::new(InMemoryClinicStore::new());
        seed(&store).await?;

        let cache = Arc::new(cache);
        let backend: Option<Arc<dyn CacheBackend>> = if config.cache.enabled {
            Some(cache.clone())
        } else {
            None
        };

        let state = AppState::with_backends(config, store.clone(), backend);
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            store,
            cache,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = builder
            .body(match body {
                Some(json) => Body::from(serde_json::to_vec(&json)?),
                None => Body::empty(),
            })
            .context("build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> anyhow::Result<String> {
        let (status, _, body) = self
            .request(
                Method::POST,
                "/api/v1/login",
                Some(serde_json::json!({
                    "email": email,
                    "password": password,
                    "role": role.as_str(),
                })),
                None,
            )
            .await?;
        assert_status(status, StatusCode::OK, "login");

        let json: Value = serde_json::from_slice(&body)?;
        json["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response carries data.token")
    }

    pub async fn receptionist_token(&self) -> anyhow::Result<String> {
        self.login(RECEPTIONIST_EMAIL, STAFF_PASSWORD, Role::Receptionist)
            .await
    }

    pub async fn doctor_token(&self) -> anyhow::Result<String> {
        self.login(DOCTOR_EMAIL, STAFF_PASSWORD, Role::Doctor).await
    }

    /// Register Jane Doe and return her token id.
    pub async fn create_jane_doe(&self, token: &str) -> anyhow::Result<i64> {
        let (status, _, body) = self
            .request(Method::POST, "/api/v1/patients", Some(jane_doe()), Some(token))
            .await?;
        assert_status(status, StatusCode::CREATED, "create patient");
        created_token(&envelope(status, &body)?)
    }
}

fn base_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.rate_limit.enabled = false;
    config.database.query_timeout_seconds = 5;
    config.cache.timeout_seconds = 1;
    config
}

fn init_tracing() {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
