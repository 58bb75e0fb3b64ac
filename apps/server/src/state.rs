//! Shared application state

use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::middleware::rate_limit::{build_rate_limiter, ServiceRateLimiter};
use crate::auth::AuthManager;
use crate::cache::{CacheBackend, RedisCache};
use crate::db::{ClinicStore, PostgresClinicStore};
use crate::services::{CredentialService, DoctorResolver, PatientService};
use crate::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthManager>,
    pub doctor_resolver: Arc<DoctorResolver>,
    pub patient_service: Arc<PatientService>,
    pub credential_service: Arc<CredentialService>,
    /// Shared by every request to this service; `None` when disabled
    pub rate_limiter: Option<Arc<ServiceRateLimiter>>,
    /// Present only with the PostgreSQL backend, for pool metrics
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Connect to PostgreSQL and Redis and build the services.
    ///
    /// The server starts without a cache if Redis cannot be reached.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = PostgresClinicStore::connect(&config.database)
            .await
            .context("Failed to connect to PostgreSQL")?;

        if config.database.run_migrations {
            store
                .run_migrations()
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }

        let cache: Option<Arc<dyn CacheBackend>> = if config.cache.enabled {
            match RedisCache::connect(&config.cache).await {
                Ok(cache) => {
                    tracing::info!("Connected to Redis");
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, doctor lookups will not be cached");
                    None
                }
            }
        } else {
            tracing::info!("Doctor cache disabled by configuration");
            None
        };

        let pool = store.pool().clone();
        let mut state = Self::with_backends(config, Arc::new(store), cache);
        state.db_pool = Some(pool);
        Ok(state)
    }

    /// Build the state over explicit backends.
    pub fn with_backends(
        config: Config,
        store: Arc<dyn ClinicStore>,
        cache: Option<Arc<dyn CacheBackend>>,
    ) -> Self {
        let config = Arc::new(config);
        let store_timeout = config.database.query_timeout();

        let doctor_resolver = Arc::new(DoctorResolver::new(
            store.clone(),
            cache,
            config.cache.doctor_ttl(),
            store_timeout,
            config.cache.timeout(),
        ));
        let patient_service = Arc::new(PatientService::new(
            store.clone(),
            doctor_resolver.clone(),
            store_timeout,
            &config.patients,
        ));
        let credential_service = Arc::new(CredentialService::new(store, store_timeout));
        let auth = Arc::new(AuthManager::new(
            &config.auth.jwt_secret,
            chrono::Duration::minutes(config.auth.token_ttl_minutes),
        ));

        Self {
            rate_limiter: build_rate_limiter(&config.rate_limit).map(Arc::new),
            config,
            auth,
            doctor_resolver,
            patient_service,
            credential_service,
            db_pool: None,
        }
    }
}
