//! Cache-aside doctor lookup
//!
//! Reads `doctor:id:<uuid>` from the cache first, falls back to the store on
//! a miss and writes the row back with a TTL. A cache that is down or slow
//! behaves like a miss; a payload that cannot be decoded is an error.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::with_deadline;
use crate::cache::{doctor_key, CacheBackend};
use crate::db::ClinicStore;
use crate::error::Dependency;
use crate::metrics::{DOCTOR_CACHE_LOOKUPS_TOTAL, DOCTOR_CACHE_WRITES_TOTAL};
use crate::models::{Doctor, DoctorLookup};
use crate::{Error, Result};

pub struct DoctorResolver {
    store: Arc<dyn ClinicStore>,
    cache: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
    store_timeout: Duration,
    cache_timeout: Duration,
}

impl DoctorResolver {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        cache: Option<Arc<dyn CacheBackend>>,
        ttl: Duration,
        store_timeout: Duration,
        cache_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            ttl,
            store_timeout,
            cache_timeout,
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Resolve a doctor by id.
    ///
    /// # Returns
    /// * `Ok(DoctorLookup::Found(_))` - from the cache or the store
    /// * `Ok(DoctorLookup::NotFound)` - no such doctor
    ///
    /// # Errors
    /// * `CacheCorrupt` - cached payload is not a valid doctor
    /// * `DependencyTimeout` / `Database` - the store failed
    #[tracing::instrument(skip(self), fields(cache_key = tracing::field::Empty))]
    pub async fn resolve(&self, doctor_id: Uuid) -> Result<DoctorLookup> {
        let key = doctor_key(doctor_id);
        tracing::Span::current().record("cache_key", key.as_str());

        if let Some(cache) = &self.cache {
            if let Some(doctor) = self.read_cache(cache.as_ref(), &key).await? {
                return Ok(DoctorLookup::Found(doctor));
            }
        }

        let row = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.fetch_doctor(doctor_id),
        )
        .await?;

        let Some(doctor) = row else {
            tracing::debug!(%doctor_id, "Doctor not found");
            return Ok(DoctorLookup::NotFound);
        };

        if let Some(cache) = &self.cache {
            self.populate(cache.as_ref(), &key, &doctor).await;
        }

        Ok(DoctorLookup::Found(doctor))
    }

    /// `Ok(None)` on a miss or when the cache cannot be reached.
    async fn read_cache(&self, cache: &dyn CacheBackend, key: &str) -> Result<Option<Doctor>> {
        let payload = match with_deadline(Dependency::Cache, self.cache_timeout, cache.get(key)).await
        {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                DOCTOR_CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
                return Ok(None);
            }
            Err(e) => {
                DOCTOR_CACHE_LOOKUPS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(cache_key = key, error = %e, "Cache read failed, falling back to store");
                return Ok(None);
            }
        };

        match serde_json::from_str::<Doctor>(&payload) {
            Ok(doctor) => {
                DOCTOR_CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
                Ok(Some(doctor))
            }
            Err(e) => {
                DOCTOR_CACHE_LOOKUPS_TOTAL.with_label_values(&["corrupt"]).inc();
                Err(Error::CacheCorrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn populate(&self, cache: &dyn CacheBackend, key: &str, doctor: &Doctor) {
        let payload = match serde_json::to_string(doctor) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "Failed to encode doctor for cache");
                return;
            }
        };

        match with_deadline(
            Dependency::Cache,
            self.cache_timeout,
            cache.set(key, &payload, self.ttl),
        )
        .await
        {
            Ok(()) => {
                DOCTOR_CACHE_WRITES_TOTAL.with_label_values(&["ok"]).inc();
            }
            Err(e) => {
                DOCTOR_CACHE_WRITES_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(cache_key = key, error = %e, "Failed to populate doctor cache");
            }
        }
    }
}
