//! Business services: doctor resolution, patient records and staff login
//!
//! Services own the deadlines for every store and cache call, so any
//! [`ClinicStore`](crate::db::ClinicStore) or
//! [`CacheBackend`](crate::cache::CacheBackend) implementation is bounded the same way.

pub mod credentials;
pub mod doctor;
pub mod patient;

pub use credentials::CredentialService;
pub use doctor::DoctorResolver;
pub use patient::PatientService;

use std::future::Future;
use std::time::Duration;

use crate::error::Dependency;
use crate::metrics::DEPENDENCY_TIMEOUTS_TOTAL;
use crate::{Error, Result};

/// Run `fut`, failing with [`Error::DependencyTimeout`] if it outlives `after`.
pub async fn with_deadline<T, F>(dependency: Dependency, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            DEPENDENCY_TIMEOUTS_TOTAL
                .with_label_values(&[&dependency.to_string()])
                .inc();
            tracing::warn!(%dependency, timeout = ?after, "Dependency call timed out");
            Err(Error::DependencyTimeout { dependency, after })
        }
    }
}
