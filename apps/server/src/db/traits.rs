//! Storage trait for the clinic backend
//!
//! Any backend (PostgreSQL, in-memory for tests) implements [`ClinicStore`].
//! Services hold it as `Arc<dyn ClinicStore>` and apply their own deadlines.

use async_trait::async_trait;
use uuid::Uuid;

use super::update::UpdateStatement;
use crate::{
    models::{
        Doctor, DoctorPatientSummary, NewPatient, PatientRecord, Role, StoredCredentials, TokenId,
    },
    Result,
};

/// Limit/offset window, already normalized by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// One page of rows plus the window-function total of the whole result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage<T> {
    pub records: Vec<T>,
    /// Zero when the page is empty, even if earlier pages had rows
    pub total: i64,
}

impl<T> RecordPage<T> {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
        }
    }
}

#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Read one doctor profile.
    ///
    /// # Returns
    /// * `Ok(Some(doctor))` - Row found
    /// * `Ok(None)` - No doctor with this id
    async fn fetch_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>>;

    /// Look up login credentials in the table selected by `role`.
    async fn fetch_credentials(&self, role: Role, email: &str) -> Result<Option<StoredCredentials>>;

    /// List patients ordered by creation time.
    ///
    /// A negative offset is rejected with a validation error.
    async fn list_patients(&self, page: Page) -> Result<RecordPage<PatientRecord>>;

    /// List the patients assigned to one doctor, with the doctor's name joined in.
    async fn list_patients_by_doctor(
        &self,
        doctor_id: Uuid,
        page: Page,
    ) -> Result<RecordPage<DoctorPatientSummary>>;

    async fn find_patient(&self, token_id: TokenId) -> Result<Option<PatientRecord>>;

    /// Insert a patient in its own transaction and return the assigned token.
    async fn insert_patient(&self, patient: &NewPatient) -> Result<TokenId>;

    /// Execute a sparse update in its own transaction.
    ///
    /// # Returns
    /// Rows affected; zero when the token does not exist or nothing changed.
    async fn execute_update(&self, statement: &UpdateStatement) -> Result<u64>;

    /// Delete a patient in its own transaction and return rows affected.
    async fn delete_patient(&self, token_id: TokenId) -> Result<u64>;
}
