//! Patient record service

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{with_deadline, DoctorResolver};
use crate::config::PatientsConfig;
use crate::db::{ClinicStore, Page, UpdateStatement};
use crate::error::Dependency;
use crate::metrics::DB_NOOP_WRITES_TOTAL;
use crate::models::{
    DoctorPatientsPage, PatientChanges, PatientPage, PatientRequest, PatientView, TokenId,
    WriteOutcome,
};
use crate::{Error, Result};

pub struct PatientService {
    store: Arc<dyn ClinicStore>,
    doctors: Arc<DoctorResolver>,
    store_timeout: Duration,
    default_page_size: i64,
    max_page_size: i64,
}

impl PatientService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        doctors: Arc<DoctorResolver>,
        store_timeout: Duration,
        paging: &PatientsConfig,
    ) -> Self {
        Self {
            store,
            doctors,
            store_timeout,
            default_page_size: paging.default_page_size,
            max_page_size: paging.max_page_size,
        }
    }

    /// Apply the default and the cap to `limit`. Offsets pass through unchanged.
    pub fn page(&self, limit: Option<i64>, offset: Option<i64>) -> Page {
        let limit = match limit {
            Some(l) if l > 0 => l.min(self.max_page_size),
            _ => self.default_page_size,
        };
        Page {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    pub async fn list(&self, limit: Option<i64>, offset: Option<i64>) -> Result<PatientPage> {
        let page = self.page(limit, offset);
        let rows = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.list_patients(page),
        )
        .await?;

        // Each distinct doctor is resolved once per page.
        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut patients = Vec::with_capacity(rows.records.len());
        for record in rows.records {
            let name = match names.get(&record.assigned_to) {
                Some(name) => name.clone(),
                None => {
                    let name = self.doctor_name(record.assigned_to).await;
                    names.insert(record.assigned_to, name.clone());
                    name
                }
            };
            patients.push(PatientView::from_record(record, name));
        }

        Ok(PatientPage {
            patients,
            total_records: rows.total,
        })
    }

    pub async fn list_by_doctor(
        &self,
        doctor_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<DoctorPatientsPage> {
        let page = self.page(limit, offset);
        let rows = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.list_patients_by_doctor(doctor_id, page),
        )
        .await?;

        Ok(DoctorPatientsPage {
            patients: rows.records,
            total_records: rows.total,
        })
    }

    pub async fn get_by_token(&self, token_id: TokenId) -> Result<PatientView> {
        let record = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.find_patient(token_id),
        )
        .await?
        .ok_or_else(|| Error::NotFound(format!("patient {token_id}")))?;

        let name = self.doctor_name(record.assigned_to).await;
        Ok(PatientView::from_record(record, name))
    }

    pub async fn create(&self, body: &Map<String, JsonValue>) -> Result<TokenId> {
        let patient = PatientRequest::from_json(body)?.into_new_patient()?;
        let token_id = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.insert_patient(&patient),
        )
        .await?;

        tracing::info!(%token_id, "Patient registered");
        Ok(token_id)
    }

    /// Full update: every field with a meaningful value is written.
    pub async fn update(
        &self,
        token_id: TokenId,
        body: &Map<String, JsonValue>,
    ) -> Result<WriteOutcome> {
        let patient = PatientRequest::from_json(body)?.into_new_patient()?;
        self.apply(token_id, &PatientChanges::from_full(&patient))
            .await
    }

    /// Partial update: only the keys present in `body` are written.
    pub async fn patch(
        &self,
        token_id: TokenId,
        body: &Map<String, JsonValue>,
    ) -> Result<WriteOutcome> {
        let changes = PatientChanges::from_partial(body)?;
        self.apply(token_id, &changes).await
    }

    pub async fn apply(&self, token_id: TokenId, changes: &PatientChanges) -> Result<WriteOutcome> {
        let statement = UpdateStatement::build(token_id, changes)?;
        let rows = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.execute_update(&statement),
        )
        .await?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome == WriteOutcome::NoOp {
            DB_NOOP_WRITES_TOTAL.with_label_values(&["update"]).inc();
            tracing::debug!(%token_id, "Update changed no rows");
        }
        Ok(outcome)
    }

    pub async fn delete(&self, token_id: TokenId) -> Result<WriteOutcome> {
        let rows = with_deadline(
            Dependency::Database,
            self.store_timeout,
            self.store.delete_patient(token_id),
        )
        .await?;

        let outcome = WriteOutcome::from_rows(rows);
        if outcome == WriteOutcome::NoOp {
            DB_NOOP_WRITES_TOTAL.with_label_values(&["delete"]).inc();
        } else {
            tracing::info!(%token_id, "Patient deleted");
        }
        Ok(outcome)
    }

    /// Doctor display name for a patient row; any failure yields an empty name.
    async fn doctor_name(&self, doctor_id: Uuid) -> String {
        match self.doctors.resolve(doctor_id).await {
            Ok(lookup) => lookup.display_name(),
            Err(e) => {
                tracing::warn!(%doctor_id, error = %e, "Could not resolve assigned doctor");
                String::new()
            }
        }
    }
}
