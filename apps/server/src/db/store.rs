//! PostgreSQL implementation of [`ClinicStore`]

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::time::Duration;
use uuid::Uuid;

use super::traits::{ClinicStore, Page, RecordPage};
use super::transaction::PatientTransaction;
use super::update::UpdateStatement;
use crate::config::DatabaseConfig;
use crate::metrics::{QueryTimer, DB_QUERY_ERRORS_TOTAL};
use crate::models::{
    Doctor, DoctorPatientSummary, NewPatient, PatientRecord, Role, StoredCredentials, TokenId,
};
use crate::{Error, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const PATIENT_COLUMNS: &str = "token_id, fullname, gender, age, contact, symptoms, treatment, \
                               assigned_to, created_by, created_at, updated_at";

/// Translate PostgreSQL errors caused by caller input into validation errors.
pub(crate) fn map_db_error(err: sqlx::Error) -> Error {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        // invalid_row_count_in_result_offset_clause / limit_clause
        Some("2201X") => Error::Validation("offset must not be negative".to_string()),
        Some("2201W") => Error::Validation("limit must not be negative".to_string()),
        Some("23503") => {
            Error::Validation("assigned doctor or registering staff does not exist".to_string())
        }
        Some("23514") => Error::Validation("patient fields violate a constraint".to_string()),
        Some("22P02") => Error::Validation("invalid input value".to_string()),
        _ => Error::Database(err),
    }
}

fn record_error(query_type: &str, err: &Error) {
    if matches!(err, Error::Database(_)) {
        DB_QUERY_ERRORS_TOTAL.with_label_values(&[query_type]).inc();
    }
}

#[derive(Debug, Clone)]
pub struct PostgresClinicStore {
    pool: PgPool,
}

impl PostgresClinicStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool sized from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min_size)
            .max_connections(config.pool_max_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(Error::Database)?;

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("Failed to run migrations: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn patient_from_row(row: &PgRow) -> Result<PatientRecord> {
        let token_id: i64 = row.get("token_id");
        let gender: String = row.get("gender");

        Ok(PatientRecord {
            token_id: TokenId::new(token_id)?,
            fullname: row.get("fullname"),
            gender: gender.parse()?,
            age: row.get("age"),
            contact: row.get("contact"),
            symptoms: row.get("symptoms"),
            treatment: row.get("treatment"),
            assigned_to: row.get("assigned_to"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl ClinicStore for PostgresClinicStore {
    async fn fetch_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        let _timer = QueryTimer::start("fetch_doctor");

        let row = sqlx::query(
            r#"
            SELECT fullname, email, specialization, created_at, updated_at
            FROM doctor
            WHERE doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)
        .inspect_err(|e| record_error("fetch_doctor", e))?;

        Ok(row.map(|row| Doctor {
            fullname: row.get("fullname"),
            email: row.get("email"),
            specialization: row.get("specialization"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn fetch_credentials(&self, role: Role, email: &str) -> Result<Option<StoredCredentials>> {
        let _timer = QueryTimer::start("fetch_credentials");

        let sql = match role {
            Role::Doctor => {
                "SELECT doctor_id AS id, email, password_hash FROM doctor WHERE email = $1"
            }
            Role::Receptionist => {
                "SELECT staff_id AS id, email, password_hash FROM staff \
                 WHERE role = 'receptionist' AND email = $1"
            }
        };

        let row = sqlx::query(sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
            .inspect_err(|e| record_error("fetch_credentials", e))?;

        Ok(row.map(|row| StoredCredentials {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn list_patients(&self, page: Page) -> Result<RecordPage<PatientRecord>> {
        let _timer = QueryTimer::start("list_patients");

        let sql = format!(
            "SELECT {PATIENT_COLUMNS}, count(*) OVER () AS total_records \
             FROM patient ORDER BY created_at, token_id LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&sql)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
            .inspect_err(|e| record_error("list_patients", e))?;

        let total = rows
            .first()
            .map(|row| row.get::<i64, _>("total_records"))
            .unwrap_or(0);
        let records = rows
            .iter()
            .map(Self::patient_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordPage { records, total })
    }

    async fn list_patients_by_doctor(
        &self,
        doctor_id: Uuid,
        page: Page,
    ) -> Result<RecordPage<DoctorPatientSummary>> {
        let _timer = QueryTimer::start("list_patients_by_doctor");

        let rows = sqlx::query(
            r#"
            SELECT p.token_id, p.fullname, d.fullname AS doctor_name,
                   count(*) OVER () AS total_records
            FROM patient p
            INNER JOIN doctor d ON p.assigned_to = d.doctor_id
            WHERE d.doctor_id = $1
            ORDER BY p.created_at, p.token_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(doctor_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
        .inspect_err(|e| record_error("list_patients_by_doctor", e))?;

        let total = rows
            .first()
            .map(|row| row.get::<i64, _>("total_records"))
            .unwrap_or(0);
        let records = rows
            .iter()
            .map(|row| {
                Ok(DoctorPatientSummary {
                    token_id: TokenId::new(row.get("token_id"))?,
                    fullname: row.get("fullname"),
                    assigned_to: row.get("doctor_name"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordPage { records, total })
    }

    async fn find_patient(&self, token_id: TokenId) -> Result<Option<PatientRecord>> {
        let _timer = QueryTimer::start("find_patient");

        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patient WHERE token_id = $1");
        let row = sqlx::query(&sql)
            .bind(token_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
            .inspect_err(|e| record_error("find_patient", e))?;

        row.as_ref().map(Self::patient_from_row).transpose()
    }

    async fn insert_patient(&self, patient: &NewPatient) -> Result<TokenId> {
        let mut tx = PatientTransaction::begin(&self.pool).await?;
        let result = tx.insert(patient).await;
        tx.finish(result)
            .await
            .inspect_err(|e| record_error("insert_patient", e))
    }

    async fn execute_update(&self, statement: &UpdateStatement) -> Result<u64> {
        let mut tx = PatientTransaction::begin(&self.pool).await?;
        let result = tx.execute_update(statement).await;
        tx.finish(result)
            .await
            .inspect_err(|e| record_error("update_patient", e))
    }

    async fn delete_patient(&self, token_id: TokenId) -> Result<u64> {
        let mut tx = PatientTransaction::begin(&self.pool).await?;
        let result = tx.delete(token_id).await;
        tx.finish(result)
            .await
            .inspect_err(|e| record_error("delete_patient", e))
    }
}
