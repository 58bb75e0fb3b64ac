//! PostgreSQL transaction wrapper for patient writes
//!
//! Every write runs in its own transaction: begin, execute, then commit on
//! success or roll back on error. A failed rollback is logged and never
//! replaces the error that caused it.

use sqlx::{PgPool, Postgres, Row, Transaction};

use super::store::map_db_error;
use super::update::{BindValue, UpdateStatement};
use crate::metrics::QueryTimer;
use crate::models::{NewPatient, TokenId};
use crate::{Error, Result};

pub struct PatientTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PatientTransaction {
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await.map_err(Error::Database)?;
        Ok(Self { tx: Some(tx) })
    }

    pub async fn insert(&mut self, patient: &NewPatient) -> Result<TokenId> {
        let _timer = QueryTimer::start("insert_patient");
        let tx = self.tx_mut()?;

        let row = sqlx::query(
            r#"
            INSERT INTO patient (
                fullname, gender, age, contact, symptoms, treatment, assigned_to, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING token_id
            "#,
        )
        .bind(&patient.fullname)
        .bind(patient.gender.as_str())
        .bind(patient.age)
        .bind(&patient.contact)
        .bind(&patient.symptoms)
        .bind(&patient.treatment)
        .bind(patient.assigned_to)
        .bind(patient.created_by)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_error)?;

        let token_id: i64 = row.get("token_id");
        TokenId::new(token_id)
            .map_err(|_| Error::Internal(format!("Database assigned out-of-range token {token_id}")))
    }

    pub async fn execute_update(&mut self, statement: &UpdateStatement) -> Result<u64> {
        let _timer = QueryTimer::start("update_patient");
        let (sql, bind_values) = statement.build_sql();
        let tx = self.tx_mut()?;

        let mut query = sqlx::query(&sql);
        for value in bind_values {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::Int(v) => query.bind(v),
                BindValue::BigInt(v) => query.bind(v),
                BindValue::Uuid(v) => query.bind(v),
            };
        }

        let result = query.execute(&mut **tx).await.map_err(map_db_error)?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&mut self, token_id: TokenId) -> Result<u64> {
        let _timer = QueryTimer::start("delete_patient");
        let tx = self.tx_mut()?;

        let result = sqlx::query("DELETE FROM patient WHERE token_id = $1")
            .bind(token_id.value())
            .execute(&mut **tx)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    pub async fn commit(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Transaction already committed".to_string()))?;

        tx.commit().await.map_err(Error::Database)
    }

    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("Transaction already rolled back".to_string()))?;

        tx.rollback().await.map_err(Error::Database)
    }

    /// Commit when `result` is Ok, roll back otherwise.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(e) = self.commit().await {
                    tracing::error!(error = %e, "Failed to commit transaction");
                    return Err(e);
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        cause = %err,
                        "Failed to roll back transaction"
                    );
                }
                Err(err)
            }
        }
    }

    fn tx_mut(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or_else(|| {
            Error::Internal("Transaction already committed or rolled back".to_string())
        })
    }
}
