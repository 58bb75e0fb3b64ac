//! In-memory implementation of [`ClinicStore`]
//!
//! Mirrors the PostgreSQL behavior the services rely on: token ids start at
//! 100000, negative offsets are rejected, foreign keys are checked, and an
//! update only counts a row when some column actually changes. Every update
//! statement is recorded and doctor fetches are counted so tests can assert
//! on store traffic.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{ClinicStore, Page, RecordPage};
use super::update::{BindValue, PatientColumn, UpdateStatement};
use crate::models::{
    Doctor, DoctorPatientSummary, Gender, NewPatient, PatientRecord, Role, StoredCredentials,
    TokenId,
};
use crate::models::patient::{MAX_TOKEN_ID, MIN_TOKEN_ID};
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct DoctorRow {
    doctor: Doctor,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct StaffRow {
    email: String,
    password_hash: String,
    role: String,
}

#[derive(Debug)]
struct Tables {
    doctors: HashMap<Uuid, DoctorRow>,
    staff: HashMap<Uuid, StaffRow>,
    patients: BTreeMap<i64, PatientRecord>,
    next_token: i64,
}

/// SQL text and parameters of an executed update, as captured by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedUpdate {
    pub sql: String,
    pub params: Vec<BindValue>,
}

#[derive(Debug)]
pub struct InMemoryClinicStore {
    tables: RwLock<Tables>,
    updates: RwLock<Vec<ExecutedUpdate>>,
    doctor_fetches: AtomicUsize,
    latency: Option<Duration>,
}

impl Default for InMemoryClinicStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                doctors: HashMap::new(),
                staff: HashMap::new(),
                patients: BTreeMap::new(),
                next_token: MIN_TOKEN_ID,
            }),
            updates: RwLock::new(Vec::new()),
            doctor_fetches: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Delay every call by `latency`, for exercising deadlines.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add_doctor(&self, id: Uuid, doctor: Doctor, password_hash: impl Into<String>) {
        self.tables.write().await.doctors.insert(
            id,
            DoctorRow {
                doctor,
                password_hash: password_hash.into(),
            },
        );
    }

    pub async fn add_staff(
        &self,
        id: Uuid,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) {
        self.tables.write().await.staff.insert(
            id,
            StaffRow {
                email: email.into(),
                password_hash: password_hash.into(),
                role: role.as_str().to_string(),
            },
        );
    }

    pub fn doctor_fetch_count(&self) -> usize {
        self.doctor_fetches.load(Ordering::SeqCst)
    }

    pub async fn executed_updates(&self) -> Vec<ExecutedUpdate> {
        self.updates.read().await.clone()
    }

    pub async fn patient_count(&self) -> usize {
        self.tables.read().await.patients.len()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_page(page: Page) -> Result<()> {
        if page.offset < 0 {
            return Err(Error::Validation("offset must not be negative".to_string()));
        }
        if page.limit < 0 {
            return Err(Error::Validation("limit must not be negative".to_string()));
        }
        Ok(())
    }

    fn check_references(tables: &Tables, assigned_to: Option<Uuid>, created_by: Option<Uuid>) -> Result<()> {
        let missing_doctor = assigned_to.is_some_and(|id| !tables.doctors.contains_key(&id));
        let missing_staff = created_by.is_some_and(|id| !tables.staff.contains_key(&id));
        if missing_doctor || missing_staff {
            return Err(Error::Validation(
                "assigned doctor or registering staff does not exist".to_string(),
            ));
        }
        Ok(())
    }

    fn window<T: Clone>(rows: &[T], page: Page) -> RecordPage<T> {
        let records: Vec<T> = rows
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        let total = if records.is_empty() {
            0
        } else {
            rows.len() as i64
        };
        RecordPage { records, total }
    }
}

/// Apply one assignment; returns whether the stored value changed.
fn apply(record: &mut PatientRecord, column: PatientColumn, value: &BindValue) -> Result<bool> {
    fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
        if *slot == value {
            false
        } else {
            *slot = value;
            true
        }
    }

    let mismatch = || Error::Internal(format!("Unexpected bind value for {}", column.as_str()));

    let changed = match (column, value) {
        (PatientColumn::Fullname, BindValue::Text(v)) => set(&mut record.fullname, v.clone()),
        (PatientColumn::Gender, BindValue::Text(v)) => set(&mut record.gender, v.parse::<Gender>()?),
        (PatientColumn::Age, BindValue::Int(v)) => set(&mut record.age, *v),
        (PatientColumn::Contact, BindValue::Text(v)) => set(&mut record.contact, v.clone()),
        (PatientColumn::Symptoms, BindValue::Text(v)) => set(&mut record.symptoms, v.clone()),
        (PatientColumn::Treatment, BindValue::Text(v)) => set(&mut record.treatment, v.clone()),
        (PatientColumn::AssignedTo, BindValue::Uuid(v)) => set(&mut record.assigned_to, *v),
        (PatientColumn::CreatedBy, BindValue::Uuid(v)) => set(&mut record.created_by, *v),
        _ => return Err(mismatch()),
    };
    Ok(changed)
}

#[async_trait]
impl ClinicStore for InMemoryClinicStore {
    async fn fetch_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        self.simulate_latency().await;
        self.doctor_fetches.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        Ok(tables.doctors.get(&doctor_id).map(|row| row.doctor.clone()))
    }

    async fn fetch_credentials(&self, role: Role, email: &str) -> Result<Option<StoredCredentials>> {
        self.simulate_latency().await;
        let tables = self.tables.read().await;
        let found = match role {
            Role::Doctor => tables
                .doctors
                .iter()
                .find(|(_, row)| row.doctor.email == email)
                .map(|(id, row)| StoredCredentials {
                    id: *id,
                    email: row.doctor.email.clone(),
                    password_hash: row.password_hash.clone(),
                }),
            Role::Receptionist => tables
                .staff
                .iter()
                .find(|(_, row)| row.role == "receptionist" && row.email == email)
                .map(|(id, row)| StoredCredentials {
                    id: *id,
                    email: row.email.clone(),
                    password_hash: row.password_hash.clone(),
                }),
        };
        Ok(found)
    }

    async fn list_patients(&self, page: Page) -> Result<RecordPage<PatientRecord>> {
        self.simulate_latency().await;
        Self::check_page(page)?;
        let tables = self.tables.read().await;
        let mut rows: Vec<PatientRecord> = tables.patients.values().cloned().collect();
        rows.sort_by_key(|r| (r.created_at, r.token_id));
        Ok(Self::window(&rows, page))
    }

    async fn list_patients_by_doctor(
        &self,
        doctor_id: Uuid,
        page: Page,
    ) -> Result<RecordPage<DoctorPatientSummary>> {
        self.simulate_latency().await;
        Self::check_page(page)?;
        let tables = self.tables.read().await;
        let Some(doctor) = tables.doctors.get(&doctor_id) else {
            return Ok(RecordPage::empty());
        };

        let mut rows: Vec<&PatientRecord> = tables
            .patients
            .values()
            .filter(|r| r.assigned_to == doctor_id)
            .collect();
        rows.sort_by_key(|r| (r.created_at, r.token_id));

        let summaries: Vec<DoctorPatientSummary> = rows
            .into_iter()
            .map(|r| DoctorPatientSummary {
                token_id: r.token_id,
                fullname: r.fullname.clone(),
                assigned_to: doctor.doctor.fullname.clone(),
            })
            .collect();
        Ok(Self::window(&summaries, page))
    }

    async fn find_patient(&self, token_id: TokenId) -> Result<Option<PatientRecord>> {
        self.simulate_latency().await;
        Ok(self
            .tables
            .read()
            .await
            .patients
            .get(&token_id.value())
            .cloned())
    }

    async fn insert_patient(&self, patient: &NewPatient) -> Result<TokenId> {
        self.simulate_latency().await;
        let mut tables = self.tables.write().await;
        Self::check_references(&tables, Some(patient.assigned_to), Some(patient.created_by))?;

        if tables.next_token > MAX_TOKEN_ID {
            return Err(Error::Validation("patient token range exhausted".to_string()));
        }
        let token_id = TokenId::new(tables.next_token)?;
        tables.next_token += 1;

        let now = Utc::now();
        tables.patients.insert(
            token_id.value(),
            PatientRecord {
                token_id,
                fullname: patient.fullname.clone(),
                gender: patient.gender,
                age: patient.age,
                contact: patient.contact.clone(),
                symptoms: patient.symptoms.clone(),
                treatment: patient.treatment.clone(),
                assigned_to: patient.assigned_to,
                created_by: patient.created_by,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(token_id)
    }

    async fn execute_update(&self, statement: &UpdateStatement) -> Result<u64> {
        self.simulate_latency().await;
        let (sql, params) = statement.build_sql();
        self.updates
            .write()
            .await
            .push(ExecutedUpdate { sql, params });

        let mut tables = self.tables.write().await;

        let new_doctor = statement.assignments().iter().find_map(|a| match a.value {
            BindValue::Uuid(id) if a.column == PatientColumn::AssignedTo => Some(id),
            _ => None,
        });
        let new_staff = statement.assignments().iter().find_map(|a| match a.value {
            BindValue::Uuid(id) if a.column == PatientColumn::CreatedBy => Some(id),
            _ => None,
        });
        Self::check_references(&tables, new_doctor, new_staff)?;

        let Some(stored) = tables.patients.get(&statement.token_id().value()) else {
            return Ok(0);
        };

        // Work on a copy so a failed assignment leaves the row untouched.
        let mut record = stored.clone();
        let mut changed = false;
        for assignment in statement.assignments() {
            changed |= apply(&mut record, assignment.column, &assignment.value)?;
        }
        if !changed {
            return Ok(0);
        }

        record.updated_at = Utc::now();
        tables.patients.insert(record.token_id.value(), record);
        Ok(1)
    }

    async fn delete_patient(&self, token_id: TokenId) -> Result<u64> {
        self.simulate_latency().await;
        let removed = self
            .tables
            .write()
            .await
            .patients
            .remove(&token_id.value());
        Ok(u64::from(removed.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientChanges;

    fn doctor(name: &str) -> Doctor {
        let now = Utc::now();
        Doctor {
            fullname: name.to_string(),
            email: format!("{}@clinic.test", name.to_lowercase().replace(' ', ".")),
            specialization: "General".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded() -> (InMemoryClinicStore, Uuid, Uuid) {
        let store = InMemoryClinicStore::new();
        let doctor_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        store.add_doctor(doctor_id, doctor("Ada Smith"), "").await;
        store
            .add_staff(staff_id, "desk@clinic.test", "", Role::Receptionist)
            .await;
        (store, doctor_id, staff_id)
    }

    fn patient(doctor_id: Uuid, staff_id: Uuid) -> NewPatient {
        NewPatient {
            fullname: "Jane Doe".to_string(),
            gender: Gender::Female,
            age: 34,
            contact: "9998887770".to_string(),
            symptoms: String::new(),
            treatment: String::new(),
            assigned_to: doctor_id,
            created_by: staff_id,
        }
    }

    #[tokio::test]
    async fn tokens_start_at_six_digits() {
        let (store, doctor_id, staff_id) = seeded().await;
        let first = store.insert_patient(&patient(doctor_id, staff_id)).await.unwrap();
        let second = store.insert_patient(&patient(doctor_id, staff_id)).await.unwrap();
        assert_eq!(first.value(), 100000);
        assert_eq!(second.value(), 100001);
    }

    #[tokio::test]
    async fn insert_rejects_unknown_doctor() {
        let (store, _, staff_id) = seeded().await;
        let err = store
            .insert_patient(&patient(Uuid::new_v4(), staff_id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn identical_update_touches_no_rows() {
        let (store, doctor_id, staff_id) = seeded().await;
        let token = store.insert_patient(&patient(doctor_id, staff_id)).await.unwrap();

        let changes = PatientChanges {
            treatment: Some("rest".to_string()),
            ..Default::default()
        };
        let stmt = UpdateStatement::build(token, &changes).unwrap();
        assert_eq!(store.execute_update(&stmt).await.unwrap(), 1);
        assert_eq!(store.execute_update(&stmt).await.unwrap(), 0);
        assert_eq!(store.executed_updates().await.len(), 2);
    }

    #[tokio::test]
    async fn negative_offset_is_rejected() {
        let (store, _, _) = seeded().await;
        let err = store
            .list_patients(Page {
                limit: 10,
                offset: -1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn empty_page_reports_zero_total() {
        let (store, doctor_id, staff_id) = seeded().await;
        store.insert_patient(&patient(doctor_id, staff_id)).await.unwrap();

        let page = store
            .list_patients(Page {
                limit: 10,
                offset: 5,
            })
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total, 0);
    }
}
