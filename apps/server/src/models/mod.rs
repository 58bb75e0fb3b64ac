//! Domain models for the clinic server

pub mod credentials;
pub mod doctor;
pub mod patient;

pub use credentials::{LoginRequest, LoginResponse, Role, StoredCredentials};
pub use doctor::{Doctor, DoctorLookup};
pub use patient::{
    DoctorPatientSummary, DoctorPatientsPage, Gender, NewPatient, PatientChanges, PatientPage,
    PatientRecord, PatientRequest, PatientView, TokenId,
};

/// Result of a write that may legitimately touch zero rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied { rows: u64 },
    NoOp,
}

impl WriteOutcome {
    pub fn from_rows(rows: u64) -> Self {
        if rows == 0 {
            WriteOutcome::NoOp
        } else {
            WriteOutcome::Applied { rows }
        }
    }
}
