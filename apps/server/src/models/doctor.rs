//! Doctor profiles as stored and cached

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Doctor profile. This is also the JSON payload stored under `doctor:id:<uuid>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub fullname: String,
    pub email: String,
    pub specialization: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of resolving a doctor id.
///
/// A missing doctor is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DoctorLookup {
    Found(Doctor),
    NotFound,
}

impl DoctorLookup {
    /// Display name, empty when the doctor is unknown.
    pub fn display_name(&self) -> String {
        match self {
            DoctorLookup::Found(doctor) => doctor.fullname.clone(),
            DoctorLookup::NotFound => String::new(),
        }
    }
}
