//! Patient records, request bodies and field-level validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{Error, Result};

pub const MIN_AGE: i32 = 1;
pub const MAX_AGE: i32 = 124;
pub const CONTACT_DIGITS: usize = 10;

/// Lowest token the database hands out; tokens are always six digits.
pub const MIN_TOKEN_ID: i64 = 100_000;
pub const MAX_TOKEN_ID: i64 = 999_999;

/// Public patient identifier (six-digit number assigned by the store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(i64);

impl TokenId {
    pub fn new(value: i64) -> Result<Self> {
        if (MIN_TOKEN_ID..=MAX_TOKEN_ID).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Validation("Invalid token ID".to_string()))
        }
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl FromStr for TokenId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation("Invalid token ID".to_string()));
        }
        let value = s
            .parse::<i64>()
            .map_err(|_| Error::Validation("Invalid token ID".to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(Error::Validation(
                "gender must be one of following - ['male', 'female', 'other']".to_string(),
            )),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of create (POST) and full update (PUT) requests.
///
/// The doctor and staff references use the wire names `assigned_doctor` and
/// `registered_by`; `assigned_to` and `created_by` are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PatientRequest {
    #[validate(custom(function = "validate_fullname"))]
    pub fullname: String,

    #[validate(custom(function = "validate_gender"))]
    pub gender: String,

    #[validate(range(min = 1, max = 124, message = "age must be between 1 and 124"))]
    pub age: i32,

    #[validate(custom(function = "validate_contact"))]
    pub contact: String,

    #[serde(default)]
    pub symptoms: String,

    #[serde(default)]
    pub treatment: String,

    #[serde(rename = "assigned_doctor", alias = "assigned_to")]
    #[validate(custom(function = "validate_assigned_doctor"))]
    pub assigned_to: Uuid,

    #[serde(rename = "registered_by", alias = "created_by")]
    #[validate(custom(function = "validate_registered_by"))]
    pub created_by: Uuid,
}

/// Order in which field errors are reported, so messages are deterministic.
const FIELD_ORDER: [&str; 6] = [
    "fullname",
    "gender",
    "age",
    "contact",
    "assigned_to",
    "created_by",
];

impl PatientRequest {
    /// Decode a request body, mapping type mismatches to validation errors.
    pub fn from_json(body: &Map<String, JsonValue>) -> Result<Self> {
        serde_json::from_value(JsonValue::Object(body.clone()))
            .map_err(|e| Error::Validation(format!("Invalid patient request body: {e}")))
    }

    /// Validate every field and produce the typed insert model.
    pub fn into_new_patient(self) -> Result<NewPatient> {
        self.validate().map_err(|errors| first_error(&errors))?;
        Ok(NewPatient {
            fullname: self.fullname.trim().to_string(),
            gender: self.gender.parse()?,
            age: self.age,
            contact: self.contact,
            symptoms: self.symptoms,
            treatment: self.treatment,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
        })
    }
}

fn first_error(errors: &ValidationErrors) -> Error {
    let field_errors = errors.field_errors();
    let message = FIELD_ORDER
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .chain(field_errors.values())
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid patient request".to_string());
    Error::Validation(message)
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn validate_fullname(fullname: &str) -> std::result::Result<(), ValidationError> {
    if fullname.trim().is_empty() {
        return Err(rule("fullname", "fullname must not be empty"));
    }
    Ok(())
}

fn validate_gender(gender: &str) -> std::result::Result<(), ValidationError> {
    gender.parse::<Gender>().map(|_| ()).map_err(|_| {
        rule(
            "gender",
            "gender must be one of following - ['male', 'female', 'other']",
        )
    })
}

fn validate_contact(contact: &str) -> std::result::Result<(), ValidationError> {
    if contact.len() == CONTACT_DIGITS && contact.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    Err(rule("contact", "contact no must be of 10 digits"))
}

fn validate_assigned_doctor(id: &Uuid) -> std::result::Result<(), ValidationError> {
    if id.is_nil() {
        return Err(rule("assigned_doctor", "doctor needs to be assigned"));
    }
    Ok(())
}

fn validate_registered_by(id: &Uuid) -> std::result::Result<(), ValidationError> {
    if id.is_nil() {
        return Err(rule("registered_by", "receptionist needs to be assigned"));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<()> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(Error::Validation("age must be between 1 and 124".to_string()))
    }
}

/// A fully validated patient ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub fullname: String,
    pub gender: Gender,
    pub age: i32,
    pub contact: String,
    pub symptoms: String,
    pub treatment: String,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
}

/// The sparse set of columns an update touches. `None` means "keep the stored value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientChanges {
    pub fullname: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub contact: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

impl PatientChanges {
    /// Changes for a full update: every field carrying a meaningful value.
    ///
    /// Empty free-text fields are skipped so an omitted `symptoms` or
    /// `treatment` does not wipe the stored text.
    pub fn from_full(patient: &NewPatient) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            fullname: non_empty(&patient.fullname),
            gender: Some(patient.gender),
            age: (patient.age >= MIN_AGE).then_some(patient.age),
            contact: non_empty(&patient.contact),
            symptoms: non_empty(&patient.symptoms),
            treatment: non_empty(&patient.treatment),
            assigned_to: (!patient.assigned_to.is_nil()).then_some(patient.assigned_to),
            created_by: (!patient.created_by.is_nil()).then_some(patient.created_by),
        }
    }

    /// Changes for a partial update, keyed on which JSON keys the body carries.
    ///
    /// A key that is present is validated even when its value is the type's
    /// zero value; a key that is absent is left untouched. Unknown keys are ignored.
    pub fn from_partial(body: &Map<String, JsonValue>) -> Result<Self> {
        let mut changes = Self::default();

        if let Some(value) = body.get("fullname") {
            let fullname = as_string("fullname", value)?;
            validate_fullname(&fullname).map_err(Self::rule_error)?;
            changes.fullname = Some(fullname.trim().to_string());
        }
        if let Some(value) = body.get("gender") {
            changes.gender = Some(as_string("gender", value)?.parse()?);
        }
        if let Some(value) = body.get("age") {
            let age = value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| Error::Validation("age must be an integer".to_string()))?;
            validate_age(age)?;
            changes.age = Some(age);
        }
        if let Some(value) = body.get("contact") {
            let contact = as_string("contact", value)?;
            validate_contact(&contact).map_err(Self::rule_error)?;
            changes.contact = Some(contact);
        }
        if let Some(value) = body.get("symptoms") {
            changes.symptoms = Some(as_string("symptoms", value)?);
        }
        if let Some(value) = body.get("treatment") {
            changes.treatment = Some(as_string("treatment", value)?);
        }
        if let Some(value) = body.get("assigned_doctor").or_else(|| body.get("assigned_to")) {
            let id = as_uuid("assigned_doctor", value)?;
            validate_assigned_doctor(&id).map_err(Self::rule_error)?;
            changes.assigned_to = Some(id);
        }
        if let Some(value) = body.get("registered_by").or_else(|| body.get("created_by")) {
            let id = as_uuid("registered_by", value)?;
            validate_registered_by(&id).map_err(Self::rule_error)?;
            changes.created_by = Some(id);
        }

        Ok(changes)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn rule_error(err: ValidationError) -> Error {
        Error::Validation(
            err.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string()),
        )
    }
}

fn as_string(field: &str, value: &JsonValue) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Validation(format!("{field} must be a string")))
}

fn as_uuid(field: &str, value: &JsonValue) -> Result<Uuid> {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| Error::Validation(format!("{field} must be a valid UUID")))
}

/// A patient row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub token_id: TokenId,
    pub fullname: String,
    pub gender: Gender,
    pub age: i32,
    pub contact: String,
    pub symptoms: String,
    pub treatment: String,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A patient as returned to callers, with the assigned doctor's name resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientView {
    pub token_id: TokenId,
    pub fullname: String,
    pub gender: Gender,
    pub age: i32,
    pub contact: String,
    pub symptoms: String,
    pub treatment: String,
    /// Assigned doctor's full name; empty when it could not be resolved
    pub assigned_to: String,
    pub assigned_doctor_id: Uuid,
    pub registered_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientView {
    pub fn from_record(record: PatientRecord, doctor_name: String) -> Self {
        Self {
            token_id: record.token_id,
            fullname: record.fullname,
            gender: record.gender,
            age: record.age,
            contact: record.contact,
            symptoms: record.symptoms,
            treatment: record.treatment,
            assigned_to: doctor_name,
            assigned_doctor_id: record.assigned_to,
            registered_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// One page of patients plus the total number of matching rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientPage {
    #[serde(rename = "patients_data")]
    pub patients: Vec<PatientView>,
    #[serde(rename = "total_no_records")]
    pub total_records: i64,
}

/// Patient entry in the per-doctor listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorPatientSummary {
    pub token_id: TokenId,
    pub fullname: String,
    /// Assigned doctor's full name
    pub assigned_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPatientsPage {
    #[serde(rename = "patients_data")]
    pub patients: Vec<DoctorPatientSummary>,
    #[serde(rename = "total_no_records")]
    pub total_records: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    fn jane() -> JsonValue {
        json!({
            "fullname": "Jane Doe",
            "gender": "female",
            "age": 34,
            "contact": "9998887770",
            "assigned_doctor": Uuid::new_v4(),
            "registered_by": Uuid::new_v4(),
        })
    }

    #[test]
    fn token_id_requires_six_digits() {
        assert_eq!("123456".parse::<TokenId>().unwrap().value(), 123456);
        assert_eq!(" 100000 ".parse::<TokenId>().unwrap().value(), 100000);
        assert!("12345".parse::<TokenId>().is_err());
        assert!("1234567".parse::<TokenId>().is_err());
        assert!("12a456".parse::<TokenId>().is_err());
        assert!("012345".parse::<TokenId>().is_err());
    }

    #[test]
    fn full_request_validates_into_new_patient() {
        let patient = PatientRequest::from_json(&body(jane()))
            .unwrap()
            .into_new_patient()
            .unwrap();
        assert_eq!(patient.fullname, "Jane Doe");
        assert_eq!(patient.gender, Gender::Female);
        assert_eq!(patient.symptoms, "");
    }

    #[test]
    fn full_request_reports_first_failing_field() {
        let mut raw = jane();
        raw["fullname"] = json!("  ");
        raw["contact"] = json!("123");
        let err = PatientRequest::from_json(&body(raw))
            .unwrap()
            .into_new_patient()
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: fullname must not be empty");
    }

    #[test]
    fn full_request_rejects_bad_contact_and_age() {
        let mut raw = jane();
        raw["contact"] = json!("99988877ab");
        let err = PatientRequest::from_json(&body(raw))
            .unwrap()
            .into_new_patient()
            .unwrap_err();
        assert!(err.to_string().contains("10 digits"));

        let mut raw = jane();
        raw["age"] = json!(0);
        let err = PatientRequest::from_json(&body(raw))
            .unwrap()
            .into_new_patient()
            .unwrap_err();
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn full_request_rejects_nil_doctor() {
        let mut raw = jane();
        raw["assigned_doctor"] = json!(Uuid::nil());
        let err = PatientRequest::from_json(&body(raw))
            .unwrap()
            .into_new_patient()
            .unwrap_err();
        assert!(err.to_string().contains("doctor needs to be assigned"));
    }

    #[test]
    fn missing_required_key_is_a_validation_error() {
        let mut raw = jane();
        raw.as_object_mut().unwrap().remove("age");
        assert!(matches!(
            PatientRequest::from_json(&body(raw)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn partial_changes_follow_present_keys() {
        let changes = PatientChanges::from_partial(&body(json!({ "treatment": "rest" }))).unwrap();
        assert_eq!(changes.treatment.as_deref(), Some("rest"));
        assert!(changes.fullname.is_none());
        assert!(changes.age.is_none());
    }

    #[test]
    fn partial_present_zero_value_is_validated_not_skipped() {
        let err = PatientChanges::from_partial(&body(json!({ "age": 0 }))).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = PatientChanges::from_partial(&body(json!({ "fullname": "" }))).unwrap_err();
        assert!(err.to_string().contains("fullname"));
    }

    #[test]
    fn partial_explicit_empty_free_text_is_a_change() {
        let changes = PatientChanges::from_partial(&body(json!({ "symptoms": "" }))).unwrap();
        assert_eq!(changes.symptoms.as_deref(), Some(""));
        assert!(!changes.is_empty());
    }

    #[test]
    fn partial_unknown_keys_yield_empty_changes() {
        let changes = PatientChanges::from_partial(&body(json!({ "nickname": "JD" }))).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn partial_accepts_alias_keys() {
        let doctor = Uuid::new_v4();
        let changes =
            PatientChanges::from_partial(&body(json!({ "assigned_to": doctor }))).unwrap();
        assert_eq!(changes.assigned_to, Some(doctor));
    }

    #[test]
    fn full_changes_skip_empty_free_text() {
        let patient = PatientRequest::from_json(&body(jane()))
            .unwrap()
            .into_new_patient()
            .unwrap();
        let changes = PatientChanges::from_full(&patient);
        assert!(changes.symptoms.is_none());
        assert!(changes.treatment.is_none());
        assert_eq!(changes.age, Some(34));
        assert_eq!(changes.gender, Some(Gender::Female));
    }
}
