use chrono::Utc;
use clinic::{
    db::InMemoryClinicStore,
    models::{Doctor, Role},
};
use serde_json::{json, Value};
use std::sync::OnceLock;
use uuid::Uuid;

pub const STAFF_PASSWORD: &str = "correct horse";
pub const RECEPTIONIST_EMAIL: &str = "desk@clinic.test";
pub const DOCTOR_EMAIL: &str = "house@clinic.test";
pub const DOCTOR_NAME: &str = "Dr. Gregory House";

pub fn doctor_id() -> Uuid {
    Uuid::from_u128(0x0d0c_0000_0000_4000_8000_0000_0000_0001)
}

pub fn second_doctor_id() -> Uuid {
    Uuid::from_u128(0x0d0c_0000_0000_4000_8000_0000_0000_0002)
}

pub fn receptionist_id() -> Uuid {
    Uuid::from_u128(0x5afe_0000_0000_4000_8000_0000_0000_0001)
}

/// bcrypt at the minimum cost, computed once per test binary.
pub fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash(STAFF_PASSWORD, 4).expect("hash fixture password"))
}

pub fn doctor(fullname: &str, email: &str) -> Doctor {
    let now = Utc::now();
    Doctor {
        fullname: fullname.to_string(),
        email: email.to_string(),
        specialization: "Diagnostics".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed(store: &InMemoryClinicStore) -> anyhow::Result<()> {
    store
        .add_doctor(doctor_id(), doctor(DOCTOR_NAME, DOCTOR_EMAIL), password_hash())
        .await;
    store
        .add_doctor(
            second_doctor_id(),
            doctor("Dr. Lisa Cuddy", "cuddy@clinic.test"),
            password_hash(),
        )
        .await;
    store
        .add_staff(
            receptionist_id(),
            RECEPTIONIST_EMAIL,
            password_hash(),
            Role::Receptionist,
        )
        .await;
    Ok(())
}

pub fn jane_doe() -> Value {
    json!({
        "fullname": "Jane Doe",
        "gender": "female",
        "age": 34,
        "contact": "9876543210",
        "symptoms": "persistent cough",
        "treatment": "",
        "assigned_doctor": doctor_id(),
        "registered_by": receptionist_id(),
    })
}
