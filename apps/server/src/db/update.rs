//! Sparse patient UPDATE statement builder
//!
//! Only columns present in a [`PatientChanges`] are written. Each value is
//! bound as a positional parameter, never interpolated. The WHERE clause also
//! requires at least one column to actually differ, so re-sending identical
//! values affects zero rows.

use uuid::Uuid;

use crate::models::{PatientChanges, TokenId};
use crate::{Error, Result};

/// Updatable patient columns, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientColumn {
    Fullname,
    Gender,
    Age,
    Contact,
    Symptoms,
    Treatment,
    AssignedTo,
    CreatedBy,
}

impl PatientColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientColumn::Fullname => "fullname",
            PatientColumn::Gender => "gender",
            PatientColumn::Age => "age",
            PatientColumn::Contact => "contact",
            PatientColumn::Symptoms => "symptoms",
            PatientColumn::Treatment => "treatment",
            PatientColumn::AssignedTo => "assigned_to",
            PatientColumn::CreatedBy => "created_by",
        }
    }
}

/// Typed value bound to a positional parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: PatientColumn,
    pub value: BindValue,
}

/// A ready-to-execute UPDATE for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    token_id: TokenId,
    assignments: Vec<Assignment>,
}

fn push(bind_params: &mut Vec<BindValue>, value: BindValue) -> usize {
    bind_params.push(value);
    bind_params.len()
}

impl UpdateStatement {
    /// Build the statement, rejecting a change set that touches no column.
    pub fn build(token_id: TokenId, changes: &PatientChanges) -> Result<Self> {
        if changes.is_empty() {
            return Err(Error::Validation(
                "No fields provided to update".to_string(),
            ));
        }

        let mut assignments = Vec::new();
        let mut set = |column: PatientColumn, value: Option<BindValue>| {
            if let Some(value) = value {
                assignments.push(Assignment { column, value });
            }
        };

        set(
            PatientColumn::Fullname,
            changes.fullname.clone().map(BindValue::Text),
        );
        set(
            PatientColumn::Gender,
            changes.gender.map(|g| BindValue::Text(g.as_str().to_string())),
        );
        set(PatientColumn::Age, changes.age.map(BindValue::Int));
        set(
            PatientColumn::Contact,
            changes.contact.clone().map(BindValue::Text),
        );
        set(
            PatientColumn::Symptoms,
            changes.symptoms.clone().map(BindValue::Text),
        );
        set(
            PatientColumn::Treatment,
            changes.treatment.clone().map(BindValue::Text),
        );
        set(
            PatientColumn::AssignedTo,
            changes.assigned_to.map(BindValue::Uuid),
        );
        set(
            PatientColumn::CreatedBy,
            changes.created_by.map(BindValue::Uuid),
        );

        Ok(Self {
            token_id,
            assignments,
        })
    }

    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn columns(&self) -> Vec<PatientColumn> {
        self.assignments.iter().map(|a| a.column).collect()
    }

    /// SQL text and the values for its positional parameters, in order.
    pub fn build_sql(&self) -> (String, Vec<BindValue>) {
        let mut bind_params = Vec::with_capacity(self.assignments.len() + 1);
        let mut set_clauses = Vec::with_capacity(self.assignments.len());
        let mut changed_guards = Vec::with_capacity(self.assignments.len());

        for assignment in &self.assignments {
            let idx = push(&mut bind_params, assignment.value.clone());
            let column = assignment.column.as_str();
            set_clauses.push(format!("{column} = ${idx}"));
            changed_guards.push(format!("{column} IS DISTINCT FROM ${idx}"));
        }

        let token_idx = push(&mut bind_params, BindValue::BigInt(self.token_id.value()));

        let sql = format!(
            "UPDATE patient SET {}, updated_at = now() WHERE token_id = ${} AND ({})",
            set_clauses.join(", "),
            token_idx,
            changed_guards.join(" OR ")
        );

        (sql, bind_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn token() -> TokenId {
        TokenId::new(123456).unwrap()
    }

    #[test]
    fn single_column_update() {
        let changes = PatientChanges {
            treatment: Some("rest".to_string()),
            ..Default::default()
        };
        let stmt = UpdateStatement::build(token(), &changes).unwrap();
        let (sql, binds) = stmt.build_sql();

        assert_eq!(
            sql,
            "UPDATE patient SET treatment = $1, updated_at = now() \
             WHERE token_id = $2 AND (treatment IS DISTINCT FROM $1)"
        );
        assert_eq!(
            binds,
            vec![BindValue::Text("rest".to_string()), BindValue::BigInt(123456)]
        );
    }

    #[test]
    fn columns_follow_fixed_order_regardless_of_input() {
        let doctor = Uuid::new_v4();
        let changes = PatientChanges {
            assigned_to: Some(doctor),
            age: Some(40),
            fullname: Some("Jane Doe".to_string()),
            gender: Some(Gender::Female),
            ..Default::default()
        };
        let stmt = UpdateStatement::build(token(), &changes).unwrap();
        assert_eq!(
            stmt.columns(),
            vec![
                PatientColumn::Fullname,
                PatientColumn::Gender,
                PatientColumn::Age,
                PatientColumn::AssignedTo
            ]
        );

        let (sql, binds) = stmt.build_sql();
        assert!(sql.starts_with(
            "UPDATE patient SET fullname = $1, gender = $2, age = $3, assigned_to = $4,"
        ));
        assert!(sql.contains("WHERE token_id = $5"));
        assert_eq!(binds.len(), 5);
        assert_eq!(binds[2], BindValue::Int(40));
        assert_eq!(binds[3], BindValue::Uuid(doctor));
    }

    #[test]
    fn values_never_appear_in_sql_text() {
        let changes = PatientChanges {
            symptoms: Some("'; DROP TABLE patient; --".to_string()),
            ..Default::default()
        };
        let (sql, _) = UpdateStatement::build(token(), &changes)
            .unwrap()
            .build_sql();
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn empty_change_set_is_rejected() {
        let err = UpdateStatement::build(token(), &PatientChanges::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
