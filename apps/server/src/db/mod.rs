//! Database layer - storage trait, PostgreSQL and in-memory backends

pub mod memory;
pub mod store;
pub mod traits;
pub mod transaction;
pub mod update;

pub use memory::{ExecutedUpdate, InMemoryClinicStore};
pub use store::PostgresClinicStore;
pub use traits::{ClinicStore, Page, RecordPage};
pub use transaction::PatientTransaction;
pub use update::{Assignment, BindValue, PatientColumn, UpdateStatement};
