//! Request handlers for API endpoints
//!
//! Handlers extract and validate input, call a service, and shape the
//! `{code, message, data}` response. Errors render through [`crate::Error`].

pub mod login;
pub mod metrics;
pub mod patients;

pub use login::*;
pub use metrics::*;
pub use patients::*;
