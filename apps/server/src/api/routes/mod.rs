//! Route tables

pub mod clinic;
pub mod metrics;
