//! Verification, access control, and fleet matching core for the fleet back office.

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod store;
pub mod telemetry;
pub mod workflows;
