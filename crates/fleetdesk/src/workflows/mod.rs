//! Back-office workflows: driver and company verification, role-based access
//! control, and matching verified drivers to company requests.

pub mod access;
pub mod error;
pub mod matching;
mod status;
pub mod verification;

pub use error::{DomainError, ErrorKind, FieldErrors, Violations};
