//! Driver, company and document verification.
//!
//! Status changes go through [`transitions`], which writes every dependent
//! field (timestamps, reviewer, activity flags) in the same update as the
//! status itself. Bulk updates apply to every listed row or to none.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod transitions;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    BulkUpdate, CheckId, CheckKind, CheckStatus, Company, CompanyId, CompanyRegistration,
    CompanyStatus, Document, DocumentId, DocumentStatus, Driver, DriverId, DriverRegistration,
    DriverStatus, IdentityCheck, KycStatus, NewDocument, PurgeReport, ReviewTrail,
    TransitionOutcome, VerificationStatus,
};
pub use repository::VerificationStore;
pub use router::verification_router;
pub use service::{VerificationConfig, VerificationService, DEFAULT_BULK_LIMIT};
