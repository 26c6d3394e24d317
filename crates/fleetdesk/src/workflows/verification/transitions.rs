//! Field-level effects of status changes.
//!
//! Each function mutates a row in place and reports whether anything changed.
//! Services call them inside a single `Repository::modify`, so readers never
//! see a half-applied transition.

use chrono::{DateTime, Utc};

use super::domain::{
    CheckStatus, Company, CompanyStatus, Document, DocumentStatus, Driver, DriverStatus,
    IdentityCheck, KycStatus, ReviewStage, ReviewStatus, ReviewTrail, VerificationStatus,
};
use crate::workflows::access::AdminId;

/// Who made the change, when, and the note attached to a rejection.
#[derive(Debug, Clone)]
pub struct Review {
    pub actor: AdminId,
    pub at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl<S: ReviewStatus> ReviewTrail<S> {
    /// Move to `target`, recomputing every dependent field.
    ///
    /// A repeat keeps the original `verified_at`/`rejected_at`; a repeated
    /// rejection still takes the new reviewer and notes.
    pub fn apply(&mut self, target: S, review: &Review) -> bool {
        let before = self.clone();
        let repeat = self.verification_status == target;
        self.verification_status = target;
        match target.stage() {
            ReviewStage::Accepted => {
                if !repeat || self.verified_at.is_none() {
                    self.verified_by = Some(review.actor);
                    self.verified_at = Some(review.at);
                }
                self.rejected_at = None;
                self.rejection_reason = None;
            }
            ReviewStage::Rejected => {
                if !repeat || self.rejected_at.is_none() {
                    self.rejected_at = Some(review.at);
                }
                self.verified_by = Some(review.actor);
                self.verified_at = None;
                self.rejection_reason = review.notes.clone();
            }
            ReviewStage::Pending => {
                self.verified_by = None;
                self.verified_at = None;
                self.rejected_at = None;
                self.rejection_reason = None;
            }
        }
        *self != before
    }
}

/// Verified drivers are always active and rejected ones inactive, whatever
/// state they were in before; a pending reset leaves activity alone.
pub fn transition_driver(driver: &mut Driver, target: VerificationStatus, review: &Review) -> bool {
    let reviewed = driver.review.apply(target, review);
    let (status, is_active) = match target {
        VerificationStatus::Verified => (DriverStatus::Active, true),
        VerificationStatus::Rejected => (DriverStatus::Inactive, false),
        VerificationStatus::Pending => return reviewed,
    };
    let activity_changed = driver.status != status || driver.is_active != is_active;
    driver.status = status;
    driver.is_active = is_active;
    reviewed || activity_changed
}

pub fn transition_company(
    company: &mut Company,
    target: VerificationStatus,
    review: &Review,
) -> bool {
    let reviewed = company.review.apply(target, review);
    let status = match target {
        VerificationStatus::Verified => CompanyStatus::Active,
        VerificationStatus::Rejected => CompanyStatus::Inactive,
        VerificationStatus::Pending => return reviewed,
    };
    let status_changed = company.status != status;
    company.status = status;
    reviewed || status_changed
}

pub fn transition_document(document: &mut Document, target: DocumentStatus, review: &Review) -> bool {
    document.review.apply(target, review)
}

pub fn set_kyc(driver: &mut Driver, target: KycStatus) -> bool {
    if driver.kyc_status == target {
        return false;
    }
    driver.kyc_status = target;
    true
}

pub fn suspend(driver: &mut Driver) -> bool {
    if driver.status == DriverStatus::Suspended {
        return false;
    }
    driver.status = DriverStatus::Suspended;
    driver.is_active = false;
    true
}

/// Lift a suspension. Only verified drivers come back as active.
pub fn reactivate(driver: &mut Driver) -> bool {
    if driver.status != DriverStatus::Suspended {
        return false;
    }
    let verified = driver.review.verification_status == VerificationStatus::Verified;
    driver.status = if verified {
        DriverStatus::Active
    } else {
        DriverStatus::Inactive
    };
    driver.is_active = verified;
    true
}

pub fn check_succeeded(check: &mut IdentityCheck, at: DateTime<Utc>) -> bool {
    if check.status == CheckStatus::Success {
        return false;
    }
    check.status = CheckStatus::Success;
    check.verified_at = Some(at);
    check.failed_at = None;
    check.last_error = None;
    true
}

/// Every recorded failure counts towards `retry_count`.
pub fn check_failed(check: &mut IdentityCheck, reason: &str, at: DateTime<Utc>) {
    check.status = CheckStatus::Failed;
    check.retry_count += 1;
    check.failed_at = Some(at);
    check.verified_at = None;
    check.last_error = Some(reason.to_string());
}

pub fn check_reset(check: &mut IdentityCheck) -> bool {
    if check.status == CheckStatus::Pending {
        return false;
    }
    check.status = CheckStatus::Pending;
    check.verified_at = None;
    check.failed_at = None;
    true
}
