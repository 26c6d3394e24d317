use chrono::{Duration, TimeZone, Utc};

use super::common::{company_registration, driver_registration};
use crate::workflows::access::AdminId;
use crate::workflows::verification::transitions::{
    check_failed, check_reset, check_succeeded, reactivate, suspend, transition_company,
    transition_document, transition_driver, Review,
};
use crate::workflows::verification::{
    CheckId, CheckKind, CheckStatus, Company, CompanyStatus, Document, DocumentId,
    DocumentStatus, Driver, DriverId, DriverStatus, IdentityCheck, ReviewTrail,
    VerificationStatus,
};

fn review(notes: Option<&str>) -> Review {
    Review {
        actor: AdminId(7),
        at: Utc.with_ymd_and_hms(2025, 5, 2, 10, 0, 0).unwrap(),
        notes: notes.map(str::to_string),
    }
}

fn driver() -> Driver {
    Driver::register(driver_registration("Ada"), Utc::now())
}

#[test]
fn verifying_a_driver_activates_it() {
    let mut driver = driver();
    let review = review(None);

    assert!(transition_driver(&mut driver, VerificationStatus::Verified, &review));
    assert_eq!(driver.review.verification_status, VerificationStatus::Verified);
    assert_eq!(driver.review.verified_by, Some(AdminId(7)));
    assert_eq!(driver.review.verified_at, Some(review.at));
    assert_eq!(driver.review.rejected_at, None);
    assert_eq!(driver.review.rejection_reason, None);
    assert_eq!(driver.status, DriverStatus::Active);
    assert!(driver.is_active);
}

#[test]
fn rejecting_a_driver_records_the_reason_and_deactivates() {
    let mut driver = driver();
    transition_driver(&mut driver, VerificationStatus::Verified, &review(None));

    let rejection = review(Some("licence photo unreadable"));
    assert!(transition_driver(&mut driver, VerificationStatus::Rejected, &rejection));
    assert_eq!(driver.review.verified_at, None);
    assert_eq!(driver.review.rejected_at, Some(rejection.at));
    assert_eq!(
        driver.review.rejection_reason.as_deref(),
        Some("licence photo unreadable")
    );
    assert_eq!(driver.status, DriverStatus::Inactive);
    assert!(!driver.is_active);
}

#[test]
fn resetting_to_pending_clears_the_trail_but_keeps_activity() {
    let mut driver = driver();
    transition_driver(&mut driver, VerificationStatus::Verified, &review(None));

    assert!(transition_driver(&mut driver, VerificationStatus::Pending, &review(None)));
    assert_eq!(driver.review, ReviewTrail::new(VerificationStatus::Pending));
    assert_eq!(driver.status, DriverStatus::Active);
    assert!(driver.is_active);
}

#[test]
fn repeating_the_current_status_changes_nothing() {
    let mut driver = driver();
    transition_driver(&mut driver, VerificationStatus::Verified, &review(None));
    let once = driver.clone();

    let later = Review {
        at: once.review.verified_at.unwrap() + Duration::hours(3),
        ..review(None)
    };
    assert!(!transition_driver(&mut driver, VerificationStatus::Verified, &later));
    assert_eq!(driver, once);
}

#[test]
fn reverifying_a_suspended_driver_restores_activity() {
    let mut driver = driver();
    transition_driver(&mut driver, VerificationStatus::Verified, &review(None));
    let verified_at = driver.review.verified_at;
    suspend(&mut driver);

    let later = Review {
        at: review(None).at + Duration::days(1),
        ..review(None)
    };
    assert!(transition_driver(&mut driver, VerificationStatus::Verified, &later));
    assert_eq!(driver.status, DriverStatus::Active);
    assert!(driver.is_active);
    assert_eq!(driver.review.verified_at, verified_at);
}

#[test]
fn repeated_rejection_takes_the_latest_notes() {
    let mut driver = driver();
    let first = review(Some("blurry licence"));
    transition_driver(&mut driver, VerificationStatus::Rejected, &first);

    let second = Review {
        actor: AdminId(9),
        at: first.at + Duration::hours(2),
        notes: Some("expired licence".to_string()),
    };
    assert!(transition_driver(&mut driver, VerificationStatus::Rejected, &second));
    assert_eq!(driver.review.rejection_reason.as_deref(), Some("expired licence"));
    assert_eq!(driver.review.verified_by, Some(AdminId(9)));
    assert_eq!(driver.review.rejected_at, Some(first.at));

    assert!(!transition_driver(&mut driver, VerificationStatus::Rejected, &second));
}

#[test]
fn reverifying_an_inactive_company_reactivates_it() {
    let mut company = Company::register(company_registration("Acme Haulage"), Utc::now());
    transition_company(&mut company, VerificationStatus::Verified, &review(None));
    company.status = CompanyStatus::Inactive;

    assert!(transition_company(&mut company, VerificationStatus::Verified, &review(None)));
    assert!(company.is_verified());
}

#[test]
fn verified_and_rejected_timestamps_are_exclusive_for_any_path() {
    let statuses = [
        VerificationStatus::Pending,
        VerificationStatus::Verified,
        VerificationStatus::Rejected,
    ];
    for first in statuses {
        for second in statuses {
            let mut driver = driver();
            transition_driver(&mut driver, first, &review(Some("first")));
            transition_driver(&mut driver, second, &review(Some("second")));
            assert!(
                driver.review.verified_at.is_none() || driver.review.rejected_at.is_none(),
                "{first} then {second} left both timestamps set"
            );
            assert_eq!(driver.review.verification_status, second);
        }
    }
}

#[test]
fn company_transitions_toggle_status_only() {
    let mut company = Company::register(company_registration("Acme Haulage"), Utc::now());
    assert_eq!(company.status, CompanyStatus::Inactive);

    assert!(transition_company(&mut company, VerificationStatus::Verified, &review(None)));
    assert_eq!(company.status, CompanyStatus::Active);
    assert!(company.is_verified());

    assert!(transition_company(
        &mut company,
        VerificationStatus::Rejected,
        &review(Some("incomplete CAC filing"))
    ));
    assert_eq!(company.status, CompanyStatus::Inactive);
    assert_eq!(
        company.review.rejection_reason.as_deref(),
        Some("incomplete CAC filing")
    );
}

#[test]
fn document_approval_uses_the_shared_trail() {
    let mut document = Document {
        id: DocumentId(1),
        driver_id: DriverId(1),
        document_type: "drivers_licence".to_string(),
        file_name: "licence.pdf".to_string(),
        review: ReviewTrail::new(DocumentStatus::Pending),
        expiry_date: None,
        uploaded_at: Utc::now(),
    };
    assert!(transition_document(&mut document, DocumentStatus::Approved, &review(None)));
    assert!(document.review.verified_at.is_some());
    assert!(!transition_document(&mut document, DocumentStatus::Approved, &review(None)));
}

#[test]
fn suspension_round_trip_restores_verified_drivers_only() {
    let mut verified = driver();
    transition_driver(&mut verified, VerificationStatus::Verified, &review(None));
    assert!(suspend(&mut verified));
    assert!(!suspend(&mut verified));
    assert!(!verified.is_active);
    assert!(reactivate(&mut verified));
    assert_eq!(verified.status, DriverStatus::Active);

    let mut pending = driver();
    suspend(&mut pending);
    assert!(reactivate(&mut pending));
    assert_eq!(pending.status, DriverStatus::Inactive);
    assert!(!pending.is_active);
    assert!(!reactivate(&mut pending));
}

#[test]
fn checks_count_failures_and_keep_timestamps_exclusive() {
    let at = Utc::now();
    let mut check = IdentityCheck {
        id: CheckId(1),
        driver_id: DriverId(1),
        kind: CheckKind::Nin,
        reference: None,
        status: CheckStatus::Pending,
        retry_count: 0,
        verified_at: None,
        failed_at: None,
        last_error: None,
        created_at: at,
    };

    check_failed(&mut check, "registry timeout", at);
    assert_eq!(check.retry_count, 1);
    assert_eq!(check.failed_at, Some(at));

    assert!(check_reset(&mut check));
    assert_eq!(check.status, CheckStatus::Pending);
    assert_eq!(check.retry_count, 1);

    assert!(check_succeeded(&mut check, at));
    assert_eq!(check.verified_at, Some(at));
    assert_eq!(check.failed_at, None);
    assert_eq!(check.last_error, None);
    assert_eq!(check.retry_count, 1);
}
