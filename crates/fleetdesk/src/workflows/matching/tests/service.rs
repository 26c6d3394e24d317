use super::common::*;
use crate::query::{Filter, Query};
use crate::workflows::matching::{NewDriverRequest, RequestStatus};
use crate::workflows::verification::VerificationStatus;
use crate::workflows::verification::tests::common::company_registration;
use crate::workflows::ErrorKind;

#[test]
fn filling_the_last_slot_fulfils_the_request() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 2);
    assert_eq!(request.status, RequestStatus::Open);
    assert_eq!(request.matched, 0);

    let first = harness.verified_driver("Ada");
    let second = harness.verified_driver("Bola");

    let once = harness
        .service
        .match_driver(request.id, first.id, harness.root())
        .expect("first placement");
    assert_eq!(once.request.matched, 1);
    assert_eq!(once.request.status, RequestStatus::Open);
    assert_eq!(once.placed.matched_by, harness.root());

    let twice = harness
        .service
        .match_driver(request.id, second.id, harness.root())
        .expect("second placement");
    assert_eq!(twice.request.matched, 2);
    assert_eq!(twice.request.status, RequestStatus::Fulfilled);
    assert!(twice.request.fulfilled_at.is_some());
}

#[test]
fn fulfilled_requests_take_no_more_drivers() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 1);
    let placed = harness.verified_driver("Ada");
    let extra = harness.verified_driver("Bola");
    harness
        .service
        .match_driver(request.id, placed.id, harness.root())
        .expect("placement");

    let err = harness
        .service
        .match_driver(request.id, extra.id, harness.root())
        .expect_err("no slots left");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(harness.service.request(request.id).expect("request").matched, 1);
}

#[test]
fn duplicate_match_is_a_conflict_and_releases_the_slot() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 3);
    let driver = harness.verified_driver("Ada");
    harness
        .service
        .match_driver(request.id, driver.id, harness.root())
        .expect("placement");

    let err = harness
        .service
        .match_driver(request.id, driver.id, harness.root())
        .expect_err("already placed");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        err.to_string(),
        format!("driver {} is already matched to request {}", driver.id, request.id)
    );

    let stored = harness.service.request(request.id).expect("request");
    assert_eq!(stored.matched, 1);
    assert_eq!(harness.service.matches_for(request.id).expect("matches").len(), 1);
}

#[test]
fn only_verified_active_drivers_can_be_matched() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 2);

    let pending = harness.pending_driver("Ada");
    let err = harness
        .service
        .match_driver(request.id, pending.id, harness.root())
        .expect_err("pending driver");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let suspended = harness.verified_driver("Bola");
    harness
        .verification
        .suspend_driver(suspended.id, harness.root())
        .expect("suspended");
    let err = harness
        .service
        .match_driver(request.id, suspended.id, harness.root())
        .expect_err("suspended driver");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = harness.service.request(request.id).expect("request");
    assert_eq!(stored.matched, 0);
}

#[test]
fn unverified_companies_cannot_open_requests() {
    let harness = harness();
    let company = harness
        .verification
        .register_company(company_registration("Pending Freight"))
        .expect("company registered");

    let err = harness
        .service
        .open_request(NewDriverRequest {
            company_id: company.id,
            title: "Night shift".to_string(),
            drivers_needed: 1,
        })
        .expect_err("company not verified");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn request_needs_a_title_and_at_least_one_driver() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");

    let err = harness
        .service
        .open_request(NewDriverRequest {
            company_id: company.id,
            title: " ".to_string(),
            drivers_needed: 0,
        })
        .expect_err("invalid request");
    let fields = err.field_errors().expect("field errors");
    assert!(fields.contains_key("title"));
    assert!(fields.contains_key("drivers_needed"));
}

#[test]
fn unmatching_reopens_a_fulfilled_request() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 1);
    let driver = harness.verified_driver("Ada");
    harness
        .service
        .match_driver(request.id, driver.id, harness.root())
        .expect("placement");

    let reopened = harness
        .service
        .unmatch_driver(request.id, driver.id, harness.root())
        .expect("unmatched");
    assert_eq!(reopened.status, RequestStatus::Open);
    assert_eq!(reopened.matched, 0);
    assert_eq!(reopened.fulfilled_at, None);

    let err = harness
        .service
        .unmatch_driver(request.id, driver.id, harness.root())
        .expect_err("nothing left to remove");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn only_open_requests_can_be_cancelled() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let open = harness.request_for(&company, 2);

    let cancelled = harness
        .service
        .cancel_request(open.id, harness.root())
        .expect("cancelled");
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let err = harness
        .service
        .cancel_request(open.id, harness.root())
        .expect_err("already cancelled");
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let driver = harness.verified_driver("Ada");
    let err = harness
        .service
        .match_driver(open.id, driver.id, harness.root())
        .expect_err("cancelled requests take no drivers");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn verifiers_cannot_match_drivers() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 1);
    let driver = harness.verified_driver("Ada");
    let verifier = harness.seed.verifier.clone();
    let reviewer = harness.admin_with_role("Reviewer", &verifier);

    let err = harness
        .service
        .match_driver(request.id, driver.id, reviewer)
        .expect_err("missing matching.manage");
    assert_eq!(err.kind(), ErrorKind::InsufficientAuthority);

    let admin = harness.seed.admin.clone();
    let coordinator = harness.admin_with_role("Coordinator", &admin);
    harness
        .service
        .match_driver(request.id, driver.id, coordinator)
        .expect("admins hold matching.manage");
}

#[test]
fn candidates_exclude_unverified_and_already_placed_drivers() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 3);
    let placed = harness.verified_driver("Ada");
    let free = harness.verified_driver("Bola");
    harness.pending_driver("Chidi");
    harness
        .service
        .match_driver(request.id, placed.id, harness.root())
        .expect("placement");

    let candidates = harness.service.candidates(request.id).expect("candidates");
    let ids: Vec<_> = candidates.iter().map(|driver| driver.id).collect();
    assert_eq!(ids, vec![free.id]);
}

#[test]
fn requests_are_searchable_by_status() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let first = harness.request_for(&company, 1);
    harness.request_for(&company, 4);
    harness
        .service
        .cancel_request(first.id, harness.root())
        .expect("cancelled");

    let open = harness
        .service
        .search_requests(&Query::new().filter(Filter::equals("status", RequestStatus::Open)))
        .expect("search");
    assert_eq!(open.total, 1);
    assert_eq!(open.items[0].drivers_needed, 4);
}

#[test]
fn requests_of_a_company_rejected_later_take_no_placements() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 2);
    let driver = harness.verified_driver("Ada");
    harness
        .verification
        .set_company_status(
            company.id,
            VerificationStatus::Rejected,
            harness.root(),
            Some("licence revoked".to_string()),
        )
        .expect("company rejected");

    let err = harness
        .service
        .match_driver(request.id, driver.id, harness.root())
        .expect_err("company no longer verified");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let stored = harness.service.request(request.id).expect("request");
    assert_eq!(stored.matched, 0);
    assert!(harness.service.matches_for(request.id).expect("matches").is_empty());
}

#[test]
fn purging_a_placed_driver_frees_the_slot() {
    let harness = harness();
    let company = harness.verified_company("Acme Haulage");
    let request = harness.request_for(&company, 1);
    let gone = harness.verified_driver("Ada");
    let next = harness.verified_driver("Bola");
    harness
        .service
        .match_driver(request.id, gone.id, harness.root())
        .expect("placement");

    let report = harness
        .verification
        .purge_driver(gone.id, harness.root())
        .expect("purged");
    assert_eq!(report.matches, 1);

    let reopened = harness.service.request(request.id).expect("request");
    assert_eq!(reopened.matched, 0);
    assert_eq!(reopened.status, RequestStatus::Open);
    assert!(reopened.fulfilled_at.is_none());
    assert!(harness.service.matches_for(request.id).expect("matches").is_empty());

    let refilled = harness
        .service
        .match_driver(request.id, next.id, harness.root())
        .expect("slot is free again");
    assert_eq!(refilled.request.status, RequestStatus::Fulfilled);
}
