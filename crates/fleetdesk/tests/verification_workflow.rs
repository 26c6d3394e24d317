use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{NaiveDate, TimeZone, Utc};
use fleetdesk::clock::FixedClock;
use fleetdesk::http::Responder;
use fleetdesk::query::{Filter, Query, SortKey, Trashed};
use fleetdesk::store::MemoryStore;
use fleetdesk::workflows::access::{seed_access_control, AccessControlService, AdminId, NewAdmin};
use fleetdesk::workflows::verification::{
    verification_router, CheckKind, CheckStatus, DriverRegistration, DriverStatus, KycStatus,
    NewDocument, VerificationConfig, VerificationService, VerificationStatus,
};
use fleetdesk::workflows::ErrorKind;
use serde_json::{json, Value};
use tower::ServiceExt;

struct Desk {
    service: Arc<VerificationService<MemoryStore>>,
    root: AdminId,
}

fn desk() -> Desk {
    let store = Arc::new(MemoryStore::new());
    let access = Arc::new(AccessControlService::new(store.clone()));
    let seed = seed_access_control(
        &access,
        NewAdmin {
            name: "Ops Lead".to_string(),
            email: "ops@fleetdesk.test".to_string(),
        },
    )
    .expect("seed");
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap());
    let service = Arc::new(VerificationService::with_clock(
        store,
        access,
        Arc::new(clock),
        VerificationConfig { bulk_limit: 3 },
    ));
    Desk {
        service,
        root: seed.bootstrap.admin.id,
    }
}

fn registration(first_name: &str, last_name: &str) -> DriverRegistration {
    DriverRegistration {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}.{}@drivers.test", first_name.to_lowercase(), last_name.to_lowercase()),
        phone: None,
    }
}

#[test]
fn driver_moves_from_registration_to_verified_with_checks_cleared() {
    let desk = desk();
    let driver = desk
        .service
        .register_driver(registration("Ngozi", "Okeke"))
        .expect("registered");

    desk.service
        .set_kyc_status(driver.id, KycStatus::InProgress, desk.root)
        .expect("kyc in progress");
    let check = desk
        .service
        .open_check(driver.id, CheckKind::Frsc, Some("FRSC-11902".to_string()), desk.root)
        .expect("check opened");
    let check = desk
        .service
        .record_check_success(check.id, desk.root)
        .expect("check passed")
        .into_inner();
    assert_eq!(check.status, CheckStatus::Success);

    let verified = desk
        .service
        .set_driver_status(driver.id, VerificationStatus::Verified, desk.root, None)
        .expect("verified");
    assert!(verified.is_applied());
    let verified = verified.into_inner();
    assert_eq!(
        verified.review.verified_at,
        Some(Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap())
    );
    assert_eq!(verified.status, DriverStatus::Active);
    assert!(verified.is_matchable());
}

#[test]
fn bulk_limit_comes_from_configuration() {
    let desk = desk();
    let ids: Vec<_> = ["Ada", "Bayo", "Chika", "Dayo"]
        .iter()
        .map(|name| {
            desk.service
                .register_driver(registration(name, "Eze"))
                .expect("registered")
                .id
        })
        .collect();

    let err = desk
        .service
        .bulk_set_driver_status(&ids, VerificationStatus::Verified, desk.root, None)
        .expect_err("four ids exceed the limit of three");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let update = desk
        .service
        .bulk_set_driver_status(&ids[..3], VerificationStatus::Verified, desk.root, None)
        .expect("within limit");
    assert_eq!(update.affected, 3);
}

#[test]
fn trashed_drivers_leave_default_searches_until_restored() {
    let desk = desk();
    let kept = desk
        .service
        .register_driver(registration("Ife", "Bello"))
        .expect("registered");
    let trashed = desk
        .service
        .register_driver(registration("Jide", "Bello"))
        .expect("registered");
    desk.service
        .trash_driver(trashed.id, desk.root)
        .expect("trashed");

    let by_surname = Query::new()
        .filter(Filter::equals("last_name", "Bello"))
        .sort_by(SortKey::asc("first_name"));
    let visible = desk.service.search_drivers(&by_surname).expect("search");
    assert_eq!(visible.total, 1);
    assert_eq!(visible.items[0].id, kept.id);

    let everyone = desk
        .service
        .search_drivers(&by_surname.clone().trashed(Trashed::Include))
        .expect("search");
    assert_eq!(everyone.total, 2);

    desk.service
        .restore_driver(trashed.id, desk.root)
        .expect("restored");
    assert_eq!(desk.service.search_drivers(&by_surname).expect("search").total, 2);
}

#[test]
fn expired_documents_are_reported_by_date() {
    let desk = desk();
    let driver = desk
        .service
        .register_driver(registration("Kemi", "Ajayi"))
        .expect("registered");
    for (document_type, expiry) in [
        ("drivers_licence", Some((2025, 3, 1))),
        ("vehicle_papers", Some((2025, 9, 1))),
        ("passport_photo", None),
    ] {
        desk.service
            .upload_document(NewDocument {
                driver_id: driver.id,
                document_type: document_type.to_string(),
                file_name: format!("{document_type}.pdf"),
                expiry_date: expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            })
            .expect("uploaded");
    }

    let on = NaiveDate::from_ymd_opt(2025, 4, 1).expect("date");
    let expired = desk.service.expired_documents(on).expect("expired");
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].document_type, "drivers_licence");
}

#[tokio::test]
async fn router_serves_json_envelopes_end_to_end() {
    let desk = desk();
    let app = verification_router(desk.service.clone(), Responder::new(false));

    let created = app
        .clone()
        .oneshot(
            Request::post("/api/v1/drivers")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "first_name": "Lola",
                        "last_name": "Ade",
                        "email": "lola@drivers.test"
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = axum::body::to_bytes(created.into_body(), 64 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    let driver_id = payload["data"]["id"].as_u64().expect("id");

    let rejected = app
        .oneshot(
            Request::post(format!("/api/v1/drivers/{driver_id}/status"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "acting_admin_id": desk.root.0,
                        "status": "REJECTED",
                        "notes": "blurred licence"
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("route executes");
    assert_eq!(rejected.status(), StatusCode::OK);
    let body = axum::body::to_bytes(rejected.into_body(), 64 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(payload["data"]["verification_status"], "rejected");
    assert_eq!(payload["data"]["rejection_reason"], "blurred licence");
    assert_eq!(payload["data"]["verified_at"], Value::Null);
}
