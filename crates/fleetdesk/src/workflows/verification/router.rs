use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{
    CheckId, CheckKind, CompanyId, CompanyRegistration, DocumentId, DocumentStatus, DriverId,
    DriverRegistration, KycStatus, NewDocument, TransitionOutcome, VerificationStatus,
};
use super::repository::VerificationStore;
use super::service::VerificationService;
use crate::http::{ApiState, Responder};
use crate::query::Query;
use crate::workflows::access::router::ActorBody;
use crate::workflows::access::AdminId;
use crate::workflows::DomainError;

type VerificationState<S> = State<ApiState<VerificationService<S>>>;

/// Status change request; `status` is checked against the entity's enum before any write.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub acting_admin_id: AdminId,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusBody {
    pub acting_admin_id: AdminId,
    pub ids: Vec<u64>,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KycBody {
    pub acting_admin_id: AdminId,
    pub kyc_status: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenCheckBody {
    pub acting_admin_id: AdminId,
    pub driver_id: DriverId,
    pub kind: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckFailureBody {
    pub acting_admin_id: AdminId,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpiryBody {
    pub on: NaiveDate,
}

/// Router exposing driver, company, document and identity-check verification.
pub fn verification_router<S>(
    service: Arc<VerificationService<S>>,
    responder: Responder,
) -> Router
where
    S: VerificationStore + 'static,
{
    Router::new()
        .route("/api/v1/drivers", post(register_driver_handler::<S>))
        .route("/api/v1/drivers/search", post(search_drivers_handler::<S>))
        .route("/api/v1/drivers/trashed", post(trashed_drivers_handler::<S>))
        .route(
            "/api/v1/drivers/status/bulk",
            post(bulk_driver_status_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id",
            get(driver_handler::<S>).delete(trash_driver_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/status",
            post(driver_status_handler::<S>),
        )
        .route("/api/v1/drivers/:driver_id/kyc", post(kyc_status_handler::<S>))
        .route(
            "/api/v1/drivers/:driver_id/suspend",
            post(suspend_driver_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/reactivate",
            post(reactivate_driver_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/restore",
            post(restore_driver_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/purge",
            delete(purge_driver_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/documents",
            get(driver_documents_handler::<S>),
        )
        .route(
            "/api/v1/drivers/:driver_id/checks",
            get(driver_checks_handler::<S>),
        )
        .route("/api/v1/documents", post(upload_document_handler::<S>))
        .route(
            "/api/v1/documents/expired",
            post(expired_documents_handler::<S>),
        )
        .route(
            "/api/v1/documents/:document_id/status",
            post(document_status_handler::<S>),
        )
        .route("/api/v1/checks", post(open_check_handler::<S>))
        .route(
            "/api/v1/checks/:check_id/success",
            post(check_success_handler::<S>),
        )
        .route(
            "/api/v1/checks/:check_id/failure",
            post(check_failure_handler::<S>),
        )
        .route("/api/v1/checks/:check_id/retry", post(check_retry_handler::<S>))
        .route("/api/v1/companies", post(register_company_handler::<S>))
        .route(
            "/api/v1/companies/search",
            post(search_companies_handler::<S>),
        )
        .route(
            "/api/v1/companies/status/bulk",
            post(bulk_company_status_handler::<S>),
        )
        .route("/api/v1/companies/:company_id", get(company_handler::<S>))
        .route(
            "/api/v1/companies/:company_id/status",
            post(company_status_handler::<S>),
        )
        .with_state(ApiState::new(service, responder))
}

macro_rules! accept {
    ($api:expr, $headers:expr, $body:expr) => {
        match $api.accept(&$headers, $body) {
            Ok(body) => body,
            Err(rejection) => return rejection,
        }
    };
}

pub(crate) async fn register_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<DriverRegistration>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let registration = accept!(api, headers, body);
    let result = api.service.register_driver(registration);
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn search_drivers_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<Query>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let query = accept!(api, headers, body);
    api.respond(&headers, StatusCode::OK, api.service.search_drivers(&query))
}

pub(crate) async fn trashed_drivers_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<Query>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let query = accept!(api, headers, body);
    api.respond(&headers, StatusCode::OK, api.service.trashed_drivers(&query))
}

pub(crate) async fn driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let result = api.service.driver(DriverId(driver_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn driver_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = body
        .status
        .parse::<VerificationStatus>()
        .and_then(|target| {
            api.service.set_driver_status(
                DriverId(driver_id),
                target,
                body.acting_admin_id,
                body.notes,
            )
        })
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn bulk_driver_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<BulkStatusBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let ids: Vec<DriverId> = body.ids.iter().copied().map(DriverId).collect();
    let result = body.status.parse::<VerificationStatus>().and_then(|target| {
        api.service
            .bulk_set_driver_status(&ids, target, body.acting_admin_id, body.notes)
    });
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn kyc_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<KycBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = body
        .kyc_status
        .parse::<KycStatus>()
        .and_then(|target| {
            api.service
                .set_kyc_status(DriverId(driver_id), target, body.acting_admin_id)
        })
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn suspend_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .suspend_driver(DriverId(driver_id), body.acting_admin_id)
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn reactivate_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .reactivate_driver(DriverId(driver_id), body.acting_admin_id);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn trash_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .trash_driver(DriverId(driver_id), body.acting_admin_id)
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn restore_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .restore_driver(DriverId(driver_id), body.acting_admin_id)
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn purge_driver_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .purge_driver(DriverId(driver_id), body.acting_admin_id);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn driver_documents_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let result = api.service.documents_for(DriverId(driver_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn driver_checks_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(driver_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let result = api.service.checks_for(DriverId(driver_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn upload_document_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<NewDocument>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let new = accept!(api, headers, body);
    api.respond(&headers, StatusCode::CREATED, api.service.upload_document(new))
}

pub(crate) async fn expired_documents_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<ExpiryBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    api.respond(&headers, StatusCode::OK, api.service.expired_documents(body.on))
}

pub(crate) async fn document_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(document_id): Path<u64>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = body
        .status
        .parse::<DocumentStatus>()
        .and_then(|target| {
            api.service.set_document_status(
                DocumentId(document_id),
                target,
                body.acting_admin_id,
                body.notes,
            )
        })
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn open_check_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<OpenCheckBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = body.kind.parse::<CheckKind>().and_then(|kind| {
        api.service
            .open_check(body.driver_id, kind, body.reference, body.acting_admin_id)
    });
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn check_success_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(check_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .record_check_success(CheckId(check_id), body.acting_admin_id)
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn check_failure_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(check_id): Path<u64>,
    body: Result<Json<CheckFailureBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result =
        api.service
            .record_check_failure(CheckId(check_id), &body.reason, body.acting_admin_id);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn check_retry_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(check_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = api
        .service
        .retry_check(CheckId(check_id), body.acting_admin_id);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn register_company_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<CompanyRegistration>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let registration = accept!(api, headers, body);
    let result = api.service.register_company(registration);
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn search_companies_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<Query>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let query = accept!(api, headers, body);
    api.respond(&headers, StatusCode::OK, api.service.search_companies(&query))
}

pub(crate) async fn company_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(company_id): Path<u64>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let result = api.service.company(CompanyId(company_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn company_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    Path(company_id): Path<u64>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let result = body
        .status
        .parse::<VerificationStatus>()
        .and_then(|target| {
            api.service.set_company_status(
                CompanyId(company_id),
                target,
                body.acting_admin_id,
                body.notes,
            )
        })
        .map(TransitionOutcome::into_inner);
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn bulk_company_status_handler<S>(
    State(api): VerificationState<S>,
    headers: HeaderMap,
    body: Result<Json<BulkStatusBody>, JsonRejection>,
) -> Response
where
    S: VerificationStore + 'static,
{
    let body = accept!(api, headers, body);
    let ids: Vec<CompanyId> = body.ids.iter().copied().map(CompanyId).collect();
    let result: Result<_, DomainError> =
        body.status.parse::<VerificationStatus>().and_then(|target| {
            api.service
                .bulk_set_company_status(&ids, target, body.acting_admin_id, body.notes)
        });
    api.respond(&headers, StatusCode::OK, result)
}
