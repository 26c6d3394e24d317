use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{NewDriverRequest, RequestId};
use super::repository::MatchingStore;
use super::service::MatchingService;
use crate::http::{ApiState, Responder};
use crate::query::Query;
use crate::workflows::access::router::ActorBody;
use crate::workflows::access::AdminId;
use crate::workflows::verification::DriverId;

type MatchingState<S> = State<ApiState<MatchingService<S>>>;

#[derive(Debug, Deserialize)]
pub struct MatchBody {
    pub acting_admin_id: AdminId,
    pub driver_id: DriverId,
}

/// Router exposing driver requests and driver placement.
pub fn matching_router<S>(service: Arc<MatchingService<S>>, responder: Responder) -> Router
where
    S: MatchingStore + 'static,
{
    Router::new()
        .route("/api/v1/requests", post(open_request_handler::<S>))
        .route("/api/v1/requests/search", post(search_requests_handler::<S>))
        .route("/api/v1/requests/:request_id", get(request_handler::<S>))
        .route(
            "/api/v1/requests/:request_id/matches",
            get(matches_handler::<S>).post(match_driver_handler::<S>),
        )
        .route(
            "/api/v1/requests/:request_id/matches/:driver_id",
            delete(unmatch_driver_handler::<S>),
        )
        .route(
            "/api/v1/requests/:request_id/candidates",
            get(candidates_handler::<S>),
        )
        .route(
            "/api/v1/requests/:request_id/cancel",
            post(cancel_request_handler::<S>),
        )
        .with_state(ApiState::new(service, responder))
}

pub(crate) async fn open_request_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    body: Result<Json<NewDriverRequest>, JsonRejection>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let new = match api.accept(&headers, body) {
        Ok(new) => new,
        Err(rejection) => return rejection,
    };
    api.respond(&headers, StatusCode::CREATED, api.service.open_request(new))
}

pub(crate) async fn search_requests_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    body: Result<Json<Query>, JsonRejection>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let query = match api.accept(&headers, body) {
        Ok(query) => query,
        Err(rejection) => return rejection,
    };
    api.respond(&headers, StatusCode::OK, api.service.search_requests(&query))
}

pub(crate) async fn request_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path(request_id): Path<u64>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let result = api.service.request(RequestId(request_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn matches_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path(request_id): Path<u64>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let result = api.service.matches_for(RequestId(request_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn candidates_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path(request_id): Path<u64>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let result = api.service.candidates(RequestId(request_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn match_driver_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path(request_id): Path<u64>,
    body: Result<Json<MatchBody>, JsonRejection>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result =
        api.service
            .match_driver(RequestId(request_id), body.driver_id, body.acting_admin_id);
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn unmatch_driver_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path((request_id, driver_id)): Path<(u64, u64)>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api.service.unmatch_driver(
        RequestId(request_id),
        DriverId(driver_id),
        body.acting_admin_id,
    );
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn cancel_request_handler<S>(
    State(api): MatchingState<S>,
    headers: HeaderMap,
    Path(request_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: MatchingStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api
        .service
        .cancel_request(RequestId(request_id), body.acting_admin_id);
    api.respond(&headers, StatusCode::OK, result)
}
