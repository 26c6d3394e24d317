use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{AdminId, NewAdmin, NewPermission, NewRole, PermissionId, RoleId};
use super::repository::AccessStore;
use super::service::AccessControlService;
use crate::http::{ApiState, Responder};

type AccessState<S> = State<ApiState<AccessControlService<S>>>;

/// Body for mutations that need nothing beyond the acting admin.
#[derive(Debug, Deserialize)]
pub struct ActorBody {
    pub acting_admin_id: AdminId,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleBody {
    pub acting_admin_id: AdminId,
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub parent_id: Option<RoleId>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePermissionBody {
    pub acting_admin_id: AdminId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SyncPermissionsBody {
    pub acting_admin_id: AdminId,
    pub permission_ids: Vec<PermissionId>,
}

/// Router exposing role, permission and admin membership management.
pub fn access_router<S>(service: Arc<AccessControlService<S>>, responder: Responder) -> Router
where
    S: AccessStore + 'static,
{
    Router::new()
        .route("/api/v1/roles", post(create_role_handler::<S>))
        .route("/api/v1/roles/hierarchy", get(hierarchy_handler::<S>))
        .route(
            "/api/v1/roles/:role_id/assignable",
            get(assignable_roles_handler::<S>),
        )
        .route(
            "/api/v1/roles/:role_id/permissions",
            get(role_permissions_handler::<S>).put(sync_permissions_handler::<S>),
        )
        .route(
            "/api/v1/roles/:role_id/permissions/:permission_id",
            post(assign_permission_handler::<S>).delete(revoke_permission_handler::<S>),
        )
        .route(
            "/api/v1/roles/:role_id/deactivate",
            post(deactivate_role_handler::<S>),
        )
        .route("/api/v1/roles/:role_id/restore", post(restore_role_handler::<S>))
        .route("/api/v1/permissions", post(create_permission_handler::<S>))
        .route("/api/v1/admins", post(create_admin_handler::<S>))
        .route("/api/v1/admins/:admin_id", get(admin_profile_handler::<S>))
        .route(
            "/api/v1/admins/:admin_id/roles/:role_id",
            put(assign_role_handler::<S>).delete(revoke_role_handler::<S>),
        )
        .with_state(ApiState::new(service, responder))
}

pub(crate) async fn create_role_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    body: Result<Json<CreateRoleBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let new = NewRole {
        name: body.name,
        level: body.level,
        parent_id: body.parent_id,
        description: body.description,
    };
    let result = api.service.create_role(new, Some(body.acting_admin_id));
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn hierarchy_handler<S>(State(api): AccessState<S>, headers: HeaderMap) -> Response
where
    S: AccessStore + 'static,
{
    api.respond(&headers, StatusCode::OK, api.service.hierarchy())
}

pub(crate) async fn assignable_roles_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(role_id): Path<u64>,
) -> Response
where
    S: AccessStore + 'static,
{
    let result = api.service.roles_assignable_by(RoleId(role_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn role_permissions_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(role_id): Path<u64>,
) -> Response
where
    S: AccessStore + 'static,
{
    let result = api.service.permissions_for(RoleId(role_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn sync_permissions_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(role_id): Path<u64>,
    body: Result<Json<SyncPermissionsBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api.service.sync_permissions(
        RoleId(role_id),
        &body.permission_ids,
        Some(body.acting_admin_id),
    );
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn assign_permission_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path((role_id, permission_id)): Path<(u64, u64)>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api.service.assign_permission(
        RoleId(role_id),
        PermissionId(permission_id),
        Some(body.acting_admin_id),
    );
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn revoke_permission_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path((role_id, permission_id)): Path<(u64, u64)>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api
        .service
        .revoke_permission(
            RoleId(role_id),
            PermissionId(permission_id),
            Some(body.acting_admin_id),
        )
        .map(|removed| serde_json::json!({ "removed": removed }));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn deactivate_role_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(role_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api
        .service
        .deactivate_role(RoleId(role_id), Some(body.acting_admin_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn restore_role_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(role_id): Path<u64>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api
        .service
        .restore_role(RoleId(role_id), Some(body.acting_admin_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn create_permission_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    body: Result<Json<CreatePermissionBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let new = NewPermission {
        name: body.name,
        category: body.category,
        resource: None,
        action: None,
        description: body.description,
    };
    let result = api
        .service
        .create_permission(new, Some(body.acting_admin_id));
    api.respond(&headers, StatusCode::CREATED, result)
}

pub(crate) async fn create_admin_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    body: Result<Json<NewAdmin>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let new = match api.accept(&headers, body) {
        Ok(new) => new,
        Err(rejection) => return rejection,
    };
    api.respond(&headers, StatusCode::CREATED, api.service.create_admin(new))
}

pub(crate) async fn admin_profile_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path(admin_id): Path<u64>,
) -> Response
where
    S: AccessStore + 'static,
{
    let result = api.service.admin_profile(AdminId(admin_id));
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn assign_role_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path((admin_id, role_id)): Path<(u64, u64)>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api.service.assign_role(
        AdminId(admin_id),
        RoleId(role_id),
        Some(body.acting_admin_id),
    );
    api.respond(&headers, StatusCode::OK, result)
}

pub(crate) async fn revoke_role_handler<S>(
    State(api): AccessState<S>,
    headers: HeaderMap,
    Path((admin_id, role_id)): Path<(u64, u64)>,
    body: Result<Json<ActorBody>, JsonRejection>,
) -> Response
where
    S: AccessStore + 'static,
{
    let body = match api.accept(&headers, body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let result = api.service.revoke_role(
        AdminId(admin_id),
        RoleId(role_id),
        Some(body.acting_admin_id),
    );
    api.respond(&headers, StatusCode::OK, result)
}
