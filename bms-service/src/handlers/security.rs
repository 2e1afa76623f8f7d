//! Access permissions, incidents, visitor log and security staff.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        AccessCheckQuery, AccessCheckResponse, AccessPermissionResponse, CheckOutRequest,
        CreateAccessPermissionRequest, CreateIncidentRequest, CreateStaffRequest,
        CreateVisitorRequest, IncidentResponse, RevokePermissionRequest, StaffResponse,
        UpdateAccessPermissionRequest, UpdateIncidentRequest, UpdateStaffRequest,
        UpdateVisitorRequest, VisitorResponse,
    },
    middleware::AuthContext,
    models::Permission,
    services::{AccessPermissionFilter, IncidentFilter, StaffFilter, VisitorFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_permissions(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<AccessPermissionFilter>,
) -> Result<Json<Vec<AccessPermissionResponse>>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let permissions = state.access_permissions.list(auth.org_id(), &filter).await?;
    Ok(Json(
        permissions
            .into_iter()
            .map(AccessPermissionResponse::from)
            .collect(),
    ))
}

pub async fn create_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateAccessPermissionRequest>,
) -> Result<(StatusCode, Json<AccessPermissionResponse>), AppError> {
    auth.require(Permission::SecurityWrite)?;
    let permission = state
        .access_permissions
        .create(auth.org_id(), payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AccessPermissionResponse::from(permission)),
    ))
}

pub async fn get_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<AccessPermissionResponse>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let permission = state
        .access_permissions
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Access permission"))?;
    Ok(Json(AccessPermissionResponse::from(permission)))
}

pub async fn update_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateAccessPermissionRequest>,
) -> Result<Json<AccessPermissionResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let permission = state
        .access_permissions
        .update(&id, auth.org_id(), payload)
        .await?;
    Ok(Json(AccessPermissionResponse::from(permission)))
}

pub async fn revoke_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RevokePermissionRequest>,
) -> Result<Json<AccessPermissionResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let permission = state
        .access_permissions
        .revoke(&id, auth.org_id(), payload)
        .await?;
    Ok(Json(AccessPermissionResponse::from(permission)))
}

/// Would the holder be let in at `at` (now by default), optionally into `area`?
pub async fn check_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    QueryParams(query): QueryParams<AccessCheckQuery>,
) -> Result<Json<AccessCheckResponse>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let at = query.at.unwrap_or_else(Utc::now);
    let result = state
        .access_permissions
        .check(&id, auth.org_id(), at, query.area)
        .await?;
    Ok(Json(result))
}

pub async fn delete_permission(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::SecurityWrite)?;
    state.access_permissions.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_incidents(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<IncidentFilter>,
) -> Result<Json<Vec<IncidentResponse>>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let incidents = state.incidents.list(auth.org_id(), &filter).await?;
    Ok(Json(incidents.into_iter().map(IncidentResponse::from).collect()))
}

pub async fn create_incident(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<IncidentResponse>), AppError> {
    auth.require(Permission::SecurityWrite)?;
    let incident = state
        .incidents
        .create(auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(IncidentResponse::from(incident))))
}

pub async fn get_incident(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<IncidentResponse>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let incident = state
        .incidents
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Incident"))?;
    Ok(Json(IncidentResponse::from(incident)))
}

pub async fn update_incident(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateIncidentRequest>,
) -> Result<Json<IncidentResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let incident = state.incidents.update(&id, auth.org_id(), payload).await?;
    Ok(Json(IncidentResponse::from(incident)))
}

pub async fn delete_incident(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::SecurityWrite)?;
    state.incidents.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_visitors(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<VisitorFilter>,
) -> Result<Json<Vec<VisitorResponse>>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let visitors = state.visitors.list(auth.org_id(), &filter).await?;
    Ok(Json(visitors.into_iter().map(VisitorResponse::from).collect()))
}

pub async fn create_visitor(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateVisitorRequest>,
) -> Result<(StatusCode, Json<VisitorResponse>), AppError> {
    auth.require(Permission::SecurityWrite)?;
    let visitor = state
        .visitors
        .create(auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(VisitorResponse::from(visitor))))
}

pub async fn get_visitor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<VisitorResponse>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let visitor = state
        .visitors
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Visitor log"))?;
    Ok(Json(VisitorResponse::from(visitor)))
}

pub async fn update_visitor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateVisitorRequest>,
) -> Result<Json<VisitorResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let visitor = state.visitors.update(&id, auth.org_id(), payload).await?;
    Ok(Json(VisitorResponse::from(visitor)))
}

/// The body is optional; without `checkOutAt` the visitor leaves now.
pub async fn check_out_visitor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Option<Json<CheckOutRequest>>,
) -> Result<Json<VisitorResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let at = payload.and_then(|Json(body)| body.check_out_at);
    let visitor = state.visitors.check_out(&id, auth.org_id(), at).await?;
    Ok(Json(VisitorResponse::from(visitor)))
}

pub async fn delete_visitor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::SecurityWrite)?;
    state.visitors.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_staff(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<StaffFilter>,
) -> Result<Json<Vec<StaffResponse>>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let staff = state.staff.list(auth.org_id(), &filter).await?;
    Ok(Json(staff.into_iter().map(StaffResponse::from).collect()))
}

pub async fn create_staff(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateStaffRequest>,
) -> Result<(StatusCode, Json<StaffResponse>), AppError> {
    auth.require(Permission::SecurityWrite)?;
    let member = state.staff.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(StaffResponse::from(member))))
}

pub async fn get_staff(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<StaffResponse>, AppError> {
    auth.require(Permission::SecurityRead)?;
    let member = state
        .staff
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Security staff member"))?;
    Ok(Json(StaffResponse::from(member)))
}

pub async fn update_staff(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateStaffRequest>,
) -> Result<Json<StaffResponse>, AppError> {
    auth.require(Permission::SecurityWrite)?;
    let member = state.staff.update(&id, auth.org_id(), payload).await?;
    Ok(Json(StaffResponse::from(member)))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::SecurityWrite)?;
    state.staff.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
