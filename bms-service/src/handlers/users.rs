use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{CreateUserRequest, OrganizationResponse, UpdateSettingsRequest, UpdateUserRequest, UserResponse},
    middleware::AuthContext,
    models::Permission,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth.require(Permission::UsersManage)?;
    let users = state.users.list(auth.org_id()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    auth.require(Permission::UsersManage)?;
    let user = state
        .users
        .create(auth.org_id(), auth.role(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require(Permission::UsersManage)?;
    let user = state
        .users
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("User"))?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require(Permission::UsersManage)?;
    let user = state
        .users
        .update(&id, auth.org_id(), &auth.user, payload)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::UsersManage)?;
    state.users.deactivate(&id, auth.org_id(), &auth.user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Any member may read their organization; changing it needs settings.manage.
pub async fn get_organization(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<OrganizationResponse>, AppError> {
    let organization = state.users.organization(auth.org_id()).await?;
    Ok(Json(OrganizationResponse::from(organization)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<UpdateSettingsRequest>,
) -> Result<Json<OrganizationResponse>, AppError> {
    auth.require(Permission::SettingsManage)?;
    let organization = state.users.update_settings(auth.org_id(), payload).await?;
    tracing::info!(
        organization_id = %organization.id,
        user_id = %auth.user_id(),
        "Organization settings updated"
    );
    Ok(Json(OrganizationResponse::from(organization)))
}
