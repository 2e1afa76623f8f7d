//! Feature flags.
//!
//! Organizations manage their own flags; platform-wide flags (no organization)
//! additionally need `flags.global`. Evaluation is open to every signed-in user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{CreateFeatureFlagRequest, FeatureFlagResponse, UpdateFeatureFlagRequest},
    middleware::AuthContext,
    models::{FlagEvaluation, Permission},
    utils::ValidatedJson,
    AppState,
};

pub async fn list_flags(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<FeatureFlagResponse>>, AppError> {
    auth.require(Permission::FlagsManage)?;
    let flags = state.flags.list(auth.org_id()).await?;
    Ok(Json(flags.into_iter().map(FeatureFlagResponse::from).collect()))
}

pub async fn create_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateFeatureFlagRequest>,
) -> Result<(StatusCode, Json<FeatureFlagResponse>), AppError> {
    auth.require(Permission::FlagsManage)?;
    let org_id = if payload.global {
        auth.require(Permission::FlagsGlobal)?;
        None
    } else {
        Some(auth.org_id())
    };
    let flag = state.flags.create(org_id, payload).await?;
    Ok((StatusCode::CREATED, Json(FeatureFlagResponse::from(flag))))
}

pub async fn get_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<FeatureFlagResponse>, AppError> {
    auth.require(Permission::FlagsManage)?;
    let flag = state
        .flags
        .find_visible(&id, auth.org_id())
        .await?
        .ok_or_else(|| not_found("Feature flag"))?;
    Ok(Json(FeatureFlagResponse::from(flag)))
}

pub async fn update_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateFeatureFlagRequest>,
) -> Result<Json<FeatureFlagResponse>, AppError> {
    auth.require(Permission::FlagsManage)?;
    let flag = state
        .flags
        .update(&id, auth.org_id(), auth.can(Permission::FlagsGlobal), payload)
        .await?;
    Ok(Json(FeatureFlagResponse::from(flag)))
}

pub async fn delete_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::FlagsManage)?;
    state
        .flags
        .delete(&id, auth.org_id(), auth.can(Permission::FlagsGlobal))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn evaluate_flag(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(key): Path<String>,
) -> Result<Json<FlagEvaluation>, AppError> {
    let evaluation = state.flags.evaluate(&key, auth.org_id()).await?;
    Ok(Json(evaluation))
}
