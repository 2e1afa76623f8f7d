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
        AssetResponse, AssetValuationResponse, CreateAssetRequest, DepreciationQuery,
        UpdateAssetRequest,
    },
    middleware::AuthContext,
    models::Permission,
    services::AssetFilter,
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_assets(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<AssetFilter>,
) -> Result<Json<Vec<AssetResponse>>, AppError> {
    auth.require(Permission::AssetsRead)?;
    let assets = state.assets.list(auth.org_id(), &filter).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

pub async fn create_asset(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), AppError> {
    auth.require(Permission::AssetsWrite)?;
    let asset = state.assets.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(AssetResponse::from(asset))))
}

pub async fn get_asset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<AssetResponse>, AppError> {
    auth.require(Permission::AssetsRead)?;
    let asset = state
        .assets
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Asset"))?;
    Ok(Json(AssetResponse::from(asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateAssetRequest>,
) -> Result<Json<AssetResponse>, AppError> {
    auth.require(Permission::AssetsWrite)?;
    let asset = state.assets.update(&id, auth.org_id(), payload).await?;
    Ok(Json(AssetResponse::from(asset)))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::AssetsWrite)?;
    state.assets.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Book value and warranty state, today unless `asOf` is given.
pub async fn depreciation(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    QueryParams(query): QueryParams<DepreciationQuery>,
) -> Result<Json<AssetValuationResponse>, AppError> {
    auth.require(Permission::AssetsRead)?;
    let as_of = query.as_of.unwrap_or_else(Utc::now);
    let valuation = state.assets.valuation(&id, auth.org_id(), as_of).await?;
    Ok(Json(valuation))
}
