//! Buildings, units and floor-based rent repricing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        BuildingResponse, CreateBuildingRequest, CreateUnitRequest, RentBulkUpdateRequest,
        RentBulkUpdateResponse, UnitResponse, UpdateBuildingRequest, UpdateUnitRequest,
    },
    middleware::AuthContext,
    models::{Permission, RentPolicy},
    services::{BuildingFilter, UnitFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_buildings(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<BuildingFilter>,
) -> Result<Json<Vec<BuildingResponse>>, AppError> {
    auth.require(Permission::BuildingsRead)?;
    let buildings = state.buildings.list(auth.org_id(), &filter).await?;
    Ok(Json(buildings.into_iter().map(BuildingResponse::from).collect()))
}

pub async fn create_building(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateBuildingRequest>,
) -> Result<(StatusCode, Json<BuildingResponse>), AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let building = state.buildings.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(BuildingResponse::from(building))))
}

pub async fn get_building(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<BuildingResponse>, AppError> {
    auth.require(Permission::BuildingsRead)?;
    let building = state
        .buildings
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Building"))?;
    Ok(Json(BuildingResponse::from(building)))
}

pub async fn update_building(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateBuildingRequest>,
) -> Result<Json<BuildingResponse>, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let building = state.buildings.update(&id, auth.org_id(), payload).await?;
    Ok(Json(BuildingResponse::from(building)))
}

pub async fn delete_building(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    state.buildings.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn building_units(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<UnitResponse>>, AppError> {
    auth.require(Permission::BuildingsRead)?;
    state
        .buildings
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Building"))?;
    let units = state.buildings.units_for_building(&id, auth.org_id()).await?;
    Ok(Json(units.into_iter().map(UnitResponse::from).collect()))
}

pub async fn set_rent_policy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(policy): Json<RentPolicy>,
) -> Result<Json<BuildingResponse>, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let building = state
        .buildings
        .set_rent_policy(&id, auth.org_id(), policy)
        .await?;
    Ok(Json(BuildingResponse::from(building)))
}

pub async fn list_units(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<UnitFilter>,
) -> Result<Json<Vec<UnitResponse>>, AppError> {
    auth.require(Permission::BuildingsRead)?;
    let units = state.buildings.list_units(auth.org_id(), &filter).await?;
    Ok(Json(units.into_iter().map(UnitResponse::from).collect()))
}

pub async fn create_unit(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateUnitRequest>,
) -> Result<(StatusCode, Json<UnitResponse>), AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let unit = state.buildings.create_unit(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(UnitResponse::from(unit))))
}

pub async fn get_unit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<UnitResponse>, AppError> {
    auth.require(Permission::BuildingsRead)?;
    let unit = state
        .buildings
        .find_unit(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Unit"))?;
    Ok(Json(UnitResponse::from(unit)))
}

pub async fn update_unit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUnitRequest>,
) -> Result<Json<UnitResponse>, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let unit = state.buildings.update_unit(&id, auth.org_id(), payload).await?;
    Ok(Json(UnitResponse::from(unit)))
}

pub async fn delete_unit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    state.buildings.delete_unit(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reprice a building's units by floor. `dryRun` returns the plan without writing.
pub async fn bulk_update_rent(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<RentBulkUpdateRequest>,
) -> Result<Json<RentBulkUpdateResponse>, AppError> {
    auth.require(Permission::BuildingsWrite)?;
    let result = state.rent.bulk_update(auth.org_id(), payload).await?;
    tracing::info!(
        building_id = %result.building_id,
        updated = result.updated,
        dry_run = result.dry_run,
        "Rent bulk update processed"
    );
    Ok(Json(result))
}
