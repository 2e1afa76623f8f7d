//! Utility meters and their readings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        ConsumptionQuery, ConsumptionSummary, CreateMeterRequest, CreateReadingRequest,
        MeterResponse, ReadingResponse, UpdateMeterRequest, UpdateReadingRequest,
    },
    middleware::AuthContext,
    models::Permission,
    services::{MeterFilter, ReadingFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_meters(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<MeterFilter>,
) -> Result<Json<Vec<MeterResponse>>, AppError> {
    auth.require(Permission::MetersRead)?;
    let meters = state.meters.list(auth.org_id(), &filter).await?;
    Ok(Json(meters.into_iter().map(MeterResponse::from).collect()))
}

pub async fn create_meter(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateMeterRequest>,
) -> Result<(StatusCode, Json<MeterResponse>), AppError> {
    auth.require(Permission::MetersWrite)?;
    let meter = state.meters.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(MeterResponse::from(meter))))
}

pub async fn get_meter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<MeterResponse>, AppError> {
    auth.require(Permission::MetersRead)?;
    let meter = state
        .meters
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Meter"))?;
    Ok(Json(MeterResponse::from(meter)))
}

pub async fn update_meter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMeterRequest>,
) -> Result<Json<MeterResponse>, AppError> {
    auth.require(Permission::MetersWrite)?;
    let meter = state.meters.update(&id, auth.org_id(), payload).await?;
    Ok(Json(MeterResponse::from(meter)))
}

pub async fn delete_meter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::MetersWrite)?;
    state.meters.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_readings(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    QueryParams(filter): QueryParams<ReadingFilter>,
) -> Result<Json<Vec<ReadingResponse>>, AppError> {
    auth.require(Permission::MetersRead)?;
    let readings = state
        .meters
        .list_readings(&id, auth.org_id(), &filter)
        .await?;
    Ok(Json(readings.into_iter().map(ReadingResponse::from).collect()))
}

/// Readings must not go backwards unless `allowDecrease` is set (meter replaced or rolled over).
pub async fn add_reading(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateReadingRequest>,
) -> Result<(StatusCode, Json<ReadingResponse>), AppError> {
    auth.require(Permission::MetersWrite)?;
    let reading = state
        .meters
        .add_reading(&id, auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ReadingResponse::from(reading))))
}

pub async fn update_reading(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateReadingRequest>,
) -> Result<Json<ReadingResponse>, AppError> {
    auth.require(Permission::MetersWrite)?;
    let reading = state
        .meters
        .update_reading(&id, auth.org_id(), payload)
        .await?;
    Ok(Json(ReadingResponse::from(reading)))
}

pub async fn delete_reading(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::MetersWrite)?;
    state.meters.delete_reading(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn consumption(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    QueryParams(query): QueryParams<ConsumptionQuery>,
) -> Result<Json<ConsumptionSummary>, AppError> {
    auth.require(Permission::MetersRead)?;
    let summary = state
        .meters
        .consumption(&id, auth.org_id(), query.from, query.to)
        .await?;
    Ok(Json(summary))
}
