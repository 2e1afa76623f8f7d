//! Preventive maintenance tasks and work orders.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        CompleteTaskResponse, CreateMaintenanceTaskRequest, CreateWorkOrderRequest,
        MaintenanceTaskResponse, RefreshStatusResponse, UpdateMaintenanceTaskRequest,
        UpdateWorkOrderRequest, WorkOrderResponse,
    },
    middleware::AuthContext,
    models::Permission,
    services::{TaskFilter, WorkOrderFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<TaskFilter>,
) -> Result<Json<Vec<MaintenanceTaskResponse>>, AppError> {
    auth.require(Permission::MaintenanceRead)?;
    let tasks = state.maintenance.list(auth.org_id(), &filter).await?;
    Ok(Json(
        tasks.into_iter().map(MaintenanceTaskResponse::from).collect(),
    ))
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateMaintenanceTaskRequest>,
) -> Result<(StatusCode, Json<MaintenanceTaskResponse>), AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let task = state.maintenance.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(MaintenanceTaskResponse::from(task))))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<MaintenanceTaskResponse>, AppError> {
    auth.require(Permission::MaintenanceRead)?;
    let task = state
        .maintenance
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Maintenance task"))?;
    Ok(Json(MaintenanceTaskResponse::from(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMaintenanceTaskRequest>,
) -> Result<Json<MaintenanceTaskResponse>, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let task = state.maintenance.update(&id, auth.org_id(), payload).await?;
    Ok(Json(MaintenanceTaskResponse::from(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    state.maintenance.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Close the task and schedule the next occurrence.
pub async fn complete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<CompleteTaskResponse>, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let (task, next_task) = state.maintenance.complete(&id, auth.org_id()).await?;
    Ok(Json(CompleteTaskResponse {
        task: MaintenanceTaskResponse::from(task),
        next_task: next_task.map(MaintenanceTaskResponse::from),
    }))
}

pub async fn refresh_task_status(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<RefreshStatusResponse>, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let result = state.maintenance.refresh_status(auth.org_id()).await?;
    Ok(Json(result))
}

pub async fn list_work_orders(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<WorkOrderFilter>,
) -> Result<Json<Vec<WorkOrderResponse>>, AppError> {
    auth.require(Permission::MaintenanceRead)?;
    let orders = state.work_orders.list(auth.org_id(), &filter).await?;
    Ok(Json(orders.into_iter().map(WorkOrderResponse::from).collect()))
}

pub async fn create_work_order(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<WorkOrderResponse>), AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let order = state
        .work_orders
        .create(auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(WorkOrderResponse::from(order))))
}

pub async fn get_work_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<WorkOrderResponse>, AppError> {
    auth.require(Permission::MaintenanceRead)?;
    let order = state
        .work_orders
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Work order"))?;
    Ok(Json(WorkOrderResponse::from(order)))
}

pub async fn update_work_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateWorkOrderRequest>,
) -> Result<Json<WorkOrderResponse>, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    let order = state.work_orders.update(&id, auth.org_id(), payload).await?;
    Ok(Json(WorkOrderResponse::from(order)))
}

pub async fn delete_work_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::MaintenanceWrite)?;
    state.work_orders.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
