use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        CreateUtilityPaymentRequest, ReconcileRequest, RefundRequest,
        UpdateUtilityPaymentRequest, UtilityPaymentResponse,
    },
    middleware::AuthContext,
    models::Permission,
    services::UtilityPaymentFilter,
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_utility_payments(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<UtilityPaymentFilter>,
) -> Result<Json<Vec<UtilityPaymentResponse>>, AppError> {
    auth.require(Permission::BillingRead)?;
    let payments = state.utility_payments.list(auth.org_id(), &filter).await?;
    Ok(Json(
        payments.into_iter().map(UtilityPaymentResponse::from).collect(),
    ))
}

pub async fn create_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateUtilityPaymentRequest>,
) -> Result<(StatusCode, Json<UtilityPaymentResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state.utility_payments.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(UtilityPaymentResponse::from(payment))))
}

pub async fn get_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<UtilityPaymentResponse>, AppError> {
    auth.require(Permission::BillingRead)?;
    let payment = state
        .utility_payments
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Utility payment"))?;
    Ok(Json(UtilityPaymentResponse::from(payment)))
}

pub async fn update_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUtilityPaymentRequest>,
) -> Result<Json<UtilityPaymentResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .utility_payments
        .update(&id, auth.org_id(), payload)
        .await?;
    Ok(Json(UtilityPaymentResponse::from(payment)))
}

pub async fn delete_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::BillingWrite)?;
    state.utility_payments.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refund_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RefundRequest>,
) -> Result<Json<UtilityPaymentResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .utility_payments
        .refund(&id, auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok(Json(UtilityPaymentResponse::from(payment)))
}

pub async fn reconcile_utility_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ReconcileRequest>,
) -> Result<Json<UtilityPaymentResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .utility_payments
        .reconcile(&id, auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok(Json(UtilityPaymentResponse::from(payment)))
}
