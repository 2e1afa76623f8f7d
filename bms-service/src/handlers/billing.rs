//! Invoices, rent payments and Chapa checkout.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        ChapaInitializeRequest, ChapaInitializeResponse, ChapaVerifyResponse,
        CreateInvoiceRequest, CreatePaymentRequest, InvoiceResponse, MarkOverdueResponse,
        PaymentResponse, ReconcileRequest, RefundRequest, UpdateInvoiceRequest,
    },
    middleware::AuthContext,
    models::Permission,
    services::{InvoiceFilter, PaymentFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<InvoiceFilter>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    auth.require(Permission::BillingRead)?;
    let invoices = state.invoices.list(auth.org_id(), &filter).await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;
    let invoice = state.invoices.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.require(Permission::BillingRead)?;
    let invoice = state
        .invoices
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Invoice"))?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let invoice = state.invoices.update(&id, auth.org_id(), payload).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::BillingWrite)?;
    state.invoices.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let invoice = state.invoices.send(&id, auth.org_id()).await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn mark_overdue(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MarkOverdueResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let updated = state.invoices.mark_overdue(auth.org_id()).await?;
    Ok(Json(MarkOverdueResponse { updated }))
}

pub async fn invoice_payments(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    auth.require(Permission::BillingRead)?;
    state
        .invoices
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Invoice"))?;
    let payments = state.payments.find_by_invoice(&id, auth.org_id()).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

pub async fn list_payments(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<PaymentFilter>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    auth.require(Permission::BillingRead)?;
    let payments = state.payments.list(auth.org_id(), &filter).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

/// Record a manual payment; the invoice is settled from its completed payments.
pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .payments
        .record(auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(PaymentResponse::from(payment))))
}

pub async fn get_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.require(Permission::BillingRead)?;
    let payment = state
        .payments
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Payment"))?;
    Ok(Json(PaymentResponse::from(payment)))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::BillingWrite)?;
    state.payments.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refund_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RefundRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .payments
        .refund(&id, auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok(Json(PaymentResponse::from(payment)))
}

pub async fn reconcile_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ReconcileRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .payments
        .reconcile(&id, auth.org_id(), auth.user_id(), payload)
        .await?;
    Ok(Json(PaymentResponse::from(payment)))
}

pub async fn chapa_initialize(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<ChapaInitializeRequest>,
) -> Result<(StatusCode, Json<ChapaInitializeResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;
    let payment = state
        .payments
        .chapa_initialize(&state.chapa, auth.org_id(), auth.user_id(), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ChapaInitializeResponse {
            tx_ref: payment.tx_ref.clone().unwrap_or_default(),
            checkout_url: payment.checkout_url.clone().unwrap_or_default(),
            payment_id: payment.id,
        }),
    ))
}

pub async fn chapa_verify(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(tx_ref): Path<String>,
) -> Result<Json<ChapaVerifyResponse>, AppError> {
    auth.require(Permission::BillingRead)?;
    let payment = state
        .payments
        .chapa_verify(&state.chapa, auth.org_id(), &tx_ref)
        .await?;

    Ok(Json(ChapaVerifyResponse {
        tx_ref,
        status: payment.status,
        payment: PaymentResponse::from(payment),
    }))
}
