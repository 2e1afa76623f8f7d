//! Tenants and their leases.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::not_found;
use crate::{
    dtos::{
        CreateLeaseRequest, CreateTenantRequest, InvoiceResponse, LeaseResponse,
        TenantResponse, TerminateLeaseRequest, UpdateLeaseRequest, UpdateTenantRequest,
    },
    middleware::AuthContext,
    models::Permission,
    services::{LeaseFilter, TenantFilter},
    utils::{QueryParams, ValidatedJson},
    AppState,
};

pub async fn list_tenants(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<TenantFilter>,
) -> Result<Json<Vec<TenantResponse>>, AppError> {
    auth.require(Permission::TenantsRead)?;
    let tenants = state.tenants.list(auth.org_id(), &filter).await?;
    Ok(Json(tenants.into_iter().map(TenantResponse::from).collect()))
}

pub async fn create_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateTenantRequest>,
) -> Result<(StatusCode, Json<TenantResponse>), AppError> {
    auth.require(Permission::TenantsWrite)?;
    let tenant = state.tenants.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(TenantResponse::from(tenant))))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<TenantResponse>, AppError> {
    auth.require(Permission::TenantsRead)?;
    let tenant = state
        .tenants
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Tenant"))?;
    Ok(Json(TenantResponse::from(tenant)))
}

pub async fn update_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateTenantRequest>,
) -> Result<Json<TenantResponse>, AppError> {
    auth.require(Permission::TenantsWrite)?;
    let tenant = state.tenants.update(&id, auth.org_id(), payload).await?;
    Ok(Json(TenantResponse::from(tenant)))
}

pub async fn delete_tenant(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::TenantsWrite)?;
    state.tenants.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn tenant_leases(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<LeaseResponse>>, AppError> {
    auth.require(Permission::LeasesRead)?;
    state
        .tenants
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Tenant"))?;
    let leases = state.leases.find_by_tenant(&id, auth.org_id()).await?;
    Ok(Json(leases.into_iter().map(LeaseResponse::from).collect()))
}

pub async fn list_leases(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<LeaseFilter>,
) -> Result<Json<Vec<LeaseResponse>>, AppError> {
    auth.require(Permission::LeasesRead)?;
    let leases = state.leases.list(auth.org_id(), &filter).await?;
    Ok(Json(leases.into_iter().map(LeaseResponse::from).collect()))
}

pub async fn create_lease(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateLeaseRequest>,
) -> Result<(StatusCode, Json<LeaseResponse>), AppError> {
    auth.require(Permission::LeasesWrite)?;
    let lease = state.leases.create(auth.org_id(), payload).await?;
    Ok((StatusCode::CREATED, Json(LeaseResponse::from(lease))))
}

pub async fn get_lease(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<LeaseResponse>, AppError> {
    auth.require(Permission::LeasesRead)?;
    let lease = state
        .leases
        .find_by_id(&id, Some(auth.org_id()))
        .await?
        .ok_or_else(|| not_found("Lease"))?;
    Ok(Json(LeaseResponse::from(lease)))
}

pub async fn update_lease(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateLeaseRequest>,
) -> Result<Json<LeaseResponse>, AppError> {
    auth.require(Permission::LeasesWrite)?;
    let lease = state.leases.update(&id, auth.org_id(), payload).await?;
    Ok(Json(LeaseResponse::from(lease)))
}

pub async fn terminate_lease(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<TerminateLeaseRequest>,
) -> Result<Json<LeaseResponse>, AppError> {
    auth.require(Permission::LeasesWrite)?;
    let lease = state.leases.terminate(&id, auth.org_id(), payload).await?;
    Ok(Json(LeaseResponse::from(lease)))
}

pub async fn delete_lease(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth.require(Permission::LeasesWrite)?;
    state.leases.delete(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bill the lease's next period from its rent terms.
pub async fn generate_lease_invoice(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;
    let invoice = state.invoices.generate_for_lease(&id, auth.org_id()).await?;
    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}
