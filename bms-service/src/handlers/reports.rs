//! Reports, CSV export and the dashboard summary.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::{
    dtos::{
        AgingQuery, AgingReport, DashboardSummary, ExportQuery, PeriodQuery,
        ReconciliationReport, ReliabilityQuery, ReliabilityReport,
    },
    middleware::AuthContext,
    models::Permission,
    utils::QueryParams,
    AppState,
};

pub async fn aging(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<AgingQuery>,
) -> Result<Json<AgingReport>, AppError> {
    auth.require(Permission::ReportsRead)?;
    let as_of = query.as_of.unwrap_or_else(Utc::now);
    let report = state.reports.aging(auth.org_id(), as_of).await?;
    Ok(Json(report))
}

pub async fn reconciliation(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<PeriodQuery>,
) -> Result<Json<ReconciliationReport>, AppError> {
    auth.require(Permission::ReportsRead)?;
    let report = state
        .reports
        .reconciliation(auth.org_id(), query.from, query.to)
        .await?;
    Ok(Json(report))
}

pub async fn reliability(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<ReliabilityQuery>,
) -> Result<Json<ReliabilityReport>, AppError> {
    auth.require(Permission::ReportsRead)?;
    let report = state
        .reports
        .reliability(
            auth.org_id(),
            query.building_id.as_deref(),
            query.from,
            query.to,
        )
        .await?;
    Ok(Json(report))
}

/// CSV download of one of the billing or tenant reports.
pub async fn export(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(query): QueryParams<ExportQuery>,
) -> Result<Response, AppError> {
    auth.require(Permission::ReportsRead)?;
    let now = Utc::now();
    let csv = state
        .reports
        .export(
            auth.org_id(),
            query.report,
            query.from,
            query.to,
            query.as_of.unwrap_or(now),
        )
        .await?;

    let file_name = format!("{}-{}.csv", query.report.file_stem(), now.format("%Y%m%d"));
    tracing::info!(
        organization_id = %auth.org_id(),
        report = query.report.file_stem(),
        bytes = csv.len(),
        "Report exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        csv,
    )
        .into_response())
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<DashboardSummary>, AppError> {
    auth.require(Permission::ReportsRead)?;
    let summary = state.reports.dashboard(auth.org_id()).await?;
    Ok(Json(summary))
}
