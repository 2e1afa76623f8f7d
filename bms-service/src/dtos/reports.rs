use crate::models::PaymentMethod;
use crate::utils::time::flexible_opt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingQuery {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityQuery {
    pub building_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Invoices,
    Payments,
    Aging,
    Tenants,
    UtilityPayments,
}

impl ExportKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportKind::Invoices => "invoices",
            ExportKind::Payments => "payments",
            ExportKind::Aging => "aging",
            ExportKind::Tenants => "tenants",
            ExportKind::UtilityPayments => "utility_payments",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub report: ExportKind,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub as_of: Option<DateTime<Utc>>,
}

/// Outstanding amounts per days-past-due bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgingAmounts {
    pub current: f64,
    #[serde(rename = "1-30")]
    pub days_1_30: f64,
    #[serde(rename = "31-60")]
    pub days_31_60: f64,
    #[serde(rename = "61-90")]
    pub days_61_90: f64,
    #[serde(rename = "90+")]
    pub days_90_plus: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAging {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    pub invoices: usize,
    pub amounts: AgingAmounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgingReport {
    pub as_of: DateTime<Utc>,
    pub invoices: usize,
    pub totals: AgingAmounts,
    pub tenants: Vec<TenantAging>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodTotals {
    pub method: PaymentMethod,
    pub count: usize,
    pub reconciled_amount: f64,
    pub unreconciled_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSection {
    pub reconciled_count: usize,
    pub reconciled_amount: f64,
    pub unreconciled_count: usize,
    pub unreconciled_amount: f64,
    pub by_method: Vec<MethodTotals>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    pub payments: ReconciliationSection,
    pub utility_payments: ReconciliationSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReliability {
    pub asset_id: String,
    pub asset_name: String,
    pub failures: usize,
    pub repaired: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mttr_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtbf_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreventiveCompliance {
    pub tasks_due: usize,
    pub completed_on_time: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub window_hours: f64,
    pub assets: Vec<AssetReliability>,
    pub preventive: PreventiveCompliance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub buildings: u64,
    pub units: u64,
    pub occupied_units: u64,
    pub occupancy_rate: f64,
    pub active_tenants: u64,
    pub active_leases: u64,
    pub outstanding_balance: f64,
    pub overdue_invoices: u64,
    pub open_work_orders: u64,
    pub open_incidents: u64,
    pub maintenance_due: u64,
}
