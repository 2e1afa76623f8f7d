use crate::models::{
    BillingCycle, EmergencyContact, Lease, LeaseStatus, Tenant, TenantStatus,
};
use crate::utils::time::{flexible, flexible_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 32))]
    pub phone: String,
    pub national_id: Option<String>,
    pub company_name: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub move_in_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub company_name: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub move_in_date: Option<DateTime<Utc>>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResponse {
    pub id: String,
    pub organization_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_in_date: Option<DateTime<Utc>>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(t: Tenant) -> Self {
        Self {
            full_name: t.full_name(),
            id: t.id,
            organization_id: t.organization_id,
            first_name: t.first_name,
            last_name: t.last_name,
            email: t.email,
            phone: t.phone,
            national_id: t.national_id,
            company_name: t.company_name,
            emergency_contact: t.emergency_contact,
            move_in_date: t.move_in_date,
            status: t.status,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaseRequest {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub unit_id: String,
    #[serde(deserialize_with = "flexible")]
    pub start_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub rent_amount: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub deposit_amount: f64,
    pub billing_cycle: BillingCycle,
    #[validate(range(min = 1, max = 28))]
    pub payment_due_day: u32,
    /// Only `draft` or `active` are accepted on creation.
    pub status: Option<LeaseStatus>,
    #[validate(length(max = 5000))]
    pub terms: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeaseRequest {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub rent_amount: Option<f64>,
    #[validate(range(min = 0.0))]
    pub deposit_amount: Option<f64>,
    pub billing_cycle: Option<BillingCycle>,
    #[validate(range(min = 1, max = 28))]
    pub payment_due_day: Option<u32>,
    pub status: Option<LeaseStatus>,
    #[validate(length(max = 5000))]
    pub terms: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TerminateLeaseRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub terminated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseResponse {
    pub id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub unit_id: String,
    pub building_id: String,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub rent_amount: f64,
    pub deposit_amount: f64,
    pub billing_cycle: BillingCycle,
    pub payment_due_day: u32,
    pub status: LeaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_billed_through: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Lease> for LeaseResponse {
    fn from(l: Lease) -> Self {
        Self {
            id: l.id,
            organization_id: l.organization_id,
            tenant_id: l.tenant_id,
            unit_id: l.unit_id,
            building_id: l.building_id,
            start_date: l.start_date,
            end_date: l.end_date,
            rent_amount: l.rent_amount,
            deposit_amount: l.deposit_amount,
            billing_cycle: l.billing_cycle,
            payment_due_day: l.payment_due_day,
            status: l.status,
            terms: l.terms,
            last_billed_through: l.last_billed_through,
            terminated_at: l.terminated_at,
            termination_reason: l.termination_reason,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}
