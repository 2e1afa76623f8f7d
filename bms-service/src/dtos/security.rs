use crate::models::{
    AccessPermission, AccessStatus, HolderType, IncidentStatus, SecurityIncident, SecurityStaff,
    Severity, Shift, StaffStatus, TimeWindow, VisitorLog, VisitorStatus,
};
use crate::utils::time::{flexible, flexible_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessPermissionRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub holder_type: HolderType,
    pub holder_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub holder_name: String,
    #[validate(length(min = 1, max = 50))]
    pub access_level: String,
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(deserialize_with = "flexible")]
    pub valid_from: DateTime<Utc>,
    #[serde(deserialize_with = "flexible")]
    pub valid_until: DateTime<Utc>,
    pub time_window: Option<TimeWindow>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccessPermissionRequest {
    #[validate(length(min = 1, max = 200))]
    pub holder_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub access_level: Option<String>,
    pub areas: Option<Vec<String>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub valid_until: Option<DateTime<Utc>>,
    pub time_window: Option<TimeWindow>,
    #[serde(default)]
    pub clear_time_window: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevokePermissionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckQuery {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub at: Option<DateTime<Utc>>,
    pub area: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckResponse {
    pub permission_id: String,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub granted: bool,
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermissionResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub holder_type: HolderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_id: Option<String>,
    pub holder_name: String,
    pub access_level: String,
    pub areas: Vec<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    pub status: AccessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoke_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccessPermission> for AccessPermissionResponse {
    fn from(p: AccessPermission) -> Self {
        Self {
            id: p.id,
            organization_id: p.organization_id,
            building_id: p.building_id,
            holder_type: p.holder_type,
            holder_id: p.holder_id,
            holder_name: p.holder_name,
            access_level: p.access_level,
            areas: p.areas,
            valid_from: p.valid_from,
            valid_until: p.valid_until,
            time_window: p.time_window,
            status: p.status,
            revoked_at: p.revoked_at,
            revoke_reason: p.revoke_reason,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncidentRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub unit_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub incident_type: String,
    pub severity: Severity,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub occurred_at: Option<DateTime<Utc>>,
    pub assigned_staff_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncidentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub incident_type: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<IncidentStatus>,
    pub assigned_staff_id: Option<String>,
    #[validate(length(max = 4000))]
    pub resolution: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub title: String,
    pub description: String,
    pub incident_type: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub occurred_at: DateTime<Utc>,
    pub reported_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_staff_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SecurityIncident> for IncidentResponse {
    fn from(i: SecurityIncident) -> Self {
        Self {
            id: i.id,
            organization_id: i.organization_id,
            building_id: i.building_id,
            unit_id: i.unit_id,
            title: i.title,
            description: i.description,
            incident_type: i.incident_type,
            severity: i.severity,
            status: i.status,
            occurred_at: i.occurred_at,
            reported_by: i.reported_by,
            assigned_staff_id: i.assigned_staff_id,
            resolution: i.resolution,
            resolved_at: i.resolved_at,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitorRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    #[validate(length(min = 1, max = 200))]
    pub visitor_name: String,
    #[validate(length(max = 30))]
    pub visitor_phone: Option<String>,
    #[validate(length(max = 50))]
    pub id_number: Option<String>,
    pub host_tenant_id: Option<String>,
    pub unit_id: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub purpose: String,
    #[validate(length(max = 50))]
    pub badge_number: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub check_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisitorRequest {
    #[validate(length(min = 1, max = 200))]
    pub visitor_name: Option<String>,
    #[validate(length(max = 30))]
    pub visitor_phone: Option<String>,
    #[validate(length(max = 50))]
    pub id_number: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub purpose: Option<String>,
    #[validate(length(max = 50))]
    pub badge_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub check_out_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub visitor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub purpose: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_number: Option<String>,
    pub check_in_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_at: Option<DateTime<Utc>>,
    pub status: VisitorStatus,
    pub logged_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VisitorLog> for VisitorResponse {
    fn from(v: VisitorLog) -> Self {
        Self {
            id: v.id,
            organization_id: v.organization_id,
            building_id: v.building_id,
            visitor_name: v.visitor_name,
            visitor_phone: v.visitor_phone,
            id_number: v.id_number,
            host_tenant_id: v.host_tenant_id,
            unit_id: v.unit_id,
            purpose: v.purpose,
            badge_number: v.badge_number,
            check_in_at: v.check_in_at,
            check_out_at: v.check_out_at,
            status: v.status,
            logged_by: v.logged_by,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 30))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub building_ids: Vec<String>,
    pub shift: Option<Shift>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub employee_id: Option<String>,
    pub building_ids: Option<Vec<String>>,
    pub shift: Option<Shift>,
    pub status: Option<StaffStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffResponse {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    pub building_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
    pub status: StaffStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SecurityStaff> for StaffResponse {
    fn from(s: SecurityStaff) -> Self {
        Self {
            id: s.id,
            organization_id: s.organization_id,
            name: s.name,
            phone: s.phone,
            email: s.email,
            employee_id: s.employee_id,
            building_ids: s.building_ids,
            shift: s.shift,
            status: s.status,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
