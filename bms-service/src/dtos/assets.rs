use crate::models::{
    Asset, AssetStatus, Depreciation, DepreciationSummary, MaintenanceSchedule, MaintenanceTask,
    Priority, ScheduleType, TaskStatus, Warranty, WorkOrder, WorkOrderStatus, WorkType,
};
use crate::utils::time::{flexible, flexible_opt};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyInput {
    #[validate(length(min = 1, max = 200))]
    pub provider: String,
    #[serde(deserialize_with = "flexible")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "flexible")]
    pub end_date: DateTime<Utc>,
    #[validate(length(max = 2000))]
    pub terms: Option<String>,
}

impl From<WarrantyInput> for Warranty {
    fn from(w: WarrantyInput) -> Self {
        Self {
            provider: w.provider.trim().to_string(),
            start_date: w.start_date,
            end_date: w.end_date,
            terms: w.terms,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    #[validate(range(min = 1, max = 3650))]
    pub interval_days: i64,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub last_service_date: Option<DateTime<Utc>>,
}

impl From<ScheduleInput> for MaintenanceSchedule {
    fn from(s: ScheduleInput) -> Self {
        Self {
            interval_days: s.interval_days,
            last_service_date: s.last_service_date,
            next_service_date: s
                .last_service_date
                .map(|last| last + Duration::days(s.interval_days)),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub unit_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub status: Option<AssetStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub purchase_cost: Option<f64>,
    #[validate(nested)]
    pub warranty: Option<WarrantyInput>,
    pub depreciation: Option<Depreciation>,
    #[validate(nested)]
    pub maintenance_schedule: Option<ScheduleInput>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub unit_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub status: Option<AssetStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub purchase_cost: Option<f64>,
    #[validate(nested)]
    pub warranty: Option<WarrantyInput>,
    pub depreciation: Option<Depreciation>,
    #[validate(nested)]
    pub maintenance_schedule: Option<ScheduleInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarrantyView {
    pub provider: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub interval_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_service_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_service_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: AssetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty: Option<WarrantyView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<Depreciation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_schedule: Option<ScheduleView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(a: Asset) -> Self {
        Self {
            id: a.id,
            organization_id: a.organization_id,
            building_id: a.building_id,
            unit_id: a.unit_id,
            name: a.name,
            category: a.category,
            serial_number: a.serial_number,
            manufacturer: a.manufacturer,
            model: a.model,
            status: a.status,
            purchase_date: a.purchase_date,
            purchase_cost: a.purchase_cost,
            warranty: a.warranty.map(|w| WarrantyView {
                provider: w.provider,
                start_date: w.start_date,
                end_date: w.end_date,
                terms: w.terms,
            }),
            depreciation: a.depreciation,
            maintenance_schedule: a.maintenance_schedule.map(|s| ScheduleView {
                interval_days: s.interval_days,
                last_service_date: s.last_service_date,
                next_service_date: s.next_service_date,
            }),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepreciationQuery {
    #[serde(default, deserialize_with = "flexible_opt")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetValuationResponse {
    pub asset_id: String,
    pub as_of: DateTime<Utc>,
    pub warranty_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<DepreciationSummary>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceTaskRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub asset_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    #[validate(range(min = 1, max = 3650))]
    pub interval_days: Option<i64>,
    pub meter_id: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub usage_interval: Option<f64>,
    #[serde(deserialize_with = "flexible")]
    pub due_date: DateTime<Utc>,
    #[validate(range(min = 0, max = 365))]
    pub lead_days: Option<i64>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenanceTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 3650))]
    pub interval_days: Option<i64>,
    #[validate(range(exclusive_min = 0.0))]
    pub usage_interval: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub due_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, max = 365))]
    pub lead_days: Option<i64>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    pub recurring: Option<bool>,
    /// Only `cancelled` can be set directly; other states are derived.
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTaskResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_interval: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_service_reading: Option<f64>,
    pub due_date: DateTime<Utc>,
    pub lead_days: i64,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub recurring: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MaintenanceTask> for MaintenanceTaskResponse {
    fn from(t: MaintenanceTask) -> Self {
        Self {
            id: t.id,
            organization_id: t.organization_id,
            building_id: t.building_id,
            asset_id: t.asset_id,
            title: t.title,
            description: t.description,
            schedule_type: t.schedule_type,
            interval_days: t.interval_days,
            meter_id: t.meter_id,
            usage_interval: t.usage_interval,
            last_service_reading: t.last_service_reading,
            due_date: t.due_date,
            lead_days: t.lead_days,
            priority: t.priority,
            assigned_to: t.assigned_to,
            status: t.status,
            completed_at: t.completed_at,
            recurring: t.recurring,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteTaskResponse {
    pub task: MaintenanceTaskResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_task: Option<MaintenanceTaskResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatusResponse {
    pub evaluated: usize,
    pub updated: usize,
    pub due: usize,
    pub overdue: usize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub unit_id: Option<String>,
    pub asset_id: Option<String>,
    pub maintenance_task_id: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub work_type: Option<WorkType>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<WorkOrderStatus>,
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub labor_cost: Option<f64>,
    #[validate(range(min = 0.0))]
    pub parts_cost: Option<f64>,
    #[validate(length(max = 4000))]
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_task_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub work_type: WorkType,
    pub priority: Priority,
    pub status: WorkOrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkOrder> for WorkOrderResponse {
    fn from(w: WorkOrder) -> Self {
        Self {
            id: w.id,
            organization_id: w.organization_id,
            building_id: w.building_id,
            unit_id: w.unit_id,
            asset_id: w.asset_id,
            maintenance_task_id: w.maintenance_task_id,
            title: w.title,
            description: w.description,
            category: w.category,
            work_type: w.work_type,
            priority: w.priority,
            status: w.status,
            assigned_to: w.assigned_to,
            requested_by: w.requested_by,
            scheduled_for: w.scheduled_for,
            started_at: w.started_at,
            completed_at: w.completed_at,
            labor_cost: w.labor_cost,
            parts_cost: w.parts_cost,
            resolution_notes: w.resolution_notes,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}
