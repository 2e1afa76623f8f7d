use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateWorkOrderRequest, UpdateWorkOrderRequest};
use crate::models::{
    clean_opt, new_id, round_cents, Priority, WorkOrder, WorkOrderStatus, WorkType,
};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderFilter {
    pub building_id: Option<String>,
    pub unit_id: Option<String>,
    pub asset_id: Option<String>,
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<Priority>,
    pub work_type: Option<WorkType>,
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct WorkOrderRepository {
    db: MongoDb,
}

impl WorkOrderRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(
        &self,
        org_id: &str,
        requested_by: &str,
        req: CreateWorkOrderRequest,
    ) -> ServiceResult<WorkOrder> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;

        let unit_id = clean_opt(req.unit_id);
        if let Some(id) = &unit_id {
            let unit = scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
            if unit.building_id != building.id {
                return Err(ServiceError::validation(
                    "Unit does not belong to the work order's building",
                ));
            }
        }
        let asset_id = clean_opt(req.asset_id);
        if let Some(id) = &asset_id {
            let asset = scoped::reference_in_org(&self.db.assets(), id, org_id, "Asset").await?;
            if asset.building_id != building.id {
                return Err(ServiceError::validation(
                    "Asset does not belong to the work order's building",
                ));
            }
        }
        let maintenance_task_id = clean_opt(req.maintenance_task_id);
        if let Some(id) = &maintenance_task_id {
            scoped::reference_in_org(&self.db.maintenance_tasks(), id, org_id, "Maintenance task")
                .await?;
        }

        let work_type = req.work_type.unwrap_or(if maintenance_task_id.is_some() {
            WorkType::Preventive
        } else {
            WorkType::Corrective
        });

        let now = Utc::now();
        let order = WorkOrder {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            unit_id,
            asset_id,
            maintenance_task_id,
            title: req.title.trim().to_string(),
            description: clean_opt(req.description),
            category: req.category.trim().to_lowercase(),
            work_type,
            priority: req.priority.unwrap_or(Priority::Medium),
            status: WorkOrderStatus::Pending,
            assigned_to: clean_opt(req.assigned_to),
            requested_by: Some(requested_by.to_string()),
            scheduled_for: req.scheduled_for,
            started_at: None,
            completed_at: None,
            labor_cost: None,
            parts_cost: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        order.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.work_orders(), &order, "Work order").await?;
        tracing::info!(
            work_order_id = %order.id,
            organization_id = %org_id,
            work_type = ?order.work_type,
            "Work order created"
        );
        Ok(order)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<WorkOrder>> {
        scoped::find_in_org(&self.db.work_orders(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &WorkOrderFilter) -> ServiceResult<Vec<WorkOrder>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(unit_id) = &filter.unit_id {
            query.insert("unitId", unit_id);
        }
        if let Some(asset_id) = &filter.asset_id {
            query.insert("assetId", asset_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(priority) = &filter.priority {
            query.insert("priority", scoped::to_bson(priority)?);
        }
        if let Some(kind) = &filter.work_type {
            query.insert("workType", scoped::to_bson(kind)?);
        }
        if let Some(assignee) = &filter.assigned_to {
            query.insert("assignedTo", assignee);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("createdAt", range);
        }
        scoped::find_many(&self.db.work_orders(), query, doc! { "createdAt": -1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateWorkOrderRequest,
    ) -> ServiceResult<WorkOrder> {
        let mut order =
            scoped::require_in_org(&self.db.work_orders(), id, org_id, "Work order").await?;

        if let Some(title) = clean_opt(req.title) {
            order.title = title;
        }
        if req.description.is_some() {
            order.description = clean_opt(req.description);
        }
        if let Some(category) = clean_opt(req.category) {
            order.category = category.to_lowercase();
        }
        if let Some(priority) = req.priority {
            order.priority = priority;
        }
        if req.assigned_to.is_some() {
            order.assigned_to = clean_opt(req.assigned_to);
        }
        if req.scheduled_for.is_some() {
            order.scheduled_for = req.scheduled_for;
        }
        if let Some(cost) = req.labor_cost {
            order.labor_cost = Some(round_cents(cost));
        }
        if let Some(cost) = req.parts_cost {
            order.parts_cost = Some(round_cents(cost));
        }
        if req.resolution_notes.is_some() {
            order.resolution_notes = clean_opt(req.resolution_notes);
        }

        let now = Utc::now();
        if let Some(status) = req.status {
            order
                .transition(status, now)
                .map_err(ServiceError::InvalidState)?;
        }
        order.validate_rules().map_err(ServiceError::Validation)?;
        order.updated_at = now;

        scoped::replace_in_org(&self.db.work_orders(), id, org_id, &order, "Work order").await?;
        tracing::info!(
            work_order_id = %id,
            organization_id = %org_id,
            status = ?order.status,
            "Work order updated"
        );
        Ok(order)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.work_orders(), id, org_id, "Work order").await?;
        tracing::info!(work_order_id = %id, organization_id = %org_id, "Work order deleted");
        Ok(())
    }
}
