use super::assets::AssetRepository;
use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::notifications::{NewNotification, NotificationRepository};
use super::scoped;
use crate::dtos::{
    CreateMaintenanceTaskRequest, RefreshStatusResponse, UpdateMaintenanceTaskRequest,
};
use crate::models::{
    clean_opt, new_id, MaintenanceTask, NotificationKind, Priority, ScheduleType, TaskStatus,
};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_LEAD_DAYS: i64 = 7;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub building_id: Option<String>,
    pub asset_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub due_before: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct MaintenanceRepository {
    db: MongoDb,
    assets: AssetRepository,
    notifications: NotificationRepository,
}

impl MaintenanceRepository {
    pub fn new(db: &MongoDb, assets: AssetRepository, notifications: NotificationRepository) -> Self {
        Self {
            db: db.clone(),
            assets,
            notifications,
        }
    }

    /// Latest reading of the meter driving a usage-based task.
    async fn meter_reading(&self, org_id: &str, meter_id: Option<&str>) -> ServiceResult<Option<f64>> {
        let Some(meter_id) = meter_id else {
            return Ok(None);
        };
        let meter = scoped::find_in_org(&self.db.meters(), meter_id, Some(org_id)).await?;
        Ok(meter.and_then(|m| m.last_reading))
    }

    pub async fn create(
        &self,
        org_id: &str,
        req: CreateMaintenanceTaskRequest,
    ) -> ServiceResult<MaintenanceTask> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;

        let asset_id = clean_opt(req.asset_id);
        if let Some(id) = &asset_id {
            let asset = scoped::reference_in_org(&self.db.assets(), id, org_id, "Asset").await?;
            if asset.building_id != building.id {
                return Err(ServiceError::validation(
                    "Asset does not belong to the task's building",
                ));
            }
        }

        let meter_id = clean_opt(req.meter_id);
        let mut last_service_reading = None;
        if let Some(id) = &meter_id {
            let meter = scoped::reference_in_org(&self.db.meters(), id, org_id, "Meter").await?;
            if meter.building_id != building.id {
                return Err(ServiceError::validation(
                    "Meter does not belong to the task's building",
                ));
            }
            last_service_reading = meter.last_reading;
        }

        let now = Utc::now();
        let mut task = MaintenanceTask {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            asset_id,
            title: req.title.trim().to_string(),
            description: clean_opt(req.description),
            schedule_type: req.schedule_type,
            interval_days: req.interval_days,
            meter_id,
            usage_interval: req.usage_interval,
            last_service_reading,
            due_date: req.due_date,
            lead_days: req.lead_days.unwrap_or(DEFAULT_LEAD_DAYS),
            priority: req.priority.unwrap_or(Priority::Medium),
            assigned_to: clean_opt(req.assigned_to),
            status: TaskStatus::Pending,
            completed_at: None,
            recurring: req.recurring,
            created_at: now,
            updated_at: now,
        };
        task.validate_rules().map_err(ServiceError::Validation)?;
        task.status = task.evaluate_status(now, task.last_service_reading);

        scoped::insert(&self.db.maintenance_tasks(), &task, "Maintenance task").await?;
        tracing::info!(
            task_id = %task.id,
            organization_id = %org_id,
            status = ?task.status,
            "Maintenance task created"
        );
        Ok(task)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        org_id: Option<&str>,
    ) -> ServiceResult<Option<MaintenanceTask>> {
        scoped::find_in_org(&self.db.maintenance_tasks(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &TaskFilter) -> ServiceResult<Vec<MaintenanceTask>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
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
        if let Some(before) = filter.due_before {
            query.insert("dueDate", doc! { "$lte": scoped::bson_date(before) });
        }
        scoped::find_many(&self.db.maintenance_tasks(), query, doc! { "dueDate": 1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateMaintenanceTaskRequest,
    ) -> ServiceResult<MaintenanceTask> {
        let mut task =
            scoped::require_in_org(&self.db.maintenance_tasks(), id, org_id, "Maintenance task")
                .await?;
        if task.status.is_closed() {
            return Err(ServiceError::invalid_state(
                "Completed or cancelled tasks cannot be edited",
            ));
        }

        if let Some(title) = clean_opt(req.title) {
            task.title = title;
        }
        if req.description.is_some() {
            task.description = clean_opt(req.description);
        }
        if req.interval_days.is_some() {
            task.interval_days = req.interval_days;
        }
        if req.usage_interval.is_some() {
            task.usage_interval = req.usage_interval;
        }
        let rescheduled = req.due_date.is_some() || req.lead_days.is_some();
        if let Some(due) = req.due_date {
            task.due_date = due;
        }
        if let Some(lead) = req.lead_days {
            task.lead_days = lead;
        }
        if let Some(priority) = req.priority {
            task.priority = priority;
        }
        if req.assigned_to.is_some() {
            task.assigned_to = clean_opt(req.assigned_to);
        }
        if let Some(recurring) = req.recurring {
            task.recurring = recurring;
        }
        task.validate_rules().map_err(ServiceError::Validation)?;

        let now = Utc::now();
        match req.status {
            Some(TaskStatus::Cancelled) => task.status = TaskStatus::Cancelled,
            Some(TaskStatus::Completed) => {
                return Err(ServiceError::invalid_state(
                    "Use the complete action to complete a task",
                ))
            }
            Some(_) => {
                return Err(ServiceError::validation(
                    "Only cancellation can be set directly",
                ))
            }
            None => {}
        }
        if rescheduled && !task.status.is_closed() {
            // A new due date restarts the lifecycle.
            task.status = TaskStatus::Pending;
            let reading = self.meter_reading(org_id, task.meter_id.as_deref()).await?;
            task.status = task.evaluate_status(now, reading);
        }
        task.updated_at = now;

        scoped::replace_in_org(&self.db.maintenance_tasks(), id, org_id, &task, "Maintenance task")
            .await?;
        tracing::info!(task_id = %id, organization_id = %org_id, status = ?task.status, "Maintenance task updated");
        Ok(task)
    }

    /// Complete a task, scheduling the next occurrence of a recurring one.
    pub async fn complete(
        &self,
        id: &str,
        org_id: &str,
    ) -> ServiceResult<(MaintenanceTask, Option<MaintenanceTask>)> {
        let mut task =
            scoped::require_in_org(&self.db.maintenance_tasks(), id, org_id, "Maintenance task")
                .await?;
        if task.status.is_closed() {
            return Err(ServiceError::invalid_state(format!(
                "Task is already {:?}",
                task.status
            )));
        }

        let reading = match task.schedule_type {
            ScheduleType::UsageBased => self.meter_reading(org_id, task.meter_id.as_deref()).await?,
            ScheduleType::TimeBased => None,
        };
        let now = Utc::now();
        let next = task.complete(now, reading);

        scoped::replace_in_org(&self.db.maintenance_tasks(), id, org_id, &task, "Maintenance task")
            .await?;
        if let Some(next) = &next {
            scoped::insert(&self.db.maintenance_tasks(), next, "Maintenance task").await?;
        }
        if let Some(asset_id) = &task.asset_id {
            if let Err(e) = self.assets.record_service(asset_id, org_id, now).await {
                tracing::warn!(error = %e, asset_id = %asset_id, "Failed to stamp asset service date");
            }
        }

        tracing::info!(
            task_id = %id,
            organization_id = %org_id,
            next_task_id = next.as_ref().map(|t| t.id.as_str()).unwrap_or(""),
            "Maintenance task completed"
        );
        Ok((task, next))
    }

    /// Re-evaluate every open task against the clock and its meter.
    pub async fn refresh_status(&self, org_id: &str) -> ServiceResult<RefreshStatusResponse> {
        let query = doc! {
            "organizationId": org_id,
            "status": { "$in": ["pending", "due", "overdue"] },
        };
        let tasks: Vec<MaintenanceTask> =
            scoped::find_many(&self.db.maintenance_tasks(), query, doc! { "dueDate": 1 }).await?;

        let now = Utc::now();
        let mut readings: HashMap<String, Option<f64>> = HashMap::new();
        let mut report = RefreshStatusResponse {
            evaluated: tasks.len(),
            updated: 0,
            due: 0,
            overdue: 0,
        };

        for mut task in tasks {
            let reading = match task.meter_id.clone() {
                Some(meter_id) => match readings.get(&meter_id) {
                    Some(cached) => *cached,
                    None => {
                        let value = self.meter_reading(org_id, Some(&meter_id)).await?;
                        readings.insert(meter_id, value);
                        value
                    }
                },
                None => None,
            };

            let status = task.evaluate_status(now, reading);
            match status {
                TaskStatus::Due => report.due += 1,
                TaskStatus::Overdue => report.overdue += 1,
                _ => {}
            }
            if status == task.status {
                continue;
            }

            task.status = status;
            task.updated_at = now;
            scoped::replace_in_org(
                &self.db.maintenance_tasks(),
                &task.id,
                org_id,
                &task,
                "Maintenance task",
            )
            .await?;
            report.updated += 1;

            let state = if status == TaskStatus::Overdue { "overdue" } else { "due" };
            self.notifications
                .notify(
                    org_id,
                    NewNotification {
                        kind: NotificationKind::MaintenanceDue,
                        title: format!("Maintenance {}: {}", state, task.title),
                        message: format!(
                            "Task '{}' is {} (due {})",
                            task.title,
                            state,
                            task.due_date.format("%Y-%m-%d")
                        ),
                        entity_type: "maintenance_task",
                        entity_id: Some(task.id.clone()),
                    },
                )
                .await;
        }

        tracing::info!(
            organization_id = %org_id,
            evaluated = report.evaluated,
            updated = report.updated,
            "Maintenance statuses refreshed"
        );
        Ok(report)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.maintenance_tasks(), id, org_id, "Maintenance task").await?;
        tracing::info!(task_id = %id, organization_id = %org_id, "Maintenance task deleted");
        Ok(())
    }
}
