use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    TimeBased,
    UsageBased,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Due,
    Overdue,
    Completed,
    Cancelled,
}

impl TaskStatus {
    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Due => 1,
            TaskStatus::Overdue => 2,
            TaskStatus::Completed | TaskStatus::Cancelled => 3,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTask {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_service_reading: Option<f64>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub lead_days: i64,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    pub recurring: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceTask {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("Task title is required".to_string());
        }
        if self.lead_days < 0 {
            return Err("Lead days cannot be negative".to_string());
        }
        if self.interval_days.is_some_and(|d| d <= 0) {
            return Err("Interval days must be positive".to_string());
        }
        match self.schedule_type {
            ScheduleType::TimeBased => {
                if self.recurring && self.interval_days.is_none() {
                    return Err("Recurring time-based tasks need intervalDays".to_string());
                }
            }
            ScheduleType::UsageBased => {
                if self.meter_id.is_none() {
                    return Err("Usage-based tasks need a meter".to_string());
                }
                if !self.usage_interval.is_some_and(|u| u > 0.0) {
                    return Err("Usage-based tasks need a positive usageInterval".to_string());
                }
            }
        }
        Ok(())
    }

    /// Status implied by the calendar and, for usage-based tasks, the
    /// current meter reading. Never moves a task backwards.
    pub fn evaluate_status(&self, now: DateTime<Utc>, meter_reading: Option<f64>) -> TaskStatus {
        if self.status.is_closed() {
            return self.status;
        }

        let usage_reached = match (self.schedule_type, self.usage_interval, meter_reading) {
            (ScheduleType::UsageBased, Some(interval), Some(reading)) => {
                reading - self.last_service_reading.unwrap_or(0.0) >= interval
            }
            _ => false,
        };

        let target = if now > self.due_date {
            TaskStatus::Overdue
        } else if usage_reached || now >= self.due_date - Duration::days(self.lead_days) {
            TaskStatus::Due
        } else {
            TaskStatus::Pending
        };

        if target.rank() > self.status.rank() {
            target
        } else {
            self.status
        }
    }

    /// Close the task. A recurring task returns its next occurrence.
    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        meter_reading: Option<f64>,
    ) -> Option<MaintenanceTask> {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;

        if !self.recurring {
            return None;
        }

        let interval = Duration::days(self.interval_days.unwrap_or(30));
        Some(MaintenanceTask {
            id: super::new_id(),
            due_date: now + interval,
            status: TaskStatus::Pending,
            completed_at: None,
            last_service_reading: meter_reading.or(self.last_service_reading),
            created_at: now,
            updated_at: now,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Corrective,
    Preventive,
    Inspection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Pending,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn can_transition_to(&self, next: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, OnHold)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (InProgress, OnHold)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (OnHold, InProgress)
                | (OnHold, Cancelled)
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Pending | WorkOrderStatus::InProgress | WorkOrderStatus::OnHold
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_task_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub work_type: WorkType,
    pub priority: Priority,
    pub status: WorkOrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.title.is_empty() || self.category.is_empty() {
            return Err("Work order title and category are required".to_string());
        }
        if self.labor_cost.is_some_and(|c| c < 0.0) || self.parts_cost.is_some_and(|c| c < 0.0) {
            return Err("Costs cannot be negative".to_string());
        }
        if let (Some(start), Some(done)) = (self.started_at, self.completed_at) {
            if done < start {
                return Err("Completion cannot precede start".to_string());
            }
        }
        Ok(())
    }

    /// Move to `next`, stamping start and completion times.
    pub fn transition(&mut self, next: WorkOrderStatus, now: DateTime<Utc>) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Cannot move work order from {:?} to {:?}",
                self.status, next
            ));
        }
        if next == WorkOrderStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next == WorkOrderStatus::Completed && self.completed_at.is_none() {
            self.started_at.get_or_insert(now);
            self.completed_at = Some(now);
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(schedule_type: ScheduleType) -> MaintenanceTask {
        let now = Utc::now();
        MaintenanceTask {
            id: "t1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            asset_id: None,
            title: "Filter change".into(),
            description: None,
            schedule_type,
            interval_days: Some(90),
            meter_id: Some("m1".into()),
            usage_interval: Some(500.0),
            last_service_reading: Some(1000.0),
            due_date: now + Duration::days(30),
            lead_days: 7,
            priority: Priority::Medium,
            assigned_to: None,
            status: TaskStatus::Pending,
            completed_at: None,
            recurring: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn time_based_becomes_due_within_lead_window() {
        let t = task(ScheduleType::TimeBased);
        assert_eq!(t.evaluate_status(Utc::now(), None), TaskStatus::Pending);
        let near = t.due_date - Duration::days(3);
        assert_eq!(t.evaluate_status(near, None), TaskStatus::Due);
        let past = t.due_date + Duration::days(1);
        assert_eq!(t.evaluate_status(past, None), TaskStatus::Overdue);
    }

    #[test]
    fn usage_based_becomes_due_on_meter_usage() {
        let t = task(ScheduleType::UsageBased);
        assert_eq!(t.evaluate_status(Utc::now(), Some(1200.0)), TaskStatus::Pending);
        assert_eq!(t.evaluate_status(Utc::now(), Some(1500.0)), TaskStatus::Due);
    }

    #[test]
    fn status_never_moves_backwards() {
        let mut t = task(ScheduleType::TimeBased);
        t.status = TaskStatus::Overdue;
        assert_eq!(t.evaluate_status(Utc::now(), None), TaskStatus::Overdue);
    }

    #[test]
    fn completing_recurring_task_schedules_next() {
        let mut t = task(ScheduleType::UsageBased);
        let now = Utc::now();
        let next = t.complete(now, Some(1600.0)).unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(next.status, TaskStatus::Pending);
        assert_eq!(next.due_date, now + Duration::days(90));
        assert_eq!(next.last_service_reading, Some(1600.0));
        assert_ne!(next.id, t.id);
    }

    #[test]
    fn usage_based_requires_meter() {
        let mut t = task(ScheduleType::UsageBased);
        t.meter_id = None;
        assert!(t.validate_rules().is_err());
    }

    #[test]
    fn work_order_transitions_stamp_times() {
        let now = Utc::now();
        let mut wo = WorkOrder {
            id: "w1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            asset_id: None,
            maintenance_task_id: None,
            title: "Leak".into(),
            description: None,
            category: "plumbing".into(),
            work_type: WorkType::Corrective,
            priority: Priority::High,
            status: WorkOrderStatus::Pending,
            assigned_to: None,
            requested_by: None,
            scheduled_for: None,
            started_at: None,
            completed_at: None,
            labor_cost: None,
            parts_cost: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        wo.transition(WorkOrderStatus::InProgress, now).unwrap();
        assert_eq!(wo.started_at, Some(now));
        wo.transition(WorkOrderStatus::Completed, now).unwrap();
        assert_eq!(wo.completed_at, Some(now));
        assert!(wo.transition(WorkOrderStatus::Pending, now).is_err());
    }
}
