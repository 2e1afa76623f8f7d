use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::notifications::{NewNotification, NotificationRepository};
use super::scoped;
use crate::dtos::{
    AccessCheckResponse, CreateAccessPermissionRequest, CreateIncidentRequest, CreateStaffRequest,
    CreateVisitorRequest, RevokePermissionRequest, UpdateAccessPermissionRequest,
    UpdateIncidentRequest, UpdateStaffRequest, UpdateVisitorRequest,
};
use crate::models::{
    clean_opt, new_id, AccessPermission, AccessStatus, HolderType, IncidentStatus,
    NotificationKind, SecurityIncident, SecurityStaff, Severity, StaffStatus, VisitorLog,
    VisitorStatus,
};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

/// Trimmed, lowercased, de-duplicated area names.
pub fn clean_areas(areas: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(areas.len());
    for area in areas {
        let area = area.trim().to_lowercase();
        if !area.is_empty() && !out.contains(&area) {
            out.push(area);
        }
    }
    out
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermissionFilter {
    pub building_id: Option<String>,
    pub holder_type: Option<HolderType>,
    pub holder_id: Option<String>,
    pub status: Option<AccessStatus>,
}

#[derive(Clone)]
pub struct AccessPermissionRepository {
    db: MongoDb,
}

impl AccessPermissionRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn check_holder(
        &self,
        org_id: &str,
        holder_type: HolderType,
        holder_id: Option<&str>,
    ) -> ServiceResult<()> {
        match (holder_type, holder_id) {
            (HolderType::Tenant, Some(id)) => {
                scoped::reference_in_org(&self.db.tenants(), id, org_id, "Tenant").await?;
            }
            (HolderType::Staff, Some(id)) => {
                scoped::reference_in_org(&self.db.security_staff(), id, org_id, "Staff member")
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn create(
        &self,
        org_id: &str,
        req: CreateAccessPermissionRequest,
    ) -> ServiceResult<AccessPermission> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let holder_id = clean_opt(req.holder_id);
        self.check_holder(org_id, req.holder_type, holder_id.as_deref())
            .await?;

        let now = Utc::now();
        let permission = AccessPermission {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            holder_type: req.holder_type,
            holder_id,
            holder_name: req.holder_name.trim().to_string(),
            access_level: req.access_level.trim().to_lowercase(),
            areas: clean_areas(req.areas),
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            time_window: req.time_window,
            status: AccessStatus::Active,
            revoked_at: None,
            revoke_reason: None,
            created_at: now,
            updated_at: now,
        };
        permission.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.access_permissions(), &permission, "Access permission").await?;
        tracing::info!(
            permission_id = %permission.id,
            organization_id = %org_id,
            holder_type = ?permission.holder_type,
            "Access permission granted"
        );
        Ok(permission)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        org_id: Option<&str>,
    ) -> ServiceResult<Option<AccessPermission>> {
        scoped::find_in_org(&self.db.access_permissions(), id, org_id).await
    }

    pub async fn list(
        &self,
        org_id: &str,
        filter: &AccessPermissionFilter,
    ) -> ServiceResult<Vec<AccessPermission>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(kind) = &filter.holder_type {
            query.insert("holderType", scoped::to_bson(kind)?);
        }
        if let Some(holder_id) = &filter.holder_id {
            query.insert("holderId", holder_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        scoped::find_many(&self.db.access_permissions(), query, doc! { "validUntil": -1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateAccessPermissionRequest,
    ) -> ServiceResult<AccessPermission> {
        let mut permission =
            scoped::require_in_org(&self.db.access_permissions(), id, org_id, "Access permission")
                .await?;
        if permission.status == AccessStatus::Revoked {
            return Err(ServiceError::invalid_state(
                "Revoked permissions cannot be edited",
            ));
        }

        if let Some(name) = clean_opt(req.holder_name) {
            permission.holder_name = name;
        }
        if let Some(level) = clean_opt(req.access_level) {
            permission.access_level = level.to_lowercase();
        }
        if let Some(areas) = req.areas {
            permission.areas = clean_areas(areas);
        }
        if let Some(from) = req.valid_from {
            permission.valid_from = from;
        }
        if let Some(until) = req.valid_until {
            permission.valid_until = until;
        }
        if req.clear_time_window {
            permission.time_window = None;
        } else if req.time_window.is_some() {
            permission.time_window = req.time_window;
        }

        let now = Utc::now();
        // Extending an expired permission reactivates it.
        if permission.status == AccessStatus::Expired && permission.valid_until > now {
            permission.status = AccessStatus::Active;
        }
        permission.validate_rules().map_err(ServiceError::Validation)?;
        permission.updated_at = now;

        scoped::replace_in_org(
            &self.db.access_permissions(),
            id,
            org_id,
            &permission,
            "Access permission",
        )
        .await?;
        tracing::info!(permission_id = %id, organization_id = %org_id, "Access permission updated");
        Ok(permission)
    }

    pub async fn revoke(
        &self,
        id: &str,
        org_id: &str,
        req: RevokePermissionRequest,
    ) -> ServiceResult<AccessPermission> {
        let mut permission =
            scoped::require_in_org(&self.db.access_permissions(), id, org_id, "Access permission")
                .await?;
        if permission.status == AccessStatus::Revoked {
            return Err(ServiceError::invalid_state("Permission is already revoked"));
        }

        let now = Utc::now();
        permission.status = AccessStatus::Revoked;
        permission.revoked_at = Some(now);
        permission.revoke_reason = Some(req.reason.trim().to_string());
        permission.updated_at = now;
        scoped::replace_in_org(
            &self.db.access_permissions(),
            id,
            org_id,
            &permission,
            "Access permission",
        )
        .await?;
        tracing::info!(permission_id = %id, organization_id = %org_id, "Access permission revoked");
        Ok(permission)
    }

    pub async fn check(
        &self,
        id: &str,
        org_id: &str,
        at: DateTime<Utc>,
        area: Option<String>,
    ) -> ServiceResult<AccessCheckResponse> {
        let permission =
            scoped::require_in_org(&self.db.access_permissions(), id, org_id, "Access permission")
                .await?;
        let area = clean_opt(area);
        let decision = permission.check(at, area.as_deref());
        tracing::info!(
            permission_id = %id,
            organization_id = %org_id,
            granted = decision.granted,
            "Access checked"
        );
        Ok(AccessCheckResponse {
            permission_id: permission.id,
            at,
            area,
            granted: decision.granted,
            reason: decision.reason,
        })
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.access_permissions(), id, org_id, "Access permission")
            .await?;
        tracing::info!(permission_id = %id, organization_id = %org_id, "Access permission deleted");
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilter {
    pub building_id: Option<String>,
    pub status: Option<IncidentStatus>,
    pub severity: Option<Severity>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct IncidentRepository {
    db: MongoDb,
    notifications: NotificationRepository,
}

impl IncidentRepository {
    pub fn new(db: &MongoDb, notifications: NotificationRepository) -> Self {
        Self {
            db: db.clone(),
            notifications,
        }
    }

    pub async fn create(
        &self,
        org_id: &str,
        reported_by: &str,
        req: CreateIncidentRequest,
    ) -> ServiceResult<SecurityIncident> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let unit_id = clean_opt(req.unit_id);
        if let Some(id) = &unit_id {
            let unit = scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
            if unit.building_id != building.id {
                return Err(ServiceError::validation(
                    "Unit does not belong to the incident's building",
                ));
            }
        }
        let assigned_staff_id = clean_opt(req.assigned_staff_id);
        if let Some(id) = &assigned_staff_id {
            scoped::reference_in_org(&self.db.security_staff(), id, org_id, "Staff member").await?;
        }

        let now = Utc::now();
        let incident = SecurityIncident {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            unit_id,
            title: req.title.trim().to_string(),
            description: req.description.trim().to_string(),
            incident_type: req.incident_type.trim().to_lowercase(),
            severity: req.severity,
            status: IncidentStatus::Open,
            occurred_at: req.occurred_at.unwrap_or(now),
            reported_by: reported_by.to_string(),
            assigned_staff_id,
            resolution: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        incident.validate_rules(now).map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.security_incidents(), &incident, "Incident").await?;
        tracing::info!(
            incident_id = %incident.id,
            organization_id = %org_id,
            severity = ?incident.severity,
            "Security incident reported"
        );

        self.notifications
            .notify(
                org_id,
                NewNotification {
                    kind: NotificationKind::IncidentReported,
                    title: format!("Incident reported: {}", incident.title),
                    message: format!(
                        "{:?} severity {} incident at {}",
                        incident.severity,
                        incident.incident_type,
                        incident.occurred_at.format("%Y-%m-%d %H:%M")
                    ),
                    entity_type: "security_incident",
                    entity_id: Some(incident.id.clone()),
                },
            )
            .await;
        Ok(incident)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        org_id: Option<&str>,
    ) -> ServiceResult<Option<SecurityIncident>> {
        scoped::find_in_org(&self.db.security_incidents(), id, org_id).await
    }

    pub async fn list(
        &self,
        org_id: &str,
        filter: &IncidentFilter,
    ) -> ServiceResult<Vec<SecurityIncident>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(severity) = &filter.severity {
            query.insert("severity", scoped::to_bson(severity)?);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("occurredAt", range);
        }
        scoped::find_many(&self.db.security_incidents(), query, doc! { "occurredAt": -1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateIncidentRequest,
    ) -> ServiceResult<SecurityIncident> {
        let mut incident =
            scoped::require_in_org(&self.db.security_incidents(), id, org_id, "Incident").await?;

        if let Some(title) = clean_opt(req.title) {
            incident.title = title;
        }
        if let Some(description) = clean_opt(req.description) {
            incident.description = description;
        }
        if let Some(kind) = clean_opt(req.incident_type) {
            incident.incident_type = kind.to_lowercase();
        }
        if let Some(severity) = req.severity {
            incident.severity = severity;
        }
        if let Some(staff_id) = clean_opt(req.assigned_staff_id) {
            scoped::reference_in_org(&self.db.security_staff(), &staff_id, org_id, "Staff member")
                .await?;
            incident.assigned_staff_id = Some(staff_id);
        }
        if req.resolution.is_some() {
            incident.resolution = clean_opt(req.resolution);
        }

        let now = Utc::now();
        if let Some(status) = req.status {
            incident.set_status(status, now);
        }
        incident.validate_rules(now).map_err(ServiceError::Validation)?;
        incident.updated_at = now;

        scoped::replace_in_org(&self.db.security_incidents(), id, org_id, &incident, "Incident")
            .await?;
        tracing::info!(
            incident_id = %id,
            organization_id = %org_id,
            status = ?incident.status,
            "Security incident updated"
        );
        Ok(incident)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.security_incidents(), id, org_id, "Incident").await?;
        tracing::info!(incident_id = %id, organization_id = %org_id, "Security incident deleted");
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorFilter {
    pub building_id: Option<String>,
    pub host_tenant_id: Option<String>,
    pub status: Option<VisitorStatus>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct VisitorRepository {
    db: MongoDb,
}

impl VisitorRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(
        &self,
        org_id: &str,
        logged_by: &str,
        req: CreateVisitorRequest,
    ) -> ServiceResult<VisitorLog> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let host_tenant_id = clean_opt(req.host_tenant_id);
        if let Some(id) = &host_tenant_id {
            scoped::reference_in_org(&self.db.tenants(), id, org_id, "Tenant").await?;
        }
        let unit_id = clean_opt(req.unit_id);
        if let Some(id) = &unit_id {
            let unit = scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
            if unit.building_id != building.id {
                return Err(ServiceError::validation(
                    "Unit does not belong to the visited building",
                ));
            }
        }

        let now = Utc::now();
        let check_in_at = req.check_in_at.unwrap_or(now);
        if check_in_at > now {
            return Err(ServiceError::validation("Check-in cannot be in the future"));
        }
        let visitor = VisitorLog {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            visitor_name: req.visitor_name.trim().to_string(),
            visitor_phone: clean_opt(req.visitor_phone),
            id_number: clean_opt(req.id_number),
            host_tenant_id,
            unit_id,
            purpose: req.purpose.trim().to_string(),
            badge_number: clean_opt(req.badge_number),
            check_in_at,
            check_out_at: None,
            status: VisitorStatus::CheckedIn,
            logged_by: logged_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        visitor.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.visitor_logs(), &visitor, "Visitor log").await?;
        tracing::info!(visitor_id = %visitor.id, organization_id = %org_id, "Visitor checked in");
        Ok(visitor)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<VisitorLog>> {
        scoped::find_in_org(&self.db.visitor_logs(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &VisitorFilter) -> ServiceResult<Vec<VisitorLog>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(tenant_id) = &filter.host_tenant_id {
            query.insert("hostTenantId", tenant_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("checkInAt", range);
        }
        scoped::find_many(&self.db.visitor_logs(), query, doc! { "checkInAt": -1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateVisitorRequest,
    ) -> ServiceResult<VisitorLog> {
        let mut visitor =
            scoped::require_in_org(&self.db.visitor_logs(), id, org_id, "Visitor log").await?;

        if let Some(name) = clean_opt(req.visitor_name) {
            visitor.visitor_name = name;
        }
        if req.visitor_phone.is_some() {
            visitor.visitor_phone = clean_opt(req.visitor_phone);
        }
        if req.id_number.is_some() {
            visitor.id_number = clean_opt(req.id_number);
        }
        if let Some(purpose) = clean_opt(req.purpose) {
            visitor.purpose = purpose;
        }
        if req.badge_number.is_some() {
            visitor.badge_number = clean_opt(req.badge_number);
        }
        visitor.validate_rules().map_err(ServiceError::Validation)?;
        visitor.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.visitor_logs(), id, org_id, &visitor, "Visitor log").await?;
        tracing::info!(visitor_id = %id, organization_id = %org_id, "Visitor log updated");
        Ok(visitor)
    }

    pub async fn check_out(
        &self,
        id: &str,
        org_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> ServiceResult<VisitorLog> {
        let mut visitor =
            scoped::require_in_org(&self.db.visitor_logs(), id, org_id, "Visitor log").await?;
        let now = Utc::now();
        visitor
            .check_out(at.unwrap_or(now))
            .map_err(ServiceError::InvalidState)?;
        visitor.updated_at = now;

        scoped::replace_in_org(&self.db.visitor_logs(), id, org_id, &visitor, "Visitor log").await?;
        tracing::info!(visitor_id = %id, organization_id = %org_id, "Visitor checked out");
        Ok(visitor)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.visitor_logs(), id, org_id, "Visitor log").await?;
        tracing::info!(visitor_id = %id, organization_id = %org_id, "Visitor log deleted");
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffFilter {
    pub building_id: Option<String>,
    pub status: Option<StaffStatus>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct StaffRepository {
    db: MongoDb,
}

impl StaffRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn check_buildings(&self, org_id: &str, ids: Vec<String>) -> ServiceResult<Vec<String>> {
        let mut out: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.trim().to_string();
            if id.is_empty() || out.contains(&id) {
                continue;
            }
            scoped::reference_in_org(&self.db.buildings(), &id, org_id, "Building").await?;
            out.push(id);
        }
        Ok(out)
    }

    pub async fn create(&self, org_id: &str, req: CreateStaffRequest) -> ServiceResult<SecurityStaff> {
        let building_ids = self.check_buildings(org_id, req.building_ids).await?;

        let now = Utc::now();
        let staff = SecurityStaff {
            id: new_id(),
            organization_id: org_id.to_string(),
            name: req.name.trim().to_string(),
            phone: req.phone.trim().to_string(),
            email: clean_opt(req.email).map(|e| e.to_lowercase()),
            employee_id: clean_opt(req.employee_id),
            building_ids,
            shift: req.shift,
            status: StaffStatus::Active,
            created_at: now,
            updated_at: now,
        };
        staff.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.security_staff(), &staff, "Staff member").await?;
        tracing::info!(staff_id = %staff.id, organization_id = %org_id, "Security staff created");
        Ok(staff)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        org_id: Option<&str>,
    ) -> ServiceResult<Option<SecurityStaff>> {
        scoped::find_in_org(&self.db.security_staff(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &StaffFilter) -> ServiceResult<Vec<SecurityStaff>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingIds", building_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.insert("name", scoped::contains_ci(term));
        }
        scoped::find_many(&self.db.security_staff(), query, doc! { "name": 1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateStaffRequest,
    ) -> ServiceResult<SecurityStaff> {
        let mut staff =
            scoped::require_in_org(&self.db.security_staff(), id, org_id, "Staff member").await?;

        if let Some(name) = clean_opt(req.name) {
            staff.name = name;
        }
        if let Some(phone) = clean_opt(req.phone) {
            staff.phone = phone;
        }
        if req.email.is_some() {
            staff.email = clean_opt(req.email).map(|e| e.to_lowercase());
        }
        if req.employee_id.is_some() {
            staff.employee_id = clean_opt(req.employee_id);
        }
        if let Some(ids) = req.building_ids {
            staff.building_ids = self.check_buildings(org_id, ids).await?;
        }
        if req.shift.is_some() {
            staff.shift = req.shift;
        }
        if let Some(status) = req.status {
            staff.status = status;
        }
        staff.validate_rules().map_err(ServiceError::Validation)?;
        staff.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.security_staff(), id, org_id, &staff, "Staff member")
            .await?;
        tracing::info!(staff_id = %id, organization_id = %org_id, "Security staff updated");
        Ok(staff)
    }

    /// Soft delete: the staff member is marked inactive.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let result = self
            .db
            .security_staff()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "status": scoped::to_bson(&StaffStatus::Inactive)?,
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::not_found("Staff member"));
        }
        tracing::info!(staff_id = %id, organization_id = %org_id, "Security staff deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn areas_are_normalised() {
        let areas = clean_areas(vec![
            " Lobby ".into(),
            "roof".into(),
            "LOBBY".into(),
            "".into(),
        ]);
        assert_eq!(areas, vec!["lobby".to_string(), "roof".to_string()]);
    }
}
