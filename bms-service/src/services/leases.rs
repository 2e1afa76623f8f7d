use super::buildings::BuildingRepository;
use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateLeaseRequest, TerminateLeaseRequest, UpdateLeaseRequest};
use crate::models::{clean_opt, new_id, round_cents, Lease, LeaseStatus, UnitStatus};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseFilter {
    pub tenant_id: Option<String>,
    pub unit_id: Option<String>,
    pub building_id: Option<String>,
    pub status: Option<LeaseStatus>,
}

#[derive(Clone)]
pub struct LeaseRepository {
    db: MongoDb,
    buildings: BuildingRepository,
}

impl LeaseRepository {
    pub fn new(db: &MongoDb, buildings: BuildingRepository) -> Self {
        Self {
            db: db.clone(),
            buildings,
        }
    }

    async fn ensure_unit_free(&self, org_id: &str, unit_id: &str, except: Option<&str>) -> ServiceResult<()> {
        let mut filter = doc! {
            "organizationId": org_id,
            "unitId": unit_id,
            "status": scoped::to_bson(&LeaseStatus::Active)?,
        };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        if self.db.leases().find_one(filter, None).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Unit already has an active lease".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, org_id: &str, req: CreateLeaseRequest) -> ServiceResult<Lease> {
        let tenant =
            scoped::reference_in_org(&self.db.tenants(), &req.tenant_id, org_id, "Tenant").await?;
        let unit = scoped::reference_in_org(&self.db.units(), &req.unit_id, org_id, "Unit").await?;

        let status = req.status.unwrap_or(LeaseStatus::Draft);
        if !matches!(status, LeaseStatus::Draft | LeaseStatus::Active) {
            return Err(ServiceError::validation(
                "A new lease must be draft or active",
            ));
        }

        let now = Utc::now();
        let lease = Lease {
            id: new_id(),
            organization_id: org_id.to_string(),
            tenant_id: tenant.id,
            unit_id: unit.id.clone(),
            building_id: unit.building_id.clone(),
            start_date: req.start_date,
            end_date: req.end_date,
            rent_amount: round_cents(req.rent_amount),
            deposit_amount: round_cents(req.deposit_amount),
            billing_cycle: req.billing_cycle,
            payment_due_day: req.payment_due_day,
            status,
            terms: clean_opt(req.terms),
            last_billed_through: None,
            terminated_at: None,
            termination_reason: None,
            created_at: now,
            updated_at: now,
        };
        lease.validate_rules().map_err(ServiceError::Validation)?;

        if status == LeaseStatus::Active {
            self.ensure_unit_free(org_id, &unit.id, None).await?;
        }

        scoped::insert(&self.db.leases(), &lease, "Lease").await?;
        if status == LeaseStatus::Active {
            self.buildings
                .set_unit_status(&unit.id, org_id, UnitStatus::Occupied)
                .await?;
        }
        tracing::info!(
            lease_id = %lease.id,
            unit_id = %lease.unit_id,
            organization_id = %org_id,
            "Lease created"
        );
        Ok(lease)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Lease>> {
        scoped::find_in_org(&self.db.leases(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &LeaseFilter) -> ServiceResult<Vec<Lease>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(tenant_id) = &filter.tenant_id {
            query.insert("tenantId", tenant_id);
        }
        if let Some(unit_id) = &filter.unit_id {
            query.insert("unitId", unit_id);
        }
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        scoped::find_many(&self.db.leases(), query, doc! { "startDate": -1 }).await
    }

    pub async fn find_by_tenant(&self, tenant_id: &str, org_id: &str) -> ServiceResult<Vec<Lease>> {
        let filter = LeaseFilter {
            tenant_id: Some(tenant_id.to_string()),
            ..Default::default()
        };
        self.list(org_id, &filter).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateLeaseRequest,
    ) -> ServiceResult<Lease> {
        let mut lease = scoped::require_in_org(&self.db.leases(), id, org_id, "Lease").await?;
        let previous = lease.status;

        if let Some(start) = req.start_date {
            lease.start_date = start;
        }
        if req.end_date.is_some() {
            lease.end_date = req.end_date;
        }
        if let Some(rent) = req.rent_amount {
            lease.rent_amount = round_cents(rent);
        }
        if let Some(deposit) = req.deposit_amount {
            lease.deposit_amount = round_cents(deposit);
        }
        if let Some(cycle) = req.billing_cycle {
            lease.billing_cycle = cycle;
        }
        if let Some(day) = req.payment_due_day {
            lease.payment_due_day = day;
        }
        if req.terms.is_some() {
            lease.terms = clean_opt(req.terms);
        }
        if let Some(next) = req.status {
            if !previous.can_transition_to(next) {
                return Err(ServiceError::invalid_state(format!(
                    "Cannot move lease from {:?} to {:?}",
                    previous, next
                )));
            }
            lease.status = next;
        }
        lease.validate_rules().map_err(ServiceError::Validation)?;

        let now = Utc::now();
        if lease.status == LeaseStatus::Active && previous != LeaseStatus::Active {
            self.ensure_unit_free(org_id, &lease.unit_id, Some(id)).await?;
        }
        if lease.status == LeaseStatus::Terminated && previous != LeaseStatus::Terminated {
            lease.terminated_at = Some(now);
        }
        lease.updated_at = now;

        scoped::replace_in_org(&self.db.leases(), id, org_id, &lease, "Lease").await?;
        self.sync_unit_status(&lease, previous).await?;
        tracing::info!(lease_id = %id, organization_id = %org_id, status = ?lease.status, "Lease updated");
        Ok(lease)
    }

    pub async fn terminate(
        &self,
        id: &str,
        org_id: &str,
        req: TerminateLeaseRequest,
    ) -> ServiceResult<Lease> {
        let mut lease = scoped::require_in_org(&self.db.leases(), id, org_id, "Lease").await?;
        let previous = lease.status;
        if !matches!(previous, LeaseStatus::Draft | LeaseStatus::Active) {
            return Err(ServiceError::invalid_state(
                "Only draft or active leases can be terminated",
            ));
        }

        let now = Utc::now();
        lease.status = LeaseStatus::Terminated;
        lease.terminated_at = Some(req.terminated_at.unwrap_or(now));
        lease.termination_reason = clean_opt(req.reason);
        lease.updated_at = now;

        scoped::replace_in_org(&self.db.leases(), id, org_id, &lease, "Lease").await?;
        self.sync_unit_status(&lease, previous).await?;
        tracing::info!(lease_id = %id, organization_id = %org_id, "Lease terminated");
        Ok(lease)
    }

    /// Hard delete, allowed only for drafts.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let lease = scoped::require_in_org(&self.db.leases(), id, org_id, "Lease").await?;
        if lease.status != LeaseStatus::Draft {
            return Err(ServiceError::invalid_state("Only draft leases can be deleted"));
        }
        scoped::delete_in_org(&self.db.leases(), id, org_id, "Lease").await?;
        tracing::info!(lease_id = %id, organization_id = %org_id, "Lease deleted");
        Ok(())
    }

    pub async fn mark_billed_through(
        &self,
        id: &str,
        org_id: &str,
        through: DateTime<Utc>,
    ) -> ServiceResult<()> {
        self.db
            .leases()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "lastBilledThrough": scoped::bson_date(through),
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn sync_unit_status(&self, lease: &Lease, previous: LeaseStatus) -> ServiceResult<()> {
        if lease.status == previous {
            return Ok(());
        }
        match lease.status {
            LeaseStatus::Active => {
                self.buildings
                    .set_unit_status(&lease.unit_id, &lease.organization_id, UnitStatus::Occupied)
                    .await
            }
            LeaseStatus::Expired | LeaseStatus::Terminated if previous == LeaseStatus::Active => {
                self.buildings
                    .set_unit_status(&lease.unit_id, &lease.organization_id, UnitStatus::Vacant)
                    .await
            }
            _ => Ok(()),
        }
    }
}
