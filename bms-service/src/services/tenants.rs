use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateTenantRequest, UpdateTenantRequest};
use crate::models::{clean_opt, new_id, Tenant, TenantStatus};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantFilter {
    pub status: Option<TenantStatus>,
    /// Matches first name, last name, email or company.
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct TenantRepository {
    db: MongoDb,
}

impl TenantRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn ensure_email_free(&self, org_id: &str, email: &str, except: Option<&str>) -> ServiceResult<()> {
        let mut filter = doc! { "organizationId": org_id, "email": email };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        if self.db.tenants().find_one(filter, None).await?.is_some() {
            return Err(ServiceError::Conflict(
                "A tenant with this email already exists".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, org_id: &str, req: CreateTenantRequest) -> ServiceResult<Tenant> {
        let email = req.email.trim().to_lowercase();
        self.ensure_email_free(org_id, &email, None).await?;

        let now = Utc::now();
        let tenant = Tenant {
            id: new_id(),
            organization_id: org_id.to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email,
            phone: req.phone.trim().to_string(),
            national_id: clean_opt(req.national_id),
            company_name: clean_opt(req.company_name),
            emergency_contact: req.emergency_contact,
            move_in_date: req.move_in_date,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tenant.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.tenants(), &tenant, "Tenant").await?;
        tracing::info!(tenant_id = %tenant.id, organization_id = %org_id, "Tenant created");
        Ok(tenant)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Tenant>> {
        scoped::find_in_org(&self.db.tenants(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &TenantFilter) -> ServiceResult<Vec<Tenant>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = scoped::contains_ci(term);
            query.insert(
                "$or",
                vec![
                    doc! { "firstName": pattern.clone() },
                    doc! { "lastName": pattern.clone() },
                    doc! { "email": pattern.clone() },
                    doc! { "companyName": pattern },
                ],
            );
        }
        scoped::find_many(
            &self.db.tenants(),
            query,
            doc! { "lastName": 1, "firstName": 1 },
        )
        .await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateTenantRequest,
    ) -> ServiceResult<Tenant> {
        let mut tenant = scoped::require_in_org(&self.db.tenants(), id, org_id, "Tenant").await?;

        if let Some(first) = clean_opt(req.first_name) {
            tenant.first_name = first;
        }
        if let Some(last) = clean_opt(req.last_name) {
            tenant.last_name = last;
        }
        if let Some(email) = clean_opt(req.email).map(|e| e.to_lowercase()) {
            if email != tenant.email {
                self.ensure_email_free(org_id, &email, Some(id)).await?;
                tenant.email = email;
            }
        }
        if let Some(phone) = clean_opt(req.phone) {
            tenant.phone = phone;
        }
        if req.national_id.is_some() {
            tenant.national_id = clean_opt(req.national_id);
        }
        if req.company_name.is_some() {
            tenant.company_name = clean_opt(req.company_name);
        }
        if req.emergency_contact.is_some() {
            tenant.emergency_contact = req.emergency_contact;
        }
        if req.move_in_date.is_some() {
            tenant.move_in_date = req.move_in_date;
        }
        if let Some(status) = req.status {
            tenant.status = status;
        }
        tenant.validate_rules().map_err(ServiceError::Validation)?;
        tenant.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.tenants(), id, org_id, &tenant, "Tenant").await?;
        tracing::info!(tenant_id = %id, organization_id = %org_id, "Tenant updated");
        Ok(tenant)
    }

    /// Soft delete: the tenant is marked inactive.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let result = self
            .db
            .tenants()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "status": scoped::to_bson(&TenantStatus::Inactive)?,
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::not_found("Tenant"));
        }
        tracing::info!(tenant_id = %id, organization_id = %org_id, "Tenant deactivated");
        Ok(())
    }
}
