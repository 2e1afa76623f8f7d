use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{AssetValuationResponse, CreateAssetRequest, UpdateAssetRequest};
use crate::models::{clean_opt, new_id, Asset, AssetStatus};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFilter {
    pub building_id: Option<String>,
    pub unit_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<AssetStatus>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct AssetRepository {
    db: MongoDb,
}

impl AssetRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn check_unit(&self, org_id: &str, building_id: &str, unit_id: &str) -> ServiceResult<()> {
        let unit = scoped::reference_in_org(&self.db.units(), unit_id, org_id, "Unit").await?;
        if unit.building_id != building_id {
            return Err(ServiceError::validation(
                "Unit does not belong to the asset's building",
            ));
        }
        Ok(())
    }

    pub async fn create(&self, org_id: &str, req: CreateAssetRequest) -> ServiceResult<Asset> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let unit_id = clean_opt(req.unit_id);
        if let Some(unit_id) = &unit_id {
            self.check_unit(org_id, &building.id, unit_id).await?;
        }

        let now = Utc::now();
        let asset = Asset {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            unit_id,
            name: req.name.trim().to_string(),
            category: req.category.trim().to_lowercase(),
            serial_number: clean_opt(req.serial_number),
            manufacturer: clean_opt(req.manufacturer),
            model: clean_opt(req.model),
            status: req.status.unwrap_or(AssetStatus::Operational),
            purchase_date: req.purchase_date,
            purchase_cost: req.purchase_cost,
            warranty: req.warranty.map(Into::into),
            depreciation: req.depreciation,
            maintenance_schedule: req.maintenance_schedule.map(Into::into),
            created_at: now,
            updated_at: now,
        };
        asset.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.assets(), &asset, "Asset").await?;
        tracing::info!(asset_id = %asset.id, organization_id = %org_id, "Asset created");
        Ok(asset)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Asset>> {
        scoped::find_in_org(&self.db.assets(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &AssetFilter) -> ServiceResult<Vec<Asset>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(unit_id) = &filter.unit_id {
            query.insert("unitId", unit_id);
        }
        if let Some(category) = &filter.category {
            query.insert("category", category.trim().to_lowercase());
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.insert("name", scoped::contains_ci(term));
        }
        scoped::find_many(&self.db.assets(), query, doc! { "name": 1 }).await
    }

    pub async fn update(&self, id: &str, org_id: &str, req: UpdateAssetRequest) -> ServiceResult<Asset> {
        let mut asset = scoped::require_in_org(&self.db.assets(), id, org_id, "Asset").await?;

        if let Some(unit_id) = clean_opt(req.unit_id) {
            self.check_unit(org_id, &asset.building_id, &unit_id).await?;
            asset.unit_id = Some(unit_id);
        }
        if let Some(name) = clean_opt(req.name) {
            asset.name = name;
        }
        if let Some(category) = clean_opt(req.category) {
            asset.category = category.to_lowercase();
        }
        if req.serial_number.is_some() {
            asset.serial_number = clean_opt(req.serial_number);
        }
        if req.manufacturer.is_some() {
            asset.manufacturer = clean_opt(req.manufacturer);
        }
        if req.model.is_some() {
            asset.model = clean_opt(req.model);
        }
        if let Some(status) = req.status {
            asset.status = status;
        }
        if req.purchase_date.is_some() {
            asset.purchase_date = req.purchase_date;
        }
        if req.purchase_cost.is_some() {
            asset.purchase_cost = req.purchase_cost;
        }
        if let Some(warranty) = req.warranty {
            asset.warranty = Some(warranty.into());
        }
        if req.depreciation.is_some() {
            asset.depreciation = req.depreciation;
        }
        if let Some(schedule) = req.maintenance_schedule {
            asset.maintenance_schedule = Some(schedule.into());
        }

        asset.validate_rules().map_err(ServiceError::Validation)?;
        asset.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.assets(), id, org_id, &asset, "Asset").await?;
        tracing::info!(asset_id = %id, organization_id = %org_id, "Asset updated");
        Ok(asset)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.assets(), id, org_id, "Asset").await?;
        tracing::info!(asset_id = %id, organization_id = %org_id, "Asset deleted");
        Ok(())
    }

    pub async fn valuation(
        &self,
        id: &str,
        org_id: &str,
        as_of: DateTime<Utc>,
    ) -> ServiceResult<AssetValuationResponse> {
        let asset = scoped::require_in_org(&self.db.assets(), id, org_id, "Asset").await?;
        Ok(AssetValuationResponse {
            asset_id: asset.id.clone(),
            as_of,
            warranty_active: asset.warranty_active(as_of),
            depreciation: asset.depreciation_at(as_of),
        })
    }

    /// Stamp a completed service on the asset's schedule.
    pub async fn record_service(&self, id: &str, org_id: &str, at: DateTime<Utc>) -> ServiceResult<()> {
        let mut asset = scoped::require_in_org(&self.db.assets(), id, org_id, "Asset").await?;
        let Some(schedule) = asset.maintenance_schedule.as_mut() else {
            return Ok(());
        };
        schedule.last_service_date = Some(at);
        schedule.next_service_date = Some(at + chrono::Duration::days(schedule.interval_days));
        asset.updated_at = Utc::now();
        scoped::replace_in_org(&self.db.assets(), id, org_id, &asset, "Asset").await?;
        tracing::info!(asset_id = %id, organization_id = %org_id, "Asset service recorded");
        Ok(())
    }
}
