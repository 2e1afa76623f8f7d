use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateBuildingRequest, CreateUnitRequest, UpdateBuildingRequest, UpdateUnitRequest};
use crate::models::{
    clean_opt, new_id, Building, BuildingStatus, BuildingType, LeaseStatus, RentPolicy, Unit,
    UnitStatus, UnitType,
};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingFilter {
    pub status: Option<BuildingStatus>,
    pub building_type: Option<BuildingType>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFilter {
    pub building_id: Option<String>,
    pub status: Option<UnitStatus>,
    pub unit_type: Option<UnitType>,
}

#[derive(Clone)]
pub struct BuildingRepository {
    db: MongoDb,
}

fn clean_amenities(amenities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for a in amenities {
        let a = a.trim().to_string();
        if !a.is_empty() && !out.contains(&a) {
            out.push(a);
        }
    }
    out
}

impl BuildingRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, org_id: &str, req: CreateBuildingRequest) -> ServiceResult<Building> {
        let now = Utc::now();
        let building = Building {
            id: new_id(),
            organization_id: org_id.to_string(),
            name: req.name.trim().to_string(),
            address: req.address.trimmed(),
            building_type: req.building_type,
            floors: req.floors,
            total_units: req.total_units,
            year_built: req.year_built,
            status: req.status.unwrap_or(BuildingStatus::Active),
            amenities: clean_amenities(req.amenities),
            rent_policy: req.rent_policy,
            created_at: now,
            updated_at: now,
        };
        building.validate_rules(now).map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.buildings(), &building, "Building").await?;
        tracing::info!(building_id = %building.id, organization_id = %org_id, "Building created");
        Ok(building)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Building>> {
        scoped::find_in_org(&self.db.buildings(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &BuildingFilter) -> ServiceResult<Vec<Building>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(kind) = &filter.building_type {
            query.insert("buildingType", scoped::to_bson(kind)?);
        }
        if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.insert("name", scoped::contains_ci(term));
        }
        scoped::find_many(&self.db.buildings(), query, doc! { "name": 1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateBuildingRequest,
    ) -> ServiceResult<Building> {
        let mut building =
            scoped::require_in_org(&self.db.buildings(), id, org_id, "Building").await?;

        if let Some(name) = clean_opt(req.name) {
            building.name = name;
        }
        if let Some(address) = req.address {
            building.address = address.trimmed();
        }
        if let Some(kind) = req.building_type {
            building.building_type = kind;
        }
        if let Some(floors) = req.floors {
            let highest = self.highest_unit_floor(id, org_id).await?;
            if highest.is_some_and(|f| f > floors) {
                return Err(ServiceError::validation(format!(
                    "Units exist above floor {}",
                    floors
                )));
            }
            building.floors = floors;
        }
        if let Some(total) = req.total_units {
            building.total_units = total;
        }
        if req.year_built.is_some() {
            building.year_built = req.year_built;
        }
        if let Some(status) = req.status {
            building.status = status;
        }
        if let Some(amenities) = req.amenities {
            building.amenities = clean_amenities(amenities);
        }

        let now = Utc::now();
        building.validate_rules(now).map_err(ServiceError::Validation)?;
        building.updated_at = now;

        scoped::replace_in_org(&self.db.buildings(), id, org_id, &building, "Building").await?;
        tracing::info!(building_id = %id, organization_id = %org_id, "Building updated");
        Ok(building)
    }

    /// Soft delete: the building is marked inactive.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let result = self
            .db
            .buildings()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "status": scoped::to_bson(&BuildingStatus::Inactive)?,
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::not_found("Building"));
        }
        tracing::info!(building_id = %id, organization_id = %org_id, "Building deactivated");
        Ok(())
    }

    pub async fn set_rent_policy(
        &self,
        id: &str,
        org_id: &str,
        policy: RentPolicy,
    ) -> ServiceResult<Building> {
        policy.validate_rules().map_err(ServiceError::Validation)?;
        let mut building =
            scoped::require_in_org(&self.db.buildings(), id, org_id, "Building").await?;
        building.rent_policy = Some(policy);
        building.updated_at = Utc::now();
        scoped::replace_in_org(&self.db.buildings(), id, org_id, &building, "Building").await?;
        tracing::info!(building_id = %id, organization_id = %org_id, "Rent policy saved");
        Ok(building)
    }

    async fn highest_unit_floor(&self, building_id: &str, org_id: &str) -> ServiceResult<Option<i32>> {
        let options = mongodb::options::FindOneOptions::builder()
            .sort(doc! { "floor": -1 })
            .build();
        let unit = self
            .db
            .units()
            .find_one(
                doc! { "organizationId": org_id, "buildingId": building_id },
                options,
            )
            .await?;
        Ok(unit.map(|u| u.floor))
    }

    async fn ensure_unit_number_free(
        &self,
        org_id: &str,
        building_id: &str,
        unit_number: &str,
    ) -> ServiceResult<()> {
        let existing = self
            .db
            .units()
            .find_one(
                doc! {
                    "organizationId": org_id,
                    "buildingId": building_id,
                    "unitNumber": unit_number,
                },
                None,
            )
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Unit {} already exists in this building",
                unit_number
            )));
        }
        Ok(())
    }

    pub async fn create_unit(&self, org_id: &str, req: CreateUnitRequest) -> ServiceResult<Unit> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let unit_number = req.unit_number.trim().to_string();
        self.ensure_unit_number_free(org_id, &building.id, &unit_number)
            .await?;

        let now = Utc::now();
        let unit = Unit {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id.clone(),
            unit_number,
            floor: req.floor,
            unit_type: req.unit_type,
            area: req.area,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            status: req.status.unwrap_or(UnitStatus::Vacant),
            rent_amount: crate::models::round_cents(req.rent_amount),
            created_at: now,
            updated_at: now,
        };
        unit.validate_rules(building.floors)
            .map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.units(), &unit, "Unit").await?;
        tracing::info!(
            unit_id = %unit.id,
            building_id = %building.id,
            organization_id = %org_id,
            "Unit created"
        );
        Ok(unit)
    }

    pub async fn find_unit(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Unit>> {
        scoped::find_in_org(&self.db.units(), id, org_id).await
    }

    pub async fn list_units(&self, org_id: &str, filter: &UnitFilter) -> ServiceResult<Vec<Unit>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(kind) = &filter.unit_type {
            query.insert("unitType", scoped::to_bson(kind)?);
        }
        scoped::find_many(
            &self.db.units(),
            query,
            doc! { "buildingId": 1, "floor": 1, "unitNumber": 1 },
        )
        .await
    }

    pub async fn units_for_building(&self, building_id: &str, org_id: &str) -> ServiceResult<Vec<Unit>> {
        let filter = UnitFilter {
            building_id: Some(building_id.to_string()),
            ..Default::default()
        };
        self.list_units(org_id, &filter).await
    }

    pub async fn update_unit(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateUnitRequest,
    ) -> ServiceResult<Unit> {
        let mut unit = scoped::require_in_org(&self.db.units(), id, org_id, "Unit").await?;
        let building =
            scoped::reference_in_org(&self.db.buildings(), &unit.building_id, org_id, "Building")
                .await?;

        if let Some(number) = clean_opt(req.unit_number) {
            if number != unit.unit_number {
                self.ensure_unit_number_free(org_id, &unit.building_id, &number)
                    .await?;
                unit.unit_number = number;
            }
        }
        if let Some(floor) = req.floor {
            unit.floor = floor;
        }
        if let Some(kind) = req.unit_type {
            unit.unit_type = kind;
        }
        if let Some(area) = req.area {
            unit.area = area;
        }
        if req.bedrooms.is_some() {
            unit.bedrooms = req.bedrooms;
        }
        if req.bathrooms.is_some() {
            unit.bathrooms = req.bathrooms;
        }
        if let Some(status) = req.status {
            unit.status = status;
        }
        if let Some(rent) = req.rent_amount {
            unit.rent_amount = crate::models::round_cents(rent);
        }
        unit.validate_rules(building.floors)
            .map_err(ServiceError::Validation)?;
        unit.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.units(), id, org_id, &unit, "Unit").await?;
        tracing::info!(unit_id = %id, organization_id = %org_id, "Unit updated");
        Ok(unit)
    }

    pub async fn set_unit_status(&self, id: &str, org_id: &str, status: UnitStatus) -> ServiceResult<()> {
        self.db
            .units()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "status": scoped::to_bson(&status)?,
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn set_unit_rent(&self, id: &str, org_id: &str, rent: f64) -> ServiceResult<()> {
        self.db
            .units()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": {
                    "rentAmount": rent,
                    "updatedAt": scoped::bson_date(Utc::now()),
                } },
                None,
            )
            .await?;
        Ok(())
    }

    /// Hard delete, refused while the unit holds an active lease.
    pub async fn delete_unit(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let unit = scoped::require_in_org(&self.db.units(), id, org_id, "Unit").await?;
        let active_leases = self
            .db
            .leases()
            .count_documents(
                doc! {
                    "organizationId": org_id,
                    "unitId": &unit.id,
                    "status": scoped::to_bson(&LeaseStatus::Active)?,
                },
                None,
            )
            .await?;
        if active_leases > 0 {
            return Err(ServiceError::Conflict(
                "Unit has an active lease and cannot be deleted".to_string(),
            ));
        }
        scoped::delete_in_org(&self.db.units(), id, org_id, "Unit").await?;
        tracing::info!(unit_id = %id, organization_id = %org_id, "Unit deleted");
        Ok(())
    }
}
