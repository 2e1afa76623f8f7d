use crate::models::{
    Address, Building, BuildingStatus, BuildingType, RentPolicy, Unit, UnitStatus, UnitType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBuildingRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(nested)]
    pub address: Address,
    pub building_type: BuildingType,
    #[validate(range(min = 1, max = 300))]
    pub floors: i32,
    #[validate(range(min = 0, max = 100000))]
    pub total_units: i32,
    pub year_built: Option<i32>,
    pub status: Option<BuildingStatus>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub rent_policy: Option<RentPolicy>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBuildingRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(nested)]
    pub address: Option<Address>,
    pub building_type: Option<BuildingType>,
    #[validate(range(min = 1, max = 300))]
    pub floors: Option<i32>,
    #[validate(range(min = 0, max = 100000))]
    pub total_units: Option<i32>,
    pub year_built: Option<i32>,
    pub status: Option<BuildingStatus>,
    pub amenities: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingResponse {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub address: Address,
    pub building_type: BuildingType,
    pub floors: i32,
    pub total_units: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    pub status: BuildingStatus,
    pub amenities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_policy: Option<RentPolicy>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Building> for BuildingResponse {
    fn from(b: Building) -> Self {
        Self {
            id: b.id,
            organization_id: b.organization_id,
            name: b.name,
            address: b.address,
            building_type: b.building_type,
            floors: b.floors,
            total_units: b.total_units,
            year_built: b.year_built,
            status: b.status,
            amenities: b.amenities,
            rent_policy: b.rent_policy,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    #[validate(length(min = 1, max = 20))]
    pub unit_number: String,
    pub floor: i32,
    pub unit_type: UnitType,
    #[validate(range(exclusive_min = 0.0))]
    pub area: f64,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub status: Option<UnitStatus>,
    #[validate(range(min = 0.0))]
    pub rent_amount: f64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnitRequest {
    #[validate(length(min = 1, max = 20))]
    pub unit_number: Option<String>,
    pub floor: Option<i32>,
    pub unit_type: Option<UnitType>,
    #[validate(range(exclusive_min = 0.0))]
    pub area: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub status: Option<UnitStatus>,
    #[validate(range(min = 0.0))]
    pub rent_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub unit_number: String,
    pub floor: i32,
    pub unit_type: UnitType,
    pub area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<i32>,
    pub status: UnitStatus,
    pub rent_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Unit> for UnitResponse {
    fn from(u: Unit) -> Self {
        Self {
            id: u.id,
            organization_id: u.organization_id,
            building_id: u.building_id,
            unit_number: u.unit_number,
            floor: u.floor,
            unit_type: u.unit_type,
            area: u.area,
            bedrooms: u.bedrooms,
            bathrooms: u.bathrooms,
            status: u.status,
            rent_amount: u.rent_amount,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RentBulkUpdateRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    /// Falls back to the building's saved policy.
    pub policy: Option<RentPolicy>,
    /// Restrict the update to these units.
    pub unit_ids: Option<Vec<String>>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub save_policy: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentChange {
    pub unit_id: String,
    pub unit_number: String,
    pub floor: i32,
    pub previous_rent: f64,
    pub new_rent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentBulkUpdateResponse {
    pub building_id: String,
    pub updated: usize,
    pub dry_run: bool,
    pub changes: Vec<RentChange>,
}
