//! Floor-based bulk rent repricing.

use super::buildings::BuildingRepository;
use super::error::{ServiceError, ServiceResult};
use crate::dtos::{RentBulkUpdateRequest, RentBulkUpdateResponse, RentChange};
use crate::models::{RentPolicy, Unit};

#[derive(Clone)]
pub struct RentService {
    buildings: BuildingRepository,
}

/// Price every unit under the policy; units whose rent is unchanged are left out.
pub fn plan_changes(policy: &RentPolicy, units: &[Unit]) -> Vec<RentChange> {
    units
        .iter()
        .filter_map(|unit| {
            let new_rent = policy.rent_for(unit.floor, unit.area);
            ((new_rent - unit.rent_amount).abs() >= 0.005).then(|| RentChange {
                unit_id: unit.id.clone(),
                unit_number: unit.unit_number.clone(),
                floor: unit.floor,
                previous_rent: unit.rent_amount,
                new_rent,
            })
        })
        .collect()
}

impl RentService {
    pub fn new(buildings: BuildingRepository) -> Self {
        Self { buildings }
    }

    pub async fn bulk_update(
        &self,
        org_id: &str,
        req: RentBulkUpdateRequest,
    ) -> ServiceResult<RentBulkUpdateResponse> {
        let building = self
            .buildings
            .find_by_id(&req.building_id, Some(org_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Building"))?;

        let policy = match req.policy {
            Some(policy) => policy,
            None => building.rent_policy.clone().ok_or_else(|| {
                ServiceError::validation("No rent policy given and the building has none saved")
            })?,
        };
        policy.validate_rules().map_err(ServiceError::Validation)?;

        let mut units = self.buildings.units_for_building(&building.id, org_id).await?;
        if let Some(ids) = &req.unit_ids {
            units.retain(|u| ids.contains(&u.id));
        }

        let changes = plan_changes(&policy, &units);

        if !req.dry_run {
            for change in &changes {
                self.buildings
                    .set_unit_rent(&change.unit_id, org_id, change.new_rent)
                    .await?;
            }
            if req.save_policy {
                self.buildings
                    .set_rent_policy(&building.id, org_id, policy)
                    .await?;
            }
            tracing::info!(
                building_id = %building.id,
                organization_id = %org_id,
                updated = changes.len(),
                "Rent bulk update applied"
            );
        }

        Ok(RentBulkUpdateResponse {
            building_id: building.id,
            updated: changes.len(),
            dry_run: req.dry_run,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FloorOverride, RentBasis, UnitStatus, UnitType};
    use chrono::Utc;

    fn unit(id: &str, floor: i32, rent: f64) -> Unit {
        let now = Utc::now();
        Unit {
            id: id.into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_number: format!("{}0{}", floor, id),
            floor,
            unit_type: UnitType::Apartment,
            area: 50.0,
            bedrooms: None,
            bathrooms: None,
            status: UnitStatus::Vacant,
            rent_amount: rent,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unchanged_units_are_skipped() {
        let policy = RentPolicy {
            base_rate: 1000.0,
            per_floor_decrement: 100.0,
            floor_multiplier: 1.0,
            minimum_rent: 0.0,
            overrides: vec![FloorOverride { floor: 3, rate: 1500.0 }],
            basis: RentBasis::Flat,
        };
        let units = vec![unit("a", 0, 1000.0), unit("b", 1, 1000.0), unit("c", 3, 0.0)];

        let changes = plan_changes(&policy, &units);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].unit_id, "b");
        assert_eq!(changes[0].new_rent, 900.0);
        assert_eq!(changes[1].previous_rent, 0.0);
        assert_eq!(changes[1].new_rent, 1500.0);
    }
}
