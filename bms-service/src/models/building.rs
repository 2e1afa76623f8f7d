use super::round_cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

impl Address {
    pub fn trimmed(self) -> Self {
        Self {
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            region: super::clean_opt(self.region),
            postal_code: super::clean_opt(self.postal_code),
            country: self.country.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    Residential,
    Commercial,
    MixedUse,
    Industrial,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildingStatus {
    Active,
    Inactive,
    UnderConstruction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RentBasis {
    #[default]
    Flat,
    PerSquareMeter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FloorOverride {
    pub floor: i32,
    pub rate: f64,
}

/// Floor-based pricing applied by the rent bulk update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RentPolicy {
    pub base_rate: f64,
    #[serde(default)]
    pub per_floor_decrement: f64,
    #[serde(default = "default_multiplier")]
    pub floor_multiplier: f64,
    #[serde(default)]
    pub minimum_rent: f64,
    #[serde(default)]
    pub overrides: Vec<FloorOverride>,
    #[serde(default)]
    pub basis: RentBasis,
}

fn default_multiplier() -> f64 {
    1.0
}

impl RentPolicy {
    pub fn validate_rules(&self) -> Result<(), String> {
        if !self.base_rate.is_finite() || self.base_rate < 0.0 {
            return Err("Base rate must be a non-negative number".to_string());
        }
        if self.per_floor_decrement < 0.0 {
            return Err("Per-floor decrement cannot be negative".to_string());
        }
        if self.floor_multiplier <= 0.0 {
            return Err("Floor multiplier must be positive".to_string());
        }
        if self.minimum_rent < 0.0 {
            return Err("Minimum rent cannot be negative".to_string());
        }
        for (i, o) in self.overrides.iter().enumerate() {
            if o.rate < 0.0 {
                return Err(format!("Override rate for floor {} cannot be negative", o.floor));
            }
            if self.overrides[..i].iter().any(|prev| prev.floor == o.floor) {
                return Err(format!("Duplicate override for floor {}", o.floor));
            }
        }
        Ok(())
    }

    /// Rate for a floor: an override wins, otherwise the decremented base
    /// scaled by the multiplier and clamped to the minimum.
    pub fn rate_for_floor(&self, floor: i32) -> f64 {
        if let Some(o) = self.overrides.iter().find(|o| o.floor == floor) {
            return o.rate;
        }
        let decremented = self.base_rate - self.per_floor_decrement * floor as f64;
        (decremented * self.floor_multiplier).max(self.minimum_rent)
    }

    pub fn rent_for(&self, floor: i32, area: f64) -> f64 {
        let rate = self.rate_for_floor(floor);
        match self.basis {
            RentBasis::Flat => round_cents(rate),
            RentBasis::PerSquareMeter => round_cents(rate * area),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub address: Address,
    pub building_type: BuildingType,
    pub floors: i32,
    pub total_units: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    pub status: BuildingStatus,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent_policy: Option<RentPolicy>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Building {
    pub fn validate_rules(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("Building name is required".to_string());
        }
        if self.floors < 1 {
            return Err("A building must have at least one floor".to_string());
        }
        if self.total_units < 0 {
            return Err("Total units cannot be negative".to_string());
        }
        if let Some(year) = self.year_built {
            let max_year = chrono::Datelike::year(&now) + 5;
            if !(1800..=max_year).contains(&year) {
                return Err(format!("Year built must be between 1800 and {}", max_year));
            }
        }
        if let Some(policy) = &self.rent_policy {
            policy.validate_rules()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Apartment,
    Office,
    Retail,
    Storage,
    Parking,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Occupied,
    Maintenance,
    Reserved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub unit_number: String,
    pub floor: i32,
    pub unit_type: UnitType,
    pub area: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<i32>,
    pub status: UnitStatus,
    pub rent_amount: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    /// Units sit between the ground floor (0) and the building's top floor.
    pub fn validate_rules(&self, building_floors: i32) -> Result<(), String> {
        if self.unit_number.is_empty() {
            return Err("Unit number is required".to_string());
        }
        if self.floor < 0 || self.floor > building_floors {
            return Err(format!(
                "Floor {} is outside the building (0-{})",
                self.floor, building_floors
            ));
        }
        if self.area <= 0.0 {
            return Err("Area must be positive".to_string());
        }
        if self.rent_amount < 0.0 {
            return Err("Rent amount cannot be negative".to_string());
        }
        if self.bedrooms.is_some_and(|b| b < 0) || self.bathrooms.is_some_and(|b| b < 0) {
            return Err("Room counts cannot be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RentPolicy {
        RentPolicy {
            base_rate: 1000.0,
            per_floor_decrement: 50.0,
            floor_multiplier: 1.0,
            minimum_rent: 700.0,
            overrides: vec![FloorOverride {
                floor: 10,
                rate: 2500.0,
            }],
            basis: RentBasis::Flat,
        }
    }

    fn unit(floor: i32) -> Unit {
        let now = Utc::now();
        Unit {
            id: "u1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_number: "101".into(),
            floor,
            unit_type: UnitType::Apartment,
            area: 80.0,
            bedrooms: Some(2),
            bathrooms: Some(1),
            status: UnitStatus::Vacant,
            rent_amount: 1000.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn decrements_rate_per_floor() {
        let p = policy();
        assert_eq!(p.rate_for_floor(0), 1000.0);
        assert_eq!(p.rate_for_floor(2), 900.0);
    }

    #[test]
    fn clamps_to_minimum_rent() {
        assert_eq!(policy().rate_for_floor(8), 700.0);
    }

    #[test]
    fn override_wins_over_formula() {
        assert_eq!(policy().rate_for_floor(10), 2500.0);
    }

    #[test]
    fn multiplier_scales_decremented_rate() {
        let p = RentPolicy {
            floor_multiplier: 1.1,
            minimum_rent: 0.0,
            ..policy()
        };
        assert_eq!(p.rent_for(2, 0.0), 990.0);
    }

    #[test]
    fn per_square_meter_basis_uses_area() {
        let p = RentPolicy {
            base_rate: 12.5,
            per_floor_decrement: 0.0,
            minimum_rent: 0.0,
            overrides: vec![],
            basis: RentBasis::PerSquareMeter,
            ..policy()
        };
        assert_eq!(p.rent_for(3, 80.0), 1000.0);
    }

    #[test]
    fn rejects_duplicate_overrides() {
        let mut p = policy();
        p.overrides.push(FloorOverride {
            floor: 10,
            rate: 1.0,
        });
        assert!(p.validate_rules().is_err());
    }

    #[test]
    fn rejects_non_positive_multiplier() {
        let p = RentPolicy {
            floor_multiplier: 0.0,
            ..policy()
        };
        assert!(p.validate_rules().is_err());
    }

    #[test]
    fn unit_floor_must_be_inside_building() {
        assert!(unit(0).validate_rules(5).is_ok());
        assert!(unit(5).validate_rules(5).is_ok());
        assert!(unit(6).validate_rules(5).is_err());
        assert!(unit(-1).validate_rules(5).is_err());
    }
}
