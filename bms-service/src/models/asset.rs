use super::round_cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Operational,
    UnderMaintenance,
    Faulty,
    Retired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warranty {
    pub provider: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    DecliningBalance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depreciation {
    pub method: DepreciationMethod,
    pub useful_life_years: f64,
    #[serde(default)]
    pub salvage_value: f64,
    /// Declining-balance rate; defaults to double declining (2 / life).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSchedule {
    pub interval_days: i64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_service_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub next_service_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: AssetStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warranty: Option<Warranty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<Depreciation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_schedule: Option<MaintenanceSchedule>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepreciationSummary {
    pub method: DepreciationMethod,
    pub purchase_cost: f64,
    pub salvage_value: f64,
    pub years_elapsed: f64,
    pub accumulated_depreciation: f64,
    pub book_value: f64,
    pub fully_depreciated: bool,
}

impl Asset {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.name.is_empty() || self.category.is_empty() {
            return Err("Asset name and category are required".to_string());
        }
        if self.purchase_cost.is_some_and(|c| c < 0.0) {
            return Err("Purchase cost cannot be negative".to_string());
        }
        if let Some(w) = &self.warranty {
            if w.start_date >= w.end_date {
                return Err("Warranty start date must be before end date".to_string());
            }
        }
        if let Some(d) = &self.depreciation {
            if d.useful_life_years <= 0.0 {
                return Err("Useful life must be positive".to_string());
            }
            if d.salvage_value < 0.0 {
                return Err("Salvage value cannot be negative".to_string());
            }
            if d.annual_rate.is_some_and(|r| r <= 0.0 || r > 1.0) {
                return Err("Annual depreciation rate must be in (0, 1]".to_string());
            }
            match self.purchase_cost {
                Some(cost) if d.salvage_value <= cost => {}
                Some(_) => return Err("Salvage value cannot exceed purchase cost".to_string()),
                None => return Err("Depreciation requires a purchase cost".to_string()),
            }
            if self.purchase_date.is_none() {
                return Err("Depreciation requires a purchase date".to_string());
            }
        }
        if let Some(s) = &self.maintenance_schedule {
            if s.interval_days <= 0 {
                return Err("Maintenance interval must be positive".to_string());
            }
        }
        Ok(())
    }

    pub fn warranty_active(&self, at: DateTime<Utc>) -> bool {
        self.warranty
            .as_ref()
            .is_some_and(|w| w.start_date <= at && at <= w.end_date)
    }

    /// Book value at `as_of`; never below the salvage value.
    pub fn depreciation_at(&self, as_of: DateTime<Utc>) -> Option<DepreciationSummary> {
        let dep = self.depreciation.as_ref()?;
        let cost = self.purchase_cost?;
        let purchased = self.purchase_date?;

        let years = ((as_of - purchased).num_days() as f64 / 365.25).max(0.0);
        let salvage = dep.salvage_value;
        let fully = years >= dep.useful_life_years;

        let value = if fully {
            salvage
        } else {
            let raw = match dep.method {
                DepreciationMethod::StraightLine => {
                    let annual = (cost - salvage) / dep.useful_life_years;
                    cost - annual * years
                }
                DepreciationMethod::DecliningBalance => {
                    let rate = dep
                        .annual_rate
                        .unwrap_or(2.0 / dep.useful_life_years)
                        .min(1.0);
                    cost * (1.0 - rate).powf(years)
                }
            };
            raw.max(salvage)
        };

        let book_value = round_cents(value);
        Some(DepreciationSummary {
            method: dep.method,
            purchase_cost: cost,
            salvage_value: salvage,
            years_elapsed: (years * 100.0).round() / 100.0,
            accumulated_depreciation: round_cents(cost - book_value),
            book_value,
            fully_depreciated: fully || book_value <= salvage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn asset(method: DepreciationMethod) -> Asset {
        let purchased = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        Asset {
            id: "a1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            name: "Chiller".into(),
            category: "hvac".into(),
            serial_number: None,
            manufacturer: None,
            model: None,
            status: AssetStatus::Operational,
            purchase_date: Some(purchased),
            purchase_cost: Some(10_000.0),
            warranty: Some(Warranty {
                provider: "Acme".into(),
                start_date: purchased,
                end_date: purchased + Duration::days(730),
                terms: None,
            }),
            depreciation: Some(Depreciation {
                method,
                useful_life_years: 10.0,
                salvage_value: 1_000.0,
                annual_rate: None,
            }),
            maintenance_schedule: None,
            created_at: purchased,
            updated_at: purchased,
        }
    }

    #[test]
    fn straight_line_halfway() {
        let a = asset(DepreciationMethod::StraightLine);
        let as_of = a.purchase_date.unwrap() + Duration::days(1826);
        let summary = a.depreciation_at(as_of).unwrap();
        // 1826 days is 4.9993 years at 900/year.
        assert!((summary.book_value - 5500.62).abs() < 0.01);
        assert!(!summary.fully_depreciated);
    }

    #[test]
    fn never_below_salvage() {
        let a = asset(DepreciationMethod::DecliningBalance);
        let as_of = a.purchase_date.unwrap() + Duration::days(365 * 20);
        let summary = a.depreciation_at(as_of).unwrap();
        assert_eq!(summary.book_value, 1000.0);
        assert!(summary.fully_depreciated);
        assert_eq!(summary.accumulated_depreciation, 9000.0);
    }

    #[test]
    fn declining_balance_uses_double_rate_by_default() {
        let a = asset(DepreciationMethod::DecliningBalance);
        let as_of = a.purchase_date.unwrap() + Duration::days(365);
        let summary = a.depreciation_at(as_of).unwrap();
        // 0.8 ^ 0.99932 of 10k.
        assert!(summary.book_value > 8000.0 && summary.book_value < 8003.0);
    }

    #[test]
    fn warranty_window() {
        let a = asset(DepreciationMethod::StraightLine);
        let start = a.purchase_date.unwrap();
        assert!(a.warranty_active(start + Duration::days(10)));
        assert!(!a.warranty_active(start + Duration::days(800)));
    }

    #[test]
    fn salvage_above_cost_is_rejected() {
        let mut a = asset(DepreciationMethod::StraightLine);
        a.purchase_cost = Some(500.0);
        assert!(a.validate_rules().is_err());
    }
}
