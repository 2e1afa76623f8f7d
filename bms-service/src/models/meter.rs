use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MeterType {
    Electricity,
    Water,
    Gas,
    Heating,
    Other,
}

impl MeterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeterType::Electricity => "electricity",
            MeterType::Water => "water",
            MeterType::Gas => "gas",
            MeterType::Heating => "heating",
            MeterType::Other => "other",
        }
    }

    pub fn default_unit(&self) -> &'static str {
        match self {
            MeterType::Electricity => "kWh",
            MeterType::Water | MeterType::Gas => "m3",
            MeterType::Heating => "kWh",
            MeterType::Other => "unit",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeterStatus {
    Active,
    Inactive,
    Faulty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub meter_number: String,
    pub meter_type: MeterType,
    pub unit_of_measure: String,
    pub multiplier: f64,
    pub status: MeterStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_reading_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Meter {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.meter_number.is_empty() {
            return Err("Meter number is required".to_string());
        }
        if self.multiplier <= 0.0 {
            return Err("Multiplier must be positive".to_string());
        }
        if self.unit_of_measure.is_empty() {
            return Err("Unit of measure is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterReading {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub meter_id: String,
    pub value: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub reading_at: DateTime<Utc>,
    pub consumption: f64,
    #[serde(default)]
    pub allow_decrease: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Readings are monotonic: a value must not fall below the previous reading
/// nor rise above the following one unless flagged as a correction.
pub fn check_reading(
    value: f64,
    previous: Option<f64>,
    next: Option<f64>,
    allow_decrease: bool,
) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err("Reading value must be a non-negative number".to_string());
    }
    if allow_decrease {
        return Ok(());
    }
    if let Some(prev) = previous {
        if value < prev {
            return Err(format!(
                "Reading {} is lower than the previous reading {}; set allowDecrease for corrections",
                value, prev
            ));
        }
    }
    if let Some(next) = next {
        if value > next {
            return Err(format!(
                "Reading {} is higher than the following reading {}",
                value, next
            ));
        }
    }
    Ok(())
}

/// Consumption since the previous reading scaled by the meter multiplier.
/// A correction below the previous value resets the baseline to zero usage.
pub fn consumption(value: f64, previous: Option<f64>, multiplier: f64) -> f64 {
    match previous {
        Some(prev) => {
            let delta = ((value - prev) * multiplier).max(0.0);
            (delta * 1000.0).round() / 1000.0
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reading_below_previous() {
        assert!(check_reading(90.0, Some(100.0), None, false).is_err());
    }

    #[test]
    fn allow_decrease_permits_corrections() {
        assert!(check_reading(90.0, Some(100.0), None, true).is_ok());
    }

    #[test]
    fn backdated_reading_must_not_exceed_next() {
        assert!(check_reading(150.0, Some(100.0), Some(120.0), false).is_err());
        assert!(check_reading(110.0, Some(100.0), Some(120.0), false).is_ok());
    }

    #[test]
    fn equal_reading_is_accepted() {
        assert!(check_reading(100.0, Some(100.0), None, false).is_ok());
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(check_reading(-1.0, None, None, true).is_err());
    }

    #[test]
    fn consumption_uses_multiplier() {
        assert_eq!(consumption(150.0, Some(100.0), 2.0), 100.0);
        assert_eq!(consumption(150.0, None, 2.0), 0.0);
        assert_eq!(consumption(80.0, Some(100.0), 1.0), 0.0);
    }
}
