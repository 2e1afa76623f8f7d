use crate::models::{Meter, MeterReading, MeterStatus, MeterType};
use crate::utils::time::{flexible, flexible_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeterRequest {
    #[validate(length(min = 1))]
    pub building_id: String,
    pub unit_id: Option<String>,
    pub asset_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub meter_number: String,
    pub meter_type: MeterType,
    /// Defaults to the meter type's usual unit.
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub multiplier: Option<f64>,
    pub status: Option<MeterStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub installed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeterRequest {
    pub unit_id: Option<String>,
    pub asset_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub meter_number: Option<String>,
    pub meter_type: Option<MeterType>,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub multiplier: Option<f64>,
    pub status: Option<MeterStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub installed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterResponse {
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub meter_number: String,
    pub meter_type: MeterType,
    pub unit_of_measure: String,
    pub multiplier: f64,
    pub status: MeterStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Meter> for MeterResponse {
    fn from(m: Meter) -> Self {
        Self {
            id: m.id,
            organization_id: m.organization_id,
            building_id: m.building_id,
            unit_id: m.unit_id,
            asset_id: m.asset_id,
            meter_number: m.meter_number,
            meter_type: m.meter_type,
            unit_of_measure: m.unit_of_measure,
            multiplier: m.multiplier,
            status: m.status,
            installed_at: m.installed_at,
            last_reading: m.last_reading,
            last_reading_at: m.last_reading_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    #[validate(range(min = 0.0))]
    pub value: f64,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub reading_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allow_decrease: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadingRequest {
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub reading_at: Option<DateTime<Utc>>,
    pub allow_decrease: Option<bool>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub id: String,
    pub organization_id: String,
    pub meter_id: String,
    pub value: f64,
    pub reading_at: DateTime<Utc>,
    pub consumption: f64,
    pub allow_decrease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MeterReading> for ReadingResponse {
    fn from(r: MeterReading) -> Self {
        Self {
            id: r.id,
            organization_id: r.organization_id,
            meter_id: r.meter_id,
            value: r.value,
            reading_at: r.reading_at,
            consumption: r.consumption,
            allow_decrease: r.allow_decrease,
            notes: r.notes,
            recorded_by: r.recorded_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionQuery {
    #[serde(deserialize_with = "flexible")]
    pub from: DateTime<Utc>,
    #[serde(deserialize_with = "flexible")]
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionSummary {
    pub meter_id: String,
    pub unit_of_measure: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub readings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_value: Option<f64>,
    pub total_consumption: f64,
}
