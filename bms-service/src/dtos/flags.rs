use crate::models::FeatureFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeatureFlagRequest {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[validate(range(min = 0, max = 100))]
    pub rollout_percentage: Option<u8>,
    /// Create a platform-wide flag instead of one for the caller's organization.
    #[serde(default)]
    pub global: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeatureFlagRequest {
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub enabled: Option<bool>,
    #[validate(range(min = 0, max = 100))]
    pub rollout_percentage: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlagResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub rollout_percentage: u8,
    pub global: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeatureFlag> for FeatureFlagResponse {
    fn from(f: FeatureFlag) -> Self {
        Self {
            global: f.organization_id.is_none(),
            id: f.id,
            organization_id: f.organization_id,
            key: f.key,
            description: f.description,
            enabled: f.enabled,
            rollout_percentage: f.rollout_percentage,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}
