use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
    #[serde(rename = "_id")]
    pub id: String,
    /// Absent for global flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub rollout_percentage: u8,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

pub fn is_valid_flag_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 100
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
}

/// Stable 0-99 bucket for an organization under a flag key.
pub fn rollout_bucket(key: &str, organization_id: &str) -> u8 {
    let digest = Sha256::digest(format!("{}:{}", key, organization_id).as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (prefix % 100) as u8
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlagEvaluation {
    pub key: String,
    pub enabled: bool,
    /// `organization`, `global` or `default`.
    pub source: String,
}

impl FeatureFlag {
    pub fn validate_rules(&self) -> Result<(), String> {
        if !is_valid_flag_key(&self.key) {
            return Err("Flag key may only contain a-z, 0-9, '_', '.' and '-'".to_string());
        }
        if self.rollout_percentage > 100 {
            return Err("Rollout percentage must be between 0 and 100".to_string());
        }
        Ok(())
    }

    pub fn is_enabled_for(&self, organization_id: &str) -> bool {
        self.enabled && rollout_bucket(&self.key, organization_id) < self.rollout_percentage
    }
}

/// An organization flag overrides the global one; no flag means disabled.
pub fn evaluate_flag(
    key: &str,
    organization_id: &str,
    org_flag: Option<&FeatureFlag>,
    global_flag: Option<&FeatureFlag>,
) -> FlagEvaluation {
    let (enabled, source) = match (org_flag, global_flag) {
        (Some(flag), _) => (flag.is_enabled_for(organization_id), "organization"),
        (None, Some(flag)) => (flag.is_enabled_for(organization_id), "global"),
        (None, None) => (false, "default"),
    };
    FlagEvaluation {
        key: key.to_string(),
        enabled,
        source: source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(org: Option<&str>, enabled: bool, pct: u8) -> FeatureFlag {
        let now = Utc::now();
        FeatureFlag {
            id: "f1".into(),
            organization_id: org.map(String::from),
            key: "new_dashboard".into(),
            description: None,
            enabled,
            rollout_percentage: pct,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn key_format() {
        assert!(is_valid_flag_key("billing.v2-beta_1"));
        assert!(!is_valid_flag_key("Billing"));
        assert!(!is_valid_flag_key("has space"));
        assert!(!is_valid_flag_key(""));
    }

    #[test]
    fn bucket_is_deterministic_and_bounded() {
        let a = rollout_bucket("new_dashboard", "org-1");
        assert_eq!(a, rollout_bucket("new_dashboard", "org-1"));
        for i in 0..50 {
            assert!(rollout_bucket("k", &format!("org-{}", i)) < 100);
        }
    }

    #[test]
    fn full_and_zero_rollout() {
        assert!(flag(None, true, 100).is_enabled_for("org-1"));
        assert!(!flag(None, true, 0).is_enabled_for("org-1"));
        assert!(!flag(None, false, 100).is_enabled_for("org-1"));
    }

    #[test]
    fn organization_flag_overrides_global() {
        let global = flag(None, true, 100);
        let org = flag(Some("org-1"), false, 100);
        let eval = evaluate_flag("new_dashboard", "org-1", Some(&org), Some(&global));
        assert!(!eval.enabled);
        assert_eq!(eval.source, "organization");

        let eval = evaluate_flag("new_dashboard", "org-1", None, Some(&global));
        assert!(eval.enabled);
        assert_eq!(eval.source, "global");

        let eval = evaluate_flag("missing", "org-1", None, None);
        assert!(!eval.enabled);
        assert_eq!(eval.source, "default");
    }
}
