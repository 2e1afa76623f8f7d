pub mod asset;
pub mod billing;
pub mod building;
pub mod feature_flag;
pub mod maintenance;
pub mod meter;
pub mod notification;
pub mod organization;
pub mod security;
pub mod tenant;
pub mod user;

pub use asset::*;
pub use billing::*;
pub use building::*;
pub use feature_flag::*;
pub use maintenance::*;
pub use meter::*;
pub use notification::*;
pub use organization::*;
pub use security::*;
pub use tenant::*;
pub use user::*;

/// Round a monetary amount to cents.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trim and drop empty optional strings.
pub fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Helper module for optional DateTime<Utc> as BSON DateTime
pub mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                bson_dt.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_cents(10.005_1), 10.01);
        assert_eq!(round_cents(3.333_3), 3.33);
        assert_eq!(round_cents(0.0), 0.0);
    }

    #[test]
    fn clean_opt_drops_blank_strings() {
        assert_eq!(clean_opt(Some("  ".into())), None);
        assert_eq!(clean_opt(Some(" a ".into())), Some("a".into()));
        assert_eq!(clean_opt(None), None);
    }
}
