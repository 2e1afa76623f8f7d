//! Request-side date parsing. Clients send either RFC 3339 timestamps or
//! plain `YYYY-MM-DD` dates (taken as midnight UTC).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN)))
}

pub fn flexible<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", raw))
    })
}

pub fn flexible_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", s))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(deserialize_with = "flexible")]
        at: DateTime<Utc>,
        #[serde(default, deserialize_with = "flexible_opt")]
        until: Option<DateTime<Utc>>,
    }

    #[test]
    fn accepts_plain_dates_and_timestamps() {
        let p: Stamped = serde_json::from_str(r#"{"at":"2024-05-01"}"#).unwrap();
        assert_eq!(p.at, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert!(p.until.is_none());

        let p: Stamped =
            serde_json::from_str(r#"{"at":"2024-05-01T10:00:00+03:00","until":"2024-06-01"}"#)
                .unwrap();
        assert_eq!(p.at, Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap());
        assert!(p.until.is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn blank_optional_date_is_none() {
        let p: Stamped = serde_json::from_str(r#"{"at":"2024-05-01","until":""}"#).unwrap();
        assert!(p.until.is_none());
    }
}
