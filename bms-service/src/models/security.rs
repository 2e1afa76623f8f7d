use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HolderType {
    Tenant,
    Staff,
    Visitor,
    Contractor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Active,
    Revoked,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for Day {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

/// Parse `HH:mm` into minutes after midnight.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(h) || !two_digits(m) {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_time: String,
    pub end_time: String,
    pub days: Vec<Day>,
}

impl TimeWindow {
    pub fn validate_rules(&self) -> Result<(), String> {
        let start = parse_hhmm(&self.start_time)
            .ok_or_else(|| format!("Invalid start time '{}', expected HH:mm", self.start_time))?;
        let end = parse_hhmm(&self.end_time)
            .ok_or_else(|| format!("Invalid end time '{}', expected HH:mm", self.end_time))?;
        if start >= end {
            return Err("Time window start must be before its end".to_string());
        }
        if self.days.is_empty() {
            return Err("Time window needs at least one day".to_string());
        }
        for (i, d) in self.days.iter().enumerate() {
            if self.days[..i].contains(d) {
                return Err(format!("Day {:?} listed twice", d));
            }
        }
        Ok(())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let (Some(start), Some(end)) = (parse_hhmm(&self.start_time), parse_hhmm(&self.end_time))
        else {
            return false;
        };
        let minute = at.hour() * 60 + at.minute();
        self.days.contains(&Day::from(at.weekday())) && minute >= start && minute < end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPermission {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub holder_type: HolderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_id: Option<String>,
    pub holder_name: String,
    pub access_level: String,
    #[serde(default)]
    pub areas: Vec<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub valid_from: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub valid_until: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    pub status: AccessStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_reason: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub granted: bool,
    pub reason: String,
}

impl AccessDecision {
    fn deny(reason: &str) -> Self {
        Self {
            granted: false,
            reason: reason.to_string(),
        }
    }
}

impl AccessPermission {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.holder_name.is_empty() {
            return Err("Holder name is required".to_string());
        }
        if self.access_level.is_empty() {
            return Err("Access level is required".to_string());
        }
        if self.valid_from >= self.valid_until {
            return Err("validFrom must be before validUntil".to_string());
        }
        if let Some(window) = &self.time_window {
            window.validate_rules()?;
        }
        Ok(())
    }

    /// Whether the permission lets its holder in at `at`, optionally into a
    /// specific area. An empty area list covers the whole building.
    pub fn check(&self, at: DateTime<Utc>, area: Option<&str>) -> AccessDecision {
        match self.status {
            AccessStatus::Revoked => return AccessDecision::deny("Permission revoked"),
            AccessStatus::Expired => return AccessDecision::deny("Permission expired"),
            AccessStatus::Active => {}
        }
        if at < self.valid_from {
            return AccessDecision::deny("Permission not yet valid");
        }
        if at > self.valid_until {
            return AccessDecision::deny("Permission expired");
        }
        if let Some(window) = &self.time_window {
            if !window.contains(at) {
                return AccessDecision::deny("Outside the permitted time window");
            }
        }
        if let Some(area) = area {
            if !self.areas.is_empty() && !self.areas.iter().any(|a| a.eq_ignore_ascii_case(area)) {
                return AccessDecision::deny("Area not covered by this permission");
            }
        }
        AccessDecision {
            granted: true,
            reason: "Access granted".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, IncidentStatus::Open | IncidentStatus::Investigating)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityIncident {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub title: String,
    pub description: String,
    pub incident_type: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub occurred_at: DateTime<Utc>,
    pub reported_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_staff_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl SecurityIncident {
    pub fn validate_rules(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.title.is_empty() || self.description.is_empty() {
            return Err("Incident title and description are required".to_string());
        }
        if self.occurred_at > now {
            return Err("Incident cannot occur in the future".to_string());
        }
        Ok(())
    }

    /// Set the status, stamping `resolvedAt` on resolution and clearing it
    /// when the incident is reopened.
    pub fn set_status(&mut self, status: IncidentStatus, now: DateTime<Utc>) {
        if status.is_open() {
            self.resolved_at = None;
        } else if self.resolved_at.is_none() {
            self.resolved_at = Some(now);
        }
        self.status = status;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitorStatus {
    CheckedIn,
    CheckedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorLog {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub building_id: String,
    pub visitor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_number: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub check_in_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub check_out_at: Option<DateTime<Utc>>,
    pub status: VisitorStatus,
    pub logged_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl VisitorLog {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.visitor_name.is_empty() || self.purpose.is_empty() {
            return Err("Visitor name and purpose are required".to_string());
        }
        if let Some(out) = self.check_out_at {
            if out < self.check_in_at {
                return Err("Check-out cannot be before check-in".to_string());
            }
        }
        Ok(())
    }

    pub fn check_out(&mut self, at: DateTime<Utc>) -> Result<(), String> {
        if self.status != VisitorStatus::CheckedIn {
            return Err("Visitor is already checked out".to_string());
        }
        if at < self.check_in_at {
            return Err("Check-out cannot be before check-in".to_string());
        }
        self.check_out_at = Some(at);
        self.status = VisitorStatus::CheckedOut;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaffStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStaff {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub building_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
    pub status: StaffStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl SecurityStaff {
    /// Shifts may wrap past midnight, so only equal ends are rejected.
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.name.is_empty() || self.phone.is_empty() {
            return Err("Staff name and phone are required".to_string());
        }
        if let Some(shift) = &self.shift {
            let start = parse_hhmm(&shift.start_time)
                .ok_or_else(|| format!("Invalid shift start '{}'", shift.start_time))?;
            let end = parse_hhmm(&shift.end_time)
                .ok_or_else(|| format!("Invalid shift end '{}'", shift.end_time))?;
            if start == end {
                return Err("Shift start and end cannot be equal".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn permission() -> AccessPermission {
        // 2024-03-04 is a Monday.
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        AccessPermission {
            id: "p1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            holder_type: HolderType::Contractor,
            holder_id: None,
            holder_name: "Abebe".into(),
            access_level: "standard".into(),
            areas: vec!["lobby".into(), "roof".into()],
            valid_from: from,
            valid_until: from + Duration::days(30),
            time_window: Some(TimeWindow {
                start_time: "08:00".into(),
                end_time: "17:30".into(),
                days: vec![Day::Monday, Day::Tuesday],
            }),
            status: AccessStatus::Active,
            revoked_at: None,
            revoke_reason: None,
            created_at: from,
            updated_at: from,
        }
    }

    #[test]
    fn parses_hhmm() {
        assert_eq!(parse_hhmm("08:30"), Some(510));
        assert_eq!(parse_hhmm("23:59"), Some(1439));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("8:30"), None);
        assert_eq!(parse_hhmm("08-30"), None);
        assert_eq!(parse_hhmm("+8:00"), None);
        assert_eq!(parse_hhmm("08:+5"), None);
    }

    #[test]
    fn window_rejects_signed_times() {
        let mut p = permission();
        if let Some(w) = p.time_window.as_mut() {
            w.start_time = "+8:00".into();
        }
        assert!(p.validate_rules().is_err());
    }

    #[test]
    fn window_must_be_ordered() {
        let mut p = permission();
        if let Some(w) = p.time_window.as_mut() {
            w.start_time = "18:00".into();
        }
        assert!(p.validate_rules().is_err());
    }

    #[test]
    fn valid_from_must_precede_valid_until() {
        let mut p = permission();
        p.valid_until = p.valid_from;
        assert!(p.validate_rules().is_err());
    }

    #[test]
    fn check_honours_weekday_and_time() {
        let p = permission();
        let monday_noon = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        assert!(p.check(monday_noon, None).granted);

        let monday_evening = Utc.with_ymd_and_hms(2024, 3, 4, 17, 30, 0).unwrap();
        assert!(!p.check(monday_evening, None).granted);

        let wednesday = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        assert!(!p.check(wednesday, None).granted);
    }

    #[test]
    fn check_honours_area_and_status() {
        let mut p = permission();
        let monday_noon = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();
        assert!(p.check(monday_noon, Some("Roof")).granted);
        assert!(!p.check(monday_noon, Some("basement")).granted);

        p.status = AccessStatus::Revoked;
        assert_eq!(p.check(monday_noon, None).reason, "Permission revoked");
    }

    #[test]
    fn incident_resolution_is_stamped_and_cleared() {
        let now = Utc::now();
        let mut incident = SecurityIncident {
            id: "i1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            title: "Broken gate".into(),
            description: "Gate latch broken".into(),
            incident_type: "property_damage".into(),
            severity: Severity::Low,
            status: IncidentStatus::Open,
            occurred_at: now,
            reported_by: "u1".into(),
            assigned_staff_id: None,
            resolution: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        incident.set_status(IncidentStatus::Resolved, now);
        assert_eq!(incident.resolved_at, Some(now));
        incident.set_status(IncidentStatus::Closed, now + Duration::hours(1));
        assert_eq!(incident.resolved_at, Some(now));
        incident.set_status(IncidentStatus::Investigating, now);
        assert!(incident.resolved_at.is_none());
    }

    #[test]
    fn visitor_checkout_rules() {
        let now = Utc::now();
        let mut v = VisitorLog {
            id: "v1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            visitor_name: "Sara".into(),
            visitor_phone: None,
            id_number: None,
            host_tenant_id: None,
            unit_id: None,
            purpose: "Delivery".into(),
            badge_number: None,
            check_in_at: now,
            check_out_at: None,
            status: VisitorStatus::CheckedIn,
            logged_by: "u1".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(v.check_out(now - Duration::minutes(5)).is_err());
        assert!(v.check_out(now + Duration::minutes(5)).is_ok());
        assert!(v.check_out(now + Duration::minutes(10)).is_err());
    }
}
