use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub move_in_date: Option<DateTime<Utc>>,
    pub status: TenantStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate_rules(&self) -> Result<(), String> {
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return Err("First and last name are required".to_string());
        }
        if self.phone.is_empty() {
            return Err("Phone is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
}

impl BillingCycle {
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::SemiAnnually => 6,
            BillingCycle::Annually => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

impl LeaseStatus {
    pub fn can_transition_to(&self, next: LeaseStatus) -> bool {
        use LeaseStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Terminated) | (Active, Expired) | (Active, Terminated)
        ) || *self == next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub tenant_id: String,
    pub unit_id: String,
    pub building_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub end_date: Option<DateTime<Utc>>,
    /// Rent per month.
    pub rent_amount: f64,
    pub deposit_amount: f64,
    pub billing_cycle: BillingCycle,
    pub payment_due_day: u32,
    pub status: LeaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_billed_through: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub terminated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A billing period, both ends inclusive, with the payment due date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub due: DateTime<Utc>,
    pub months: u32,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

impl Lease {
    pub fn validate_rules(&self) -> Result<(), String> {
        if let Some(end) = self.end_date {
            if self.start_date >= end {
                return Err("Lease start date must be before end date".to_string());
            }
        }
        if self.rent_amount < 0.0 || self.deposit_amount < 0.0 {
            return Err("Rent and deposit cannot be negative".to_string());
        }
        if !(1..=28).contains(&self.payment_due_day) {
            return Err("Payment due day must be between 1 and 28".to_string());
        }
        Ok(())
    }

    /// The period following the last billed one, or `None` once the lease
    /// end date has been billed.
    pub fn next_billing_period(&self) -> Option<BillingPeriod> {
        let start = match self.last_billed_through {
            Some(through) => through.date_naive() + Duration::days(1),
            None => self.start_date.date_naive(),
        };
        let end_limit = self.end_date.map(|d| d.date_naive());
        if end_limit.is_some_and(|limit| start > limit) {
            return None;
        }

        let months = self.billing_cycle.months();
        let mut end = start.checked_add_months(Months::new(months))? - Duration::days(1);
        if let Some(limit) = end_limit {
            end = end.min(limit);
        }

        let mut due = start.with_day(self.payment_due_day)?;
        if due < start {
            due = due.checked_add_months(Months::new(1))?;
        }

        Some(BillingPeriod {
            start: midnight(start),
            end: midnight(end),
            due: midnight(due),
            months,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn lease() -> Lease {
        let now = Utc::now();
        Lease {
            id: "l1".into(),
            organization_id: "org".into(),
            tenant_id: "t1".into(),
            unit_id: "u1".into(),
            building_id: "b1".into(),
            start_date: date(2024, 1, 15),
            end_date: Some(date(2024, 12, 31)),
            rent_amount: 1000.0,
            deposit_amount: 2000.0,
            billing_cycle: BillingCycle::Monthly,
            payment_due_day: 5,
            status: LeaseStatus::Active,
            terms: None,
            last_billed_through: None,
            terminated_at: None,
            termination_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn start_must_precede_end() {
        let mut l = lease();
        l.end_date = Some(l.start_date);
        assert!(l.validate_rules().is_err());
    }

    #[test]
    fn due_day_limited_to_28() {
        let mut l = lease();
        l.payment_due_day = 31;
        assert!(l.validate_rules().is_err());
    }

    #[test]
    fn first_period_starts_at_lease_start() {
        let period = lease().next_billing_period().unwrap();
        assert_eq!(period.start, date(2024, 1, 15));
        assert_eq!(period.end, date(2024, 2, 14));
        // Due day 5 has passed in January, so it rolls into February.
        assert_eq!(period.due, date(2024, 2, 5));
    }

    #[test]
    fn next_period_follows_last_billed() {
        let mut l = lease();
        l.billing_cycle = BillingCycle::Quarterly;
        l.last_billed_through = Some(date(2024, 3, 31));
        let period = l.next_billing_period().unwrap();
        assert_eq!(period.start, date(2024, 4, 1));
        assert_eq!(period.end, date(2024, 6, 30));
        assert_eq!(period.due, date(2024, 4, 5));
        assert_eq!(period.months, 3);
    }

    #[test]
    fn period_is_clamped_to_lease_end() {
        let mut l = lease();
        l.last_billed_through = Some(date(2024, 12, 14));
        let period = l.next_billing_period().unwrap();
        assert_eq!(period.end, date(2024, 12, 31));

        l.last_billed_through = Some(date(2024, 12, 31));
        assert!(l.next_billing_period().is_none());
    }

    #[test]
    fn lease_transitions() {
        assert!(LeaseStatus::Draft.can_transition_to(LeaseStatus::Active));
        assert!(LeaseStatus::Active.can_transition_to(LeaseStatus::Terminated));
        assert!(!LeaseStatus::Terminated.can_transition_to(LeaseStatus::Active));
        assert!(!LeaseStatus::Expired.can_transition_to(LeaseStatus::Draft));
    }
}
