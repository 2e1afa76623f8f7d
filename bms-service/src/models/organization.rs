use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub settings: OrganizationSettings,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    pub currency: String,
    /// Fraction, e.g. 0.15 for 15% VAT.
    pub vat_rate: f64,
    pub invoice_prefix: String,
    pub payment_terms_days: u32,
    pub late_fee_percentage: f64,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            currency: "ETB".to_string(),
            vat_rate: 0.15,
            invoice_prefix: "INV".to_string(),
            payment_terms_days: 30,
            late_fee_percentage: 0.0,
            timezone: "Africa/Addis_Ababa".to_string(),
            contact_email: None,
            contact_phone: None,
            address: None,
        }
    }
}

impl OrganizationSettings {
    pub fn validate_rules(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.vat_rate) {
            return Err("VAT rate must be between 0 and 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.late_fee_percentage) {
            return Err("Late fee percentage must be between 0 and 100".to_string());
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err("Currency must be a three-letter ISO code".to_string());
        }
        let prefix_ok = !self.invoice_prefix.is_empty()
            && self.invoice_prefix.len() <= 10
            && self
                .invoice_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !prefix_ok {
            return Err("Invoice prefix must be 1-10 letters, digits or dashes".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(OrganizationSettings::default().validate_rules().is_ok());
    }

    #[test]
    fn rejects_out_of_range_vat() {
        let settings = OrganizationSettings {
            vat_rate: 15.0,
            ..Default::default()
        };
        assert!(settings.validate_rules().is_err());
    }

    #[test]
    fn rejects_malformed_currency() {
        let settings = OrganizationSettings {
            currency: "birr".into(),
            ..Default::default()
        };
        assert!(settings.validate_rules().is_err());
    }
}
