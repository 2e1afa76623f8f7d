use super::round_cents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Statuses that still expect money.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::Pending | InvoiceStatus::Overdue
        )
    }

    /// Manual transitions. `Paid -> Sent/Overdue` happens only through a
    /// refund, which calls [`Invoice::apply_payments`] instead.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Sent)
                | (Draft, Pending)
                | (Draft, Cancelled)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (Pending, Paid)
                | (Pending, Overdue)
                | (Pending, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub invoice_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub period_end: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Outcome of re-evaluating an invoice against its completed payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Unchanged,
    Paid,
    Reopened,
}

impl Invoice {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.line_items.is_empty() {
            return Err("An invoice needs at least one line item".to_string());
        }
        for item in &self.line_items {
            if item.description.trim().is_empty() {
                return Err("Line item description is required".to_string());
            }
            if item.quantity <= 0.0 {
                return Err("Line item quantity must be positive".to_string());
            }
            if item.unit_price < 0.0 {
                return Err("Line item unit price cannot be negative".to_string());
            }
        }
        if !(0.0..=1.0).contains(&self.vat_rate) {
            return Err("VAT rate must be between 0 and 1".to_string());
        }
        if self.due_date < self.issue_date {
            return Err("Due date cannot be before issue date".to_string());
        }
        if let (Some(start), Some(end)) = (self.period_start, self.period_end) {
            if start > end {
                return Err("Billing period start must not be after its end".to_string());
            }
        }
        Ok(())
    }

    pub fn recompute_totals(&mut self) {
        for item in &mut self.line_items {
            item.amount = round_cents(item.quantity * item.unit_price);
        }
        self.subtotal = round_cents(self.line_items.iter().map(|i| i.amount).sum());
        self.vat_amount = round_cents(self.subtotal * self.vat_rate);
        self.total = round_cents(self.subtotal + self.vat_amount);
    }

    pub fn balance_due(&self) -> f64 {
        round_cents((self.total - self.amount_paid).max(0.0))
    }

    /// Record the cumulative completed payments and flip the status when the
    /// invoice becomes covered or stops being covered.
    pub fn apply_payments(&mut self, completed_total: f64, now: DateTime<Utc>) -> Settlement {
        self.amount_paid = round_cents(completed_total);
        let covered = self.amount_paid + 0.005 >= self.total;

        if covered && self.status.is_outstanding() {
            self.status = InvoiceStatus::Paid;
            self.paid_at = Some(now);
            return Settlement::Paid;
        }
        if !covered && self.status == InvoiceStatus::Paid {
            self.status = if self.due_date < now {
                InvoiceStatus::Overdue
            } else {
                InvoiceStatus::Sent
            };
            self.paid_at = None;
            return Settlement::Reopened;
        }
        Settlement::Unchanged
    }

    pub fn accepts_payments(&self) -> bool {
        self.status.is_outstanding()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    MobileMoney,
    Card,
    Chapa,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Card => "card",
            PaymentMethod::Chapa => "chapa",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInfo {
    pub reason: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub refunded_at: DateTime<Utc>,
    pub refunded_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationInfo {
    pub reconciled: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub reconciled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub invoice_id: String,
    pub tenant_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub paid_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundInfo>,
    #[serde(default)]
    pub reconciliation: ReconciliationInfo,
    pub recorded_by: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn ensure_refundable(&self) -> Result<(), String> {
        if self.status != PaymentStatus::Completed {
            return Err("Only completed payments can be refunded".to_string());
        }
        Ok(())
    }

    pub fn ensure_reconcilable(&self) -> Result<(), String> {
        if self.status != PaymentStatus::Completed {
            return Err("Only completed payments can be reconciled".to_string());
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> Result<(), String> {
        match self.status {
            PaymentStatus::Pending | PaymentStatus::Failed => Ok(()),
            _ => Err("Only pending or failed payments can be deleted".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UtilityPaymentStatus {
    Pending,
    Completed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityPayment {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub meter_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub utility_type: super::MeterType,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub period_start: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub period_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption: Option<f64>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: UtilityPaymentStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundInfo>,
    #[serde(default)]
    pub reconciliation: ReconciliationInfo,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl UtilityPayment {
    pub fn validate_rules(&self) -> Result<(), String> {
        if self.period_start >= self.period_end {
            return Err("Period start must be before period end".to_string());
        }
        if self.amount <= 0.0 {
            return Err("Amount must be positive".to_string());
        }
        if self.consumption.is_some_and(|c| c < 0.0) {
            return Err("Consumption cannot be negative".to_string());
        }
        if self.status == UtilityPaymentStatus::Completed && self.paid_at.is_none() {
            return Err("Completed payments need a payment date".to_string());
        }
        Ok(())
    }

    pub fn ensure_refundable(&self) -> Result<(), String> {
        if self.status != UtilityPaymentStatus::Completed {
            return Err("Only completed payments can be refunded".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invoice(status: InvoiceStatus) -> Invoice {
        let now = Utc::now();
        let mut inv = Invoice {
            id: "i1".into(),
            organization_id: "org".into(),
            invoice_number: "INV-2024-00001".into(),
            lease_id: None,
            tenant_id: "t1".into(),
            unit_id: None,
            line_items: vec![
                LineItem {
                    description: "Rent".into(),
                    quantity: 1.0,
                    unit_price: 1000.0,
                    amount: 0.0,
                },
                LineItem {
                    description: "Parking".into(),
                    quantity: 2.0,
                    unit_price: 33.335,
                    amount: 0.0,
                },
            ],
            subtotal: 0.0,
            vat_rate: 0.15,
            vat_amount: 0.0,
            total: 0.0,
            amount_paid: 0.0,
            issue_date: now,
            due_date: now + Duration::days(30),
            period_start: None,
            period_end: None,
            status,
            notes: None,
            paid_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        inv.recompute_totals();
        inv
    }

    #[test]
    fn totals_are_rounded_to_cents() {
        let inv = invoice(InvoiceStatus::Draft);
        assert_eq!(inv.line_items[1].amount, 66.67);
        assert_eq!(inv.subtotal, 1066.67);
        assert_eq!(inv.vat_amount, 160.0);
        assert_eq!(inv.total, 1226.67);
    }

    #[test]
    fn covering_payments_flip_invoice_to_paid() {
        let mut inv = invoice(InvoiceStatus::Sent);
        let now = Utc::now();
        assert_eq!(inv.apply_payments(1000.0, now), Settlement::Unchanged);
        assert_eq!(inv.status, InvoiceStatus::Sent);
        assert_eq!(inv.apply_payments(1226.67, now), Settlement::Paid);
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.paid_at, Some(now));
        assert_eq!(inv.balance_due(), 0.0);
    }

    #[test]
    fn refund_reopens_paid_invoice() {
        let mut inv = invoice(InvoiceStatus::Sent);
        let now = Utc::now();
        inv.apply_payments(inv.total, now);

        assert_eq!(inv.apply_payments(0.0, now), Settlement::Reopened);
        assert_eq!(inv.status, InvoiceStatus::Sent);
        assert!(inv.paid_at.is_none());

        inv.apply_payments(inv.total, now);
        inv.due_date = now - Duration::days(1);
        inv.apply_payments(10.0, now);
        assert_eq!(inv.status, InvoiceStatus::Overdue);
    }

    #[test]
    fn drafts_are_not_settled_by_payments() {
        let mut inv = invoice(InvoiceStatus::Draft);
        assert_eq!(inv.apply_payments(5000.0, Utc::now()), Settlement::Unchanged);
        assert_eq!(inv.status, InvoiceStatus::Draft);
    }

    #[test]
    fn invoice_transitions_are_guarded() {
        use InvoiceStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Overdue));
        assert!(Overdue.can_transition_to(Paid));
        assert!(!Cancelled.can_transition_to(Draft));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Draft.can_transition_to(Paid));
    }

    #[test]
    fn invoice_requires_line_items() {
        let mut inv = invoice(InvoiceStatus::Draft);
        inv.line_items.clear();
        assert!(inv.validate_rules().is_err());
    }
}
