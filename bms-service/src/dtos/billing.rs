use crate::models::{
    Invoice, InvoiceStatus, LineItem, MeterType, Payment, PaymentMethod, PaymentStatus,
    ReconciliationInfo, RefundInfo, UtilityPayment, UtilityPaymentStatus,
};
use crate::utils::time::{flexible, flexible_opt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    #[validate(length(min = 1, max = 300))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0))]
    pub quantity: f64,
    #[validate(range(min = 0.0))]
    pub unit_price: f64,
}

impl From<LineItemInput> for LineItem {
    fn from(i: LineItemInput) -> Self {
        LineItem {
            description: i.description.trim().to_string(),
            quantity: i.quantity,
            unit_price: i.unit_price,
            amount: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    pub lease_id: Option<String>,
    pub unit_id: Option<String>,
    #[validate(length(min = 1), nested)]
    pub line_items: Vec<LineItemInput>,
    /// Defaults to the organization's VAT rate.
    #[validate(range(min = 0.0, max = 1.0))]
    pub vat_rate: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub issue_date: Option<DateTime<Utc>>,
    /// Defaults to issue date plus the organization's payment terms.
    #[serde(default, deserialize_with = "flexible_opt")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub period_end: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1), nested)]
    pub line_items: Option<Vec<LineItemInput>>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub vat_rate: Option<f64>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<InvoiceStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    pub organization_id: String,
    pub invoice_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub balance_due: f64,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(i: Invoice) -> Self {
        Self {
            balance_due: i.balance_due(),
            id: i.id,
            organization_id: i.organization_id,
            invoice_number: i.invoice_number,
            lease_id: i.lease_id,
            tenant_id: i.tenant_id,
            unit_id: i.unit_id,
            line_items: i.line_items,
            subtotal: i.subtotal,
            vat_rate: i.vat_rate,
            vat_amount: i.vat_amount,
            total: i.total,
            amount_paid: i.amount_paid,
            issue_date: i.issue_date,
            due_date: i.due_date,
            period_start: i.period_start,
            period_end: i.period_end,
            status: i.status,
            notes: i.notes,
            paid_at: i.paid_at,
            sent_at: i.sent_at,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOverdueResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1))]
    pub invoice_id: String,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    pub method: PaymentMethod,
    /// Defaults to `completed`.
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 200))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    #[validate(length(max = 200))]
    pub bank_reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refunded_by: String,
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
}

impl From<RefundInfo> for RefundResponse {
    fn from(r: RefundInfo) -> Self {
        Self {
            refunded_by: r.refunded_by,
            reason: r.reason,
            refunded_at: r.refunded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub reconciled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<ReconciliationInfo> for ReconciliationResponse {
    fn from(r: ReconciliationInfo) -> Self {
        Self {
            reconciled: r.reconciled,
            reconciled_at: r.reconciled_at,
            reconciled_by: r.reconciled_by,
            bank_reference: r.bank_reference,
            notes: r.notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub organization_id: String,
    pub invoice_id: String,
    pub tenant_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundResponse>,
    pub reconciliation: ReconciliationResponse,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            organization_id: p.organization_id,
            invoice_id: p.invoice_id,
            tenant_id: p.tenant_id,
            amount: p.amount,
            method: p.method,
            status: p.status,
            reference: p.reference,
            notes: p.notes,
            paid_at: p.paid_at,
            tx_ref: p.tx_ref,
            checkout_url: p.checkout_url,
            refund: p.refund.map(Into::into),
            reconciliation: p.reconciliation.into(),
            recorded_by: p.recorded_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChapaInitializeRequest {
    #[validate(length(min = 1))]
    pub invoice_id: String,
    /// Defaults to the invoice balance.
    #[validate(range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapaInitializeResponse {
    pub payment_id: String,
    pub tx_ref: String,
    pub checkout_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapaVerifyResponse {
    pub tx_ref: String,
    pub status: PaymentStatus,
    pub payment: PaymentResponse,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUtilityPaymentRequest {
    #[validate(length(min = 1))]
    pub meter_id: String,
    pub unit_id: Option<String>,
    pub tenant_id: Option<String>,
    /// Defaults to the meter's type.
    pub utility_type: Option<MeterType>,
    #[serde(deserialize_with = "flexible")]
    pub period_start: DateTime<Utc>,
    #[serde(deserialize_with = "flexible")]
    pub period_end: DateTime<Utc>,
    #[validate(range(min = 0.0))]
    pub consumption: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: Option<UtilityPaymentStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub paid_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub receipt_url: Option<String>,
    #[validate(length(max = 200))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUtilityPaymentRequest {
    pub unit_id: Option<String>,
    pub tenant_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub period_end: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0))]
    pub consumption: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    pub amount: Option<f64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<UtilityPaymentStatus>,
    #[serde(default, deserialize_with = "flexible_opt")]
    pub paid_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub receipt_url: Option<String>,
    #[validate(length(max = 200))]
    pub reference: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityPaymentResponse {
    pub id: String,
    pub organization_id: String,
    pub meter_id: String,
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub utility_type: MeterType,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<f64>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: UtilityPaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundResponse>,
    pub reconciliation: ReconciliationResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UtilityPayment> for UtilityPaymentResponse {
    fn from(p: UtilityPayment) -> Self {
        Self {
            id: p.id,
            organization_id: p.organization_id,
            meter_id: p.meter_id,
            building_id: p.building_id,
            unit_id: p.unit_id,
            tenant_id: p.tenant_id,
            utility_type: p.utility_type,
            period_start: p.period_start,
            period_end: p.period_end,
            consumption: p.consumption,
            amount: p.amount,
            method: p.method,
            status: p.status,
            paid_at: p.paid_at,
            receipt_url: p.receipt_url,
            reference: p.reference,
            notes: p.notes,
            refund: p.refund.map(Into::into),
            reconciliation: p.reconciliation.into(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_request(line_items: serde_json::Value) -> CreateInvoiceRequest {
        serde_json::from_value(json!({ "tenantId": "t1", "lineItems": line_items })).unwrap()
    }

    #[test]
    fn invoice_needs_at_least_one_line_item() {
        assert!(invoice_request(json!([])).validate().is_err());
    }

    #[test]
    fn line_items_are_validated_individually() {
        let bad = invoice_request(json!([
            { "description": "Rent", "quantity": 1.0, "unitPrice": 1000.0 },
            { "description": "", "quantity": 0.0, "unitPrice": 5.0 },
        ]));
        assert!(bad.validate().is_err());

        let good = invoice_request(json!([
            { "description": "Rent", "quantity": 1.0, "unitPrice": 1000.0 },
        ]));
        assert!(good.validate().is_ok());
    }

    #[test]
    fn update_validates_replacement_line_items() {
        let update: UpdateInvoiceRequest =
            serde_json::from_value(json!({ "lineItems": [] })).unwrap();
        assert!(update.validate().is_err());
        assert!(UpdateInvoiceRequest::default().validate().is_ok());
    }
}
