use super::chapa::{format_amount, ChapaClient, InitializeRequest, VerifyOutcome};
use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::invoices::InvoiceRepository;
use super::metrics;
use super::notifications::{NewNotification, NotificationRepository};
use super::scoped;
use crate::dtos::{ChapaInitializeRequest, CreatePaymentRequest, ReconcileRequest, RefundRequest};
use crate::models::{
    clean_opt, new_id, round_cents, Invoice, NotificationKind, Payment, PaymentMethod,
    PaymentStatus, ReconciliationInfo, RefundInfo,
};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    pub invoice_id: Option<String>,
    pub tenant_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub reconciled: Option<bool>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

/// Sum of the completed payments, rounded to cents.
pub fn completed_total(payments: &[Payment]) -> f64 {
    round_cents(
        payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .sum(),
    )
}

pub fn new_tx_ref() -> String {
    format!("bms-{}", uuid::Uuid::new_v4().simple())
}

#[derive(Clone)]
pub struct PaymentRepository {
    db: MongoDb,
    invoices: InvoiceRepository,
    notifications: NotificationRepository,
}

impl PaymentRepository {
    pub fn new(
        db: &MongoDb,
        invoices: InvoiceRepository,
        notifications: NotificationRepository,
    ) -> Self {
        Self {
            db: db.clone(),
            invoices,
            notifications,
        }
    }

    pub async fn record(
        &self,
        org_id: &str,
        recorded_by: &str,
        req: CreatePaymentRequest,
    ) -> ServiceResult<Payment> {
        let invoice: Invoice =
            scoped::reference_in_org(&self.db.invoices(), &req.invoice_id, org_id, "Invoice")
                .await?;
        if !invoice.accepts_payments() {
            return Err(ServiceError::invalid_state(format!(
                "Invoice {} is not awaiting payment",
                invoice.invoice_number
            )));
        }

        let status = req.status.unwrap_or(PaymentStatus::Completed);
        if status == PaymentStatus::Refunded {
            return Err(ServiceError::validation(
                "A payment cannot be recorded as refunded",
            ));
        }

        let now = Utc::now();
        let payment = Payment {
            id: new_id(),
            organization_id: org_id.to_string(),
            invoice_id: invoice.id.clone(),
            tenant_id: invoice.tenant_id.clone(),
            amount: round_cents(req.amount),
            method: req.method,
            status,
            reference: clean_opt(req.reference),
            notes: clean_opt(req.notes),
            paid_at: req.paid_at.unwrap_or(now),
            tx_ref: None,
            checkout_url: None,
            refund: None,
            reconciliation: ReconciliationInfo::default(),
            recorded_by: recorded_by.to_string(),
            created_at: now,
            updated_at: now,
        };

        scoped::insert(&self.db.payments(), &payment, "Payment").await?;
        metrics::record_payment(org_id, payment.method.as_str(), status.as_str());
        tracing::info!(
            payment_id = %payment.id,
            invoice_id = %invoice.id,
            organization_id = %org_id,
            amount = payment.amount,
            method = payment.method.as_str(),
            "Payment recorded"
        );

        if status == PaymentStatus::Completed {
            self.settle_invoice(&invoice.id, org_id).await?;
            self.notifications
                .notify(
                    org_id,
                    NewNotification {
                        kind: NotificationKind::PaymentReceived,
                        title: "Payment received".to_string(),
                        message: format!(
                            "{:.2} received for invoice {}",
                            payment.amount, invoice.invoice_number
                        ),
                        entity_type: "payment",
                        entity_id: Some(payment.id.clone()),
                    },
                )
                .await;
        }
        Ok(payment)
    }

    /// Recompute the invoice from all of its completed payments.
    async fn settle_invoice(&self, invoice_id: &str, org_id: &str) -> ServiceResult<()> {
        let payments = self.find_by_invoice(invoice_id, org_id).await?;
        self.invoices
            .apply_payments(invoice_id, org_id, completed_total(&payments))
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Payment>> {
        scoped::find_in_org(&self.db.payments(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &PaymentFilter) -> ServiceResult<Vec<Payment>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(invoice_id) = &filter.invoice_id {
            query.insert("invoiceId", invoice_id);
        }
        if let Some(tenant_id) = &filter.tenant_id {
            query.insert("tenantId", tenant_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(method) = &filter.method {
            query.insert("method", scoped::to_bson(method)?);
        }
        if let Some(reconciled) = filter.reconciled {
            query.insert("reconciliation.reconciled", reconciled);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("paidAt", range);
        }
        scoped::find_many(&self.db.payments(), query, doc! { "paidAt": -1 }).await
    }

    pub async fn find_by_invoice(&self, invoice_id: &str, org_id: &str) -> ServiceResult<Vec<Payment>> {
        let filter = PaymentFilter {
            invoice_id: Some(invoice_id.to_string()),
            ..Default::default()
        };
        self.list(org_id, &filter).await
    }

    pub async fn refund(
        &self,
        id: &str,
        org_id: &str,
        refunded_by: &str,
        req: RefundRequest,
    ) -> ServiceResult<Payment> {
        let mut payment = scoped::require_in_org(&self.db.payments(), id, org_id, "Payment").await?;
        payment.ensure_refundable().map_err(ServiceError::InvalidState)?;

        let now = Utc::now();
        payment.status = PaymentStatus::Refunded;
        payment.refund = Some(RefundInfo {
            reason: req.reason.trim().to_string(),
            refunded_at: now,
            refunded_by: refunded_by.to_string(),
        });
        payment.updated_at = now;
        scoped::replace_in_org(&self.db.payments(), id, org_id, &payment, "Payment").await?;
        tracing::info!(payment_id = %id, organization_id = %org_id, amount = payment.amount, "Payment refunded");

        self.settle_invoice(&payment.invoice_id, org_id).await?;
        self.notifications
            .notify(
                org_id,
                NewNotification {
                    kind: NotificationKind::PaymentRefunded,
                    title: "Payment refunded".to_string(),
                    message: format!("{:.2} refunded", payment.amount),
                    entity_type: "payment",
                    entity_id: Some(payment.id.clone()),
                },
            )
            .await;
        Ok(payment)
    }

    pub async fn reconcile(
        &self,
        id: &str,
        org_id: &str,
        reconciled_by: &str,
        req: ReconcileRequest,
    ) -> ServiceResult<Payment> {
        let mut payment = scoped::require_in_org(&self.db.payments(), id, org_id, "Payment").await?;
        payment.ensure_reconcilable().map_err(ServiceError::InvalidState)?;

        let now = Utc::now();
        payment.reconciliation = ReconciliationInfo {
            reconciled: true,
            reconciled_at: Some(now),
            reconciled_by: Some(reconciled_by.to_string()),
            bank_reference: clean_opt(req.bank_reference),
            notes: clean_opt(req.notes),
        };
        payment.updated_at = now;
        scoped::replace_in_org(&self.db.payments(), id, org_id, &payment, "Payment").await?;
        tracing::info!(payment_id = %id, organization_id = %org_id, "Payment reconciled");
        Ok(payment)
    }

    /// Hard delete, allowed for pending or failed payments.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let payment = scoped::require_in_org(&self.db.payments(), id, org_id, "Payment").await?;
        payment.ensure_deletable().map_err(ServiceError::InvalidState)?;
        scoped::delete_in_org(&self.db.payments(), id, org_id, "Payment").await?;
        tracing::info!(payment_id = %id, organization_id = %org_id, "Payment deleted");
        Ok(())
    }

    /// Open a hosted checkout and track it as a pending payment.
    pub async fn chapa_initialize(
        &self,
        chapa: &ChapaClient,
        org_id: &str,
        recorded_by: &str,
        req: ChapaInitializeRequest,
    ) -> ServiceResult<Payment> {
        let invoice: Invoice =
            scoped::reference_in_org(&self.db.invoices(), &req.invoice_id, org_id, "Invoice")
                .await?;
        if !invoice.accepts_payments() {
            return Err(ServiceError::invalid_state(format!(
                "Invoice {} is not awaiting payment",
                invoice.invoice_number
            )));
        }
        let amount = round_cents(req.amount.unwrap_or_else(|| invoice.balance_due()));
        if amount <= 0.0 {
            return Err(ServiceError::validation("Nothing left to pay on this invoice"));
        }

        let tenant =
            scoped::reference_in_org(&self.db.tenants(), &invoice.tenant_id, org_id, "Tenant")
                .await?;
        let currency = self
            .db
            .organizations()
            .find_one(doc! { "_id": org_id }, None)
            .await?
            .map(|o| o.settings.currency)
            .unwrap_or_else(|| "ETB".to_string());

        let tx_ref = new_tx_ref();
        let checkout_url = chapa
            .initialize(&InitializeRequest {
                amount: format_amount(amount),
                currency,
                email: req.email.unwrap_or_else(|| tenant.email.clone()),
                first_name: tenant.first_name.clone(),
                last_name: tenant.last_name.clone(),
                tx_ref: tx_ref.clone(),
                callback_url: chapa.callback_url(),
                return_url: chapa.return_url(),
            })
            .await?;

        let now = Utc::now();
        let payment = Payment {
            id: new_id(),
            organization_id: org_id.to_string(),
            invoice_id: invoice.id.clone(),
            tenant_id: invoice.tenant_id.clone(),
            amount,
            method: PaymentMethod::Chapa,
            status: PaymentStatus::Pending,
            reference: None,
            notes: None,
            paid_at: now,
            tx_ref: Some(tx_ref),
            checkout_url: Some(checkout_url),
            refund: None,
            reconciliation: ReconciliationInfo::default(),
            recorded_by: recorded_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        scoped::insert(&self.db.payments(), &payment, "Payment").await?;
        metrics::record_payment(org_id, PaymentMethod::Chapa.as_str(), "pending");
        tracing::info!(
            payment_id = %payment.id,
            invoice_id = %invoice.id,
            organization_id = %org_id,
            "Chapa checkout opened"
        );
        Ok(payment)
    }

    /// Confirm a Chapa transaction and settle the invoice when it succeeded.
    pub async fn chapa_verify(
        &self,
        chapa: &ChapaClient,
        org_id: &str,
        tx_ref: &str,
    ) -> ServiceResult<Payment> {
        let mut payment = self
            .db
            .payments()
            .find_one(doc! { "organizationId": org_id, "txRef": tx_ref }, None)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment"))?;
        if payment.status != PaymentStatus::Pending {
            return Ok(payment);
        }

        let verification = chapa.verify(tx_ref).await?;
        let now = Utc::now();
        match verification.outcome {
            VerifyOutcome::Pending => return Ok(payment),
            VerifyOutcome::Success => {
                payment.status = PaymentStatus::Completed;
                payment.paid_at = now;
                payment.reference = verification.reference.or(payment.reference);
            }
            VerifyOutcome::Failed => payment.status = PaymentStatus::Failed,
        }
        payment.updated_at = now;
        let id = payment.id.clone();
        scoped::replace_in_org(&self.db.payments(), &id, org_id, &payment, "Payment").await?;
        tracing::info!(payment_id = %id, tx_ref = %tx_ref, status = ?payment.status, "Chapa payment verified");

        if payment.status == PaymentStatus::Completed {
            metrics::record_payment(org_id, PaymentMethod::Chapa.as_str(), "completed");
            self.settle_invoice(&payment.invoice_id, org_id).await?;
            self.notifications
                .notify(
                    org_id,
                    NewNotification {
                        kind: NotificationKind::PaymentReceived,
                        title: "Payment received".to_string(),
                        message: format!("{:.2} received via Chapa", payment.amount),
                        entity_type: "payment",
                        entity_id: Some(id),
                    },
                )
                .await;
        }
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(amount: f64, status: PaymentStatus) -> Payment {
        let now = Utc::now();
        Payment {
            id: new_id(),
            organization_id: "org".into(),
            invoice_id: "inv".into(),
            tenant_id: "t".into(),
            amount,
            method: PaymentMethod::Cash,
            status,
            reference: None,
            notes: None,
            paid_at: now,
            tx_ref: None,
            checkout_url: None,
            refund: None,
            reconciliation: ReconciliationInfo::default(),
            recorded_by: "u".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_completed_payments_count_toward_settlement() {
        let payments = vec![
            payment(500.0, PaymentStatus::Completed),
            payment(250.25, PaymentStatus::Completed),
            payment(1000.0, PaymentStatus::Refunded),
            payment(75.0, PaymentStatus::Pending),
        ];
        assert_eq!(completed_total(&payments), 750.25);
    }

    #[test]
    fn tx_refs_are_unique_and_prefixed() {
        let a = new_tx_ref();
        assert!(a.starts_with("bms-"));
        assert_ne!(a, new_tx_ref());
    }
}
