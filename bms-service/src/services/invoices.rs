use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::leases::LeaseRepository;
use super::metrics;
use super::notifications::{NewNotification, NotificationRepository};
use super::scoped;
use crate::dtos::{CreateInvoiceRequest, UpdateInvoiceRequest};
use crate::models::{
    clean_opt, new_id, round_cents, Invoice, InvoiceStatus, Lease, LeaseStatus, LineItem,
    NotificationKind, OrganizationSettings, Settlement,
};
use anyhow::anyhow;
use chrono::{DateTime, Datelike, Duration, Utc};
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub tenant_id: Option<String>,
    pub lease_id: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

pub fn format_invoice_number(prefix: &str, year: i32, seq: i64) -> String {
    format!("{}-{}-{:05}", prefix, year, seq)
}

#[derive(Clone)]
pub struct InvoiceRepository {
    db: MongoDb,
    leases: LeaseRepository,
    notifications: NotificationRepository,
}

impl InvoiceRepository {
    pub fn new(db: &MongoDb, leases: LeaseRepository, notifications: NotificationRepository) -> Self {
        Self {
            db: db.clone(),
            leases,
            notifications,
        }
    }

    async fn settings(&self, org_id: &str) -> ServiceResult<OrganizationSettings> {
        let org = self
            .db
            .organizations()
            .find_one(doc! { "_id": org_id }, None)
            .await?;
        Ok(org.map(|o| o.settings).unwrap_or_default())
    }

    /// Atomically take the next number from the per-organization yearly counter.
    async fn next_invoice_number(&self, org_id: &str, prefix: &str, year: i32) -> ServiceResult<String> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .db
            .counters()
            .find_one_and_update(
                doc! { "_id": format!("invoice:{}:{}", org_id, year) },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?;
        let seq = counter
            .and_then(|c| c.get_i64("seq").ok())
            .ok_or_else(|| anyhow!("invoice counter was not returned"))?;
        Ok(format_invoice_number(prefix, year, seq))
    }

    pub async fn create(&self, org_id: &str, req: CreateInvoiceRequest) -> ServiceResult<Invoice> {
        let tenant =
            scoped::reference_in_org(&self.db.tenants(), &req.tenant_id, org_id, "Tenant").await?;

        let mut unit_id = req.unit_id.clone();
        if let Some(lease_id) = &req.lease_id {
            let lease =
                scoped::reference_in_org(&self.db.leases(), lease_id, org_id, "Lease").await?;
            if lease.tenant_id != tenant.id {
                return Err(ServiceError::validation(
                    "Lease does not belong to this tenant",
                ));
            }
            unit_id.get_or_insert(lease.unit_id);
        }
        if let Some(id) = &unit_id {
            scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
        }

        let settings = self.settings(org_id).await?;
        let now = Utc::now();
        let issue_date = req.issue_date.unwrap_or(now);
        let due_date = req
            .due_date
            .unwrap_or_else(|| issue_date + Duration::days(settings.payment_terms_days as i64));

        let mut invoice = Invoice {
            id: new_id(),
            organization_id: org_id.to_string(),
            invoice_number: String::new(),
            lease_id: req.lease_id,
            tenant_id: tenant.id,
            unit_id,
            line_items: req.line_items.into_iter().map(LineItem::from).collect(),
            subtotal: 0.0,
            vat_rate: req.vat_rate.unwrap_or(settings.vat_rate),
            vat_amount: 0.0,
            total: 0.0,
            amount_paid: 0.0,
            issue_date,
            due_date,
            period_start: req.period_start,
            period_end: req.period_end,
            status: InvoiceStatus::Draft,
            notes: clean_opt(req.notes),
            paid_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        invoice.recompute_totals();
        invoice.validate_rules().map_err(ServiceError::Validation)?;
        invoice.invoice_number = self
            .next_invoice_number(org_id, &settings.invoice_prefix, issue_date.year())
            .await?;

        scoped::insert(&self.db.invoices(), &invoice, "Invoice").await?;
        tracing::info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            organization_id = %org_id,
            total = invoice.total,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Bill the lease's next period: rent times the months in the cycle.
    pub async fn generate_for_lease(&self, lease_id: &str, org_id: &str) -> ServiceResult<Invoice> {
        let lease: Lease =
            scoped::require_in_org(&self.db.leases(), lease_id, org_id, "Lease").await?;
        if lease.status != LeaseStatus::Active {
            return Err(ServiceError::invalid_state(
                "Invoices can only be generated for active leases",
            ));
        }
        let period = lease.next_billing_period().ok_or_else(|| {
            ServiceError::invalid_state("The lease has been billed through its end date")
        })?;

        let settings = self.settings(org_id).await?;
        let now = Utc::now();
        let mut invoice = Invoice {
            id: new_id(),
            organization_id: org_id.to_string(),
            invoice_number: String::new(),
            lease_id: Some(lease.id.clone()),
            tenant_id: lease.tenant_id.clone(),
            unit_id: Some(lease.unit_id.clone()),
            line_items: vec![LineItem {
                description: format!(
                    "Rent {} to {}",
                    period.start.format("%Y-%m-%d"),
                    period.end.format("%Y-%m-%d")
                ),
                quantity: period.months as f64,
                unit_price: round_cents(lease.rent_amount),
                amount: 0.0,
            }],
            subtotal: 0.0,
            vat_rate: settings.vat_rate,
            vat_amount: 0.0,
            total: 0.0,
            amount_paid: 0.0,
            issue_date: now,
            due_date: period.due.max(now),
            period_start: Some(period.start),
            period_end: Some(period.end),
            status: InvoiceStatus::Draft,
            notes: None,
            paid_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        invoice.recompute_totals();
        invoice.validate_rules().map_err(ServiceError::Validation)?;
        invoice.invoice_number = self
            .next_invoice_number(org_id, &settings.invoice_prefix, now.year())
            .await?;

        scoped::insert(&self.db.invoices(), &invoice, "Invoice").await?;
        self.leases
            .mark_billed_through(&lease.id, org_id, period.end)
            .await?;
        tracing::info!(
            invoice_id = %invoice.id,
            lease_id = %lease.id,
            organization_id = %org_id,
            "Lease invoice generated"
        );
        Ok(invoice)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Invoice>> {
        scoped::find_in_org(&self.db.invoices(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &InvoiceFilter) -> ServiceResult<Vec<Invoice>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(tenant_id) = &filter.tenant_id {
            query.insert("tenantId", tenant_id);
        }
        if let Some(lease_id) = &filter.lease_id {
            query.insert("leaseId", lease_id);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("issueDate", range);
        }
        scoped::find_many(&self.db.invoices(), query, doc! { "issueDate": -1 }).await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateInvoiceRequest,
    ) -> ServiceResult<Invoice> {
        let mut invoice = scoped::require_in_org(&self.db.invoices(), id, org_id, "Invoice").await?;
        let is_draft = invoice.status == InvoiceStatus::Draft;

        if let Some(items) = req.line_items {
            if !is_draft {
                return Err(ServiceError::invalid_state(
                    "Line items can only be edited while the invoice is a draft",
                ));
            }
            invoice.line_items = items.into_iter().map(LineItem::from).collect();
        }
        if let Some(rate) = req.vat_rate {
            if !is_draft {
                return Err(ServiceError::invalid_state(
                    "VAT can only be changed while the invoice is a draft",
                ));
            }
            invoice.vat_rate = rate;
        }
        if let Some(due) = req.due_date {
            invoice.due_date = due;
        }
        if req.notes.is_some() {
            invoice.notes = clean_opt(req.notes);
        }

        let now = Utc::now();
        if let Some(next) = req.status {
            self.transition(&mut invoice, next, now)?;
        }
        invoice.recompute_totals();
        invoice.validate_rules().map_err(ServiceError::Validation)?;
        invoice.updated_at = now;

        scoped::replace_in_org(&self.db.invoices(), id, org_id, &invoice, "Invoice").await?;
        tracing::info!(invoice_id = %id, organization_id = %org_id, status = ?invoice.status, "Invoice updated");
        Ok(invoice)
    }

    fn transition(&self, invoice: &mut Invoice, next: InvoiceStatus, now: DateTime<Utc>) -> ServiceResult<()> {
        if !invoice.status.can_transition_to(next) {
            return Err(ServiceError::invalid_state(format!(
                "Cannot move invoice from {:?} to {:?}",
                invoice.status, next
            )));
        }
        if next == InvoiceStatus::Sent && invoice.sent_at.is_none() {
            invoice.sent_at = Some(now);
        }
        if next == InvoiceStatus::Paid && invoice.status != InvoiceStatus::Paid {
            invoice.paid_at = Some(now);
        }
        invoice.status = next;
        Ok(())
    }

    pub async fn send(&self, id: &str, org_id: &str) -> ServiceResult<Invoice> {
        let mut invoice = scoped::require_in_org(&self.db.invoices(), id, org_id, "Invoice").await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(ServiceError::invalid_state("Only draft invoices can be sent"));
        }
        let now = Utc::now();
        self.transition(&mut invoice, InvoiceStatus::Sent, now)?;
        invoice.updated_at = now;
        scoped::replace_in_org(&self.db.invoices(), id, org_id, &invoice, "Invoice").await?;

        tracing::info!(invoice_id = %id, organization_id = %org_id, "Invoice sent");
        self.notifications
            .notify(
                org_id,
                NewNotification {
                    kind: NotificationKind::InvoiceSent,
                    title: format!("Invoice {} sent", invoice.invoice_number),
                    message: format!(
                        "Invoice {} for {:.2} is due {}",
                        invoice.invoice_number,
                        invoice.total,
                        invoice.due_date.format("%Y-%m-%d")
                    ),
                    entity_type: "invoice",
                    entity_id: Some(invoice.id.clone()),
                },
            )
            .await;
        Ok(invoice)
    }

    /// Flip every sent or pending invoice past its due date to overdue.
    pub async fn mark_overdue(&self, org_id: &str) -> ServiceResult<u64> {
        let now = Utc::now();
        let filter = doc! {
            "organizationId": org_id,
            "status": { "$in": [
                scoped::to_bson(&InvoiceStatus::Sent)?,
                scoped::to_bson(&InvoiceStatus::Pending)?,
            ] },
            "dueDate": { "$lt": scoped::bson_date(now) },
        };
        let result = self
            .db
            .invoices()
            .update_many(
                filter,
                doc! { "$set": {
                    "status": scoped::to_bson(&InvoiceStatus::Overdue)?,
                    "updatedAt": scoped::bson_date(now),
                } },
                None,
            )
            .await?;

        if result.modified_count > 0 {
            tracing::info!(organization_id = %org_id, count = result.modified_count, "Invoices marked overdue");
            self.notifications
                .notify(
                    org_id,
                    NewNotification {
                        kind: NotificationKind::InvoiceOverdue,
                        title: "Invoices overdue".to_string(),
                        message: format!("{} invoice(s) are now overdue", result.modified_count),
                        entity_type: "invoice",
                        entity_id: None,
                    },
                )
                .await;
        }
        Ok(result.modified_count)
    }

    /// Re-evaluate the invoice against the given completed payment total.
    pub async fn apply_payments(
        &self,
        id: &str,
        org_id: &str,
        completed_total: f64,
    ) -> ServiceResult<(Invoice, Settlement)> {
        let mut invoice = scoped::require_in_org(&self.db.invoices(), id, org_id, "Invoice").await?;
        let now = Utc::now();
        let settlement = invoice.apply_payments(completed_total, now);
        invoice.updated_at = now;
        scoped::replace_in_org(&self.db.invoices(), id, org_id, &invoice, "Invoice").await?;

        match settlement {
            Settlement::Paid => {
                metrics::record_invoice_paid(org_id);
                tracing::info!(invoice_id = %id, organization_id = %org_id, "Invoice paid");
            }
            Settlement::Reopened => {
                tracing::info!(invoice_id = %id, organization_id = %org_id, status = ?invoice.status, "Invoice reopened");
            }
            Settlement::Unchanged => {}
        }
        Ok((invoice, settlement))
    }

    /// Hard delete, allowed for drafts and cancelled invoices.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let invoice = scoped::require_in_org(&self.db.invoices(), id, org_id, "Invoice").await?;
        if !matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled) {
            return Err(ServiceError::invalid_state(
                "Only draft or cancelled invoices can be deleted",
            ));
        }
        scoped::delete_in_org(&self.db.invoices(), id, org_id, "Invoice").await?;
        tracing::info!(invoice_id = %id, organization_id = %org_id, "Invoice deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_numbers_are_zero_padded() {
        assert_eq!(format_invoice_number("INV", 2024, 7), "INV-2024-00007");
        assert_eq!(format_invoice_number("BMS", 2025, 123456), "BMS-2025-123456");
    }
}
