//! Read-only reporting over the organization's records.
//!
//! The arithmetic lives in pure functions so it can be tested without a
//! database; [`ReportService`] only gathers the inputs.

use super::database::MongoDb;
use super::error::ServiceResult;
use super::scoped;
use crate::dtos::{
    AgingAmounts, AgingReport, AssetReliability, DashboardSummary, ExportKind, MethodTotals,
    PreventiveCompliance, ReconciliationReport, ReconciliationSection, ReliabilityReport,
    TenantAging,
};
use crate::models::{
    round_cents, Asset, Invoice, MaintenanceTask, Payment, PaymentMethod, PaymentStatus,
    TaskStatus, Tenant, UtilityPayment, UtilityPaymentStatus, WorkOrder, WorkOrderStatus, WorkType,
};
use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{doc, Document};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Default look-back for period reports without an explicit `from`.
const DEFAULT_WINDOW_DAYS: i64 = 90;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bucket index: 0 = not yet due, then 1-30, 31-60, 61-90, 90+ days late.
pub fn aging_bucket(due_date: DateTime<Utc>, as_of: DateTime<Utc>) -> usize {
    if as_of <= due_date {
        return 0;
    }
    match (as_of - due_date).num_days() {
        0..=30 => 1,
        31..=60 => 2,
        61..=90 => 3,
        _ => 4,
    }
}

impl AgingAmounts {
    fn add(&mut self, bucket: usize, amount: f64) {
        let slot = match bucket {
            0 => &mut self.current,
            1 => &mut self.days_1_30,
            2 => &mut self.days_31_60,
            3 => &mut self.days_61_90,
            _ => &mut self.days_90_plus,
        };
        *slot = round_cents(*slot + amount);
        self.total = round_cents(self.total + amount);
    }
}

/// Outstanding balances bucketed by days past due, overall and per tenant.
pub fn aging_report(
    invoices: &[Invoice],
    tenant_names: &HashMap<String, String>,
    as_of: DateTime<Utc>,
) -> AgingReport {
    let mut totals = AgingAmounts::default();
    let mut per_tenant: BTreeMap<&str, (usize, AgingAmounts)> = BTreeMap::new();
    let mut count = 0;

    for invoice in invoices.iter().filter(|i| i.status.is_outstanding()) {
        let balance = invoice.balance_due();
        if balance <= 0.0 {
            continue;
        }
        let bucket = aging_bucket(invoice.due_date, as_of);
        totals.add(bucket, balance);
        let entry = per_tenant.entry(invoice.tenant_id.as_str()).or_default();
        entry.0 += 1;
        entry.1.add(bucket, balance);
        count += 1;
    }

    let mut tenants: Vec<TenantAging> = per_tenant
        .into_iter()
        .map(|(tenant_id, (invoices, amounts))| TenantAging {
            tenant_id: tenant_id.to_string(),
            tenant_name: tenant_names.get(tenant_id).cloned(),
            invoices,
            amounts,
        })
        .collect();
    tenants.sort_by(|a, b| b.amounts.total.total_cmp(&a.amounts.total));

    AgingReport {
        as_of,
        invoices: count,
        totals,
        tenants,
    }
}

/// One completed payment as the reconciliation report sees it.
#[derive(Debug, Clone, Copy)]
pub struct SettledEntry {
    pub method: PaymentMethod,
    pub amount: f64,
    pub reconciled: bool,
}

pub fn reconciliation_section(entries: &[SettledEntry]) -> ReconciliationSection {
    let mut section = ReconciliationSection::default();
    let mut methods: BTreeMap<PaymentMethod, MethodTotals> = BTreeMap::new();

    for entry in entries {
        let totals = methods.entry(entry.method).or_insert_with(|| MethodTotals {
            method: entry.method,
            count: 0,
            reconciled_amount: 0.0,
            unreconciled_amount: 0.0,
        });
        totals.count += 1;
        if entry.reconciled {
            section.reconciled_count += 1;
            section.reconciled_amount = round_cents(section.reconciled_amount + entry.amount);
            totals.reconciled_amount = round_cents(totals.reconciled_amount + entry.amount);
        } else {
            section.unreconciled_count += 1;
            section.unreconciled_amount = round_cents(section.unreconciled_amount + entry.amount);
            totals.unreconciled_amount = round_cents(totals.unreconciled_amount + entry.amount);
        }
    }
    section.by_method = methods.into_values().collect();
    section
}

fn hours(d: Duration) -> f64 {
    d.num_seconds() as f64 / 3600.0
}

/// Failure and repair figures per asset plus preventive-maintenance
/// compliance over `[from, to]`.
pub fn reliability_report(
    assets: &[Asset],
    work_orders: &[WorkOrder],
    tasks: &[MaintenanceTask],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> ReliabilityReport {
    let window_hours = hours(to - from).max(0.0);
    let in_window = |at: DateTime<Utc>| at >= from && at <= to;

    let assets = assets
        .iter()
        .map(|asset| {
            let failures: Vec<&WorkOrder> = work_orders
                .iter()
                .filter(|w| {
                    w.work_type == WorkType::Corrective
                        && w.status != WorkOrderStatus::Cancelled
                        && w.asset_id.as_deref() == Some(asset.id.as_str())
                        && in_window(w.created_at)
                })
                .collect();
            let repairs: Vec<f64> = failures
                .iter()
                .filter(|w| w.status == WorkOrderStatus::Completed)
                .filter_map(|w| w.completed_at.map(|done| hours(done - w.created_at)))
                .collect();

            let mttr = (!repairs.is_empty())
                .then(|| repairs.iter().sum::<f64>() / repairs.len() as f64);
            let mtbf = (!failures.is_empty()).then(|| window_hours / failures.len() as f64);
            let availability = match (mtbf, mttr) {
                _ if failures.is_empty() => Some(1.0),
                (Some(mtbf), Some(mttr)) if mtbf + mttr > 0.0 => Some(mtbf / (mtbf + mttr)),
                _ => None,
            };

            AssetReliability {
                asset_id: asset.id.clone(),
                asset_name: asset.name.clone(),
                failures: failures.len(),
                repaired: repairs.len(),
                mttr_hours: mttr.map(round2),
                mtbf_hours: mtbf.map(round2),
                availability: availability.map(|a| (a * 10000.0).round() / 10000.0),
            }
        })
        .collect();

    let due: Vec<&MaintenanceTask> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Cancelled && in_window(t.due_date))
        .collect();
    let on_time = due
        .iter()
        .filter(|t| t.completed_at.is_some_and(|done| done <= t.due_date))
        .count();

    ReliabilityReport {
        from,
        to,
        window_hours: round2(window_hours),
        assets,
        preventive: PreventiveCompliance {
            tasks_due: due.len(),
            completed_on_time: on_time,
            compliance_rate: (!due.is_empty())
                .then(|| (on_time as f64 / due.len() as f64 * 10000.0).round() / 10000.0),
        },
    }
}

fn day(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Writes `header` unconditionally so an empty export still names its columns.
fn write_csv<R: Serialize>(
    header: &[&str],
    rows: impl IntoIterator<Item = R>,
) -> ServiceResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| anyhow!("failed to write CSV header: {}", e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| anyhow!("failed to write CSV row: {}", e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush CSV: {}", e))?;
    Ok(String::from_utf8(bytes).map_err(|e| anyhow!("CSV is not UTF-8: {}", e))?)
}

const INVOICE_COLUMNS: [&str; 10] = [
    "invoice_number",
    "tenant_id",
    "status",
    "issue_date",
    "due_date",
    "subtotal",
    "vat_amount",
    "total",
    "amount_paid",
    "balance_due",
];

#[derive(Serialize)]
struct InvoiceRow<'a> {
    invoice_number: &'a str,
    tenant_id: &'a str,
    status: crate::models::InvoiceStatus,
    issue_date: String,
    due_date: String,
    subtotal: f64,
    vat_amount: f64,
    total: f64,
    amount_paid: f64,
    balance_due: f64,
}

pub fn invoices_csv(invoices: &[Invoice]) -> ServiceResult<String> {
    write_csv(
        &INVOICE_COLUMNS,
        invoices.iter().map(|i| InvoiceRow {
            invoice_number: &i.invoice_number,
            tenant_id: &i.tenant_id,
            status: i.status,
            issue_date: day(i.issue_date),
            due_date: day(i.due_date),
            subtotal: i.subtotal,
            vat_amount: i.vat_amount,
            total: i.total,
            amount_paid: i.amount_paid,
            balance_due: i.balance_due(),
        }),
    )
}

const PAYMENT_COLUMNS: [&str; 9] = [
    "payment_id",
    "invoice_id",
    "tenant_id",
    "method",
    "status",
    "amount",
    "paid_at",
    "reference",
    "reconciled",
];

#[derive(Serialize)]
struct PaymentRow<'a> {
    payment_id: &'a str,
    invoice_id: &'a str,
    tenant_id: &'a str,
    method: PaymentMethod,
    status: PaymentStatus,
    amount: f64,
    paid_at: String,
    reference: Option<&'a str>,
    reconciled: bool,
}

pub fn payments_csv(payments: &[Payment]) -> ServiceResult<String> {
    write_csv(
        &PAYMENT_COLUMNS,
        payments.iter().map(|p| PaymentRow {
            payment_id: &p.id,
            invoice_id: &p.invoice_id,
            tenant_id: &p.tenant_id,
            method: p.method,
            status: p.status,
            amount: p.amount,
            paid_at: day(p.paid_at),
            reference: p.reference.as_deref().or(p.tx_ref.as_deref()),
            reconciled: p.reconciliation.reconciled,
        }),
    )
}

const AGING_COLUMNS: [&str; 9] = [
    "tenant_id",
    "tenant_name",
    "invoices",
    "current",
    "1-30",
    "31-60",
    "61-90",
    "90+",
    "total",
];

#[derive(Serialize)]
struct AgingRow<'a> {
    tenant_id: &'a str,
    tenant_name: Option<&'a str>,
    invoices: usize,
    current: f64,
    #[serde(rename = "1-30")]
    days_1_30: f64,
    #[serde(rename = "31-60")]
    days_31_60: f64,
    #[serde(rename = "61-90")]
    days_61_90: f64,
    #[serde(rename = "90+")]
    days_90_plus: f64,
    total: f64,
}

pub fn aging_csv(report: &AgingReport) -> ServiceResult<String> {
    write_csv(
        &AGING_COLUMNS,
        report.tenants.iter().map(|t| AgingRow {
            tenant_id: &t.tenant_id,
            tenant_name: t.tenant_name.as_deref(),
            invoices: t.invoices,
            current: t.amounts.current,
            days_1_30: t.amounts.days_1_30,
            days_31_60: t.amounts.days_31_60,
            days_61_90: t.amounts.days_61_90,
            days_90_plus: t.amounts.days_90_plus,
            total: t.amounts.total,
        }),
    )
}

const TENANT_COLUMNS: [&str; 7] = [
    "tenant_id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "company_name",
    "status",
];

#[derive(Serialize)]
struct TenantRow<'a> {
    tenant_id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: &'a str,
    company_name: Option<&'a str>,
    status: crate::models::TenantStatus,
}

pub fn tenants_csv(tenants: &[Tenant]) -> ServiceResult<String> {
    write_csv(
        &TENANT_COLUMNS,
        tenants.iter().map(|t| TenantRow {
            tenant_id: &t.id,
            first_name: &t.first_name,
            last_name: &t.last_name,
            email: &t.email,
            phone: &t.phone,
            company_name: t.company_name.as_deref(),
            status: t.status,
        }),
    )
}

const UTILITY_PAYMENT_COLUMNS: [&str; 12] = [
    "utility_payment_id",
    "meter_id",
    "building_id",
    "unit_id",
    "utility_type",
    "period_start",
    "period_end",
    "consumption",
    "amount",
    "method",
    "status",
    "reconciled",
];

#[derive(Serialize)]
struct UtilityPaymentRow<'a> {
    utility_payment_id: &'a str,
    meter_id: &'a str,
    building_id: &'a str,
    unit_id: Option<&'a str>,
    utility_type: crate::models::MeterType,
    period_start: String,
    period_end: String,
    consumption: Option<f64>,
    amount: f64,
    method: PaymentMethod,
    status: UtilityPaymentStatus,
    reconciled: bool,
}

pub fn utility_payments_csv(payments: &[UtilityPayment]) -> ServiceResult<String> {
    write_csv(
        &UTILITY_PAYMENT_COLUMNS,
        payments.iter().map(|p| UtilityPaymentRow {
            utility_payment_id: &p.id,
            meter_id: &p.meter_id,
            building_id: &p.building_id,
            unit_id: p.unit_id.as_deref(),
            utility_type: p.utility_type,
            period_start: day(p.period_start),
            period_end: day(p.period_end),
            consumption: p.consumption,
            amount: p.amount,
            method: p.method,
            status: p.status,
            reconciled: p.reconciliation.reconciled,
        }),
    )
}

#[derive(Clone)]
pub struct ReportService {
    db: MongoDb,
}

impl ReportService {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn outstanding_invoices(&self, org_id: &str) -> ServiceResult<Vec<Invoice>> {
        scoped::find_many(
            &self.db.invoices(),
            doc! {
                "organizationId": org_id,
                "status": { "$in": ["sent", "pending", "overdue"] },
            },
            doc! { "dueDate": 1 },
        )
        .await
    }

    async fn tenant_names(&self, org_id: &str) -> ServiceResult<HashMap<String, String>> {
        let tenants: Vec<Tenant> = scoped::find_many(
            &self.db.tenants(),
            doc! { "organizationId": org_id },
            doc! { "lastName": 1 },
        )
        .await?;
        Ok(tenants.into_iter().map(|t| (t.id.clone(), t.full_name())).collect())
    }

    pub async fn aging(&self, org_id: &str, as_of: DateTime<Utc>) -> ServiceResult<AgingReport> {
        let invoices = self.outstanding_invoices(org_id).await?;
        let names = self.tenant_names(org_id).await?;
        Ok(aging_report(&invoices, &names, as_of))
    }

    fn completed_between(
        org_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Document {
        let mut query = doc! { "organizationId": org_id, "status": "completed" };
        if let Some(range) = scoped::date_range(from, to) {
            query.insert("paidAt", range);
        }
        query
    }

    pub async fn reconciliation(
        &self,
        org_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ServiceResult<ReconciliationReport> {
        let payments: Vec<Payment> = scoped::find_many(
            &self.db.payments(),
            Self::completed_between(org_id, from, to),
            doc! { "paidAt": 1 },
        )
        .await?;
        let utility: Vec<UtilityPayment> = scoped::find_many(
            &self.db.utility_payments(),
            Self::completed_between(org_id, from, to),
            doc! { "paidAt": 1 },
        )
        .await?;

        let payment_entries: Vec<SettledEntry> = payments
            .iter()
            .map(|p| SettledEntry {
                method: p.method,
                amount: p.amount,
                reconciled: p.reconciliation.reconciled,
            })
            .collect();
        let utility_entries: Vec<SettledEntry> = utility
            .iter()
            .map(|p| SettledEntry {
                method: p.method,
                amount: p.amount,
                reconciled: p.reconciliation.reconciled,
            })
            .collect();

        Ok(ReconciliationReport {
            from,
            to,
            payments: reconciliation_section(&payment_entries),
            utility_payments: reconciliation_section(&utility_entries),
        })
    }

    pub async fn reliability(
        &self,
        org_id: &str,
        building_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ServiceResult<ReliabilityReport> {
        let to = to.unwrap_or_else(Utc::now);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS));

        let mut scope = doc! { "organizationId": org_id };
        if let Some(building_id) = building_id {
            scope.insert("buildingId", building_id);
        }

        let assets: Vec<Asset> =
            scoped::find_many(&self.db.assets(), scope.clone(), doc! { "name": 1 }).await?;

        let mut orders_query = scope.clone();
        orders_query.insert("createdAt", doc! {
            "$gte": scoped::bson_date(from),
            "$lte": scoped::bson_date(to),
        });
        let orders: Vec<WorkOrder> =
            scoped::find_many(&self.db.work_orders(), orders_query, doc! { "createdAt": 1 })
                .await?;

        let mut tasks_query = scope;
        tasks_query.insert("dueDate", doc! {
            "$gte": scoped::bson_date(from),
            "$lte": scoped::bson_date(to),
        });
        let tasks: Vec<MaintenanceTask> =
            scoped::find_many(&self.db.maintenance_tasks(), tasks_query, doc! { "dueDate": 1 })
                .await?;

        Ok(reliability_report(&assets, &orders, &tasks, from, to))
    }

    pub async fn dashboard(&self, org_id: &str) -> ServiceResult<DashboardSummary> {
        let buildings = self
            .db
            .buildings()
            .count_documents(doc! { "organizationId": org_id, "status": { "$ne": "inactive" } }, None)
            .await?;
        let units = self
            .db
            .units()
            .count_documents(doc! { "organizationId": org_id }, None)
            .await?;
        let occupied_units = self
            .db
            .units()
            .count_documents(doc! { "organizationId": org_id, "status": "occupied" }, None)
            .await?;
        let active_tenants = self
            .db
            .tenants()
            .count_documents(doc! { "organizationId": org_id, "status": "active" }, None)
            .await?;
        let active_leases = self
            .db
            .leases()
            .count_documents(doc! { "organizationId": org_id, "status": "active" }, None)
            .await?;
        let overdue_invoices = self
            .db
            .invoices()
            .count_documents(doc! { "organizationId": org_id, "status": "overdue" }, None)
            .await?;
        let open_work_orders = self
            .db
            .work_orders()
            .count_documents(
                doc! {
                    "organizationId": org_id,
                    "status": { "$in": ["pending", "in_progress", "on_hold"] },
                },
                None,
            )
            .await?;
        let open_incidents = self
            .db
            .security_incidents()
            .count_documents(
                doc! {
                    "organizationId": org_id,
                    "status": { "$in": ["open", "investigating"] },
                },
                None,
            )
            .await?;
        let maintenance_due = self
            .db
            .maintenance_tasks()
            .count_documents(
                doc! { "organizationId": org_id, "status": { "$in": ["due", "overdue"] } },
                None,
            )
            .await?;

        let outstanding_balance = round_cents(
            self.outstanding_invoices(org_id)
                .await?
                .iter()
                .map(Invoice::balance_due)
                .sum(),
        );
        let occupancy_rate = if units == 0 {
            0.0
        } else {
            (occupied_units as f64 / units as f64 * 10000.0).round() / 100.0
        };

        Ok(DashboardSummary {
            buildings,
            units,
            occupied_units,
            occupancy_rate,
            active_tenants,
            active_leases,
            outstanding_balance,
            overdue_invoices,
            open_work_orders,
            open_incidents,
            maintenance_due,
        })
    }

    /// Render one of the exportable reports as CSV.
    pub async fn export(
        &self,
        org_id: &str,
        kind: ExportKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        as_of: DateTime<Utc>,
    ) -> ServiceResult<String> {
        let mut query = doc! { "organizationId": org_id };
        let csv = match kind {
            ExportKind::Invoices => {
                if let Some(range) = scoped::date_range(from, to) {
                    query.insert("issueDate", range);
                }
                let rows: Vec<Invoice> =
                    scoped::find_many(&self.db.invoices(), query, doc! { "issueDate": 1 }).await?;
                invoices_csv(&rows)?
            }
            ExportKind::Payments => {
                if let Some(range) = scoped::date_range(from, to) {
                    query.insert("paidAt", range);
                }
                let rows: Vec<Payment> =
                    scoped::find_many(&self.db.payments(), query, doc! { "paidAt": 1 }).await?;
                payments_csv(&rows)?
            }
            ExportKind::Aging => aging_csv(&self.aging(org_id, as_of).await?)?,
            ExportKind::Tenants => {
                let rows: Vec<Tenant> = scoped::find_many(
                    &self.db.tenants(),
                    query,
                    doc! { "lastName": 1, "firstName": 1 },
                )
                .await?;
                tenants_csv(&rows)?
            }
            ExportKind::UtilityPayments => {
                if let Some(range) = scoped::date_range(from, to) {
                    query.insert("periodStart", range);
                }
                let rows: Vec<UtilityPayment> = scoped::find_many(
                    &self.db.utility_payments(),
                    query,
                    doc! { "periodStart": 1 },
                )
                .await?;
                utility_payments_csv(&rows)?
            }
        };
        tracing::info!(organization_id = %org_id, report = kind.file_stem(), bytes = csv.len(), "Report exported");
        Ok(csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetStatus, InvoiceStatus, Priority, ScheduleType};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn invoice(tenant: &str, due: DateTime<Utc>, total: f64, paid: f64, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: crate::models::new_id(),
            organization_id: "org".into(),
            invoice_number: "INV-2024-00001".into(),
            lease_id: None,
            tenant_id: tenant.into(),
            unit_id: None,
            line_items: vec![],
            subtotal: total,
            vat_rate: 0.0,
            vat_amount: 0.0,
            total,
            amount_paid: paid,
            issue_date: due - Duration::days(30),
            due_date: due,
            period_start: None,
            period_end: None,
            status,
            notes: None,
            paid_at: None,
            sent_at: None,
            created_at: due,
            updated_at: due,
        }
    }

    #[test]
    fn bucket_boundaries() {
        let due = at(2024, 1, 31);
        assert_eq!(aging_bucket(due, due), 0);
        assert_eq!(aging_bucket(due, due + Duration::days(1)), 1);
        assert_eq!(aging_bucket(due, due + Duration::days(30)), 1);
        assert_eq!(aging_bucket(due, due + Duration::days(31)), 2);
        assert_eq!(aging_bucket(due, due + Duration::days(61)), 3);
        assert_eq!(aging_bucket(due, due + Duration::days(91)), 4);
    }

    #[test]
    fn aging_groups_by_tenant_and_skips_settled() {
        let as_of = at(2024, 6, 1);
        let invoices = vec![
            invoice("t1", at(2024, 6, 10), 1000.0, 0.0, InvoiceStatus::Sent),
            invoice("t1", at(2024, 5, 15), 500.0, 200.0, InvoiceStatus::Overdue),
            invoice("t2", at(2024, 1, 1), 800.0, 0.0, InvoiceStatus::Overdue),
            invoice("t2", at(2024, 1, 1), 800.0, 800.0, InvoiceStatus::Paid),
            invoice("t3", at(2024, 1, 1), 300.0, 0.0, InvoiceStatus::Draft),
        ];
        let names = HashMap::from([("t1".to_string(), "Abebe Kebede".to_string())]);

        let report = aging_report(&invoices, &names, as_of);

        assert_eq!(report.invoices, 3);
        assert_eq!(report.totals.current, 1000.0);
        assert_eq!(report.totals.days_1_30, 300.0);
        assert_eq!(report.totals.days_90_plus, 800.0);
        assert_eq!(report.totals.total, 2100.0);
        assert_eq!(report.tenants[0].tenant_id, "t1");
        assert_eq!(report.tenants[0].tenant_name.as_deref(), Some("Abebe Kebede"));
        assert_eq!(report.tenants[0].amounts.total, 1300.0);
        assert_eq!(report.tenants[1].tenant_name, None);
    }

    #[test]
    fn reconciliation_splits_by_method() {
        let entries = [
            SettledEntry { method: PaymentMethod::Cash, amount: 100.0, reconciled: true },
            SettledEntry { method: PaymentMethod::Cash, amount: 50.5, reconciled: false },
            SettledEntry { method: PaymentMethod::Chapa, amount: 200.0, reconciled: false },
        ];
        let section = reconciliation_section(&entries);

        assert_eq!(section.reconciled_count, 1);
        assert_eq!(section.reconciled_amount, 100.0);
        assert_eq!(section.unreconciled_count, 2);
        assert_eq!(section.unreconciled_amount, 250.5);
        assert_eq!(section.by_method.len(), 2);
        assert_eq!(section.by_method[0].method, PaymentMethod::Cash);
        assert_eq!(section.by_method[0].count, 2);
        assert_eq!(section.by_method[1].unreconciled_amount, 200.0);
    }

    fn asset(id: &str) -> Asset {
        let now = at(2024, 1, 1);
        Asset {
            id: id.into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            name: format!("Asset {}", id),
            category: "hvac".into(),
            serial_number: None,
            manufacturer: None,
            model: None,
            status: AssetStatus::Operational,
            purchase_date: None,
            purchase_cost: None,
            warranty: None,
            depreciation: None,
            maintenance_schedule: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn failure(asset_id: &str, created: DateTime<Utc>, repair_hours: Option<i64>) -> WorkOrder {
        WorkOrder {
            id: crate::models::new_id(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            asset_id: Some(asset_id.into()),
            maintenance_task_id: None,
            title: "Breakdown".into(),
            description: None,
            category: "hvac".into(),
            work_type: WorkType::Corrective,
            priority: Priority::High,
            status: if repair_hours.is_some() {
                WorkOrderStatus::Completed
            } else {
                WorkOrderStatus::InProgress
            },
            assigned_to: None,
            requested_by: None,
            scheduled_for: None,
            started_at: Some(created),
            completed_at: repair_hours.map(|h| created + Duration::hours(h)),
            labor_cost: None,
            parts_cost: None,
            resolution_notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn task(due: DateTime<Utc>, completed: Option<DateTime<Utc>>) -> MaintenanceTask {
        MaintenanceTask {
            id: crate::models::new_id(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            asset_id: None,
            title: "Service".into(),
            description: None,
            schedule_type: ScheduleType::TimeBased,
            interval_days: Some(30),
            meter_id: None,
            usage_interval: None,
            last_service_reading: None,
            due_date: due,
            lead_days: 7,
            priority: Priority::Medium,
            assigned_to: None,
            status: if completed.is_some() {
                TaskStatus::Completed
            } else {
                TaskStatus::Overdue
            },
            completed_at: completed,
            recurring: false,
            created_at: due,
            updated_at: due,
        }
    }

    #[test]
    fn reliability_metrics() {
        let from = at(2024, 1, 1);
        let to = from + Duration::hours(1000);
        let assets = vec![asset("a1"), asset("a2")];
        let orders = vec![
            failure("a1", from + Duration::hours(100), Some(10)),
            failure("a1", from + Duration::hours(500), Some(30)),
            failure("a1", from + Duration::hours(900), None),
        ];
        let tasks = vec![
            task(from + Duration::days(5), Some(from + Duration::days(4))),
            task(from + Duration::days(10), Some(from + Duration::days(12))),
            task(from + Duration::days(20), None),
            task(from + Duration::days(400), None),
        ];

        let report = reliability_report(&assets, &orders, &tasks, from, to);

        let a1 = &report.assets[0];
        assert_eq!(a1.failures, 3);
        assert_eq!(a1.repaired, 2);
        assert_eq!(a1.mttr_hours, Some(20.0));
        assert_eq!(a1.mtbf_hours, Some(333.33));
        let expected = 1000.0 / 3.0 / (1000.0 / 3.0 + 20.0);
        assert!((a1.availability.unwrap() - expected).abs() < 0.0001);

        let a2 = &report.assets[1];
        assert_eq!(a2.failures, 0);
        assert_eq!(a2.mtbf_hours, None);
        assert_eq!(a2.availability, Some(1.0));

        assert_eq!(report.preventive.tasks_due, 3);
        assert_eq!(report.preventive.completed_on_time, 1);
        assert_eq!(report.preventive.compliance_rate, Some(0.3333));
    }

    #[test]
    fn invoices_export_has_header_and_rows() {
        let due = at(2024, 2, 1);
        let csv = invoices_csv(&[invoice("t1", due, 115.0, 15.0, InvoiceStatus::Sent)]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("invoice_number,tenant_id,status,issue_date,due_date,subtotal,vat_amount,total,amount_paid,balance_due")
        );
        assert_eq!(
            lines.next(),
            Some("INV-2024-00001,t1,sent,2024-01-02,2024-02-01,115.0,0.0,115.0,15.0,100.0")
        );
    }

    #[test]
    fn empty_exports_still_carry_a_header() {
        assert_eq!(
            invoices_csv(&[]).unwrap(),
            format!("{}\n", INVOICE_COLUMNS.join(","))
        );
        assert_eq!(payments_csv(&[]).unwrap().lines().count(), 1);
        assert_eq!(tenants_csv(&[]).unwrap().lines().count(), 1);
        assert_eq!(
            utility_payments_csv(&[]).unwrap().lines().next(),
            Some(UTILITY_PAYMENT_COLUMNS.join(",").as_str())
        );

        let report = aging_report(&[], &HashMap::new(), at(2024, 3, 1));
        assert_eq!(
            aging_csv(&report).unwrap().trim_end(),
            "tenant_id,tenant_name,invoices,current,1-30,31-60,61-90,90+,total"
        );
    }
}
