use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    metrics::describe_counter!(
        "bms_payments_recorded_total",
        "Payments recorded by organization, method and status"
    );
    metrics::describe_counter!(
        "bms_invoices_paid_total",
        "Invoices settled by payments, by organization"
    );
    metrics::describe_counter!(
        "bms_meter_readings_total",
        "Meter readings recorded by organization and meter type"
    );
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a recorded payment for billing dashboards.
pub fn record_payment(org_id: &str, method: &str, status: &str) {
    metrics::counter!(
        "bms_payments_recorded_total",
        "organization_id" => org_id.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_invoice_paid(org_id: &str) {
    metrics::counter!("bms_invoices_paid_total", "organization_id" => org_id.to_string())
        .increment(1);
}

pub fn record_meter_reading(org_id: &str, meter_type: &str) {
    metrics::counter!(
        "bms_meter_readings_total",
        "organization_id" => org_id.to_string(),
        "meter_type" => meter_type.to_string()
    )
    .increment(1);
}
