use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{
    CreateUtilityPaymentRequest, ReconcileRequest, RefundRequest, UpdateUtilityPaymentRequest,
};
use crate::models::{
    clean_opt, new_id, round_cents, MeterType, ReconciliationInfo, RefundInfo, UtilityPayment,
    UtilityPaymentStatus,
};
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilityPaymentFilter {
    pub meter_id: Option<String>,
    pub building_id: Option<String>,
    pub tenant_id: Option<String>,
    pub utility_type: Option<MeterType>,
    pub status: Option<UtilityPaymentStatus>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

/// A payment's unit must sit in the building of the meter it pays for.
fn unit_in_building(unit_building_id: &str, building_id: &str) -> ServiceResult<()> {
    if unit_building_id != building_id {
        return Err(ServiceError::validation(
            "Unit does not belong to the meter's building",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UtilityPaymentRepository {
    db: MongoDb,
}

impl UtilityPaymentRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn check_refs(
        &self,
        org_id: &str,
        building_id: &str,
        unit_id: Option<&str>,
        tenant_id: Option<&str>,
    ) -> ServiceResult<()> {
        if let Some(id) = unit_id {
            let unit = scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
            unit_in_building(&unit.building_id, building_id)?;
        }
        if let Some(id) = tenant_id {
            scoped::reference_in_org(&self.db.tenants(), id, org_id, "Tenant").await?;
        }
        Ok(())
    }

    pub async fn create(
        &self,
        org_id: &str,
        req: CreateUtilityPaymentRequest,
    ) -> ServiceResult<UtilityPayment> {
        let meter =
            scoped::reference_in_org(&self.db.meters(), &req.meter_id, org_id, "Meter").await?;
        let unit_id = clean_opt(req.unit_id).or_else(|| meter.unit_id.clone());
        let tenant_id = clean_opt(req.tenant_id);
        self.check_refs(
            org_id,
            &meter.building_id,
            unit_id.as_deref(),
            tenant_id.as_deref(),
        )
        .await?;

        let now = Utc::now();
        let status = req.status.unwrap_or(UtilityPaymentStatus::Completed);
        if status == UtilityPaymentStatus::Refunded {
            return Err(ServiceError::validation(
                "A payment cannot be recorded as refunded",
            ));
        }
        let paid_at = match status {
            UtilityPaymentStatus::Completed => Some(req.paid_at.unwrap_or(now)),
            _ => req.paid_at,
        };

        let payment = UtilityPayment {
            id: new_id(),
            organization_id: org_id.to_string(),
            meter_id: meter.id.clone(),
            building_id: meter.building_id.clone(),
            unit_id,
            tenant_id,
            utility_type: req.utility_type.unwrap_or(meter.meter_type),
            period_start: req.period_start,
            period_end: req.period_end,
            consumption: req.consumption,
            amount: round_cents(req.amount),
            method: req.method,
            status,
            paid_at,
            receipt_url: clean_opt(req.receipt_url),
            reference: clean_opt(req.reference),
            notes: clean_opt(req.notes),
            refund: None,
            reconciliation: ReconciliationInfo::default(),
            created_at: now,
            updated_at: now,
        };
        payment.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.utility_payments(), &payment, "Utility payment").await?;
        tracing::info!(
            utility_payment_id = %payment.id,
            meter_id = %payment.meter_id,
            organization_id = %org_id,
            amount = payment.amount,
            "Utility payment recorded"
        );
        Ok(payment)
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        org_id: Option<&str>,
    ) -> ServiceResult<Option<UtilityPayment>> {
        scoped::find_in_org(&self.db.utility_payments(), id, org_id).await
    }

    pub async fn list(
        &self,
        org_id: &str,
        filter: &UtilityPaymentFilter,
    ) -> ServiceResult<Vec<UtilityPayment>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(meter_id) = &filter.meter_id {
            query.insert("meterId", meter_id);
        }
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(tenant_id) = &filter.tenant_id {
            query.insert("tenantId", tenant_id);
        }
        if let Some(kind) = &filter.utility_type {
            query.insert("utilityType", scoped::to_bson(kind)?);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("periodStart", range);
        }
        scoped::find_many(
            &self.db.utility_payments(),
            query,
            doc! { "periodStart": -1 },
        )
        .await
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateUtilityPaymentRequest,
    ) -> ServiceResult<UtilityPayment> {
        let mut payment =
            scoped::require_in_org(&self.db.utility_payments(), id, org_id, "Utility payment")
                .await?;
        if payment.status == UtilityPaymentStatus::Refunded {
            return Err(ServiceError::invalid_state(
                "Refunded payments cannot be edited",
            ));
        }

        let unit_id = clean_opt(req.unit_id);
        let tenant_id = clean_opt(req.tenant_id);
        self.check_refs(
            org_id,
            &payment.building_id,
            unit_id.as_deref(),
            tenant_id.as_deref(),
        )
        .await?;
        if unit_id.is_some() {
            payment.unit_id = unit_id;
        }
        if tenant_id.is_some() {
            payment.tenant_id = tenant_id;
        }
        if let Some(start) = req.period_start {
            payment.period_start = start;
        }
        if let Some(end) = req.period_end {
            payment.period_end = end;
        }
        if req.consumption.is_some() {
            payment.consumption = req.consumption;
        }
        if let Some(amount) = req.amount {
            payment.amount = round_cents(amount);
        }
        if let Some(method) = req.method {
            payment.method = method;
        }
        if let Some(status) = req.status {
            if status == UtilityPaymentStatus::Refunded {
                return Err(ServiceError::invalid_state(
                    "Use the refund action to refund a payment",
                ));
            }
            payment.status = status;
        }
        if req.paid_at.is_some() {
            payment.paid_at = req.paid_at;
        }
        if payment.status == UtilityPaymentStatus::Completed && payment.paid_at.is_none() {
            payment.paid_at = Some(Utc::now());
        }
        if req.receipt_url.is_some() {
            payment.receipt_url = clean_opt(req.receipt_url);
        }
        if req.reference.is_some() {
            payment.reference = clean_opt(req.reference);
        }
        if req.notes.is_some() {
            payment.notes = clean_opt(req.notes);
        }
        payment.validate_rules().map_err(ServiceError::Validation)?;
        payment.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.utility_payments(), id, org_id, &payment, "Utility payment")
            .await?;
        tracing::info!(utility_payment_id = %id, organization_id = %org_id, "Utility payment updated");
        Ok(payment)
    }

    pub async fn refund(
        &self,
        id: &str,
        org_id: &str,
        refunded_by: &str,
        req: RefundRequest,
    ) -> ServiceResult<UtilityPayment> {
        let mut payment =
            scoped::require_in_org(&self.db.utility_payments(), id, org_id, "Utility payment")
                .await?;
        payment.ensure_refundable().map_err(ServiceError::InvalidState)?;

        let now = Utc::now();
        payment.status = UtilityPaymentStatus::Refunded;
        payment.refund = Some(RefundInfo {
            reason: req.reason.trim().to_string(),
            refunded_at: now,
            refunded_by: refunded_by.to_string(),
        });
        payment.updated_at = now;
        scoped::replace_in_org(&self.db.utility_payments(), id, org_id, &payment, "Utility payment")
            .await?;
        tracing::info!(utility_payment_id = %id, organization_id = %org_id, "Utility payment refunded");
        Ok(payment)
    }

    pub async fn reconcile(
        &self,
        id: &str,
        org_id: &str,
        reconciled_by: &str,
        req: ReconcileRequest,
    ) -> ServiceResult<UtilityPayment> {
        let mut payment =
            scoped::require_in_org(&self.db.utility_payments(), id, org_id, "Utility payment")
                .await?;
        if payment.status != UtilityPaymentStatus::Completed {
            return Err(ServiceError::invalid_state(
                "Only completed payments can be reconciled",
            ));
        }

        let now = Utc::now();
        payment.reconciliation = ReconciliationInfo {
            reconciled: true,
            reconciled_at: Some(now),
            reconciled_by: Some(reconciled_by.to_string()),
            bank_reference: clean_opt(req.bank_reference),
            notes: clean_opt(req.notes),
        };
        payment.updated_at = now;
        scoped::replace_in_org(&self.db.utility_payments(), id, org_id, &payment, "Utility payment")
            .await?;
        tracing::info!(utility_payment_id = %id, organization_id = %org_id, "Utility payment reconciled");
        Ok(payment)
    }

    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        scoped::delete_in_org(&self.db.utility_payments(), id, org_id, "Utility payment").await?;
        tracing::info!(utility_payment_id = %id, organization_id = %org_id, "Utility payment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_must_share_the_meter_building() {
        assert!(unit_in_building("b1", "b1").is_ok());
        let err = unit_in_building("b2", "b1").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
