use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::metrics;
use super::scoped;
use crate::dtos::{
    ConsumptionSummary, CreateMeterRequest, CreateReadingRequest, UpdateMeterRequest,
    UpdateReadingRequest,
};
use crate::models::{
    check_reading, clean_opt, consumption, new_id, Meter, MeterReading, MeterStatus, MeterType,
};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::options::FindOneOptions;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterFilter {
    pub building_id: Option<String>,
    pub unit_id: Option<String>,
    pub meter_type: Option<MeterType>,
    pub status: Option<MeterStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingFilter {
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::utils::time::flexible_opt")]
    pub to: Option<DateTime<Utc>>,
}

/// Usage between `from` and `to` from readings sorted oldest first.
pub fn summarize_consumption(
    meter: &Meter,
    readings: &[MeterReading],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> ConsumptionSummary {
    let in_window: Vec<&MeterReading> = readings
        .iter()
        .filter(|r| r.reading_at >= from && r.reading_at <= to)
        .collect();
    let total: f64 = in_window.iter().map(|r| r.consumption).sum();

    ConsumptionSummary {
        meter_id: meter.id.clone(),
        unit_of_measure: meter.unit_of_measure.clone(),
        from,
        to,
        readings: in_window.len(),
        start_value: in_window.first().map(|r| r.value),
        end_value: in_window.last().map(|r| r.value),
        total_consumption: (total * 1000.0).round() / 1000.0,
    }
}

#[derive(Clone)]
pub struct MeterRepository {
    db: MongoDb,
}

impl MeterRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn check_placement(
        &self,
        org_id: &str,
        building_id: &str,
        unit_id: Option<&str>,
        asset_id: Option<&str>,
    ) -> ServiceResult<()> {
        if let Some(id) = unit_id {
            let unit = scoped::reference_in_org(&self.db.units(), id, org_id, "Unit").await?;
            if unit.building_id != building_id {
                return Err(ServiceError::validation(
                    "Unit does not belong to the meter's building",
                ));
            }
        }
        if let Some(id) = asset_id {
            scoped::reference_in_org(&self.db.assets(), id, org_id, "Asset").await?;
        }
        Ok(())
    }

    pub async fn create(&self, org_id: &str, req: CreateMeterRequest) -> ServiceResult<Meter> {
        let building =
            scoped::reference_in_org(&self.db.buildings(), &req.building_id, org_id, "Building")
                .await?;
        let unit_id = clean_opt(req.unit_id);
        let asset_id = clean_opt(req.asset_id);
        self.check_placement(org_id, &building.id, unit_id.as_deref(), asset_id.as_deref())
            .await?;

        let now = Utc::now();
        let meter = Meter {
            id: new_id(),
            organization_id: org_id.to_string(),
            building_id: building.id,
            unit_id,
            asset_id,
            meter_number: req.meter_number.trim().to_string(),
            meter_type: req.meter_type,
            unit_of_measure: clean_opt(req.unit_of_measure)
                .unwrap_or_else(|| req.meter_type.default_unit().to_string()),
            multiplier: req.multiplier.unwrap_or(1.0),
            status: req.status.unwrap_or(MeterStatus::Active),
            installed_at: req.installed_at,
            last_reading: None,
            last_reading_at: None,
            created_at: now,
            updated_at: now,
        };
        meter.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.meters(), &meter, "Meter number").await?;
        tracing::info!(meter_id = %meter.id, organization_id = %org_id, "Meter created");
        Ok(meter)
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<Meter>> {
        scoped::find_in_org(&self.db.meters(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str, filter: &MeterFilter) -> ServiceResult<Vec<Meter>> {
        let mut query = doc! { "organizationId": org_id };
        if let Some(building_id) = &filter.building_id {
            query.insert("buildingId", building_id);
        }
        if let Some(unit_id) = &filter.unit_id {
            query.insert("unitId", unit_id);
        }
        if let Some(kind) = &filter.meter_type {
            query.insert("meterType", scoped::to_bson(kind)?);
        }
        if let Some(status) = &filter.status {
            query.insert("status", scoped::to_bson(status)?);
        }
        scoped::find_many(&self.db.meters(), query, doc! { "meterNumber": 1 }).await
    }

    pub async fn update(&self, id: &str, org_id: &str, req: UpdateMeterRequest) -> ServiceResult<Meter> {
        let mut meter = scoped::require_in_org(&self.db.meters(), id, org_id, "Meter").await?;

        let unit_id = clean_opt(req.unit_id);
        let asset_id = clean_opt(req.asset_id);
        self.check_placement(org_id, &meter.building_id, unit_id.as_deref(), asset_id.as_deref())
            .await?;
        if unit_id.is_some() {
            meter.unit_id = unit_id;
        }
        if asset_id.is_some() {
            meter.asset_id = asset_id;
        }
        if let Some(number) = clean_opt(req.meter_number) {
            meter.meter_number = number;
        }
        if let Some(kind) = req.meter_type {
            meter.meter_type = kind;
        }
        if let Some(unit) = clean_opt(req.unit_of_measure) {
            meter.unit_of_measure = unit;
        }
        if let Some(multiplier) = req.multiplier {
            meter.multiplier = multiplier;
        }
        if let Some(status) = req.status {
            meter.status = status;
        }
        if req.installed_at.is_some() {
            meter.installed_at = req.installed_at;
        }
        meter.validate_rules().map_err(ServiceError::Validation)?;
        meter.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.meters(), id, org_id, &meter, "Meter number").await?;
        tracing::info!(meter_id = %id, organization_id = %org_id, "Meter updated");
        Ok(meter)
    }

    /// Hard delete, refused while readings exist.
    pub async fn delete(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let meter = scoped::require_in_org(&self.db.meters(), id, org_id, "Meter").await?;
        let readings = self
            .db
            .meter_readings()
            .count_documents(doc! { "organizationId": org_id, "meterId": &meter.id }, None)
            .await?;
        if readings > 0 {
            return Err(ServiceError::Conflict(
                "Meter has readings and cannot be deleted".to_string(),
            ));
        }
        scoped::delete_in_org(&self.db.meters(), id, org_id, "Meter").await?;
        tracing::info!(meter_id = %id, organization_id = %org_id, "Meter deleted");
        Ok(())
    }

    /// Closest reading strictly before (or after) `at`, skipping `except`.
    async fn neighbour(
        &self,
        meter_id: &str,
        at: DateTime<Utc>,
        except: Option<&str>,
        before: bool,
    ) -> ServiceResult<Option<MeterReading>> {
        let (op, order) = if before { ("$lt", -1) } else { ("$gt", 1) };
        let mut range = Document::new();
        range.insert(op, scoped::bson_date(at));
        let mut filter = doc! { "meterId": meter_id, "readingAt": range };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        let options = FindOneOptions::builder()
            .sort(doc! { "readingAt": order })
            .build();
        Ok(self.db.meter_readings().find_one(filter, options).await?)
    }

    /// One reading per meter per instant; otherwise neither neighbour lookup
    /// sees the other and the monotonic check is skipped.
    async fn ensure_free_slot(
        &self,
        meter_id: &str,
        at: DateTime<Utc>,
        except: Option<&str>,
    ) -> ServiceResult<()> {
        let mut filter = doc! { "meterId": meter_id, "readingAt": scoped::bson_date(at) };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id });
        }
        if self.db.meter_readings().count_documents(filter, None).await? > 0 {
            return Err(ServiceError::Conflict(format!(
                "A reading already exists for this meter at {}",
                at.to_rfc3339()
            )));
        }
        Ok(())
    }

    /// Point the meter at its newest reading, or clear it when none remain.
    async fn sync_last_reading(&self, meter: &Meter) -> ServiceResult<()> {
        let options = FindOneOptions::builder()
            .sort(doc! { "readingAt": -1, "createdAt": -1 })
            .build();
        let latest = self
            .db
            .meter_readings()
            .find_one(doc! { "meterId": &meter.id }, options)
            .await?;
        let update = match latest {
            Some(r) => doc! { "$set": {
                "lastReading": r.value,
                "lastReadingAt": scoped::bson_date(r.reading_at),
                "updatedAt": scoped::bson_date(Utc::now()),
            } },
            None => doc! {
                "$unset": { "lastReading": "", "lastReadingAt": "" },
                "$set": { "updatedAt": scoped::bson_date(Utc::now()) },
            },
        };
        self.db
            .meters()
            .update_one(scoped::id_filter(&meter.id, Some(&meter.organization_id)), update, None)
            .await?;
        Ok(())
    }

    /// Recompute a reading's consumption after its predecessor changed.
    async fn refresh_consumption(&self, meter: &Meter, reading: &MeterReading) -> ServiceResult<()> {
        let previous = self
            .neighbour(&meter.id, reading.reading_at, Some(&reading.id), true)
            .await?;
        let usage = consumption(reading.value, previous.map(|p| p.value), meter.multiplier);
        self.db
            .meter_readings()
            .update_one(
                doc! { "_id": &reading.id },
                doc! { "$set": { "consumption": usage, "updatedAt": scoped::bson_date(Utc::now()) } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn add_reading(
        &self,
        meter_id: &str,
        org_id: &str,
        recorded_by: &str,
        req: CreateReadingRequest,
    ) -> ServiceResult<MeterReading> {
        let meter = scoped::require_in_org(&self.db.meters(), meter_id, org_id, "Meter").await?;
        let now = Utc::now();
        let at = req.reading_at.unwrap_or(now);
        if at > now {
            return Err(ServiceError::validation("Reading time cannot be in the future"));
        }
        self.ensure_free_slot(&meter.id, at, None).await?;

        let previous = self.neighbour(&meter.id, at, None, true).await?;
        let next = self.neighbour(&meter.id, at, None, false).await?;
        check_reading(
            req.value,
            previous.as_ref().map(|p| p.value),
            next.as_ref().map(|n| n.value),
            req.allow_decrease,
        )
        .map_err(ServiceError::Validation)?;

        let reading = MeterReading {
            id: new_id(),
            organization_id: org_id.to_string(),
            meter_id: meter.id.clone(),
            value: req.value,
            reading_at: at,
            consumption: consumption(req.value, previous.map(|p| p.value), meter.multiplier),
            allow_decrease: req.allow_decrease,
            notes: clean_opt(req.notes),
            recorded_by: recorded_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        scoped::insert(&self.db.meter_readings(), &reading, "Meter reading").await?;

        if let Some(next) = next {
            self.refresh_consumption(&meter, &next).await?;
        }
        self.sync_last_reading(&meter).await?;

        metrics::record_meter_reading(org_id, meter.meter_type.as_str());
        tracing::info!(
            reading_id = %reading.id,
            meter_id = %meter.id,
            organization_id = %org_id,
            value = reading.value,
            consumption = reading.consumption,
            "Meter reading recorded"
        );
        Ok(reading)
    }

    pub async fn list_readings(
        &self,
        meter_id: &str,
        org_id: &str,
        filter: &ReadingFilter,
    ) -> ServiceResult<Vec<MeterReading>> {
        let meter = scoped::require_in_org(&self.db.meters(), meter_id, org_id, "Meter").await?;
        let mut query = doc! { "organizationId": org_id, "meterId": &meter.id };
        if let Some(range) = scoped::date_range(filter.from, filter.to) {
            query.insert("readingAt", range);
        }
        scoped::find_many(&self.db.meter_readings(), query, doc! { "readingAt": -1 }).await
    }

    pub async fn update_reading(
        &self,
        id: &str,
        org_id: &str,
        req: UpdateReadingRequest,
    ) -> ServiceResult<MeterReading> {
        let mut reading =
            scoped::require_in_org(&self.db.meter_readings(), id, org_id, "Meter reading").await?;
        let meter =
            scoped::require_in_org(&self.db.meters(), &reading.meter_id, org_id, "Meter").await?;
        let old_next = self
            .neighbour(&meter.id, reading.reading_at, Some(id), false)
            .await?;

        if let Some(value) = req.value {
            reading.value = value;
        }
        if let Some(at) = req.reading_at {
            reading.reading_at = at;
        }
        if let Some(allow) = req.allow_decrease {
            reading.allow_decrease = allow;
        }
        if req.notes.is_some() {
            reading.notes = clean_opt(req.notes);
        }

        self.ensure_free_slot(&meter.id, reading.reading_at, Some(id))
            .await?;

        let previous = self
            .neighbour(&meter.id, reading.reading_at, Some(id), true)
            .await?;
        let next = self
            .neighbour(&meter.id, reading.reading_at, Some(id), false)
            .await?;
        check_reading(
            reading.value,
            previous.as_ref().map(|p| p.value),
            next.as_ref().map(|n| n.value),
            reading.allow_decrease,
        )
        .map_err(ServiceError::Validation)?;
        reading.consumption = consumption(reading.value, previous.map(|p| p.value), meter.multiplier);
        reading.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.meter_readings(), id, org_id, &reading, "Meter reading")
            .await?;

        if let Some(next) = &next {
            self.refresh_consumption(&meter, next).await?;
        }
        if let Some(old) = old_next.filter(|o| next.as_ref().map(|n| &n.id) != Some(&o.id)) {
            self.refresh_consumption(&meter, &old).await?;
        }
        self.sync_last_reading(&meter).await?;
        tracing::info!(reading_id = %id, meter_id = %meter.id, organization_id = %org_id, "Meter reading updated");
        Ok(reading)
    }

    pub async fn delete_reading(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        let reading =
            scoped::require_in_org(&self.db.meter_readings(), id, org_id, "Meter reading").await?;
        let meter =
            scoped::require_in_org(&self.db.meters(), &reading.meter_id, org_id, "Meter").await?;
        let next = self
            .neighbour(&meter.id, reading.reading_at, Some(id), false)
            .await?;

        scoped::delete_in_org(&self.db.meter_readings(), id, org_id, "Meter reading").await?;
        if let Some(next) = next {
            self.refresh_consumption(&meter, &next).await?;
        }
        self.sync_last_reading(&meter).await?;
        tracing::info!(reading_id = %id, meter_id = %meter.id, organization_id = %org_id, "Meter reading deleted");
        Ok(())
    }

    pub async fn consumption(
        &self,
        meter_id: &str,
        org_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<ConsumptionSummary> {
        if from > to {
            return Err(ServiceError::validation("'from' must not be after 'to'"));
        }
        let meter = scoped::require_in_org(&self.db.meters(), meter_id, org_id, "Meter").await?;
        let query = doc! {
            "organizationId": org_id,
            "meterId": &meter.id,
            "readingAt": scoped::date_range(Some(from), Some(to)),
        };
        let readings =
            scoped::find_many(&self.db.meter_readings(), query, doc! { "readingAt": 1 }).await?;
        Ok(summarize_consumption(&meter, &readings, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn meter() -> Meter {
        let now = Utc::now();
        Meter {
            id: "m1".into(),
            organization_id: "org".into(),
            building_id: "b1".into(),
            unit_id: None,
            asset_id: None,
            meter_number: "EM-1".into(),
            meter_type: MeterType::Electricity,
            unit_of_measure: "kWh".into(),
            multiplier: 1.0,
            status: MeterStatus::Active,
            installed_at: None,
            last_reading: None,
            last_reading_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn reading(at: DateTime<Utc>, value: f64, usage: f64) -> MeterReading {
        MeterReading {
            id: new_id(),
            organization_id: "org".into(),
            meter_id: "m1".into(),
            value,
            reading_at: at,
            consumption: usage,
            allow_decrease: false,
            notes: None,
            recorded_by: "u".into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn consumption_sums_readings_inside_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let readings = vec![
            reading(start - Duration::days(1), 100.0, 0.0),
            reading(start + Duration::days(10), 150.0, 50.0),
            reading(start + Duration::days(20), 175.5, 25.5),
            reading(start + Duration::days(40), 200.0, 24.5),
        ];

        let summary = summarize_consumption(&meter(), &readings, start, start + Duration::days(30));

        assert_eq!(summary.readings, 2);
        assert_eq!(summary.start_value, Some(150.0));
        assert_eq!(summary.end_value, Some(175.5));
        assert_eq!(summary.total_consumption, 75.5);
    }

    #[test]
    fn empty_window_has_no_usage() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let summary = summarize_consumption(&meter(), &[], start, start);
        assert_eq!(summary.readings, 0);
        assert_eq!(summary.total_consumption, 0.0);
        assert!(summary.start_value.is_none());
    }
}
