use crate::models::{
    AccessPermission, Asset, Building, FeatureFlag, Invoice, Lease, MaintenanceTask, Meter,
    MeterReading, Notification, Organization, Payment, SecurityIncident, SecurityStaff, Session,
    Tenant, Unit, User, UtilityPayment, VisitorLog, WorkOrder,
};
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

fn index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}

fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build(),
        )
        .build()
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let mut options = mongodb::options::ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        options.app_name = Some("bms-service".to_string());

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "MongoDB client ready");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for bms-service");

        self.users()
            .create_indexes(
                [
                    unique_index(doc! { "email": 1 }, "user_email_unique"),
                    index(doc! { "organizationId": 1, "role": 1 }, "user_org_role"),
                ],
                None,
            )
            .await?;

        let session_ttl = IndexModel::builder()
            .keys(doc! { "expiresAt": 1 })
            .options(
                IndexOptions::builder()
                    .name("session_ttl".to_string())
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();
        self.sessions().create_index(session_ttl, None).await?;

        self.buildings()
            .create_index(
                index(doc! { "organizationId": 1, "status": 1 }, "building_org_status"),
                None,
            )
            .await?;

        self.units()
            .create_index(
                unique_index(
                    doc! { "organizationId": 1, "buildingId": 1, "unitNumber": 1 },
                    "unit_number_per_building",
                ),
                None,
            )
            .await?;

        self.tenants()
            .create_index(
                unique_index(doc! { "organizationId": 1, "email": 1 }, "tenant_email_per_org"),
                None,
            )
            .await?;

        self.leases()
            .create_indexes(
                [
                    index(
                        doc! { "organizationId": 1, "unitId": 1, "status": 1 },
                        "lease_org_unit_status",
                    ),
                    index(doc! { "organizationId": 1, "tenantId": 1 }, "lease_org_tenant"),
                ],
                None,
            )
            .await?;

        self.invoices()
            .create_indexes(
                [
                    unique_index(
                        doc! { "organizationId": 1, "invoiceNumber": 1 },
                        "invoice_number_per_org",
                    ),
                    index(
                        doc! { "organizationId": 1, "status": 1, "dueDate": 1 },
                        "invoice_org_status_due",
                    ),
                    index(doc! { "organizationId": 1, "tenantId": 1 }, "invoice_org_tenant"),
                ],
                None,
            )
            .await?;

        let tx_ref_index = IndexModel::builder()
            .keys(doc! { "txRef": 1 })
            .options(
                IndexOptions::builder()
                    .name("payment_tx_ref".to_string())
                    .unique(true)
                    .sparse(true)
                    .build(),
            )
            .build();
        self.payments()
            .create_indexes(
                [
                    index(doc! { "organizationId": 1, "invoiceId": 1 }, "payment_org_invoice"),
                    tx_ref_index,
                ],
                None,
            )
            .await?;

        self.utility_payments()
            .create_index(
                index(
                    doc! { "organizationId": 1, "meterId": 1, "periodStart": -1 },
                    "utility_payment_org_meter",
                ),
                None,
            )
            .await?;

        self.meters()
            .create_index(
                unique_index(doc! { "organizationId": 1, "meterNumber": 1 }, "meter_number_per_org"),
                None,
            )
            .await?;

        self.meter_readings()
            .create_index(
                unique_index(doc! { "meterId": 1, "readingAt": 1 }, "reading_meter_time_unique"),
                None,
            )
            .await?;

        self.assets()
            .create_index(
                index(doc! { "organizationId": 1, "buildingId": 1 }, "asset_org_building"),
                None,
            )
            .await?;

        self.maintenance_tasks()
            .create_index(
                index(
                    doc! { "organizationId": 1, "status": 1, "dueDate": 1 },
                    "task_org_status_due",
                ),
                None,
            )
            .await?;

        self.work_orders()
            .create_index(
                index(
                    doc! { "organizationId": 1, "buildingId": 1, "status": 1 },
                    "work_order_org_building_status",
                ),
                None,
            )
            .await?;

        self.access_permissions()
            .create_index(
                index(
                    doc! { "organizationId": 1, "buildingId": 1, "status": 1 },
                    "access_org_building_status",
                ),
                None,
            )
            .await?;

        self.security_incidents()
            .create_index(
                index(
                    doc! { "organizationId": 1, "buildingId": 1, "status": 1 },
                    "incident_org_building_status",
                ),
                None,
            )
            .await?;

        self.visitor_logs()
            .create_index(
                index(
                    doc! { "organizationId": 1, "buildingId": 1, "checkInAt": -1 },
                    "visitor_org_building_checkin",
                ),
                None,
            )
            .await?;

        self.security_staff()
            .create_index(
                index(doc! { "organizationId": 1, "status": 1 }, "staff_org_status"),
                None,
            )
            .await?;

        self.feature_flags()
            .create_index(
                unique_index(doc! { "key": 1, "organizationId": 1 }, "flag_key_per_org"),
                None,
            )
            .await?;

        self.notifications()
            .create_index(
                index(
                    doc! { "organizationId": 1, "userId": 1, "createdAt": -1 },
                    "notification_org_user",
                ),
                None,
            )
            .await?;

        tracing::info!("bms-service indexes initialized");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn organizations(&self) -> Collection<Organization> {
        self.db.collection("organizations")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn sessions(&self) -> Collection<Session> {
        self.db.collection("sessions")
    }

    pub fn counters(&self) -> Collection<Document> {
        self.db.collection("counters")
    }

    pub fn buildings(&self) -> Collection<Building> {
        self.db.collection("buildings")
    }

    pub fn units(&self) -> Collection<Unit> {
        self.db.collection("units")
    }

    pub fn tenants(&self) -> Collection<Tenant> {
        self.db.collection("tenants")
    }

    pub fn leases(&self) -> Collection<Lease> {
        self.db.collection("leases")
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("invoices")
    }

    pub fn payments(&self) -> Collection<Payment> {
        self.db.collection("payments")
    }

    pub fn utility_payments(&self) -> Collection<UtilityPayment> {
        self.db.collection("utilityPayments")
    }

    pub fn meters(&self) -> Collection<Meter> {
        self.db.collection("meters")
    }

    pub fn meter_readings(&self) -> Collection<MeterReading> {
        self.db.collection("meterReadings")
    }

    pub fn assets(&self) -> Collection<Asset> {
        self.db.collection("assets")
    }

    pub fn maintenance_tasks(&self) -> Collection<MaintenanceTask> {
        self.db.collection("maintenanceTasks")
    }

    pub fn work_orders(&self) -> Collection<WorkOrder> {
        self.db.collection("workOrders")
    }

    pub fn access_permissions(&self) -> Collection<AccessPermission> {
        self.db.collection("accessPermissions")
    }

    pub fn security_incidents(&self) -> Collection<SecurityIncident> {
        self.db.collection("securityIncidents")
    }

    pub fn visitor_logs(&self) -> Collection<VisitorLog> {
        self.db.collection("visitorLogs")
    }

    pub fn security_staff(&self) -> Collection<SecurityStaff> {
        self.db.collection("securityStaff")
    }

    pub fn feature_flags(&self) -> Collection<FeatureFlag> {
        self.db.collection("featureFlags")
    }

    pub fn notifications(&self) -> Collection<Notification> {
        self.db.collection("notifications")
    }
}
