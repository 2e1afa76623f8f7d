//! Application state, routing and server lifecycle.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::BmsConfig;
use crate::handlers;
use crate::services::{
    AccessPermissionRepository, AssetRepository, BuildingRepository, ChapaClient,
    FeatureFlagRepository, IncidentRepository, InvoiceRepository, LeaseRepository, LocalStorage,
    MaintenanceRepository, MeterRepository, MongoDb, NotificationRepository, PaymentRepository,
    RentService, ReportService, SessionStore, StaffRepository, Storage, TenantRepository,
    UserRepository, UtilityPaymentRepository, VisitorRepository, WorkOrderRepository,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BmsConfig,
    pub db: MongoDb,
    pub users: UserRepository,
    pub sessions: SessionStore,
    pub buildings: BuildingRepository,
    pub rent: RentService,
    pub tenants: TenantRepository,
    pub leases: LeaseRepository,
    pub invoices: InvoiceRepository,
    pub payments: PaymentRepository,
    pub utility_payments: UtilityPaymentRepository,
    pub meters: MeterRepository,
    pub assets: AssetRepository,
    pub maintenance: MaintenanceRepository,
    pub work_orders: WorkOrderRepository,
    pub access_permissions: AccessPermissionRepository,
    pub incidents: IncidentRepository,
    pub visitors: VisitorRepository,
    pub staff: StaffRepository,
    pub flags: FeatureFlagRepository,
    pub notifications: NotificationRepository,
    pub reports: ReportService,
    pub chapa: ChapaClient,
    pub storage: Arc<dyn Storage>,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every repository to one database handle. No I/O happens here.
    pub fn new(config: BmsConfig, db: MongoDb) -> Self {
        let notifications = NotificationRepository::new(&db);
        let buildings = BuildingRepository::new(&db);
        let leases = LeaseRepository::new(&db, buildings.clone());
        let invoices = InvoiceRepository::new(&db, leases.clone(), notifications.clone());
        let assets = AssetRepository::new(&db);

        let chapa = ChapaClient::new(config.chapa.clone());
        if chapa.is_configured() {
            tracing::info!("Chapa client initialized");
        } else {
            tracing::warn!("Chapa credentials not configured - online checkout disabled");
        }

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );

        Self {
            users: UserRepository::new(&db),
            sessions: SessionStore::new(&db, config.session.ttl_hours),
            rent: RentService::new(buildings.clone()),
            tenants: TenantRepository::new(&db),
            payments: PaymentRepository::new(&db, invoices.clone(), notifications.clone()),
            utility_payments: UtilityPaymentRepository::new(&db),
            meters: MeterRepository::new(&db),
            maintenance: MaintenanceRepository::new(&db, assets.clone(), notifications.clone()),
            work_orders: WorkOrderRepository::new(&db),
            access_permissions: AccessPermissionRepository::new(&db),
            incidents: IncidentRepository::new(&db, notifications.clone()),
            visitors: VisitorRepository::new(&db),
            staff: StaffRepository::new(&db),
            flags: FeatureFlagRepository::new(&db),
            reports: ReportService::new(&db),
            storage: Arc::new(LocalStorage::new(&config.uploads.dir)),
            buildings,
            leases,
            invoices,
            assets,
            notifications,
            chapa,
            login_rate_limiter,
            config,
            db,
        }
    }
}

fn api_routes(state: &AppState) -> Router<AppState> {
    use handlers::*;

    let login_route = Router::new()
        .route("/auth/login", post(auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Leave room for the multipart envelope around the file itself.
    let upload_limit = state.config.uploads.max_bytes + 64 * 1024;
    let upload_route = Router::new()
        .route("/uploads/receipts", post(uploads::upload_receipt))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        // Auth, users, organization
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/organization", get(users::get_organization))
        .route("/organization/settings", patch(users::update_settings))
        // Buildings and units
        .route(
            "/buildings",
            get(buildings::list_buildings).post(buildings::create_building),
        )
        .route(
            "/buildings/:id",
            get(buildings::get_building)
                .patch(buildings::update_building)
                .delete(buildings::delete_building),
        )
        .route("/buildings/:id/units", get(buildings::building_units))
        .route("/buildings/:id/rent-policy", put(buildings::set_rent_policy))
        .route("/units", get(buildings::list_units).post(buildings::create_unit))
        .route(
            "/units/:id",
            get(buildings::get_unit)
                .patch(buildings::update_unit)
                .delete(buildings::delete_unit),
        )
        .route("/rent/bulk-update", post(buildings::bulk_update_rent))
        // Tenants and leases
        .route("/tenants", get(tenants::list_tenants).post(tenants::create_tenant))
        .route(
            "/tenants/:id",
            get(tenants::get_tenant)
                .patch(tenants::update_tenant)
                .delete(tenants::delete_tenant),
        )
        .route("/tenants/:id/leases", get(tenants::tenant_leases))
        .route("/leases", get(tenants::list_leases).post(tenants::create_lease))
        .route(
            "/leases/:id",
            get(tenants::get_lease)
                .patch(tenants::update_lease)
                .delete(tenants::delete_lease),
        )
        .route("/leases/:id/terminate", post(tenants::terminate_lease))
        .route("/leases/:id/invoices", post(tenants::generate_lease_invoice))
        // Invoices and payments
        .route(
            "/invoices",
            get(billing::list_invoices).post(billing::create_invoice),
        )
        .route("/invoices/mark-overdue", post(billing::mark_overdue))
        .route(
            "/invoices/:id",
            get(billing::get_invoice)
                .patch(billing::update_invoice)
                .delete(billing::delete_invoice),
        )
        .route("/invoices/:id/send", post(billing::send_invoice))
        .route("/invoices/:id/payments", get(billing::invoice_payments))
        .route(
            "/payments",
            get(billing::list_payments).post(billing::record_payment),
        )
        .route("/payments/chapa/initialize", post(billing::chapa_initialize))
        .route("/payments/chapa/verify/:tx_ref", get(billing::chapa_verify))
        .route(
            "/payments/:id",
            get(billing::get_payment).delete(billing::delete_payment),
        )
        .route("/payments/:id/refund", post(billing::refund_payment))
        .route("/payments/:id/reconcile", post(billing::reconcile_payment))
        .route(
            "/utility-payments",
            get(utility_payments::list_utility_payments)
                .post(utility_payments::create_utility_payment),
        )
        .route(
            "/utility-payments/:id",
            get(utility_payments::get_utility_payment)
                .patch(utility_payments::update_utility_payment)
                .delete(utility_payments::delete_utility_payment),
        )
        .route(
            "/utility-payments/:id/refund",
            post(utility_payments::refund_utility_payment),
        )
        .route(
            "/utility-payments/:id/reconcile",
            post(utility_payments::reconcile_utility_payment),
        )
        // Meters
        .route("/meters", get(meters::list_meters).post(meters::create_meter))
        .route(
            "/meters/:id",
            get(meters::get_meter)
                .patch(meters::update_meter)
                .delete(meters::delete_meter),
        )
        .route(
            "/meters/:id/readings",
            get(meters::list_readings).post(meters::add_reading),
        )
        .route("/meters/:id/consumption", get(meters::consumption))
        .route(
            "/meter-readings/:id",
            patch(meters::update_reading).delete(meters::delete_reading),
        )
        // Assets and maintenance
        .route("/assets", get(assets::list_assets).post(assets::create_asset))
        .route(
            "/assets/:id",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/assets/:id/depreciation", get(assets::depreciation))
        .route(
            "/maintenance-tasks",
            get(maintenance::list_tasks).post(maintenance::create_task),
        )
        .route(
            "/maintenance-tasks/refresh-status",
            post(maintenance::refresh_task_status),
        )
        .route(
            "/maintenance-tasks/:id",
            get(maintenance::get_task)
                .patch(maintenance::update_task)
                .delete(maintenance::delete_task),
        )
        .route(
            "/maintenance-tasks/:id/complete",
            post(maintenance::complete_task),
        )
        .route(
            "/work-orders",
            get(maintenance::list_work_orders).post(maintenance::create_work_order),
        )
        .route(
            "/work-orders/:id",
            get(maintenance::get_work_order)
                .patch(maintenance::update_work_order)
                .delete(maintenance::delete_work_order),
        )
        // Security
        .route(
            "/security/access-permissions",
            get(security::list_permissions).post(security::create_permission),
        )
        .route(
            "/security/access-permissions/:id",
            get(security::get_permission)
                .patch(security::update_permission)
                .delete(security::delete_permission),
        )
        .route(
            "/security/access-permissions/:id/revoke",
            post(security::revoke_permission),
        )
        .route(
            "/security/access-permissions/:id/check",
            get(security::check_permission),
        )
        .route(
            "/security/incidents",
            get(security::list_incidents).post(security::create_incident),
        )
        .route(
            "/security/incidents/:id",
            get(security::get_incident)
                .patch(security::update_incident)
                .delete(security::delete_incident),
        )
        .route(
            "/security/visitors",
            get(security::list_visitors).post(security::create_visitor),
        )
        .route(
            "/security/visitors/:id",
            get(security::get_visitor)
                .patch(security::update_visitor)
                .delete(security::delete_visitor),
        )
        .route(
            "/security/visitors/:id/check-out",
            post(security::check_out_visitor),
        )
        .route(
            "/security/staff",
            get(security::list_staff).post(security::create_staff),
        )
        .route(
            "/security/staff/:id",
            get(security::get_staff)
                .patch(security::update_staff)
                .delete(security::delete_staff),
        )
        // Feature flags and notifications
        .route("/feature-flags", get(flags::list_flags).post(flags::create_flag))
        .route("/feature-flags/evaluate/:key", get(flags::evaluate_flag))
        .route(
            "/feature-flags/:id",
            get(flags::get_flag)
                .patch(flags::update_flag)
                .delete(flags::delete_flag),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", post(notifications::mark_read))
        // Reports
        .route("/reports/aging", get(reports::aging))
        .route("/reports/reconciliation", get(reports::reconciliation))
        .route("/reports/reliability", get(reports::reliability))
        .route("/reports/export", get(reports::export))
        .route("/dashboard/summary", get(reports::dashboard))
        .merge(login_route)
        .merge(upload_route)
}

/// Full HTTP surface: `/api`, operational endpoints and the public upload directory.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.uploads.dir);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .nest("/api", api_routes(&state))
        .nest_service("/uploads", uploads)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    organization_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: BmsConfig) -> Result<Self, AppError> {
        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
        db.initialize_indexes().await?;
        tracing::info!("Database initialized successfully");

        let port = config.common.port;
        let state = AppState::new(config, db);

        Ok(Self {
            port,
            router: build_router(state),
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!(address = %addr, "Listening");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(e.into()))?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
