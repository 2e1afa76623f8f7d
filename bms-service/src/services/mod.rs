pub mod assets;
pub mod buildings;
pub mod chapa;
pub mod database;
pub mod error;
pub mod feature_flags;
pub mod invoices;
pub mod leases;
pub mod maintenance;
pub mod meters;
pub mod metrics;
pub mod notifications;
pub mod payments;
pub mod rent;
pub mod reports;
pub mod scoped;
pub mod security;
pub mod sessions;
pub mod storage;
pub mod tenants;
pub mod users;
pub mod utility_payments;
pub mod work_orders;

pub use assets::{AssetFilter, AssetRepository};
pub use buildings::{BuildingFilter, BuildingRepository, UnitFilter};
pub use chapa::ChapaClient;
pub use database::MongoDb;
pub use error::{ServiceError, ServiceResult};
pub use feature_flags::FeatureFlagRepository;
pub use invoices::{InvoiceFilter, InvoiceRepository};
pub use leases::{LeaseFilter, LeaseRepository};
pub use maintenance::{MaintenanceRepository, TaskFilter};
pub use meters::{MeterFilter, MeterRepository, ReadingFilter};
pub use metrics::{get_metrics, init_metrics};
pub use notifications::{NotificationFilter, NotificationRepository};
pub use payments::{PaymentFilter, PaymentRepository};
pub use rent::RentService;
pub use reports::ReportService;
pub use security::{
    AccessPermissionFilter, AccessPermissionRepository, IncidentFilter, IncidentRepository,
    StaffFilter, StaffRepository, VisitorFilter, VisitorRepository,
};
pub use sessions::{session_ttl, SessionStore, SESSION_COOKIE};
pub use storage::{LocalStorage, Storage};
pub use tenants::{TenantFilter, TenantRepository};
pub use users::UserRepository;
pub use utility_payments::{UtilityPaymentFilter, UtilityPaymentRepository};
pub use work_orders::{WorkOrderFilter, WorkOrderRepository};
