use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    PropertyManager,
    Accountant,
    MaintenanceStaff,
    SecurityOfficer,
    Viewer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Permission {
    #[serde(rename = "buildings.read")]
    BuildingsRead,
    #[serde(rename = "buildings.write")]
    BuildingsWrite,
    #[serde(rename = "tenants.read")]
    TenantsRead,
    #[serde(rename = "tenants.write")]
    TenantsWrite,
    #[serde(rename = "leases.read")]
    LeasesRead,
    #[serde(rename = "leases.write")]
    LeasesWrite,
    #[serde(rename = "billing.read")]
    BillingRead,
    #[serde(rename = "billing.write")]
    BillingWrite,
    #[serde(rename = "meters.read")]
    MetersRead,
    #[serde(rename = "meters.write")]
    MetersWrite,
    #[serde(rename = "assets.read")]
    AssetsRead,
    #[serde(rename = "assets.write")]
    AssetsWrite,
    #[serde(rename = "maintenance.read")]
    MaintenanceRead,
    #[serde(rename = "maintenance.write")]
    MaintenanceWrite,
    #[serde(rename = "security.read")]
    SecurityRead,
    #[serde(rename = "security.write")]
    SecurityWrite,
    #[serde(rename = "reports.read")]
    ReportsRead,
    #[serde(rename = "settings.manage")]
    SettingsManage,
    #[serde(rename = "users.manage")]
    UsersManage,
    #[serde(rename = "flags.manage")]
    FlagsManage,
    #[serde(rename = "flags.global")]
    FlagsGlobal,
}

use Permission::*;

const READ_ALL: &[Permission] = &[
    BuildingsRead,
    TenantsRead,
    LeasesRead,
    BillingRead,
    MetersRead,
    AssetsRead,
    MaintenanceRead,
    SecurityRead,
    ReportsRead,
];

const WRITE_ALL: &[Permission] = &[
    BuildingsWrite,
    TenantsWrite,
    LeasesWrite,
    BillingWrite,
    MetersWrite,
    AssetsWrite,
    MaintenanceWrite,
    SecurityWrite,
];

const ADMIN: &[Permission] = &[SettingsManage, UsersManage, FlagsManage];

const PLATFORM: &[Permission] = &[FlagsGlobal];

const PROPERTY_MANAGER: &[Permission] = &[
    BuildingsRead,
    BuildingsWrite,
    TenantsRead,
    TenantsWrite,
    LeasesRead,
    LeasesWrite,
    BillingRead,
    MetersRead,
    MetersWrite,
    AssetsRead,
    AssetsWrite,
    MaintenanceRead,
    MaintenanceWrite,
    SecurityRead,
    ReportsRead,
];

const ACCOUNTANT: &[Permission] = &[
    BuildingsRead,
    TenantsRead,
    LeasesRead,
    BillingRead,
    BillingWrite,
    MetersRead,
    ReportsRead,
];

const MAINTENANCE_STAFF: &[Permission] = &[
    BuildingsRead,
    MetersRead,
    MetersWrite,
    AssetsRead,
    AssetsWrite,
    MaintenanceRead,
    MaintenanceWrite,
];

const SECURITY_OFFICER: &[Permission] = &[BuildingsRead, TenantsRead, SecurityRead, SecurityWrite];

impl Role {
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::SuperAdmin => [READ_ALL, WRITE_ALL, ADMIN, PLATFORM].concat(),
            Role::OrgAdmin => [READ_ALL, WRITE_ALL, ADMIN].concat(),
            Role::PropertyManager => PROPERTY_MANAGER.to_vec(),
            Role::Accountant => ACCOUNTANT.to_vec(),
            Role::MaintenanceStaff => MAINTENANCE_STAFF.to_vec(),
            Role::SecurityOfficer => SECURITY_OFFICER.to_vec(),
            Role::Viewer => READ_ALL.to_vec(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::opt_chrono_datetime_as_bson_datetime"
    )]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Server-side session; `_id` is the hex SHA-256 of the cookie token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub organization_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_super_admin_manages_global_flags() {
        assert!(Role::SuperAdmin.has(FlagsGlobal));
        assert!(!Role::OrgAdmin.has(FlagsGlobal));
        assert!(Role::OrgAdmin.has(FlagsManage));
    }

    #[test]
    fn viewer_is_read_only() {
        let perms = Role::Viewer.permissions();
        assert!(perms.contains(&BillingRead));
        assert!(WRITE_ALL.iter().all(|p| !perms.contains(p)));
        assert!(!perms.contains(&UsersManage));
    }

    #[test]
    fn accountant_writes_billing_but_not_buildings() {
        assert!(Role::Accountant.has(BillingWrite));
        assert!(!Role::Accountant.has(BuildingsWrite));
    }

    #[test]
    fn permission_serializes_with_dotted_name() {
        let json = serde_json::to_string(&Permission::ReportsRead).unwrap();
        assert_eq!(json, "\"reports.read\"");
    }
}
