use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateUserRequest, RegisterRequest, UpdateSettingsRequest, UpdateUserRequest};
use crate::models::{clean_opt, new_id, Organization, OrganizationSettings, Role, User, UserStatus};
use crate::utils::password::{hash_password, verify_password, Password};
use chrono::Utc;
use mongodb::bson::doc;

#[derive(Clone)]
pub struct UserRepository {
    db: MongoDb,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    async fn ensure_email_free(&self, email: &str) -> ServiceResult<()> {
        if self
            .db
            .users()
            .find_one(doc! { "email": email }, None)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }
        Ok(())
    }

    /// Create an organization with default settings and its first admin.
    pub async fn register(&self, req: RegisterRequest) -> ServiceResult<(Organization, User)> {
        let email = normalize_email(&req.email);
        self.ensure_email_free(&email).await?;

        let now = Utc::now();
        let organization = Organization {
            id: new_id(),
            name: req.organization_name.trim().to_string(),
            settings: OrganizationSettings::default(),
            created_at: now,
            updated_at: now,
        };
        scoped::insert(&self.db.organizations(), &organization, "Organization").await?;

        let password_hash = hash_password(&Password::new(req.password))?;
        let user = User {
            id: new_id(),
            organization_id: organization.id.clone(),
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role: Role::OrgAdmin,
            status: UserStatus::Active,
            last_login_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        scoped::insert(&self.db.users(), &user, "Email").await?;

        tracing::info!(
            organization_id = %organization.id,
            user_id = %user.id,
            "Organization registered"
        );
        Ok((organization, user))
    }

    /// `None` for unknown emails, inactive users and wrong passwords alike.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<Option<User>> {
        let email = normalize_email(email);
        let Some(mut user) = self.db.users().find_one(doc! { "email": &email }, None).await? else {
            return Ok(None);
        };
        if user.status != UserStatus::Active
            || !verify_password(&Password::new(password.to_string()), &user.password_hash)
        {
            return Ok(None);
        }

        let now = Utc::now();
        self.db
            .users()
            .update_one(
                doc! { "_id": &user.id },
                doc! { "$set": { "lastLoginAt": scoped::bson_date(now) } },
                None,
            )
            .await?;
        user.last_login_at = Some(now);
        Ok(Some(user))
    }

    pub async fn find_by_id(&self, id: &str, org_id: Option<&str>) -> ServiceResult<Option<User>> {
        scoped::find_in_org(&self.db.users(), id, org_id).await
    }

    pub async fn list(&self, org_id: &str) -> ServiceResult<Vec<User>> {
        scoped::find_many(
            &self.db.users(),
            doc! { "organizationId": org_id },
            doc! { "name": 1 },
        )
        .await
    }

    pub async fn create(
        &self,
        org_id: &str,
        actor_role: Role,
        req: CreateUserRequest,
    ) -> ServiceResult<User> {
        if req.role == Role::SuperAdmin && actor_role != Role::SuperAdmin {
            return Err(ServiceError::AccessDenied(
                "Only a super admin can grant the super admin role".to_string(),
            ));
        }
        let email = normalize_email(&req.email);
        self.ensure_email_free(&email).await?;

        let now = Utc::now();
        let user = User {
            id: new_id(),
            organization_id: org_id.to_string(),
            name: req.name.trim().to_string(),
            email,
            password_hash: hash_password(&Password::new(req.password))?,
            role: req.role,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        scoped::insert(&self.db.users(), &user, "Email").await?;
        tracing::info!(user_id = %user.id, organization_id = %org_id, "User created");
        Ok(user)
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        actor: &User,
        req: UpdateUserRequest,
    ) -> ServiceResult<User> {
        let mut user = scoped::require_in_org(&self.db.users(), id, org_id, "User").await?;

        if user.id == actor.id && (req.role.is_some() || req.status.is_some()) {
            return Err(ServiceError::invalid_state(
                "You cannot change your own role or status",
            ));
        }
        if let Some(role) = req.role {
            if (role == Role::SuperAdmin || user.role == Role::SuperAdmin)
                && actor.role != Role::SuperAdmin
            {
                return Err(ServiceError::AccessDenied(
                    "Only a super admin can change super admin roles".to_string(),
                ));
            }
            user.role = role;
        }
        if let Some(name) = clean_opt(req.name) {
            user.name = name;
        }
        if let Some(status) = req.status {
            user.status = status;
        }
        if let Some(password) = req.password {
            user.password_hash = hash_password(&Password::new(password))?;
        }
        user.updated_at = Utc::now();

        scoped::replace_in_org(&self.db.users(), id, org_id, &user, "User").await?;
        tracing::info!(user_id = %id, organization_id = %org_id, "User updated");
        Ok(user)
    }

    /// Soft delete: the account is deactivated and its sessions dropped.
    pub async fn deactivate(&self, id: &str, org_id: &str, actor: &User) -> ServiceResult<()> {
        if id == actor.id {
            return Err(ServiceError::invalid_state("You cannot delete your own account"));
        }
        let mut user = scoped::require_in_org(&self.db.users(), id, org_id, "User").await?;
        user.status = UserStatus::Inactive;
        user.updated_at = Utc::now();
        scoped::replace_in_org(&self.db.users(), id, org_id, &user, "User").await?;
        self.db
            .sessions()
            .delete_many(doc! { "userId": id }, None)
            .await?;
        tracing::info!(user_id = %id, organization_id = %org_id, "User deactivated");
        Ok(())
    }

    pub async fn organization(&self, org_id: &str) -> ServiceResult<Organization> {
        self.db
            .organizations()
            .find_one(doc! { "_id": org_id }, None)
            .await?
            .ok_or_else(|| ServiceError::not_found("Organization"))
    }

    pub async fn update_settings(
        &self,
        org_id: &str,
        req: UpdateSettingsRequest,
    ) -> ServiceResult<Organization> {
        let mut org = self.organization(org_id).await?;
        let s = &mut org.settings;

        if let Some(name) = clean_opt(req.name) {
            org.name = name;
        }
        if let Some(currency) = req.currency {
            s.currency = currency.trim().to_uppercase();
        }
        if let Some(vat) = req.vat_rate {
            s.vat_rate = vat;
        }
        if let Some(prefix) = req.invoice_prefix {
            s.invoice_prefix = prefix.trim().to_uppercase();
        }
        if let Some(days) = req.payment_terms_days {
            s.payment_terms_days = days;
        }
        if let Some(fee) = req.late_fee_percentage {
            s.late_fee_percentage = fee;
        }
        if let Some(tz) = clean_opt(req.timezone) {
            s.timezone = tz;
        }
        if req.contact_email.is_some() {
            s.contact_email = clean_opt(req.contact_email);
        }
        if req.contact_phone.is_some() {
            s.contact_phone = clean_opt(req.contact_phone);
        }
        if req.address.is_some() {
            s.address = clean_opt(req.address);
        }
        s.validate_rules().map_err(ServiceError::Validation)?;
        org.updated_at = Utc::now();

        self.db
            .organizations()
            .replace_one(doc! { "_id": org_id }, &org, None)
            .await?;
        tracing::info!(organization_id = %org_id, "Organization settings updated");
        Ok(org)
    }
}
