use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::dtos::{CreateFeatureFlagRequest, UpdateFeatureFlagRequest};
use crate::models::{clean_opt, evaluate_flag, new_id, FeatureFlag, FlagEvaluation};
use chrono::Utc;
use mongodb::bson::{doc, Document};

/// Filter matching the flags an organization can see: its own plus global ones.
fn visible_to(org_id: &str) -> Document {
    doc! { "$or": [
        { "organizationId": org_id },
        { "organizationId": { "$exists": false } },
    ] }
}

#[derive(Clone)]
pub struct FeatureFlagRepository {
    db: MongoDb,
}

impl FeatureFlagRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    /// `org_id = None` creates a global flag.
    pub async fn create(
        &self,
        org_id: Option<&str>,
        req: CreateFeatureFlagRequest,
    ) -> ServiceResult<FeatureFlag> {
        let now = Utc::now();
        let flag = FeatureFlag {
            id: new_id(),
            organization_id: org_id.map(str::to_string),
            key: req.key.trim().to_string(),
            description: clean_opt(req.description),
            enabled: req.enabled,
            rollout_percentage: req.rollout_percentage.unwrap_or(100),
            created_at: now,
            updated_at: now,
        };
        flag.validate_rules().map_err(ServiceError::Validation)?;

        scoped::insert(&self.db.feature_flags(), &flag, "Feature flag").await?;
        tracing::info!(
            flag_id = %flag.id,
            key = %flag.key,
            organization_id = org_id.unwrap_or("global"),
            "Feature flag created"
        );
        Ok(flag)
    }

    /// A flag the organization owns or a global one.
    pub async fn find_visible(&self, id: &str, org_id: &str) -> ServiceResult<Option<FeatureFlag>> {
        let flag = scoped::find_in_org(&self.db.feature_flags(), id, None).await?;
        Ok(flag.filter(|f| f.organization_id.as_deref().map_or(true, |o| o == org_id)))
    }

    pub async fn list(&self, org_id: &str) -> ServiceResult<Vec<FeatureFlag>> {
        scoped::find_many(
            &self.db.feature_flags(),
            visible_to(org_id),
            doc! { "key": 1, "organizationId": -1 },
        )
        .await
    }

    /// Load a flag for writing. Global flags need `allow_global`.
    async fn require_writable(
        &self,
        id: &str,
        org_id: &str,
        allow_global: bool,
    ) -> ServiceResult<FeatureFlag> {
        let flag = self
            .find_visible(id, org_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Feature flag"))?;
        if flag.organization_id.is_none() && !allow_global {
            return Err(ServiceError::AccessDenied(
                "Global flags are managed by platform administrators".to_string(),
            ));
        }
        Ok(flag)
    }

    pub async fn update(
        &self,
        id: &str,
        org_id: &str,
        allow_global: bool,
        req: UpdateFeatureFlagRequest,
    ) -> ServiceResult<FeatureFlag> {
        let mut flag = self.require_writable(id, org_id, allow_global).await?;

        if req.description.is_some() {
            flag.description = clean_opt(req.description);
        }
        if let Some(enabled) = req.enabled {
            flag.enabled = enabled;
        }
        if let Some(pct) = req.rollout_percentage {
            flag.rollout_percentage = pct;
        }
        flag.validate_rules().map_err(ServiceError::Validation)?;
        flag.updated_at = Utc::now();

        self.db
            .feature_flags()
            .replace_one(doc! { "_id": &flag.id }, &flag, None)
            .await?;
        tracing::info!(flag_id = %id, key = %flag.key, enabled = flag.enabled, "Feature flag updated");
        Ok(flag)
    }

    pub async fn delete(&self, id: &str, org_id: &str, allow_global: bool) -> ServiceResult<()> {
        let flag = self.require_writable(id, org_id, allow_global).await?;
        self.db
            .feature_flags()
            .delete_one(doc! { "_id": &flag.id }, None)
            .await?;
        tracing::info!(flag_id = %id, key = %flag.key, "Feature flag deleted");
        Ok(())
    }

    /// Resolve a key for an organization: its own flag wins over the global one.
    pub async fn evaluate(&self, key: &str, org_id: &str) -> ServiceResult<FlagEvaluation> {
        let flags = self.db.feature_flags();
        let org_flag = flags
            .find_one(doc! { "key": key, "organizationId": org_id }, None)
            .await?;
        let global_flag = flags
            .find_one(
                doc! { "key": key, "organizationId": { "$exists": false } },
                None,
            )
            .await?;
        Ok(evaluate_flag(
            key,
            org_id,
            org_flag.as_ref(),
            global_flag.as_ref(),
        ))
    }
}
