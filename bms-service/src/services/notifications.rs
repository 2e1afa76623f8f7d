use super::database::MongoDb;
use super::error::{ServiceError, ServiceResult};
use super::scoped;
use crate::models::{new_id, Notification, NotificationKind};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

/// A notice addressed to the whole organization.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
}

#[derive(Clone)]
pub struct NotificationRepository {
    db: MongoDb,
}

impl NotificationRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self { db: db.clone() }
    }

    pub async fn create(&self, org_id: &str, notice: NewNotification) -> ServiceResult<Notification> {
        let notification = Notification {
            id: new_id(),
            organization_id: org_id.to_string(),
            user_id: None,
            kind: notice.kind,
            title: notice.title,
            message: notice.message,
            entity_type: Some(notice.entity_type.to_string()),
            entity_id: notice.entity_id,
            read: false,
            created_at: Utc::now(),
        };
        scoped::insert(&self.db.notifications(), &notification, "Notification").await?;
        Ok(notification)
    }

    /// Fire-and-forget variant: failures are logged and swallowed.
    pub async fn notify(&self, org_id: &str, notice: NewNotification) {
        let kind = notice.kind;
        if let Err(e) = self.create(org_id, notice).await {
            tracing::warn!(
                error = %e,
                organization_id = %org_id,
                kind = ?kind,
                "Failed to dispatch notification"
            );
        }
    }

    /// Organization-wide notices plus those addressed to the user, newest first.
    pub async fn list(
        &self,
        org_id: &str,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> ServiceResult<Vec<Notification>> {
        let mut query = doc! {
            "organizationId": org_id,
            "$or": [
                { "userId": { "$exists": false } },
                { "userId": user_id },
            ],
        };
        if filter.unread_only {
            query.insert("read", false);
        }
        scoped::find_many(&self.db.notifications(), query, doc! { "createdAt": -1 }).await
    }

    pub async fn mark_read(&self, id: &str, org_id: &str) -> ServiceResult<()> {
        if !scoped::is_valid_id(id) {
            return Err(ServiceError::not_found("Notification"));
        }
        let result = self
            .db
            .notifications()
            .update_one(
                scoped::id_filter(id, Some(org_id)),
                doc! { "$set": { "read": true } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ServiceError::not_found("Notification"));
        }
        Ok(())
    }
}
