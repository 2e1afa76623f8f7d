//! Session authentication.
//!
//! The `bms_session` cookie is resolved to a live session and its user on
//! every request; the role (and therefore the permission set) is read from
//! the user document each time so role changes apply immediately.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::models::{Permission, Role, User, UserStatus};
use crate::services::SESSION_COOKIE;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// Raw cookie token, kept for logout.
    pub token: String,
}

impl AuthContext {
    pub fn org_id(&self) -> &str {
        &self.user.organization_id
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.user.role.has(permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user.id,
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Access denied: insufficient permissions"
            )))
        }
    }
}

fn unauthenticated() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(unauthenticated)?;

        let session = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or_else(unauthenticated)?;

        let user = state
            .users
            .find_by_id(&session.user_id, Some(&session.organization_id))
            .await?
            .filter(|u| u.status == UserStatus::Active)
            .ok_or_else(unauthenticated)?;

        let span = tracing::Span::current();
        span.record("organization_id", user.organization_id.as_str());
        span.record("user_id", user.id.as_str());

        Ok(AuthContext { user, token })
    }
}
