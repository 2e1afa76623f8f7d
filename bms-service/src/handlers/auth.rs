use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::{
    dtos::{LoginRequest, OrganizationResponse, RegisterRequest, SessionResponse, UserResponse},
    middleware::AuthContext,
    models::{Organization, User},
    services::SESSION_COOKIE,
    utils::ValidatedJson,
    AppState,
};

/// The cookie lives exactly as long as the stored session.
fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

fn session_response(user: User, organization: Organization) -> SessionResponse {
    let permissions = user.role.permissions();
    SessionResponse {
        user: UserResponse::from(user),
        organization: OrganizationResponse::from(organization),
        permissions,
    }
}

/// Create an organization with its first administrator and sign them in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    let (organization, user) = state.users.register(payload).await?;
    let token = state.sessions.create(&user).await?;

    tracing::info!(
        user_id = %user.id,
        organization_id = %organization.id,
        "Organization registered"
    );

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(
            token,
            state.sessions.ttl(),
            state.config.session.cookie_secure,
        )),
        Json(session_response(user, organization)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

    let organization = state.users.organization(&user.organization_id).await?;
    let token = state.sessions.create(&user).await?;

    tracing::info!(
        user_id = %user.id,
        organization_id = %user.organization_id,
        "User logged in"
    );

    Ok((
        jar.add(session_cookie(
            token,
            state.sessions.ttl(),
            state.config.session.cookie_secure,
        )),
        Json(session_response(user, organization)),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    state.sessions.revoke(&auth.token).await?;
    tracing::info!(user_id = %auth.user_id(), "User logged out");

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    Ok((jar.remove(removal), StatusCode::NO_CONTENT))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<SessionResponse>, AppError> {
    let organization = state.users.organization(auth.org_id()).await?;
    Ok(Json(session_response(auth.user, organization)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_ttl;

    #[test]
    fn cookie_max_age_follows_the_session_lifetime() {
        let cookie = session_cookie("token".into(), session_ttl(0), true);
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(1)));
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));

        let cookie = session_cookie("token".into(), session_ttl(48), false);
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(48)));
    }
}
