use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::NotificationResponse,
    middleware::AuthContext,
    services::NotificationFilter,
    utils::QueryParams,
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    QueryParams(filter): QueryParams<NotificationFilter>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = state
        .notifications
        .list(auth.org_id(), auth.user_id(), &filter)
        .await?;
    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.notifications.mark_read(&id, auth.org_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
