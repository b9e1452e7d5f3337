//! Student notification endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::notification::Notification};

use super::{AuthenticatedUser, Envelope};

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notification list", body = Vec<Notification>)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Envelope<Vec<Notification>>>> {
    let notifications = state
        .services
        .repository
        .notifications
        .list_for_student(claims.user_id)
        .await?;
    Ok(Json(Envelope::success(notifications)))
}

/// Mark one of the caller's notifications as read
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Envelope<Notification>>> {
    let notification = state
        .services
        .repository
        .notifications
        .mark_read(id, claims.user_id)
        .await?;
    Ok(Json(Envelope::success(notification)))
}
