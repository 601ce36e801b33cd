use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ApiError,
    handlers::common::{message_response, success_response, MessageBody},
    models::notification,
    AppState,
};

/// The caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    responses((status = 200, description = "Notifications", body = [notification::Model])),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.notifications.list_for_user(user.user_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/mark_read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = notification::Model),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(success_response(
        state.services.notifications.mark_read(user.user_id, id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/mark-all-read",
    responses((status = 200, description = "All marked read", body = MessageBody)),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.services.notifications.mark_all_read(user.user_id).await?;
    Ok(message_response("All notifications marked as read"))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/mark-all-read", post(mark_all_read))
        .route("/notifications/:id/mark_read", post(mark_read))
        .with_permission(perm::NOTIFICATIONS_READ)
}
