use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::accounts::session::AnyPrincipal;
use crate::errors::AppError;
use crate::models::notification::NotificationRow;
use crate::notifications::store::{list_notifications, mark_all_read, mark_read, Recipient};
use crate::state::AppState;

#[derive(Serialize)]
pub struct NotificationList {
    pub unread_count: usize,
    pub notifications: Vec<NotificationRow>,
}

#[derive(Serialize)]
pub struct MarkedResponse {
    pub marked: u64,
}

/// GET /api/v1/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    AnyPrincipal(principal): AnyPrincipal,
) -> Result<Json<NotificationList>, AppError> {
    let notifications = list_notifications(&state.db, Recipient::from(&principal)).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();
    Ok(Json(NotificationList {
        unread_count,
        notifications,
    }))
}

/// POST /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    AnyPrincipal(principal): AnyPrincipal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    mark_read(&state.db, Recipient::from(&principal), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    AnyPrincipal(principal): AnyPrincipal,
) -> Result<Json<MarkedResponse>, AppError> {
    let marked = mark_all_read(&state.db, Recipient::from(&principal)).await?;
    Ok(Json(MarkedResponse { marked }))
}
