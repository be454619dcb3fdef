use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Query;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::session::AdminUser;
use crate::admin::store::{
    create_zone, delete_zone, list_users, roles_with_permissions, UserListQuery,
};
use crate::errors::AppError;
use crate::institutions::store::{find_institution_by_id, list_institutions, record_approval};
use crate::models::institution::{ApprovalRow, ApprovalStatus, InstitutionRow};
use crate::models::non_empty;
use crate::models::role::RoleWithPermissions;
use crate::models::user::UserRow;
use crate::models::zone::Zone;
use crate::notifications::store::{notify, Recipient};
use crate::pagination::Page;
use crate::state::AppState;

pub const ADMIN_PAGE_SIZE: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct InstitutionListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalRequest {
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ZoneRequest {
    pub name: String,
}

/// GET /api/v1/admin/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<UserRow>>, AppError> {
    Ok(Json(list_users(&state.db, &query, ADMIN_PAGE_SIZE).await?))
}

/// GET /api/v1/admin/institutions
pub async fn handle_list_institutions(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<InstitutionListQuery>,
) -> Result<Json<Vec<InstitutionRow>>, AppError> {
    let status = match non_empty(query.status) {
        Some(raw) => Some(raw.parse::<ApprovalStatus>()?),
        None => None,
    };
    Ok(Json(list_institutions(&state.db, status).await?))
}

/// POST /api/v1/admin/institutions/:id/approve
pub async fn handle_approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ApprovalRequest>>,
) -> Result<Json<ApprovalRow>, AppError> {
    let Json(req) = body.unwrap_or_default();
    decide(&state, admin.id, id, ApprovalStatus::Approved, req.remarks).await
}

/// POST /api/v1/admin/institutions/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ApprovalRequest>>,
) -> Result<Json<ApprovalRow>, AppError> {
    let Json(req) = body.unwrap_or_default();
    decide(&state, admin.id, id, ApprovalStatus::Rejected, req.remarks).await
}

async fn decide(
    state: &AppState,
    admin_id: Uuid,
    institution_id: Uuid,
    status: ApprovalStatus,
    remarks: Option<String>,
) -> Result<Json<ApprovalRow>, AppError> {
    let institution = find_institution_by_id(&state.db, institution_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Institution {institution_id} not found")))?;
    let remarks = non_empty(remarks);
    let (title, message) = decision_notice(&institution.name, status, remarks.as_deref());

    let mut tx = state.db.begin().await?;
    let row = record_approval(&mut tx, institution.id, status, remarks.as_deref(), admin_id).await?;
    notify(&mut *tx, Recipient::Institution(institution.id), title, &message).await?;
    tx.commit().await?;

    info!("Admin {admin_id} set institution {institution_id} to {status}");
    Ok(Json(row))
}

/// Title and body of the notification an institution receives for a decision.
fn decision_notice(
    institution_name: &str,
    status: ApprovalStatus,
    remarks: Option<&str>,
) -> (&'static str, String) {
    let (title, mut message) = match status {
        ApprovalStatus::Approved => (
            "Registration approved",
            format!("{institution_name} has been approved. You can now post jobs."),
        ),
        _ => (
            "Registration rejected",
            format!("{institution_name} was not approved."),
        ),
    };
    if let Some(remarks) = remarks {
        message.push_str(&format!(" Remarks: {remarks}"));
    }
    (title, message)
}

/// GET /api/v1/admin/roles
pub async fn handle_roles(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<RoleWithPermissions>>, AppError> {
    Ok(Json(roles_with_permissions(&state.db).await?))
}

/// POST /api/v1/admin/zones
pub async fn handle_create_zone(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<ZoneRequest>,
) -> Result<(StatusCode, Json<Zone>), AppError> {
    let zone = create_zone(&state.db, &req.name).await?;
    info!("Created zone {}", zone.name);
    Ok((StatusCode::CREATED, Json(zone)))
}

/// DELETE /api/v1/admin/zones/:id
pub async fn handle_delete_zone(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_zone(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_notice_appends_remarks() {
        let (title, message) =
            decision_notice("Green Valley School", ApprovalStatus::Rejected, Some("Missing board details"));
        assert_eq!(title, "Registration rejected");
        assert_eq!(
            message,
            "Green Valley School was not approved. Remarks: Missing board details"
        );

        let (title, message) = decision_notice("Green Valley School", ApprovalStatus::Approved, None);
        assert_eq!(title, "Registration approved");
        assert!(message.ends_with("You can now post jobs."));
    }
}
