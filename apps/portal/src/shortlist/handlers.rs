use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::accounts::session::CurrentInstitution;
use crate::errors::AppError;
use crate::jobs::store::find_owned_job;
use crate::models::user::CandidateSummary;
use crate::shortlist::store::{
    self, list_candidates, shortlist_count, BulkAddOutcome, ClearOutcome, ShortlistChange,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BulkAddRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct ShortlistResponse {
    pub job_id: Uuid,
    pub job_title: String,
    pub shortlisted_count: usize,
    pub candidates: Vec<CandidateSummary>,
}

#[derive(Serialize)]
pub struct ShortlistCountResponse {
    pub job_title: String,
    pub shortlisted_count: i64,
}

#[derive(Serialize)]
pub struct ShortlistStatusResponse {
    pub job_title: String,
    pub candidate_name: String,
    pub is_shortlisted: bool,
}

/// GET /api/v1/institutions/me/jobs/:id/shortlist
pub async fn handle_list(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let candidates = list_candidates(&state.db, job.id, institution.id).await?;
    Ok(Json(ShortlistResponse {
        job_id: job.id,
        job_title: job.title,
        shortlisted_count: candidates.len(),
        candidates,
    }))
}

/// GET /api/v1/institutions/me/jobs/:id/shortlist/count
pub async fn handle_count(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ShortlistCountResponse>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let shortlisted_count = shortlist_count(&state.db, job.id, institution.id).await?;
    Ok(Json(ShortlistCountResponse {
        job_title: job.title,
        shortlisted_count,
    }))
}

/// POST /api/v1/institutions/me/jobs/:id/shortlist/:user_id/toggle
pub async fn handle_toggle(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path((job_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ShortlistChange>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let change = store::toggle(&state.db, &job, user_id).await?;
    info!("Shortlist for job {job_id}: {}", change.message);
    Ok(Json(change))
}

/// PUT /api/v1/institutions/me/jobs/:id/shortlist/:user_id
pub async fn handle_add(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path((job_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ShortlistChange>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    Ok(Json(store::add(&state.db, &job, user_id).await?))
}

/// DELETE /api/v1/institutions/me/jobs/:id/shortlist/:user_id
pub async fn handle_remove(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path((job_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ShortlistChange>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    Ok(Json(store::remove(&state.db, &job, user_id).await?))
}

/// GET /api/v1/institutions/me/jobs/:id/shortlist/:user_id
pub async fn handle_status(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path((job_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ShortlistStatusResponse>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let (candidate_name, is_shortlisted) = store::status(&state.db, &job, user_id).await?;
    Ok(Json(ShortlistStatusResponse {
        job_title: job.title,
        candidate_name,
        is_shortlisted,
    }))
}

/// POST /api/v1/institutions/me/jobs/:id/shortlist/bulk
pub async fn handle_bulk_add(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(job_id): Path<Uuid>,
    Json(req): Json<BulkAddRequest>,
) -> Result<Json<BulkAddOutcome>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let outcome = store::bulk_add(&state.db, &job, &req.user_ids).await?;
    info!("Shortlist for job {job_id}: {}", outcome.message);
    Ok(Json(outcome))
}

/// DELETE /api/v1/institutions/me/jobs/:id/shortlist
pub async fn handle_clear(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ClearOutcome>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let outcome = store::clear(&state.db, &job).await?;
    info!("Shortlist for job {job_id}: {}", outcome.message);
    Ok(Json(outcome))
}
