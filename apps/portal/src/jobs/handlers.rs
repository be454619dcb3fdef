use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Query;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::session::{CurrentInstitution, MaybeUser};
use crate::applications::store::has_applied;
use crate::errors::AppError;
use crate::jobs::catalog::{category_counts, list_zones, recent_jobs, CategoryCount};
use crate::jobs::display::JobCard;
use crate::jobs::filters::{JobFilter, JobScope, EXPERIENCE_LEVELS, POSTED_OPTIONS};
use crate::jobs::store::{
    application_stats, delete_job, find_active_job, find_owned_job, insert_job, search_jobs,
    update_job, JobApplicationStats, JobInput, JobWrite,
};
use crate::models::job::JobRow;
use crate::models::zone::Zone;
use crate::pagination::Page;
use crate::shortlist::store::shortlist_count;
use crate::state::AppState;

pub const PUBLIC_PAGE_SIZE: i64 = 10;
pub const OWN_JOBS_PAGE_SIZE: i64 = 6;

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Page<JobCard>,
    /// The filters as received, so a form can be re-filled.
    pub selected: JobFilter,
    pub filtered: bool,
    pub experience_levels: [&'static str; 4],
    pub posted_options: [&'static str; 6],
}

#[derive(Serialize)]
pub struct JobDetailResponse {
    pub job: JobCard,
    pub has_applied: bool,
}

#[derive(Serialize)]
pub struct OwnJobResponse {
    pub job: JobCard,
    pub stats: JobApplicationStats,
    pub shortlisted_count: i64,
}

#[derive(Serialize)]
pub struct JobCreatedResponse {
    pub id: Uuid,
}

fn to_cards(page: Page<JobRow>) -> Page<JobCard> {
    let now = Utc::now();
    page.map(|job| JobCard::new(job, now))
}

pub(crate) async fn public_listing(state: &AppState, filter: JobFilter) -> Result<JobListResponse, AppError> {
    let page = search_jobs(
        &state.db,
        &filter,
        JobScope::Public,
        PUBLIC_PAGE_SIZE,
        Utc::now().date_naive(),
    )
    .await?;
    Ok(JobListResponse {
        jobs: to_cards(page),
        filtered: !filter.is_empty(),
        selected: filter,
        experience_levels: EXPERIENCE_LEVELS,
        posted_options: POSTED_OPTIONS,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Public
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<JobListResponse>, AppError> {
    Ok(Json(public_listing(&state, filter).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let job = find_active_job(&state.db, id).await?;
    let has_applied = match user {
        Some(user) => has_applied(&state.db, user.id, id).await?,
        None => false,
    };
    Ok(Json(JobDetailResponse {
        job: JobCard::new(job, Utc::now()),
        has_applied,
    }))
}

/// GET /api/v1/jobs/categories
pub async fn handle_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>, AppError> {
    Ok(Json(category_counts(&state.db).await?))
}

/// GET /api/v1/jobs/recent
pub async fn handle_recent_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobCard>>, AppError> {
    let now = Utc::now();
    let jobs = recent_jobs(&state.db).await?;
    Ok(Json(jobs.into_iter().map(|job| JobCard::new(job, now)).collect()))
}

/// GET /api/v1/zones
pub async fn handle_zones(State(state): State<AppState>) -> Result<Json<Vec<Zone>>, AppError> {
    Ok(Json(list_zones(&state.db).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Institution-owned postings
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/institutions/me/jobs
pub async fn handle_my_jobs(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Page<JobCard>>, AppError> {
    let page = search_jobs(
        &state.db,
        &filter,
        JobScope::PostedBy(institution.id),
        OWN_JOBS_PAGE_SIZE,
        Utc::now().date_naive(),
    )
    .await?;
    Ok(Json(to_cards(page)))
}

/// POST /api/v1/institutions/me/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Json(input): Json<JobInput>,
) -> Result<(StatusCode, Json<JobCreatedResponse>), AppError> {
    if !institution.is_approved() {
        return Err(AppError::Forbidden(
            "Your institution must be approved before posting jobs.".to_string(),
        ));
    }
    let job = input.validate(JobWrite::Create, Utc::now().date_naive())?;
    let id = insert_job(&state.db, institution.id, &job).await?;
    info!("Institution {} posted job {id}", institution.id);
    Ok((StatusCode::CREATED, Json(JobCreatedResponse { id })))
}

/// GET /api/v1/institutions/me/jobs/:id
pub async fn handle_get_own_job(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(id): Path<Uuid>,
) -> Result<Json<OwnJobResponse>, AppError> {
    let job = find_owned_job(&state.db, id, institution.id).await?;
    let stats = application_stats(&state.db, id).await?;
    let shortlisted_count = shortlist_count(&state.db, id, institution.id).await?;
    Ok(Json(OwnJobResponse {
        job: JobCard::new(job, Utc::now()),
        stats,
        shortlisted_count,
    }))
}

/// PUT /api/v1/institutions/me/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(id): Path<Uuid>,
    Json(input): Json<JobInput>,
) -> Result<Json<JobCard>, AppError> {
    let job = input.validate(JobWrite::Update, Utc::now().date_naive())?;
    update_job(&state.db, id, institution.id, &job).await?;
    let updated = find_owned_job(&state.db, id, institution.id).await?;
    info!("Institution {} updated job {id}", institution.id);
    Ok(Json(JobCard::new(updated, Utc::now())))
}

/// DELETE /api/v1/institutions/me/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_job(&state.db, id, institution.id).await?;
    info!("Institution {} deleted job {id}", institution.id);
    Ok(StatusCode::NO_CONTENT)
}
