use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Query;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::accounts::session::{AdminUser, CurrentInstitution, CurrentUser};
use crate::admin::handlers::ADMIN_PAGE_SIZE;
use crate::applications::store::{
    applicant_status_counts, institution_status_counts, list_all_applications, list_applied_jobs,
    received_for_institution, received_for_job, set_application_status, submit_application,
    withdraw_application, AdminApplicationRow, ApplyRequest,
};
use crate::errors::AppError;
use crate::jobs::store::{application_stats, find_active_job, find_owned_job, owned_job_titles, JobApplicationStats};
use crate::models::application::{
    ApplicationRow, ApplicationStatus, AppliedJobRow, ReceivedApplicationRow, StatusCounts,
};
use crate::pagination::{Page, PageQuery};
use crate::shortlist::store::{shortlisted_pairs, shortlisted_user_ids};
use crate::state::AppState;

pub const MY_APPLICATIONS_PAGE_SIZE: i64 = 6;

#[derive(Serialize)]
pub struct MyApplicationsResponse {
    pub applications: Page<AppliedJobRow>,
    pub counts: StatusCounts,
}

/// A received application with the applicant's shortlist membership for that job.
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedApplication {
    #[serde(flatten)]
    pub application: ReceivedApplicationRow,
    pub is_shortlisted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobApplications {
    pub job_id: Uuid,
    pub job_title: String,
    pub shortlisted_count: usize,
    pub applications: Vec<ReceivedApplication>,
}

#[derive(Serialize)]
pub struct InstitutionApplicationsResponse {
    pub jobs: Vec<JobApplications>,
    pub counts: StatusCounts,
}

#[derive(Serialize)]
pub struct JobApplicationsResponse {
    pub job_id: Uuid,
    pub job_title: String,
    pub stats: JobApplicationStats,
    pub shortlisted_count: usize,
    pub applications: Vec<ReceivedApplication>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Groups applications under each posting (in `jobs` order) and marks
/// shortlisted applicants using the `(job_id, user_id)` pairs.
pub fn group_by_job(
    jobs: Vec<(Uuid, String)>,
    applications: Vec<ReceivedApplicationRow>,
    shortlisted: &[(Uuid, Uuid)],
) -> Vec<JobApplications> {
    let mut grouped: Vec<JobApplications> = jobs
        .into_iter()
        .map(|(job_id, job_title)| JobApplications {
            job_id,
            job_title,
            shortlisted_count: shortlisted.iter().filter(|(j, _)| *j == job_id).count(),
            applications: Vec::new(),
        })
        .collect();

    for application in applications {
        let Some(group) = grouped.iter_mut().find(|g| g.job_id == application.job_id) else {
            continue;
        };
        let is_shortlisted = shortlisted.contains(&(application.job_id, application.applicant_id));
        group.applications.push(ReceivedApplication {
            application,
            is_shortlisted,
        });
    }
    grouped
}

// ────────────────────────────────────────────────────────────────────────────
// Job seeker
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<Uuid>,
    body: Option<Json<ApplyRequest>>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    let Json(req) = body.unwrap_or_default();
    let job = find_active_job(&state.db, job_id).await?;
    let application = submit_application(
        &state.db,
        user.id,
        &user.username,
        &job,
        &req,
        Utc::now().date_naive(),
    )
    .await?;
    info!("User {} applied for job {job_id}", user.id);
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/me/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<MyApplicationsResponse>, AppError> {
    let applications = list_applied_jobs(
        &state.db,
        user.id,
        query.page.as_deref(),
        MY_APPLICATIONS_PAGE_SIZE,
    )
    .await?;
    let counts = applicant_status_counts(&state.db, user.id).await?;
    Ok(Json(MyApplicationsResponse {
        applications,
        counts,
    }))
}

/// DELETE /api/v1/me/applications/:id
pub async fn handle_withdraw(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    withdraw_application(&state.db, id, user.id).await?;
    info!("User {} withdrew application {id}", user.id);
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Institution
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/institutions/me/applications
pub async fn handle_institution_applications(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
) -> Result<Json<InstitutionApplicationsResponse>, AppError> {
    let jobs = owned_job_titles(&state.db, institution.id).await?;
    let applications = received_for_institution(&state.db, institution.id).await?;
    let pairs = shortlisted_pairs(&state.db, institution.id).await?;
    let counts = institution_status_counts(&state.db, institution.id).await?;
    Ok(Json(InstitutionApplicationsResponse {
        jobs: group_by_job(jobs, applications, &pairs),
        counts,
    }))
}

/// GET /api/v1/institutions/me/jobs/:id/applications
pub async fn handle_job_applications(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobApplicationsResponse>, AppError> {
    let job = find_owned_job(&state.db, job_id, institution.id).await?;
    let applications = received_for_job(&state.db, job.id).await?;
    let pairs: Vec<(Uuid, Uuid)> = shortlisted_user_ids(&state.db, job.id, institution.id)
        .await?
        .into_iter()
        .map(|user_id| (job.id, user_id))
        .collect();
    let stats = application_stats(&state.db, job.id).await?;

    let mut grouped = group_by_job(vec![(job.id, job.title)], applications, &pairs);
    let group = grouped
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;
    Ok(Json(JobApplicationsResponse {
        job_id: group.job_id,
        job_title: group.job_title,
        stats,
        shortlisted_count: group.shortlisted_count,
        applications: group.applications,
    }))
}

/// PATCH /api/v1/institutions/me/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let status: ApplicationStatus = req.status.parse()?;
    let application = set_application_status(&state.db, id, institution.id, status).await?;
    info!("Application {id} set to {status} by institution {}", institution.id);
    Ok(Json(application))
}

// ────────────────────────────────────────────────────────────────────────────
// Admin
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/applications
pub async fn handle_admin_applications(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<AdminApplicationRow>>, AppError> {
    Ok(Json(
        list_all_applications(&state.db, query.page.as_deref(), ADMIN_PAGE_SIZE).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received(job_id: Uuid, applicant_id: Uuid) -> ReceivedApplicationRow {
        ReceivedApplicationRow {
            id: Uuid::new_v4(),
            job_id,
            applicant_id,
            applicant_username: "anu".into(),
            applicant_email: "anu@example.com".into(),
            applicant_phone: None,
            status: "pending".into(),
            cover_letter: String::new(),
            communication_skills: None,
            technical_skills: None,
            experience: None,
            qualification: None,
            joining_availability: None,
            commute_distance_km: None,
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_job_marks_shortlisted() {
        let (job_a, job_b) = (Uuid::new_v4(), Uuid::new_v4());
        let (alice, bala) = (Uuid::new_v4(), Uuid::new_v4());
        let jobs = vec![(job_a, "PGT Physics".to_string()), (job_b, "Librarian".to_string())];
        let apps = vec![received(job_a, alice), received(job_a, bala), received(job_b, alice)];
        let shortlisted = vec![(job_a, bala)];

        let grouped = group_by_job(jobs, apps, &shortlisted);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].applications.len(), 2);
        assert_eq!(grouped[0].shortlisted_count, 1);
        assert!(!grouped[0].applications[0].is_shortlisted);
        assert!(grouped[0].applications[1].is_shortlisted);
        assert_eq!(grouped[1].applications.len(), 1);
        assert!(!grouped[1].applications[0].is_shortlisted);
    }

    #[test]
    fn test_group_by_job_keeps_jobs_without_applications() {
        let job = Uuid::new_v4();
        let grouped = group_by_job(vec![(job, "Clerk".into())], vec![], &[]);
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].applications.is_empty());
    }

    #[test]
    fn test_applications_for_unknown_jobs_dropped() {
        let grouped = group_by_job(vec![], vec![received(Uuid::new_v4(), Uuid::new_v4())], &[]);
        assert!(grouped.is_empty());
    }
}
