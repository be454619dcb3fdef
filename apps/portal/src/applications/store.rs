use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    ApplicationRow, ApplicationStatus, AppliedJobRow, ReceivedApplicationRow, StatusCounts,
};
use crate::models::job::JobRow;
use crate::models::non_empty;
use crate::notifications::store::{notify, Recipient};
use crate::pagination::{Page, PageWindow};

/// Days an application stays live after it is submitted.
pub const APPLICATION_LIFETIME_DAYS: i64 = 15;

const APPLICATION_COLUMNS: &str = r#"
    id, applicant_id, job_id, institution_id, status, cover_letter, communication_skills,
    technical_skills, experience, qualification, joining_availability, commute_distance_km,
    expire_date, applied_at
"#;

/// Optional screening answers sent with an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub cover_letter: String,
    pub communication_skills: Option<String>,
    pub technical_skills: Option<String>,
    pub experience: Option<String>,
    pub qualification: Option<String>,
    pub joining_availability: Option<String>,
    pub commute_distance_km: Option<i32>,
}

/// Checks that `job` still accepts applications on `today`.
pub fn ensure_accepting(job: &JobRow, today: NaiveDate) -> Result<(), AppError> {
    if !job.is_active {
        return Err(AppError::NotFound(format!("Job {} not found", job.id)));
    }
    if job.application_deadline.is_some_and(|deadline| deadline < today) {
        return Err(AppError::Validation(
            "The application deadline for this job has passed.".to_string(),
        ));
    }
    Ok(())
}

pub fn expiry_for(today: NaiveDate) -> NaiveDate {
    today + Duration::days(APPLICATION_LIFETIME_DAYS)
}

pub async fn has_applied(pool: &PgPool, applicant_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM job_applications WHERE applicant_id = $1 AND job_id = $2)",
    )
    .bind(applicant_id)
    .bind(job_id)
    .fetch_one(pool)
    .await?)
}

/// Records the application and tells the institution, in one transaction.
/// A second application to the same job is a conflict.
pub async fn submit_application(
    pool: &PgPool,
    applicant_id: Uuid,
    applicant_name: &str,
    job: &JobRow,
    req: &ApplyRequest,
    today: NaiveDate,
) -> Result<ApplicationRow, AppError> {
    ensure_accepting(job, today)?;
    if has_applied(pool, applicant_id, job.id).await? {
        return Err(AppError::Conflict(
            "You have already applied for this job.".to_string(),
        ));
    }
    if req.commute_distance_km.is_some_and(|km| km < 0) {
        return Err(AppError::Validation("Commute distance cannot be negative.".to_string()));
    }

    let mut tx = pool.begin().await?;
    let sql = format!(
        r#"
        INSERT INTO job_applications (
            applicant_id, job_id, institution_id, cover_letter, communication_skills,
            technical_skills, experience, qualification, joining_availability,
            commute_distance_km, expire_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {APPLICATION_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(applicant_id)
        .bind(job.id)
        .bind(job.posted_by)
        .bind(req.cover_letter.trim())
        .bind(non_empty(req.communication_skills.clone()))
        .bind(non_empty(req.technical_skills.clone()))
        .bind(non_empty(req.experience.clone()))
        .bind(non_empty(req.qualification.clone()))
        .bind(non_empty(req.joining_availability.clone()))
        .bind(req.commute_distance_km)
        .bind(expiry_for(today))
        .fetch_one(&mut *tx)
        .await?;

    notify(
        &mut *tx,
        Recipient::Institution(job.posted_by),
        "New application received",
        &format!("{applicant_name} applied for {}.", job.title),
    )
    .await?;
    tx.commit().await?;
    Ok(row)
}

pub async fn applicant_status_counts(pool: &PgPool, applicant_id: Uuid) -> Result<StatusCounts, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM job_applications WHERE applicant_id = $1 GROUP BY status",
    )
    .bind(applicant_id)
    .fetch_all(pool)
    .await?;
    Ok(StatusCounts::from_rows(&rows))
}

pub async fn institution_status_counts(pool: &PgPool, institution_id: Uuid) -> Result<StatusCounts, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM job_applications WHERE institution_id = $1 GROUP BY status",
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await?;
    Ok(StatusCounts::from_rows(&rows))
}

pub async fn list_applied_jobs(
    pool: &PgPool,
    applicant_id: Uuid,
    raw_page: Option<&str>,
    per_page: i64,
) -> Result<Page<AppliedJobRow>, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_applications WHERE applicant_id = $1")
        .bind(applicant_id)
        .fetch_one(pool)
        .await?;
    let window = PageWindow::resolve(raw_page, per_page, total);
    let items: Vec<AppliedJobRow> = sqlx::query_as(
        r#"
        SELECT a.id, a.job_id, j.title AS job_title, j.location AS job_location,
               i.name AS institution_name, a.status, a.applied_at, a.expire_date
        FROM job_applications a
        JOIN jobs j ON j.id = a.job_id
        JOIN institutions i ON i.id = a.institution_id
        WHERE a.applicant_id = $1
        ORDER BY a.applied_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(applicant_id)
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await?;
    Ok(Page::new(items, window, total))
}

/// Deletes the applicant's own application; anyone else's is reported missing.
pub async fn withdraw_application(pool: &PgPool, id: Uuid, applicant_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM job_applications WHERE id = $1 AND applicant_id = $2")
        .bind(id)
        .bind(applicant_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Application {id} not found")));
    }
    Ok(())
}

const RECEIVED_SELECT: &str = r#"
    SELECT a.id, a.job_id, a.applicant_id, u.username AS applicant_username,
           u.email AS applicant_email, u.phone AS applicant_phone, a.status, a.cover_letter,
           a.communication_skills, a.technical_skills, a.experience, a.qualification,
           a.joining_availability, a.commute_distance_km, a.applied_at
    FROM job_applications a
    JOIN users u ON u.id = a.applicant_id
"#;

pub async fn received_for_job(pool: &PgPool, job_id: Uuid) -> Result<Vec<ReceivedApplicationRow>, AppError> {
    let sql = format!("{RECEIVED_SELECT} WHERE a.job_id = $1 ORDER BY a.applied_at DESC");
    Ok(sqlx::query_as::<_, ReceivedApplicationRow>(&sql)
        .bind(job_id)
        .fetch_all(pool)
        .await?)
}

pub async fn received_for_institution(
    pool: &PgPool,
    institution_id: Uuid,
) -> Result<Vec<ReceivedApplicationRow>, AppError> {
    let sql = format!("{RECEIVED_SELECT} WHERE a.institution_id = $1 ORDER BY a.applied_at DESC");
    Ok(sqlx::query_as::<_, ReceivedApplicationRow>(&sql)
        .bind(institution_id)
        .fetch_all(pool)
        .await?)
}

/// Changes the status of an application to one of the institution's postings
/// and tells the applicant.
pub async fn set_application_status(
    pool: &PgPool,
    id: Uuid,
    institution_id: Uuid,
    status: ApplicationStatus,
) -> Result<ApplicationRow, AppError> {
    let mut tx = pool.begin().await?;
    let sql = format!(
        "UPDATE job_applications SET status = $1 WHERE id = $2 AND institution_id = $3 \
         RETURNING {APPLICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(status.as_str())
        .bind(id)
        .bind(institution_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;

    let job_title: String = sqlx::query_scalar("SELECT title FROM jobs WHERE id = $1")
        .bind(row.job_id)
        .fetch_one(&mut *tx)
        .await?;
    notify(
        &mut *tx,
        Recipient::User(row.applicant_id),
        "Application status updated",
        &status_message(&job_title, status),
    )
    .await?;
    tx.commit().await?;
    Ok(row)
}

pub fn status_message(job_title: &str, status: ApplicationStatus) -> String {
    match status {
        ApplicationStatus::Pending => format!("Your application for {job_title} is pending review."),
        ApplicationStatus::Shortlisted => {
            format!("Your application for {job_title} has been shortlisted.")
        }
        ApplicationStatus::Hired => format!("Congratulations! You have been hired for {job_title}."),
        ApplicationStatus::Rejected => {
            format!("Your application for {job_title} was not selected.")
        }
    }
}

/// An application as listed in the admin overview.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminApplicationRow {
    pub id: Uuid,
    pub applicant_username: String,
    pub job_title: String,
    pub institution_name: String,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub expire_date: Option<NaiveDate>,
}

pub async fn list_all_applications(
    pool: &PgPool,
    raw_page: Option<&str>,
    per_page: i64,
) -> Result<Page<AdminApplicationRow>, AppError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_applications")
        .fetch_one(pool)
        .await?;
    let window = PageWindow::resolve(raw_page, per_page, total);
    let items: Vec<AdminApplicationRow> = sqlx::query_as(
        r#"
        SELECT a.id, u.username AS applicant_username, j.title AS job_title,
               i.name AS institution_name, a.status, a.applied_at, a.expire_date
        FROM job_applications a
        JOIN users u ON u.id = a.applicant_id
        JOIN jobs j ON j.id = a.job_id
        JOIN institutions i ON i.id = a.institution_id
        ORDER BY a.applied_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(window.limit())
    .bind(window.offset())
    .fetch_all(pool)
    .await?;
    Ok(Page::new(items, window, total))
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    pub fn open_job(deadline: Option<NaiveDate>) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            posted_by: Uuid::new_v4(),
            institution_name: "Sunrise Public School".into(),
            title: "PGT Physics".into(),
            post: "PGT".into(),
            category: "teaching".into(),
            subcategory: String::new(),
            job_type: "full_time".into(),
            no_of_openings: 1,
            description: String::new(),
            min_salary: Some(30000),
            max_salary: Some(45000),
            experience_needed: Some(2),
            candidate_gender: "any".into(),
            qualifications_required: "M.Sc, B.Ed".into(),
            degree_required: String::new(),
            skills_required: vec![],
            location: "Chennai".into(),
            location_range_km: 0,
            application_deadline: deadline,
            interview_date: None,
            job_timing: String::new(),
            status: "open".into(),
            is_verified: true,
            is_active: true,
            timestamp: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::open_job;
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_deadline_today_still_open() {
        assert!(ensure_accepting(&open_job(Some(today())), today()).is_ok());
        assert!(ensure_accepting(&open_job(None), today()).is_ok());
    }

    #[test]
    fn test_past_deadline_rejected() {
        let job = open_job(NaiveDate::from_ymd_opt(2024, 5, 19));
        assert!(matches!(
            ensure_accepting(&job, today()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_inactive_job_not_found() {
        let mut job = open_job(None);
        job.is_active = false;
        assert!(matches!(ensure_accepting(&job, today()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_expiry_fifteen_days_out() {
        assert_eq!(expiry_for(today()), NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
    }

    #[test]
    fn test_status_messages_name_the_job() {
        let msg = status_message("PGT Physics", ApplicationStatus::Hired);
        assert!(msg.contains("PGT Physics"));
        assert!(msg.starts_with("Congratulations"));
    }
}
