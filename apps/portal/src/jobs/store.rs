use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::filters::{JobFilter, JobScope};
use crate::models::job::{CandidateGender, JobCategory, JobRow, JobStatus, JobType, JOB_SELECT};
use crate::models::non_empty;
use crate::pagination::{Page, PageWindow};

/// Body of a create or update request for a posting.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInput {
    pub title: String,
    pub post: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub job_type: String,
    pub no_of_openings: Option<i32>,
    pub description: Option<String>,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub experience_needed: Option<i32>,
    pub candidate_gender: Option<String>,
    pub qualifications_required: Option<String>,
    pub degree_required: Option<String>,
    #[serde(default)]
    pub skills_required: Vec<String>,
    pub location: String,
    pub location_range_km: Option<i32>,
    pub application_deadline: Option<NaiveDate>,
    pub interview_date: Option<NaiveDate>,
    pub job_timing: Option<String>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
}

/// A checked posting ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidJob {
    pub title: String,
    pub post: String,
    pub category: JobCategory,
    pub subcategory: String,
    pub job_type: JobType,
    pub no_of_openings: i32,
    pub description: String,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub experience_needed: Option<i32>,
    pub candidate_gender: CandidateGender,
    pub qualifications_required: String,
    pub degree_required: String,
    pub skills_required: Vec<String>,
    pub location: String,
    pub location_range_km: i32,
    pub application_deadline: Option<NaiveDate>,
    pub interview_date: Option<NaiveDate>,
    pub job_timing: String,
    pub status: JobStatus,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobWrite {
    Create,
    Update,
}

impl JobInput {
    /// Applies defaults and rejects inconsistent postings. On update a missing
    /// deadline falls back to `today`.
    pub fn validate(self, mode: JobWrite, today: NaiveDate) -> Result<ValidJob, AppError> {
        let title = self.title.trim().to_string();
        let location = self.location.trim().to_string();
        if title.is_empty() || location.is_empty() {
            return Err(AppError::Validation("Title and location are required.".to_string()));
        }

        let no_of_openings = self.no_of_openings.unwrap_or(1);
        if no_of_openings < 1 {
            return Err(AppError::Validation("Number of openings must be at least 1.".to_string()));
        }
        let location_range_km = self.location_range_km.unwrap_or(0);
        if location_range_km < 0 {
            return Err(AppError::Validation("Location range cannot be negative.".to_string()));
        }
        if self.experience_needed.is_some_and(|y| y < 0) {
            return Err(AppError::Validation("Experience cannot be negative.".to_string()));
        }
        if let (Some(lo), Some(hi)) = (self.min_salary, self.max_salary) {
            if lo > hi {
                return Err(AppError::Validation(
                    "Minimum salary cannot exceed maximum salary.".to_string(),
                ));
            }
        }

        let candidate_gender = match non_empty(self.candidate_gender) {
            Some(g) => g.parse()?,
            None => CandidateGender::Any,
        };
        let status = match non_empty(self.status) {
            Some(s) => s.parse()?,
            None => JobStatus::Open,
        };
        let application_deadline = match (self.application_deadline, mode) {
            (None, JobWrite::Update) => Some(today),
            (deadline, _) => deadline,
        };
        let skills_required = self
            .skills_required
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(ValidJob {
            title,
            post: self.post.unwrap_or_default().trim().to_string(),
            category: self.category.parse()?,
            subcategory: self.subcategory.unwrap_or_default().trim().to_string(),
            job_type: self.job_type.parse()?,
            no_of_openings,
            description: self.description.unwrap_or_default(),
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            experience_needed: self.experience_needed,
            candidate_gender,
            qualifications_required: self.qualifications_required.unwrap_or_default(),
            degree_required: self.degree_required.unwrap_or_default(),
            skills_required,
            location,
            location_range_km,
            application_deadline,
            interview_date: self.interview_date,
            job_timing: self.job_timing.unwrap_or_default(),
            status,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

pub async fn find_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>, AppError> {
    let sql = format!("{JOB_SELECT} WHERE j.id = $1");
    Ok(sqlx::query_as::<_, JobRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_active_job(pool: &PgPool, id: Uuid) -> Result<JobRow, AppError> {
    find_job(pool, id)
        .await?
        .filter(|job| job.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// A posting owned by `institution_id`. Other institutions' postings are
/// reported as missing.
pub async fn find_owned_job(pool: &PgPool, id: Uuid, institution_id: Uuid) -> Result<JobRow, AppError> {
    find_job(pool, id)
        .await?
        .filter(|job| job.posted_by == institution_id)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

pub async fn insert_job(pool: &PgPool, institution_id: Uuid, job: &ValidJob) -> Result<Uuid, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO jobs (
            posted_by, title, post, category, subcategory, job_type, no_of_openings, description,
            min_salary, max_salary, experience_needed, candidate_gender, qualifications_required,
            degree_required, skills_required, location, location_range_km, application_deadline,
            interview_date, job_timing, status, is_active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        RETURNING id
        "#,
    )
    .bind(institution_id)
    .bind(&job.title)
    .bind(&job.post)
    .bind(job.category.as_str())
    .bind(&job.subcategory)
    .bind(job.job_type.as_str())
    .bind(job.no_of_openings)
    .bind(&job.description)
    .bind(job.min_salary)
    .bind(job.max_salary)
    .bind(job.experience_needed)
    .bind(job.candidate_gender.as_str())
    .bind(&job.qualifications_required)
    .bind(&job.degree_required)
    .bind(&job.skills_required)
    .bind(&job.location)
    .bind(job.location_range_km)
    .bind(job.application_deadline)
    .bind(job.interview_date)
    .bind(&job.job_timing)
    .bind(job.status.as_str())
    .bind(job.is_active)
    .fetch_one(pool)
    .await?)
}

pub async fn update_job(pool: &PgPool, id: Uuid, institution_id: Uuid, job: &ValidJob) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE jobs SET
            title = $3, post = $4, category = $5, subcategory = $6, job_type = $7,
            no_of_openings = $8, description = $9, min_salary = $10, max_salary = $11,
            experience_needed = $12, candidate_gender = $13, qualifications_required = $14,
            degree_required = $15, skills_required = $16, location = $17, location_range_km = $18,
            application_deadline = $19, interview_date = $20, job_timing = $21, status = $22,
            is_active = $23, updated_at = NOW()
        WHERE id = $1 AND posted_by = $2
        "#,
    )
    .bind(id)
    .bind(institution_id)
    .bind(&job.title)
    .bind(&job.post)
    .bind(job.category.as_str())
    .bind(&job.subcategory)
    .bind(job.job_type.as_str())
    .bind(job.no_of_openings)
    .bind(&job.description)
    .bind(job.min_salary)
    .bind(job.max_salary)
    .bind(job.experience_needed)
    .bind(job.candidate_gender.as_str())
    .bind(&job.qualifications_required)
    .bind(&job.degree_required)
    .bind(&job.skills_required)
    .bind(&job.location)
    .bind(job.location_range_km)
    .bind(job.application_deadline)
    .bind(job.interview_date)
    .bind(&job.job_timing)
    .bind(job.status.as_str())
    .bind(job.is_active)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(())
}

/// Applications and shortlists go with the posting (ON DELETE CASCADE).
pub async fn delete_job(pool: &PgPool, id: Uuid, institution_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = $1 AND posted_by = $2")
        .bind(id)
        .bind(institution_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    Ok(())
}

/// Filtered, newest-first page of postings visible under `scope`.
pub async fn search_jobs(
    pool: &PgPool,
    filter: &JobFilter,
    scope: JobScope,
    per_page: i64,
    today: NaiveDate,
) -> Result<Page<JobRow>, AppError> {
    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM jobs j JOIN institutions i ON i.id = j.posted_by");
    filter.push_where(&mut count_qb, scope, today);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let window = PageWindow::resolve(filter.page.as_deref(), per_page, total);
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(JOB_SELECT);
    filter.push_where(&mut qb, scope, today);
    qb.push(" ORDER BY j.timestamp DESC LIMIT ")
        .push_bind(window.limit())
        .push(" OFFSET ")
        .push_bind(window.offset());
    let items = qb.build_query_as::<JobRow>().fetch_all(pool).await?;

    Ok(Page::new(items, window, total))
}

/// `(id, title)` of every posting by the institution, newest first.
pub async fn owned_job_titles(pool: &PgPool, institution_id: Uuid) -> Result<Vec<(Uuid, String)>, AppError> {
    Ok(sqlx::query_as("SELECT id, title FROM jobs WHERE posted_by = $1 ORDER BY timestamp DESC")
        .bind(institution_id)
        .fetch_all(pool)
        .await?)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct JobApplicationStats {
    pub total: i64,
    pub shortlisted: i64,
    pub hired: i64,
    pub rejected: i64,
}

pub async fn application_stats(pool: &PgPool, job_id: Uuid) -> Result<JobApplicationStats, AppError> {
    let (total, shortlisted, hired, rejected): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status = 'shortlisted'),
            COUNT(*) FILTER (WHERE status = 'hired'),
            COUNT(*) FILTER (WHERE status = 'rejected')
        FROM job_applications
        WHERE job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_one(pool)
    .await?;
    Ok(JobApplicationStats {
        total,
        shortlisted,
        hired,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> JobInput {
        JobInput {
            title: " PGT Physics ".into(),
            category: "teaching".into(),
            job_type: "full_time".into(),
            location: "Chennai".into(),
            skills_required: vec!["Physics".into(), " ".into(), "Lab work ".into()],
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_defaults_on_create() {
        let job = input().validate(JobWrite::Create, today()).unwrap();
        assert_eq!(job.title, "PGT Physics");
        assert_eq!(job.no_of_openings, 1);
        assert_eq!(job.location_range_km, 0);
        assert_eq!(job.candidate_gender, CandidateGender::Any);
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.application_deadline, None);
        assert!(job.is_active);
        assert_eq!(job.skills_required, vec!["Physics", "Lab work"]);
    }

    #[test]
    fn test_update_defaults_deadline_to_today() {
        let job = input().validate(JobWrite::Update, today()).unwrap();
        assert_eq!(job.application_deadline, Some(today()));

        let mut explicit = input();
        explicit.application_deadline = NaiveDate::from_ymd_opt(2024, 6, 30);
        let job = explicit.validate(JobWrite::Update, today()).unwrap();
        assert_eq!(job.application_deadline, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_required_fields() {
        let mut missing = input();
        missing.location = "  ".into();
        assert!(matches!(
            missing.validate(JobWrite::Create, today()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut salary = input();
        salary.min_salary = Some(50000);
        salary.max_salary = Some(20000);
        assert!(salary.validate(JobWrite::Create, today()).is_err());

        let mut category = input();
        category.category = "sports".into();
        assert!(category.validate(JobWrite::Create, today()).is_err());

        let mut openings = input();
        openings.no_of_openings = Some(0);
        assert!(openings.validate(JobWrite::Create, today()).is_err());
    }
}
