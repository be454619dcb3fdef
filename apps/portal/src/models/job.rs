use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum JobCategory {
        Teaching => "teaching",
        NonTeaching => "non-teaching",
        Admin => "admin",
        Technical => "technical",
        Support => "support",
        Medical => "medical",
    }
}

impl JobCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            JobCategory::Teaching => "Teaching",
            JobCategory::NonTeaching => "Non-Teaching",
            JobCategory::Admin => "Administration",
            JobCategory::Technical => "Technical",
            JobCategory::Support => "Support Staff",
            JobCategory::Medical => "Medical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            JobCategory::Teaching => "fa-chalkboard-teacher",
            JobCategory::NonTeaching => "fa-user-tie",
            JobCategory::Admin => "fa-users-cog",
            JobCategory::Technical => "fa-laptop-code",
            JobCategory::Support => "fa-headset",
            JobCategory::Medical => "fa-user-md",
        }
    }
}

text_enum! {
    pub enum JobType {
        FullTime => "full_time",
        PartTime => "part_time",
        Contract => "contract",
        Remote => "remote",
        Freelance => "freelance",
        Internship => "internship",
    }
}

impl JobType {
    pub fn display_name(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full Time",
            JobType::PartTime => "Part Time",
            JobType::Contract => "Contract",
            JobType::Remote => "Remote",
            JobType::Freelance => "Freelance",
            JobType::Internship => "Internship",
        }
    }
}

text_enum! {
    pub enum JobStatus {
        Open => "open",
        Closed => "closed",
        Pending => "pending",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum CandidateGender {
        Any => "any",
        Male => "male",
        Female => "female",
    }
}

/// A job posting with the posting institution's name joined in.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub institution_name: String,
    pub title: String,
    pub post: String,
    pub category: String,
    pub subcategory: String,
    pub job_type: String,
    pub no_of_openings: i32,
    pub description: String,
    pub min_salary: Option<i32>,
    pub max_salary: Option<i32>,
    pub experience_needed: Option<i32>,
    pub candidate_gender: String,
    pub qualifications_required: String,
    pub degree_required: String,
    pub skills_required: Vec<String>,
    pub location: String,
    pub location_range_km: i32,
    pub application_deadline: Option<NaiveDate>,
    pub interview_date: Option<NaiveDate>,
    pub job_timing: String,
    pub status: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SELECT list + FROM clause shared by every `JobRow` query.
pub const JOB_SELECT: &str = r#"
    SELECT j.id, j.posted_by, i.name AS institution_name, j.title, j.post, j.category,
           j.subcategory, j.job_type, j.no_of_openings, j.description, j.min_salary,
           j.max_salary, j.experience_needed, j.candidate_gender, j.qualifications_required,
           j.degree_required, j.skills_required, j.location, j.location_range_km,
           j.application_deadline, j.interview_date, j.job_timing, j.status, j.is_verified,
           j.is_active, j.timestamp, j.updated_at
    FROM jobs j
    JOIN institutions i ON i.id = j.posted_by
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_spelling_matches_storage() {
        assert_eq!(JobCategory::NonTeaching.as_str(), "non-teaching");
        assert_eq!(
            "non-teaching".parse::<JobCategory>().unwrap(),
            JobCategory::NonTeaching
        );
        assert_eq!(JobCategory::ALL.len(), 6);
    }

    #[test]
    fn test_job_type_display() {
        assert_eq!(JobType::FullTime.display_name(), "Full Time");
        assert!("Full Time".parse::<JobType>().is_err());
    }
}
