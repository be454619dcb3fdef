use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

text_enum! {
    pub enum ProfileVisibility {
        Public => "public",
        Hide => "hide",
    }
}

/// A job seeker or admin account. Role name is joined in from `roles`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub role: String,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub father_name: Option<String>,
    pub spouse_name: Option<String>,
    pub mother_tongue: Option<String>,
    pub qualification: Option<String>,
    pub schooling: Option<String>,
    pub languages_known: Option<String>,
    pub working_experience_years: Option<i32>,
    pub describing_experience: Option<String>,
    pub last_salary: Option<i32>,
    pub expected_salary: Option<i32>,
    pub reference_by_1: Option<String>,
    pub reference_by_2: Option<String>,
    pub joining_availability: Option<String>,
    pub aim_of_life: Option<String>,
    pub about_family: Option<String>,
    pub profile_picture: Option<String>,
    pub profile_percentage: i32,
    pub profile_visibility: String,
    #[serde(skip_serializing)]
    pub registration_otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_attempts: i32,
    pub verified: bool,
    pub is_deleted: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Columns selected for every `UserRow` query; joins `roles` for the name.
pub const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.password_hash, u.phone, u.role_id, r.name AS role,
    u.gender, u.dob, u.father_name, u.spouse_name, u.mother_tongue, u.qualification,
    u.schooling, u.languages_known, u.working_experience_years, u.describing_experience,
    u.last_salary, u.expected_salary, u.reference_by_1, u.reference_by_2,
    u.joining_availability, u.aim_of_life, u.about_family, u.profile_picture,
    u.profile_percentage, u.profile_visibility, u.registration_otp, u.otp_expires_at,
    u.otp_attempts, u.verified, u.is_deleted, u.last_login, u.created_at
"#;

/// Public view of a candidate shown to institutions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub qualification: Option<String>,
    pub working_experience_years: Option<i32>,
    pub profile_percentage: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct UserAddress {
    pub building_no: Option<String>,
    pub street: Option<String>,
    pub area: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Education {
    pub level: String,
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkExperience {
    #[serde(default)]
    pub company: String,
    pub role: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub name: String,
    #[serde(default)]
    pub proficiency: String,
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A freshly registered job seeker with an empty profile.
    pub fn blank_user() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: String::new(),
            phone: None,
            role_id: Uuid::new_v4(),
            role: "job_seeker".to_string(),
            gender: None,
            dob: None,
            father_name: None,
            spouse_name: None,
            mother_tongue: None,
            qualification: None,
            schooling: None,
            languages_known: None,
            working_experience_years: None,
            describing_experience: None,
            last_salary: None,
            expected_salary: None,
            reference_by_1: None,
            reference_by_2: None,
            joining_availability: None,
            aim_of_life: None,
            about_family: None,
            profile_picture: None,
            profile_percentage: 0,
            profile_visibility: "public".to_string(),
            registration_otp: None,
            otp_expires_at: None,
            otp_attempts: 0,
            verified: false,
            is_deleted: false,
            last_login: None,
            created_at: Utc::now(),
        }
    }
}
