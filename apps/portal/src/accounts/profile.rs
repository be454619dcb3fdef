//! Job seeker profile: editable fields, address and the repeatable sections.
//! Every write recomputes and stores `profile_percentage`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::completeness::{compute_profile_completion, CompletionReport};
use crate::accounts::service::validate_username;
use crate::accounts::store::find_user_by_id;
use crate::errors::AppError;
use crate::models::non_empty;
use crate::models::user::{
    Education, Gender, Language, ProfileVisibility, Skill, UserAddress, UserRow, WorkExperience,
};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserRow,
    pub address: UserAddress,
    pub educations: Vec<Education>,
    pub experiences: Vec<WorkExperience>,
    pub skills: Vec<Skill>,
    pub languages: Vec<Language>,
    pub completion: CompletionReport,
}

/// Editable profile fields. Absent fields are left alone; empty strings clear.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub father_name: Option<String>,
    pub spouse_name: Option<String>,
    pub mother_tongue: Option<String>,
    pub qualification: Option<String>,
    pub schooling: Option<String>,
    pub languages_known: Option<String>,
    pub working_experience_years: Option<String>,
    pub describing_experience: Option<String>,
    pub last_salary: Option<String>,
    pub expected_salary: Option<String>,
    pub reference_by_1: Option<String>,
    pub reference_by_2: Option<String>,
    pub joining_availability: Option<String>,
    pub aim_of_life: Option<String>,
    pub about_family: Option<String>,
    pub profile_visibility: Option<String>,
}

/// Applies `update` onto `user` in memory, validating typed fields.
pub fn apply_profile_update(user: &mut UserRow, update: ProfileUpdate) -> Result<(), AppError> {
    if let Some(username) = update.username {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username cannot be empty.".to_string()));
        }
        validate_username(username)?;
        user.username = username.to_string();
    }
    if let Some(gender) = update.gender {
        user.gender = match non_empty(Some(gender)) {
            Some(g) => Some(g.to_lowercase().parse::<Gender>()?.as_str().to_string()),
            None => None,
        };
    }
    if let Some(visibility) = update.profile_visibility {
        user.profile_visibility = visibility.parse::<ProfileVisibility>()?.as_str().to_string();
    }
    if let Some(dob) = update.dob {
        user.dob = parse_optional_date(&dob, "dob")?;
    }
    if let Some(v) = update.working_experience_years {
        user.working_experience_years = parse_optional_number(&v, "working_experience_years")?;
    }
    if let Some(v) = update.last_salary {
        user.last_salary = parse_optional_number(&v, "last_salary")?;
    }
    if let Some(v) = update.expected_salary {
        user.expected_salary = parse_optional_number(&v, "expected_salary")?;
    }

    let text_fields = [
        (&mut user.phone, update.phone),
        (&mut user.father_name, update.father_name),
        (&mut user.spouse_name, update.spouse_name),
        (&mut user.mother_tongue, update.mother_tongue),
        (&mut user.qualification, update.qualification),
        (&mut user.schooling, update.schooling),
        (&mut user.languages_known, update.languages_known),
        (&mut user.describing_experience, update.describing_experience),
        (&mut user.reference_by_1, update.reference_by_1),
        (&mut user.reference_by_2, update.reference_by_2),
        (&mut user.joining_availability, update.joining_availability),
        (&mut user.aim_of_life, update.aim_of_life),
        (&mut user.about_family, update.about_family),
    ];
    for (slot, incoming) in text_fields {
        if incoming.is_some() {
            *slot = non_empty(incoming);
        }
    }
    Ok(())
}

pub fn parse_optional_date(raw: &str, field: &str) -> Result<Option<NaiveDate>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

pub fn parse_optional_number(raw: &str, field: &str) -> Result<Option<i32>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<i32>() {
        Ok(n) if n >= 0 => Ok(Some(n)),
        _ => Err(AppError::Validation(format!("{field} must be a non-negative whole number"))),
    }
}

pub async fn load_profile(pool: &PgPool, user: UserRow) -> Result<ProfileResponse, AppError> {
    let address: Option<UserAddress> = sqlx::query_as(
        "SELECT building_no, street, area, district, state, pincode FROM user_addresses WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_optional(pool)
    .await?;
    let educations: Vec<Education> = sqlx::query_as(
        "SELECT level, institution, degree, percentage FROM educations WHERE user_id = $1 ORDER BY level",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;
    let experiences: Vec<WorkExperience> = sqlx::query_as(
        "SELECT company, role, start_date, end_date, description FROM work_experiences \
         WHERE user_id = $1 ORDER BY start_date DESC NULLS LAST",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;
    let skills: Vec<Skill> =
        sqlx::query_as("SELECT name, level FROM skills WHERE user_id = $1 ORDER BY name")
            .bind(user.id)
            .fetch_all(pool)
            .await?;
    let languages: Vec<Language> =
        sqlx::query_as("SELECT name, proficiency FROM languages WHERE user_id = $1 ORDER BY name")
            .bind(user.id)
            .fetch_all(pool)
            .await?;

    let completion = compute_profile_completion(&user);
    Ok(ProfileResponse {
        user,
        address: address.unwrap_or_default(),
        educations,
        experiences,
        skills,
        languages,
        completion,
    })
}

/// Writes the in-memory user back and refreshes the stored percentage.
pub async fn save_profile(pool: &PgPool, user: &mut UserRow) -> Result<(), AppError> {
    user.profile_percentage = compute_profile_completion(user).percentage;
    sqlx::query(
        r#"
        UPDATE users SET
            username = $2, phone = $3, gender = $4, dob = $5, father_name = $6,
            spouse_name = $7, mother_tongue = $8, qualification = $9, schooling = $10,
            languages_known = $11, working_experience_years = $12, describing_experience = $13,
            last_salary = $14, expected_salary = $15, reference_by_1 = $16, reference_by_2 = $17,
            joining_availability = $18, aim_of_life = $19, about_family = $20,
            profile_picture = $21, profile_visibility = $22, profile_percentage = $23
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.phone)
    .bind(&user.gender)
    .bind(user.dob)
    .bind(&user.father_name)
    .bind(&user.spouse_name)
    .bind(&user.mother_tongue)
    .bind(&user.qualification)
    .bind(&user.schooling)
    .bind(&user.languages_known)
    .bind(user.working_experience_years)
    .bind(&user.describing_experience)
    .bind(user.last_salary)
    .bind(user.expected_salary)
    .bind(&user.reference_by_1)
    .bind(&user.reference_by_2)
    .bind(&user.joining_availability)
    .bind(&user.aim_of_life)
    .bind(&user.about_family)
    .bind(&user.profile_picture)
    .bind(&user.profile_visibility)
    .bind(user.profile_percentage)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recomputes the stored percentage from the current row; returns the new value.
pub async fn refresh_profile_percentage(pool: &PgPool, user_id: Uuid) -> Result<i32, AppError> {
    let user = find_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
    let percentage = compute_profile_completion(&user).percentage;
    if percentage != user.profile_percentage {
        sqlx::query("UPDATE users SET profile_percentage = $1 WHERE id = $2")
            .bind(percentage)
            .bind(user_id)
            .execute(pool)
            .await?;
    }
    Ok(percentage)
}

pub async fn upsert_address(pool: &PgPool, user_id: Uuid, address: &UserAddress) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO user_addresses (user_id, building_no, street, area, district, state, pincode)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE SET
            building_no = EXCLUDED.building_no, street = EXCLUDED.street, area = EXCLUDED.area,
            district = EXCLUDED.district, state = EXCLUDED.state, pincode = EXCLUDED.pincode
        "#,
    )
    .bind(user_id)
    .bind(&address.building_no)
    .bind(&address.street)
    .bind(&address.area)
    .bind(&address.district)
    .bind(&address.state)
    .bind(&address.pincode)
    .execute(pool)
    .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Repeatable sections: each PUT replaces the whole list in one transaction.
// Rows whose key field is blank are dropped, matching the profile form.
// ────────────────────────────────────────────────────────────────────────────

pub async fn replace_educations(pool: &PgPool, user_id: Uuid, rows: &[Education]) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM educations WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let mut kept = 0;
    for row in rows.iter().filter(|r| !r.institution.trim().is_empty()) {
        sqlx::query(
            "INSERT INTO educations (user_id, level, institution, degree, percentage) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(row.level.trim())
        .bind(row.institution.trim())
        .bind(row.degree.trim())
        .bind(row.percentage)
        .execute(&mut *tx)
        .await?;
        kept += 1;
    }
    tx.commit().await?;
    Ok(kept)
}

pub async fn replace_experiences(
    pool: &PgPool,
    user_id: Uuid,
    rows: &[WorkExperience],
) -> Result<usize, AppError> {
    for row in rows {
        if let (Some(start), Some(end)) = (row.start_date, row.end_date) {
            if end < start {
                return Err(AppError::Validation(format!(
                    "Experience '{}' ends before it starts",
                    row.role
                )));
            }
        }
    }
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM work_experiences WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let mut kept = 0;
    for row in rows.iter().filter(|r| !r.role.trim().is_empty()) {
        sqlx::query(
            "INSERT INTO work_experiences (user_id, company, role, start_date, end_date, description) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user_id)
        .bind(row.company.trim())
        .bind(row.role.trim())
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(&row.description)
        .execute(&mut *tx)
        .await?;
        kept += 1;
    }
    tx.commit().await?;
    Ok(kept)
}

pub async fn replace_skills(pool: &PgPool, user_id: Uuid, rows: &[Skill]) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM skills WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let mut kept = 0;
    for row in rows.iter().filter(|r| !r.name.trim().is_empty()) {
        sqlx::query("INSERT INTO skills (user_id, name, level) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(row.name.trim())
            .bind(row.level.trim())
            .execute(&mut *tx)
            .await?;
        kept += 1;
    }
    tx.commit().await?;
    Ok(kept)
}

pub async fn replace_languages(pool: &PgPool, user_id: Uuid, rows: &[Language]) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM languages WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    let mut kept = 0;
    for row in rows.iter().filter(|r| !r.name.trim().is_empty()) {
        sqlx::query("INSERT INTO languages (user_id, name, proficiency) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(row.name.trim())
            .bind(row.proficiency.trim())
            .execute(&mut *tx)
            .await?;
        kept += 1;
    }
    tx.commit().await?;
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::blank_user;

    #[test]
    fn test_empty_string_clears_field() {
        let mut user = blank_user();
        user.father_name = Some("Mohan".into());
        apply_profile_update(
            &mut user,
            ProfileUpdate {
                father_name: Some(String::new()),
                mother_tongue: Some(" Tamil ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(user.father_name, None);
        assert_eq!(user.mother_tongue.as_deref(), Some("Tamil"));
    }

    #[test]
    fn test_absent_fields_untouched() {
        let mut user = blank_user();
        user.schooling = Some("ICSE".into());
        apply_profile_update(&mut user, ProfileUpdate::default()).unwrap();
        assert_eq!(user.schooling.as_deref(), Some("ICSE"));
    }

    #[test]
    fn test_typed_fields_parse() {
        let mut user = blank_user();
        apply_profile_update(
            &mut user,
            ProfileUpdate {
                dob: Some("1994-02-28".into()),
                expected_salary: Some("45000".into()),
                gender: Some("Female".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(user.dob, NaiveDate::from_ymd_opt(1994, 2, 28));
        assert_eq!(user.expected_salary, Some(45000));
        assert_eq!(user.gender.as_deref(), Some("female"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut user = blank_user();
        let bad_date = ProfileUpdate {
            dob: Some("28/02/1994".into()),
            ..Default::default()
        };
        assert!(apply_profile_update(&mut user, bad_date).is_err());

        let negative = ProfileUpdate {
            last_salary: Some("-5".into()),
            ..Default::default()
        };
        assert!(apply_profile_update(&mut user, negative).is_err());

        let blank_username = ProfileUpdate {
            username: Some("  ".into()),
            ..Default::default()
        };
        assert!(apply_profile_update(&mut user, blank_username).is_err());

        let email_username = ProfileUpdate {
            username: Some("someone@example.com".into()),
            ..Default::default()
        };
        assert!(apply_profile_update(&mut user, email_username).is_err());
    }
}
