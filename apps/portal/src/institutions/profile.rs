use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::institutions::store::approval_history;
use crate::models::institution::{
    ApprovalRow, ContactType, InstitutionAddress, InstitutionCategory, InstitutionContact,
    InstitutionRow, InstitutionStrength,
};
use crate::models::non_empty;

#[derive(Debug, Serialize)]
pub struct InstitutionProfile {
    pub institution: InstitutionRow,
    pub address: InstitutionAddress,
    pub strength: InstitutionStrength,
    pub contacts: Vec<InstitutionContact>,
    pub approvals: Vec<ApprovalRow>,
}

/// Editable institution fields plus the nested sections. A section left out
/// of the request is not touched.
#[derive(Debug, Default, Deserialize)]
pub struct InstitutionProfileUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub board: Option<String>,
    pub year_established: Option<i32>,
    pub is_omeiat_member: Option<bool>,
    pub omeiat_member_since: Option<NaiveDate>,
    pub address: Option<InstitutionAddress>,
    pub strength: Option<InstitutionStrength>,
    pub contacts: Option<Vec<InstitutionContact>>,
}

pub fn apply_institution_update(
    institution: &mut InstitutionRow,
    update: &InstitutionProfileUpdate,
) -> Result<(), AppError> {
    if let Some(name) = &update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Institution name cannot be empty.".to_string()));
        }
        institution.name = name.to_string();
    }
    if let Some(category) = &update.category {
        institution.category = category.parse::<InstitutionCategory>()?.as_str().to_string();
    }
    if let Some(phone) = &update.phone {
        institution.phone = phone.trim().to_string();
    }
    if update.website.is_some() {
        institution.website = non_empty(update.website.clone());
    }
    if update.about.is_some() {
        institution.about = non_empty(update.about.clone());
    }
    if update.board.is_some() {
        institution.board = non_empty(update.board.clone());
    }
    if let Some(year) = update.year_established {
        if !(1800..=2100).contains(&year) {
            return Err(AppError::Validation(format!("Invalid year_established {year}")));
        }
        institution.year_established = Some(year);
    }
    if let Some(member) = update.is_omeiat_member {
        institution.is_omeiat_member = member;
        if !member {
            institution.omeiat_member_since = None;
        }
    }
    if update.omeiat_member_since.is_some() && institution.is_omeiat_member {
        institution.omeiat_member_since = update.omeiat_member_since;
    }
    if let Some(strength) = &update.strength {
        validate_strength(strength)?;
    }
    if let Some(contacts) = &update.contacts {
        for contact in contacts {
            contact.contact_type.parse::<ContactType>()?;
        }
    }
    Ok(())
}

fn validate_strength(strength: &InstitutionStrength) -> Result<(), AppError> {
    let counts = [
        strength.students_male,
        strength.students_female,
        strength.teachers_male,
        strength.teachers_female,
        strength.non_teaching_staff,
    ];
    if counts.iter().any(|n| *n < 0) {
        return Err(AppError::Validation("Strength counts cannot be negative.".to_string()));
    }
    Ok(())
}

/// Contacts with no name, phone or email are dropped.
pub fn reachable_contacts(contacts: &[InstitutionContact]) -> Vec<&InstitutionContact> {
    contacts.iter().filter(|c| !c.is_blank()).collect()
}

pub async fn load_institution_profile(
    pool: &PgPool,
    institution: InstitutionRow,
) -> Result<InstitutionProfile, AppError> {
    let address: Option<InstitutionAddress> = sqlx::query_as(
        "SELECT building_no, street, area, city, district, state, country, pincode \
         FROM institution_addresses WHERE institution_id = $1",
    )
    .bind(institution.id)
    .fetch_optional(pool)
    .await?;
    let strength: Option<InstitutionStrength> = sqlx::query_as(
        "SELECT students_male, students_female, teachers_male, teachers_female, non_teaching_staff \
         FROM institution_strengths WHERE institution_id = $1",
    )
    .bind(institution.id)
    .fetch_optional(pool)
    .await?;
    let contacts: Vec<InstitutionContact> = sqlx::query_as(
        "SELECT contact_type, name, phone, email FROM institution_contacts \
         WHERE institution_id = $1 ORDER BY contact_type, name",
    )
    .bind(institution.id)
    .fetch_all(pool)
    .await?;
    let approvals = approval_history(pool, institution.id).await?;

    Ok(InstitutionProfile {
        institution,
        address: address.unwrap_or_default(),
        strength: strength.unwrap_or_default(),
        contacts,
        approvals,
    })
}

/// Writes the institution row and every section present in `update` in one transaction.
pub async fn save_institution_profile(
    pool: &PgPool,
    institution: &InstitutionRow,
    update: &InstitutionProfileUpdate,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE institutions SET
            name = $2, category = $3, phone = $4, website = $5, about = $6, board = $7,
            year_established = $8, is_omeiat_member = $9, omeiat_member_since = $10, logo = $11
        WHERE id = $1
        "#,
    )
    .bind(institution.id)
    .bind(&institution.name)
    .bind(&institution.category)
    .bind(&institution.phone)
    .bind(&institution.website)
    .bind(&institution.about)
    .bind(&institution.board)
    .bind(institution.year_established)
    .bind(institution.is_omeiat_member)
    .bind(institution.omeiat_member_since)
    .bind(&institution.logo)
    .execute(&mut *tx)
    .await?;

    if let Some(address) = &update.address {
        sqlx::query(
            r#"
            INSERT INTO institution_addresses
                (institution_id, building_no, street, area, city, district, state, country, pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (institution_id) DO UPDATE SET
                building_no = EXCLUDED.building_no, street = EXCLUDED.street,
                area = EXCLUDED.area, city = EXCLUDED.city, district = EXCLUDED.district,
                state = EXCLUDED.state, country = EXCLUDED.country, pincode = EXCLUDED.pincode
            "#,
        )
        .bind(institution.id)
        .bind(&address.building_no)
        .bind(&address.street)
        .bind(&address.area)
        .bind(&address.city)
        .bind(&address.district)
        .bind(&address.state)
        .bind(&address.country)
        .bind(&address.pincode)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(strength) = &update.strength {
        sqlx::query(
            r#"
            INSERT INTO institution_strengths
                (institution_id, students_male, students_female, teachers_male, teachers_female, non_teaching_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (institution_id) DO UPDATE SET
                students_male = EXCLUDED.students_male, students_female = EXCLUDED.students_female,
                teachers_male = EXCLUDED.teachers_male, teachers_female = EXCLUDED.teachers_female,
                non_teaching_staff = EXCLUDED.non_teaching_staff
            "#,
        )
        .bind(institution.id)
        .bind(strength.students_male)
        .bind(strength.students_female)
        .bind(strength.teachers_male)
        .bind(strength.teachers_female)
        .bind(strength.non_teaching_staff)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(contacts) = &update.contacts {
        sqlx::query("DELETE FROM institution_contacts WHERE institution_id = $1")
            .bind(institution.id)
            .execute(&mut *tx)
            .await?;
        for contact in reachable_contacts(contacts) {
            sqlx::query(
                "INSERT INTO institution_contacts (institution_id, contact_type, name, phone, email) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(institution.id)
            .bind(contact.contact_type.trim())
            .bind(contact.name.trim())
            .bind(contact.phone.trim())
            .bind(contact.email.trim())
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

pub async fn set_logo(pool: &PgPool, institution_id: Uuid, key: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE institutions SET logo = $1 WHERE id = $2")
        .bind(key)
        .bind(institution_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InstitutionDashboard {
    pub job_count: i64,
    pub application_count: i64,
    pub shortlisted_count: i64,
}

pub async fn institution_dashboard(
    pool: &PgPool,
    institution_id: Uuid,
) -> Result<InstitutionDashboard, AppError> {
    let (job_count, application_count, shortlisted_count): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM jobs WHERE posted_by = $1),
            (SELECT COUNT(*) FROM job_applications WHERE institution_id = $1),
            (SELECT COUNT(*) FROM job_shortlist_users su
                JOIN job_shortlists s ON s.id = su.shortlist_id
                WHERE s.institution_id = $1)
        "#,
    )
    .bind(institution_id)
    .fetch_one(pool)
    .await?;
    Ok(InstitutionDashboard {
        job_count,
        application_count,
        shortlisted_count,
    })
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use chrono::Utc;

    pub fn approved_institution() -> InstitutionRow {
        InstitutionRow {
            id: Uuid::new_v4(),
            name: "Sunrise Public School".to_string(),
            category: "school".to_string(),
            email: "office@sunrise.example".to_string(),
            password_hash: String::new(),
            phone: "0441234567".to_string(),
            website: None,
            about: None,
            year_established: Some(1998),
            board: Some("CBSE".to_string()),
            is_omeiat_member: false,
            omeiat_member_since: None,
            logo: None,
            approval_status: "approved".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::approved_institution;
    use super::*;

    #[test]
    fn test_update_fields() {
        let mut inst = approved_institution();
        let update = InstitutionProfileUpdate {
            name: Some(" Sunrise Senior Secondary ".into()),
            category: Some("college".into()),
            website: Some(String::new()),
            is_omeiat_member: Some(true),
            omeiat_member_since: NaiveDate::from_ymd_opt(2020, 6, 1),
            ..Default::default()
        };
        apply_institution_update(&mut inst, &update).unwrap();
        assert_eq!(inst.name, "Sunrise Senior Secondary");
        assert_eq!(inst.category, "college");
        assert_eq!(inst.website, None);
        assert_eq!(inst.omeiat_member_since, NaiveDate::from_ymd_opt(2020, 6, 1));
    }

    #[test]
    fn test_leaving_membership_clears_since_date() {
        let mut inst = approved_institution();
        inst.is_omeiat_member = true;
        inst.omeiat_member_since = NaiveDate::from_ymd_opt(2019, 1, 1);
        let update = InstitutionProfileUpdate {
            is_omeiat_member: Some(false),
            ..Default::default()
        };
        apply_institution_update(&mut inst, &update).unwrap();
        assert_eq!(inst.omeiat_member_since, None);
    }

    #[test]
    fn test_rejects_bad_sections() {
        let mut inst = approved_institution();
        let bad_contact = InstitutionProfileUpdate {
            contacts: Some(vec![InstitutionContact {
                contact_type: "janitor".into(),
                name: "Ravi".into(),
                phone: String::new(),
                email: String::new(),
            }]),
            ..Default::default()
        };
        assert!(apply_institution_update(&mut inst, &bad_contact).is_err());

        let negative = InstitutionProfileUpdate {
            strength: Some(InstitutionStrength {
                students_male: -1,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(apply_institution_update(&mut inst, &negative).is_err());
    }

    #[test]
    fn test_strength_defaults_missing_counts() {
        let strength: InstitutionStrength =
            serde_json::from_str(r#"{"students_male": 120}"#).unwrap();
        assert_eq!(strength.students_male, 120);
        assert_eq!(strength.teachers_female, 0);
    }

    #[test]
    fn test_blank_contacts_dropped() {
        let contacts = vec![
            InstitutionContact {
                contact_type: "principal".into(),
                name: "Dr. Meera".into(),
                phone: String::new(),
                email: String::new(),
            },
            InstitutionContact {
                contact_type: "hr".into(),
                name: String::new(),
                phone: " ".into(),
                email: String::new(),
            },
        ];
        let kept = reachable_contacts(&contacts);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].contact_type, "principal");
    }
}
