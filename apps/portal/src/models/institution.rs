use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum InstitutionCategory {
        School => "school",
        College => "college",
        University => "university",
        TrainingCenter => "training_center",
        Coaching => "coaching",
        Other => "other",
    }
}

text_enum! {
    pub enum ContactType {
        Principal => "principal",
        Hr => "hr",
        Admin => "admin",
        Other => "other",
    }
}

text_enum! {
    pub enum ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InstitutionRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub website: Option<String>,
    pub about: Option<String>,
    pub year_established: Option<i32>,
    pub board: Option<String>,
    pub is_omeiat_member: bool,
    pub omeiat_member_since: Option<NaiveDate>,
    pub logo: Option<String>,
    pub approval_status: String,
    pub created_at: DateTime<Utc>,
}

impl InstitutionRow {
    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved.as_str()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct InstitutionAddress {
    pub building_no: Option<String>,
    pub street: Option<String>,
    pub area: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
}

/// Headcounts; counts missing from a request default to 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct InstitutionStrength {
    pub students_male: i32,
    pub students_female: i32,
    pub teachers_male: i32,
    pub teachers_female: i32,
    pub non_teaching_staff: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InstitutionContact {
    pub contact_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl InstitutionContact {
    /// A contact row is worth keeping only if it carries some way to reach someone.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.phone.trim().is_empty() && self.email.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApprovalRow {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub status: String,
    pub remarks: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_contact() {
        let blank = InstitutionContact {
            contact_type: "hr".into(),
            name: " ".into(),
            phone: String::new(),
            email: String::new(),
        };
        assert!(blank.is_blank());
        let reachable = InstitutionContact {
            phone: "9876543210".into(),
            ..blank
        };
        assert!(!reachable.is_blank());
    }
}
