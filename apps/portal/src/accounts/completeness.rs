use chrono::NaiveDate;
use serde::Serialize;

use crate::models::user::UserRow;

#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub percentage: i32,
    pub filled_fields: usize,
    pub total_fields: usize,
    pub missing_fields: Vec<&'static str>,
    pub recommendations: Vec<String>,
}

enum FieldValue<'a> {
    Text(Option<&'a str>),
    Number(Option<i32>),
    Date(Option<NaiveDate>),
}

impl FieldValue<'_> {
    /// NULL, blank text and numeric zero all count as "not filled in".
    fn is_filled(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_some_and(|s| !s.trim().is_empty()),
            FieldValue::Number(v) => v.is_some_and(|n| n != 0),
            FieldValue::Date(v) => v.is_some(),
        }
    }
}

/// Profile fields that count towards completion. Account plumbing (id,
/// credentials, email, username, flags, timestamps, visibility) is left out.
fn tracked_fields(user: &UserRow) -> [(&'static str, FieldValue<'_>); 19] {
    use FieldValue::{Date, Number, Text};
    [
        ("phone", Text(user.phone.as_deref())),
        ("gender", Text(user.gender.as_deref())),
        ("dob", Date(user.dob)),
        ("father_name", Text(user.father_name.as_deref())),
        ("spouse_name", Text(user.spouse_name.as_deref())),
        ("mother_tongue", Text(user.mother_tongue.as_deref())),
        ("qualification", Text(user.qualification.as_deref())),
        ("schooling", Text(user.schooling.as_deref())),
        ("languages_known", Text(user.languages_known.as_deref())),
        ("working_experience_years", Number(user.working_experience_years)),
        ("describing_experience", Text(user.describing_experience.as_deref())),
        ("last_salary", Number(user.last_salary)),
        ("expected_salary", Number(user.expected_salary)),
        ("reference_by_1", Text(user.reference_by_1.as_deref())),
        ("reference_by_2", Text(user.reference_by_2.as_deref())),
        ("joining_availability", Text(user.joining_availability.as_deref())),
        ("aim_of_life", Text(user.aim_of_life.as_deref())),
        ("about_family", Text(user.about_family.as_deref())),
        ("profile_picture", Text(user.profile_picture.as_deref())),
    ]
}

pub fn compute_profile_completion(user: &UserRow) -> CompletionReport {
    let fields = tracked_fields(user);
    let total_fields = fields.len();
    let missing_fields: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| !value.is_filled())
        .map(|(name, _)| *name)
        .collect();
    let filled_fields = total_fields - missing_fields.len();

    let percentage = if total_fields > 0 {
        (filled_fields * 100 / total_fields) as i32
    } else {
        0
    };

    let mut recommendations = Vec::new();
    if missing_fields.contains(&"profile_picture") {
        recommendations.push("Upload a profile picture so institutions can recognise you".to_string());
    }
    if missing_fields.contains(&"qualification") || missing_fields.contains(&"schooling") {
        recommendations.push("Add your qualification and schooling details".to_string());
    }
    if missing_fields.contains(&"working_experience_years") {
        recommendations.push("Tell institutions how many years of experience you have".to_string());
    }
    if missing_fields.contains(&"expected_salary") {
        recommendations.push("Set an expected salary to match relevant openings".to_string());
    }

    CompletionReport {
        percentage,
        filled_fields,
        total_fields,
        missing_fields,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::blank_user;

    fn full_user() -> UserRow {
        let mut u = blank_user();
        u.phone = Some("9876543210".into());
        u.gender = Some("female".into());
        u.dob = NaiveDate::from_ymd_opt(1995, 4, 12);
        u.father_name = Some("Mohan".into());
        u.spouse_name = Some("Kiran".into());
        u.mother_tongue = Some("Marathi".into());
        u.qualification = Some("M.Sc".into());
        u.schooling = Some("CBSE".into());
        u.languages_known = Some("English, Hindi".into());
        u.working_experience_years = Some(4);
        u.describing_experience = Some("Taught physics".into());
        u.last_salary = Some(30000);
        u.expected_salary = Some(40000);
        u.reference_by_1 = Some("Principal A".into());
        u.reference_by_2 = Some("HOD B".into());
        u.joining_availability = Some("Immediate".into());
        u.aim_of_life = Some("Teach".into());
        u.about_family = Some("Four members".into());
        u.profile_picture = Some("profiles/x.png".into());
        u
    }

    #[test]
    fn test_empty_profile_is_zero() {
        let report = compute_profile_completion(&blank_user());
        assert_eq!(report.percentage, 0);
        assert_eq!(report.filled_fields, 0);
        assert_eq!(report.missing_fields.len(), report.total_fields);
    }

    #[test]
    fn test_full_profile_is_hundred() {
        let report = compute_profile_completion(&full_user());
        assert_eq!(report.percentage, 100);
        assert!(report.missing_fields.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_percentage_is_floored() {
        let mut u = blank_user();
        u.phone = Some("1".into());
        u.gender = Some("male".into());
        // 2 of 19 = 10.52%
        assert_eq!(compute_profile_completion(&u).percentage, 10);
    }

    #[test]
    fn test_zero_and_blank_count_as_empty() {
        let mut u = blank_user();
        u.working_experience_years = Some(0);
        u.qualification = Some("   ".into());
        u.last_salary = Some(0);
        let report = compute_profile_completion(&u);
        assert_eq!(report.filled_fields, 0);
        assert!(report.missing_fields.contains(&"working_experience_years"));
    }

    #[test]
    fn test_account_fields_do_not_count() {
        let mut u = blank_user();
        u.verified = true;
        u.username = "someone".into();
        assert_eq!(compute_profile_completion(&u).percentage, 0);
    }

    #[test]
    fn test_recommendations_for_missing_picture() {
        let mut u = full_user();
        u.profile_picture = None;
        let report = compute_profile_completion(&u);
        assert_eq!(report.percentage, 94);
        assert_eq!(report.recommendations.len(), 1);
    }
}
