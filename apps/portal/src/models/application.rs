use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum ApplicationStatus {
        Pending => "pending",
        Shortlisted => "shortlisted",
        Hired => "hired",
        Rejected => "rejected",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub applicant_id: Uuid,
    pub job_id: Uuid,
    pub institution_id: Uuid,
    pub status: String,
    pub cover_letter: String,
    pub communication_skills: Option<String>,
    pub technical_skills: Option<String>,
    pub experience: Option<String>,
    pub qualification: Option<String>,
    pub joining_availability: Option<String>,
    pub commute_distance_km: Option<i32>,
    pub expire_date: Option<NaiveDate>,
    pub applied_at: DateTime<Utc>,
}

/// An application joined with the job and institution it targets,
/// as listed on a job seeker's "applied jobs" page.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AppliedJobRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_location: String,
    pub institution_name: String,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub expire_date: Option<NaiveDate>,
}

/// An application joined with the applicant, as seen by the institution.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceivedApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub applicant_username: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub status: String,
    pub cover_letter: String,
    pub communication_skills: Option<String>,
    pub technical_skills: Option<String>,
    pub experience: Option<String>,
    pub qualification: Option<String>,
    pub joining_availability: Option<String>,
    pub commute_distance_km: Option<i32>,
    pub applied_at: DateTime<Utc>,
}

/// Per-status counters, the shape every dashboard reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub shortlisted: i64,
    pub hired: i64,
    pub rejected: i64,
    pub total: i64,
}

impl StatusCounts {
    /// Folds `(status, count)` rows from a GROUP BY; unknown statuses only add to the total.
    pub fn from_rows(rows: &[(String, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.total += n;
            match status.parse::<ApplicationStatus>() {
                Ok(ApplicationStatus::Pending) => counts.pending += n,
                Ok(ApplicationStatus::Shortlisted) => counts.shortlisted += n,
                Ok(ApplicationStatus::Hired) => counts.hired += n,
                Ok(ApplicationStatus::Rejected) => counts.rejected += n,
                Err(_) => {}
            }
        }
        counts
    }

    /// Labels and values in display order, for the dashboard chart.
    pub fn chart(&self) -> (Vec<&'static str>, Vec<i64>) {
        (
            vec!["Pending", "Shortlisted", "Hired", "Rejected"],
            vec![self.pending, self.shortlisted, self.hired, self.rejected],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_from_rows() {
        let rows = vec![
            ("pending".to_string(), 3),
            ("hired".to_string(), 1),
            ("withdrawn".to_string(), 2),
        ];
        let counts = StatusCounts::from_rows(&rows);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.hired, 1);
        assert_eq!(counts.shortlisted, 0);
        assert_eq!(counts.total, 6);
    }

    #[test]
    fn test_chart_order() {
        let counts = StatusCounts {
            pending: 1,
            shortlisted: 2,
            hired: 3,
            rejected: 4,
            total: 10,
        };
        let (labels, data) = counts.chart();
        assert_eq!(labels[1], "Shortlisted");
        assert_eq!(data, vec![1, 2, 3, 4]);
    }
}
