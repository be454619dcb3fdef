//! Formatting helpers shared by the job pages and the JSON listing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::job::{JobCategory, JobRow, JobType};

/// "3 days ago", "1 hour ago", "Just now". Months are 30 days, years 365.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(then);
    let days = diff.num_days();
    let plural = |n: i64, unit: &str| format!("{n} {unit}{} ago", if n > 1 { "s" } else { "" });

    if days > 365 {
        plural(days / 365, "year")
    } else if days > 30 {
        plural(days / 30, "month")
    } else if days > 0 {
        plural(days, "day")
    } else if diff.num_hours() > 0 {
        plural(diff.num_hours(), "hour")
    } else if diff.num_minutes() > 0 {
        plural(diff.num_minutes(), "minute")
    } else {
        "Just now".to_string()
    }
}

/// `12345` -> `12,345`
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// A zero salary is treated as not given.
pub fn format_salary_range(min: Option<i32>, max: Option<i32>) -> String {
    let min = min.filter(|v| *v != 0);
    let max = max.filter(|v| *v != 0);
    match (min, max) {
        (Some(lo), Some(hi)) => format!("₹{} - ₹{}", thousands(lo.into()), thousands(hi.into())),
        (Some(lo), None) => format!("₹{}+", thousands(lo.into())),
        (None, Some(hi)) => format!("Up to ₹{}", thousands(hi.into())),
        (None, None) => "Negotiable".to_string(),
    }
}

/// Whole days left before the deadline, never negative. No deadline counts as 0.
pub fn days_until_deadline(deadline: Option<NaiveDate>, today: NaiveDate) -> i64 {
    deadline
        .map(|d| (d - today).num_days().max(0))
        .unwrap_or(0)
}

/// Three days or fewer remain. A posting without a deadline is never urgent.
pub fn is_deadline_urgent(deadline: Option<NaiveDate>, today: NaiveDate) -> bool {
    deadline.is_some() && days_until_deadline(deadline, today) <= 3
}

pub fn experience_display(years: Option<i32>) -> String {
    match years {
        None => "Not specified".to_string(),
        Some(0) => "Fresher".to_string(),
        Some(1) => "1 year".to_string(),
        Some(n) => format!("{n} years"),
    }
}

/// Bootstrap badge class for a job or application status.
pub fn status_badge_class(status: &str) -> &'static str {
    match status {
        "open" | "Open" | "hired" => "bg-success",
        "closed" | "Closed" => "bg-secondary",
        "pending" => "bg-secondary",
        "Pending" | "shortlisted" => "bg-warning",
        "cancelled" | "Cancelled" | "rejected" => "bg-danger",
        _ => "bg-secondary",
    }
}

fn category_label(raw: &str) -> String {
    raw.parse::<JobCategory>()
        .map(|c| c.display_name().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn job_type_label(raw: &str) -> String {
    raw.parse::<JobType>()
        .map(|t| t.display_name().to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// A job posting plus the strings a listing card shows.
#[derive(Debug, Clone, Serialize)]
pub struct JobCard {
    #[serde(flatten)]
    pub job: JobRow,
    pub time_ago: String,
    pub salary_display: String,
    pub experience_display: String,
    pub category_display: String,
    pub job_type_display: String,
    pub days_left: i64,
    pub deadline_urgent: bool,
    pub status_badge: &'static str,
}

impl JobCard {
    pub fn new(job: JobRow, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        JobCard {
            time_ago: time_ago(job.timestamp, now),
            salary_display: format_salary_range(job.min_salary, job.max_salary),
            experience_display: experience_display(job.experience_needed),
            category_display: category_label(&job.category),
            job_type_display: job_type_label(&job.job_type),
            days_left: days_until_deadline(job.application_deadline, today),
            deadline_urgent: is_deadline_urgent(job.application_deadline, today),
            status_badge: status_badge_class(&job.status),
            job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_ago_units() {
        let now = now();
        assert_eq!(time_ago(now - Duration::seconds(20), now), "Just now");
        assert_eq!(time_ago(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_ago(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(time_ago(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(time_ago(now - Duration::days(1), now), "1 day ago");
        assert_eq!(time_ago(now - Duration::days(30), now), "30 days ago");
        assert_eq!(time_ago(now - Duration::days(61), now), "2 months ago");
        assert_eq!(time_ago(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
        assert_eq!(thousands(-25000), "-25,000");
    }

    #[test]
    fn test_salary_range() {
        assert_eq!(format_salary_range(Some(20000), Some(35000)), "₹20,000 - ₹35,000");
        assert_eq!(format_salary_range(Some(20000), None), "₹20,000+");
        assert_eq!(format_salary_range(None, Some(15000)), "Up to ₹15,000");
        assert_eq!(format_salary_range(Some(0), None), "Negotiable");
        assert_eq!(format_salary_range(None, None), "Negotiable");
    }

    #[test]
    fn test_deadline_helpers() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let in_two = NaiveDate::from_ymd_opt(2024, 5, 22);
        let in_ten = NaiveDate::from_ymd_opt(2024, 5, 30);
        let past = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(days_until_deadline(in_two, today), 2);
        assert_eq!(days_until_deadline(past, today), 0);
        assert_eq!(days_until_deadline(None, today), 0);
        assert!(is_deadline_urgent(in_two, today));
        assert!(is_deadline_urgent(past, today));
        assert!(!is_deadline_urgent(in_ten, today));
        assert!(!is_deadline_urgent(None, today));
    }

    #[test]
    fn test_experience_display() {
        assert_eq!(experience_display(Some(0)), "Fresher");
        assert_eq!(experience_display(Some(1)), "1 year");
        assert_eq!(experience_display(Some(4)), "4 years");
        assert_eq!(experience_display(None), "Not specified");
    }

    #[test]
    fn test_status_badges() {
        assert_eq!(status_badge_class("hired"), "bg-success");
        assert_eq!(status_badge_class("shortlisted"), "bg-warning");
        assert_eq!(status_badge_class("rejected"), "bg-danger");
        assert_eq!(status_badge_class("pending"), "bg-secondary");
        assert_eq!(status_badge_class("open"), "bg-success");
        assert_eq!(status_badge_class("whatever"), "bg-secondary");
    }
}
