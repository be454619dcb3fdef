//! Job search filters. Every filter contributes exactly one predicate;
//! multi-value filters OR their values together and values that cannot be
//! understood are dropped instead of failing the request.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::job::JobType;

pub const EXPERIENCE_LEVELS: [&str; 4] = ["1-2 Years", "2-3 Years", "3-6 Years", "6+ Years"];
pub const POSTED_OPTIONS: [&str; 6] = [
    "Today",
    "Last 2 days",
    "Last 3 days",
    "Last 5 days",
    "Last 10 days",
    "Last 15 days",
];

/// Raw query string as submitted by the filter form. Repeated keys
/// (`job_type=a&job_type=b`) collect into the `Vec` fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobFilter {
    pub search: Option<String>,
    pub exact_match: Option<String>,
    pub category: Option<String>,
    pub zone: Option<String>,
    #[serde(default)]
    pub job_type: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub posted_within: Vec<String>,
    pub salary_min: Option<String>,
    pub salary_max: Option<String>,
    pub page: Option<String>,
}

/// Which postings a query may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobScope {
    /// Active postings from every institution.
    Public,
    /// Everything one institution has posted, active or not.
    PostedBy(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceBand {
    OneToTwo,
    TwoToThree,
    ThreeToSix,
    SixPlus,
}

impl ExperienceBand {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "1-2 Years" => Some(ExperienceBand::OneToTwo),
            "2-3 Years" => Some(ExperienceBand::TwoToThree),
            "3-6 Years" => Some(ExperienceBand::ThreeToSix),
            "6+ Years" => Some(ExperienceBand::SixPlus),
            _ => None,
        }
    }

    /// Inclusive bounds on `experience_needed`; `None` upper bound is open.
    pub fn bounds(&self) -> (i32, Option<i32>) {
        match self {
            ExperienceBand::OneToTwo => (1, Some(2)),
            ExperienceBand::TwoToThree => (2, Some(3)),
            ExperienceBand::ThreeToSix => (3, Some(6)),
            ExperienceBand::SixPlus => (6, None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostedWithin {
    Today,
    LastDays(i64),
}

impl PostedWithin {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Today" => Some(PostedWithin::Today),
            "Last 2 days" => Some(PostedWithin::LastDays(2)),
            "Last 3 days" => Some(PostedWithin::LastDays(3)),
            "Last 5 days" => Some(PostedWithin::LastDays(5)),
            "Last 10 days" => Some(PostedWithin::LastDays(10)),
            "Last 15 days" => Some(PostedWithin::LastDays(15)),
            _ => None,
        }
    }
}

impl JobFilter {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Any non-empty value other than an explicit "off" switches exact matching on.
    pub fn is_exact_match(&self) -> bool {
        match self.exact_match.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "off" | "no"),
        }
    }

    fn category_value(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn zone_value(&self) -> Option<&str> {
        self.zone.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Storage spellings of the selected job types. Display names such as
    /// "Full Time" are accepted too.
    pub fn job_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .job_type
            .iter()
            .filter_map(|raw| {
                raw.parse::<JobType>().ok().or_else(|| {
                    JobType::ALL
                        .iter()
                        .copied()
                        .find(|t| t.display_name().eq_ignore_ascii_case(raw.trim()))
                })
            })
            .map(|t| t.as_str().to_string())
            .collect();
        types.dedup();
        types
    }

    pub fn experience_bands(&self) -> Vec<ExperienceBand> {
        self.experience
            .iter()
            .filter_map(|label| ExperienceBand::from_label(label))
            .collect()
    }

    pub fn posted_windows(&self) -> Vec<PostedWithin> {
        self.posted_within
            .iter()
            .filter_map(|label| PostedWithin::from_label(label))
            .collect()
    }

    /// Lower bound on the posting's `max_salary`.
    pub fn salary_floor(&self) -> Option<i64> {
        parse_salary(self.salary_min.as_deref()).map(|v| v.ceil() as i64)
    }

    /// Upper bound on the posting's `min_salary`.
    pub fn salary_ceiling(&self) -> Option<i64> {
        parse_salary(self.salary_max.as_deref()).map(|v| v.floor() as i64)
    }

    /// True when no filter beyond pagination is set.
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.category_value().is_none()
            && self.zone_value().is_none()
            && self.job_types().is_empty()
            && self.experience_bands().is_empty()
            && self.posted_windows().is_empty()
            && self.salary_floor().is_none()
            && self.salary_ceiling().is_none()
    }

    /// Appends ` WHERE <scope> AND <filters...>` to a query over `jobs j JOIN institutions i`.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, scope: JobScope, today: NaiveDate) {
        match scope {
            JobScope::Public => {
                qb.push(" WHERE j.is_active");
            }
            JobScope::PostedBy(institution_id) => {
                qb.push(" WHERE j.posted_by = ").push_bind(institution_id);
            }
        }

        if let Some(term) = self.search_term() {
            if self.is_exact_match() {
                qb.push(" AND (LOWER(j.title) = LOWER(")
                    .push_bind(term.to_string())
                    .push(") OR LOWER(i.name) = LOWER(")
                    .push_bind(term.to_string())
                    .push(") OR LOWER(j.location) = LOWER(")
                    .push_bind(term.to_string())
                    .push(") OR LOWER(j.post) = LOWER(")
                    .push_bind(term.to_string())
                    .push("))");
            } else {
                let pattern = like_pattern(term);
                let columns = [
                    "j.title",
                    "j.description",
                    "i.name",
                    "j.location",
                    "j.post",
                    "j.qualifications_required",
                ];
                qb.push(" AND (");
                for (n, column) in columns.iter().enumerate() {
                    if n > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
                }
                qb.push(")");
            }
        }

        if let Some(category) = self.category_value() {
            qb.push(" AND j.category = ").push_bind(category.to_string());
        }

        if let Some(zone) = self.zone_value() {
            qb.push(" AND j.location ILIKE ").push_bind(like_pattern(zone));
        }

        let job_types = self.job_types();
        if !job_types.is_empty() {
            qb.push(" AND j.job_type = ANY(").push_bind(job_types).push(")");
        }

        let bands = self.experience_bands();
        if !bands.is_empty() {
            qb.push(" AND (");
            for (n, band) in bands.iter().enumerate() {
                if n > 0 {
                    qb.push(" OR ");
                }
                let (low, high) = band.bounds();
                match high {
                    Some(high) => {
                        qb.push("j.experience_needed BETWEEN ")
                            .push_bind(low)
                            .push(" AND ")
                            .push_bind(high);
                    }
                    None => {
                        qb.push("j.experience_needed >= ").push_bind(low);
                    }
                }
            }
            qb.push(")");
        }

        let windows = self.posted_windows();
        if !windows.is_empty() {
            qb.push(" AND (");
            for (n, window) in windows.iter().enumerate() {
                if n > 0 {
                    qb.push(" OR ");
                }
                match window {
                    PostedWithin::Today => {
                        qb.push("(j.timestamp AT TIME ZONE 'UTC')::date = ").push_bind(today);
                    }
                    PostedWithin::LastDays(days) => {
                        qb.push("j.timestamp >= ").push_bind(days_ago(today, *days));
                    }
                }
            }
            qb.push(")");
        }

        if let Some(floor) = self.salary_floor() {
            qb.push(" AND j.max_salary >= ").push_bind(floor);
        }
        if let Some(ceiling) = self.salary_ceiling() {
            qb.push(" AND j.min_salary <= ").push_bind(ceiling);
        }
    }
}

fn parse_salary(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Midnight UTC `days` before `today`.
fn days_ago(today: NaiveDate, days: i64) -> DateTime<Utc> {
    (today - Duration::days(days)).and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn where_sql(filter: &JobFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM jobs j JOIN institutions i ON i.id = j.posted_by");
        filter.push_where(&mut qb, JobScope::Public, today());
        qb.sql().to_string()
    }

    #[test]
    fn test_no_filters_only_scope() {
        let sql = where_sql(&JobFilter::default());
        assert!(sql.ends_with(" WHERE j.is_active"));
        assert!(JobFilter::default().is_empty());
    }

    #[test]
    fn test_institution_scope_ignores_active_flag() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM jobs j JOIN institutions i ON i.id = j.posted_by");
        JobFilter::default().push_where(&mut qb, JobScope::PostedBy(Uuid::nil()), today());
        assert!(qb.sql().contains("WHERE j.posted_by = $1"));
        assert!(!qb.sql().contains("is_active"));
    }

    #[test]
    fn test_broad_search_covers_six_columns() {
        let filter = JobFilter {
            search: Some("physics".into()),
            ..Default::default()
        };
        let sql = where_sql(&filter);
        assert_eq!(sql.matches(" ILIKE ").count(), 6);
        assert!(sql.contains("j.qualifications_required ILIKE"));
    }

    #[test]
    fn test_exact_search_uses_equality() {
        let filter = JobFilter {
            search: Some("PGT Physics".into()),
            exact_match: Some("on".into()),
            ..Default::default()
        };
        let sql = where_sql(&filter);
        assert!(sql.contains("LOWER(j.title) = LOWER($1)"));
        assert!(sql.contains("LOWER(j.post) = LOWER($4)"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_exact_match_switch() {
        let mut filter = JobFilter::default();
        assert!(!filter.is_exact_match());
        filter.exact_match = Some("true".into());
        assert!(filter.is_exact_match());
        filter.exact_match = Some("false".into());
        assert!(!filter.is_exact_match());
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = JobFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert!(where_sql(&filter).ends_with("j.is_active"));
    }

    #[test]
    fn test_job_types_accept_both_spellings_and_drop_unknown() {
        let filter = JobFilter {
            job_type: vec!["Full Time".into(), "part_time".into(), "gig".into()],
            ..Default::default()
        };
        assert_eq!(filter.job_types(), vec!["full_time", "part_time"]);
        assert!(where_sql(&filter).contains("j.job_type = ANY($1)"));
    }

    #[test]
    fn test_experience_bands_or_together() {
        let filter = JobFilter {
            experience: vec!["1-2 Years".into(), "6+ Years".into(), "10 Years".into()],
            ..Default::default()
        };
        let sql = where_sql(&filter);
        assert!(sql.contains(
            " AND (j.experience_needed BETWEEN $1 AND $2 OR j.experience_needed >= $3)"
        ));
    }

    #[test]
    fn test_unknown_experience_only_adds_nothing() {
        let filter = JobFilter {
            experience: vec!["lots".into()],
            ..Default::default()
        };
        assert!(!where_sql(&filter).contains("experience_needed"));
    }

    #[test]
    fn test_posted_within() {
        let filter = JobFilter {
            posted_within: vec!["Today".into(), "Last 5 days".into()],
            ..Default::default()
        };
        assert_eq!(
            filter.posted_windows(),
            vec![PostedWithin::Today, PostedWithin::LastDays(5)]
        );
        let sql = where_sql(&filter);
        assert!(sql.contains("(j.timestamp AT TIME ZONE 'UTC')::date = $1 OR j.timestamp >= $2"));
        assert_eq!(
            days_ago(today(), 5),
            NaiveDate::from_ymd_opt(2024, 5, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn test_salary_bounds() {
        let filter = JobFilter {
            salary_min: Some("25000.5".into()),
            salary_max: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(filter.salary_floor(), Some(25001));
        assert_eq!(filter.salary_ceiling(), None);
        let sql = where_sql(&filter);
        assert!(sql.contains("j.max_salary >= $1"));
        assert!(!sql.contains("min_salary"));
    }

    #[test]
    fn test_category_and_zone() {
        let filter = JobFilter {
            category: Some("teaching".into()),
            zone: Some("Chennai".into()),
            ..Default::default()
        };
        let sql = where_sql(&filter);
        assert!(sql.contains(" AND j.category = $1 AND j.location ILIKE $2"));
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
