//! Template structs and the view models they render.

use askama::Template;
use uuid::Uuid;

use crate::accounts::completeness::CompletionReport;
use crate::jobs::catalog::CategoryCount;
use crate::jobs::display::{status_badge_class, JobCard};
use crate::jobs::filters::{JobFilter, EXPERIENCE_LEVELS, POSTED_OPTIONS};
use crate::models::application::{AppliedJobRow, StatusCounts};
use crate::models::job::{JobCategory, JobType};
use crate::models::role::RoleName;
use crate::models::user::UserRow;
use crate::models::zone::Zone;
use crate::pagination::Page;
use crate::pages::flash::Flash;

/// What the shared layout needs on every page.
pub struct PageContext {
    pub site_name: String,
    pub username: Option<String>,
    pub is_admin: bool,
    pub flash: Option<Flash>,
}

impl PageContext {
    pub fn new(site_name: &str, user: Option<&UserRow>, flash: Option<Flash>) -> Self {
        PageContext {
            site_name: site_name.to_string(),
            username: user.map(|u| u.username.clone()),
            is_admin: user.is_some_and(|u| u.role == RoleName::Admin.as_str()),
            flash,
        }
    }
}

/// One checkbox or select option on the filter form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

fn options<'a>(
    choices: impl IntoIterator<Item = (&'a str, &'a str)>,
    selected: &[String],
) -> Vec<FilterOption> {
    choices
        .into_iter()
        .map(|(value, label)| FilterOption {
            value: value.to_string(),
            label: label.to_string(),
            checked: selected.iter().any(|s| s.trim() == value),
        })
        .collect()
}

/// The filter form re-filled from the submitted query.
pub struct FilterForm {
    pub search: String,
    pub exact_match: bool,
    pub categories: Vec<FilterOption>,
    pub zones: Vec<FilterOption>,
    pub job_types: Vec<FilterOption>,
    pub experience_levels: Vec<FilterOption>,
    pub posted_options: Vec<FilterOption>,
    pub salary_min: String,
    pub salary_max: String,
}

impl FilterForm {
    pub fn new(filter: &JobFilter, zones: &[Zone]) -> Self {
        let category: Vec<String> = filter.category.iter().cloned().collect();
        let zone: Vec<String> = filter.zone.iter().cloned().collect();
        FilterForm {
            search: filter.search.clone().unwrap_or_default(),
            exact_match: filter.is_exact_match(),
            categories: options(
                JobCategory::ALL.iter().map(|c| (c.as_str(), c.display_name())),
                &category,
            ),
            zones: options(
                zones.iter().map(|z| (z.name.as_str(), z.name.as_str())),
                &zone,
            ),
            job_types: options(
                JobType::ALL.iter().map(|t| (t.as_str(), t.display_name())),
                &filter.job_type,
            ),
            experience_levels: options(
                EXPERIENCE_LEVELS.iter().map(|l| (*l, *l)),
                &filter.experience,
            ),
            posted_options: options(
                POSTED_OPTIONS.iter().map(|p| (*p, *p)),
                &filter.posted_within,
            ),
            salary_min: filter.salary_min.clone().unwrap_or_default(),
            salary_max: filter.salary_max.clone().unwrap_or_default(),
        }
    }
}

/// One row of the "applied jobs" table.
pub struct AppliedJobView {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub institution_name: String,
    pub job_location: String,
    pub status: String,
    pub status_badge: &'static str,
    pub applied_on: String,
    pub expires_on: String,
}

impl From<AppliedJobRow> for AppliedJobView {
    fn from(row: AppliedJobRow) -> Self {
        AppliedJobView {
            status_badge: status_badge_class(&row.status),
            applied_on: row.applied_at.format("%d %b %Y").to_string(),
            expires_on: row
                .expire_date
                .map(|d| d.format("%d %b %Y").to_string())
                .unwrap_or_else(|| "-".to_string()),
            id: row.id,
            job_id: row.job_id,
            job_title: row.job_title,
            institution_name: row.institution_name,
            job_location: row.job_location,
            status: row.status,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub ctx: PageContext,
    pub categories: Vec<CategoryCount>,
    pub zones: Vec<Zone>,
    pub recent_jobs: Vec<JobCard>,
    pub latest_jobs: Vec<JobCard>,
    pub profile_percentage: Option<i32>,
}

#[derive(Template)]
#[template(path = "job_listing.html")]
pub struct JobListingTemplate {
    pub ctx: PageContext,
    pub jobs: Page<JobCard>,
    pub form: FilterForm,
    pub filtered: bool,
}

#[derive(Template)]
#[template(path = "job_detail.html")]
pub struct JobDetailTemplate {
    pub ctx: PageContext,
    pub card: JobCard,
    pub skills: String,
    pub deadline: String,
    pub has_applied: bool,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub login: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub username: String,
    pub email: String,
    pub phone: String,
}

#[derive(Template)]
#[template(path = "verify.html")]
pub struct VerifyTemplate {
    pub ctx: PageContext,
    pub email: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub counts: StatusCounts,
    /// JSON arrays handed to the chart script.
    pub chart_labels: String,
    pub chart_data: String,
    pub completion: CompletionReport,
    pub latest_jobs: Vec<JobCard>,
}

#[derive(Template)]
#[template(path = "applied_jobs.html")]
pub struct AppliedJobsTemplate {
    pub ctx: PageContext,
    pub applications: Page<AppliedJobView>,
    pub counts: StatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::fixtures::blank_user;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn test_filter_form_marks_selected_options() {
        let filter = JobFilter {
            job_type: vec!["part_time".into(), "bogus".into()],
            experience: vec!["6+ Years".into()],
            category: Some("teaching".into()),
            zone: Some("North".into()),
            ..Default::default()
        };
        let zones = vec![
            Zone { id: Uuid::new_v4(), name: "North".into() },
            Zone { id: Uuid::new_v4(), name: "South".into() },
        ];
        let form = FilterForm::new(&filter, &zones);

        let checked: Vec<&str> = form
            .job_types
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(checked, vec!["part_time"]);
        assert!(form.experience_levels[3].checked);
        assert!(form.categories[0].checked);
        assert!(form.zones[0].checked && !form.zones[1].checked);
        assert_eq!(form.posted_options.len(), 6);
        assert!(!form.exact_match);
    }

    #[test]
    fn test_applied_job_view_formats_dates() {
        let row = AppliedJobRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            job_title: "Physics Teacher".into(),
            job_location: "Srinagar".into(),
            institution_name: "Green Valley School".into(),
            status: "shortlisted".into(),
            applied_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
            expire_date: NaiveDate::from_ymd_opt(2024, 3, 20),
        };
        let view = AppliedJobView::from(row);
        assert_eq!(view.applied_on, "05 Mar 2024");
        assert_eq!(view.expires_on, "20 Mar 2024");
        assert_eq!(view.status_badge, status_badge_class("shortlisted"));
    }

    #[test]
    fn test_page_context_admin_flag() {
        let mut user = blank_user();
        user.role = "admin".into();
        let ctx = PageContext::new("Omeiat Jobs", Some(&user), None);
        assert!(ctx.is_admin);
        assert_eq!(ctx.username.as_deref(), Some(user.username.as_str()));

        let anonymous = PageContext::new("Omeiat Jobs", None, None);
        assert!(anonymous.username.is_none() && !anonymous.is_admin);
    }
}
