use askama::Template;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::Query;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::completeness::compute_profile_completion;
use crate::accounts::service::{
    self, LoginRequest, OtpRequest, OtpVerifyRequest, RegisterRequest,
};
use crate::accounts::session::{
    end_session, expired_session_cookie, session_cookie, session_token, MaybeUser,
};
use crate::applications::handlers::MY_APPLICATIONS_PAGE_SIZE;
use crate::applications::store::{
    applicant_status_counts, has_applied, list_applied_jobs, submit_application,
    withdraw_application, ApplyRequest,
};
use crate::errors::{AppError, UNVERIFIED_MESSAGE};
use crate::jobs::catalog::{category_counts, latest_open_jobs, list_zones, recent_jobs};
use crate::jobs::display::JobCard;
use crate::jobs::filters::JobFilter;
use crate::jobs::handlers::public_listing;
use crate::jobs::store::find_active_job;
use crate::models::job::JobRow;
use crate::models::non_empty;
use crate::pages::flash::{set_flash, take_flash, Flash, FlashLevel};
use crate::pages::views::{
    AppliedJobView, AppliedJobsTemplate, DashboardTemplate, FilterForm, IndexTemplate,
    JobDetailTemplate, JobListingTemplate, LoginTemplate, PageContext, RegisterTemplate,
    VerifyTemplate,
};
use crate::pagination::PageQuery;
use crate::state::AppState;

const LATEST_JOBS_SHOWN: i64 = 5;

/// Remembers which address is waiting for its code between the register,
/// login and verify pages.
const PENDING_EMAIL_COOKIE: &str = "omeiat_verify_email";

fn render(jar: CookieJar, template: &impl Template) -> Result<Response, AppError> {
    Ok((jar, Html(template.render()?)).into_response())
}

fn redirect_with(jar: CookieJar, level: FlashLevel, message: impl Into<String>, to: &str) -> Response {
    (set_flash(jar, level, message), Redirect::to(to)).into_response()
}

fn login_required(jar: CookieJar) -> Response {
    redirect_with(jar, FlashLevel::Info, "Please log in to continue.", "/login")
}

fn error_flash(err: &AppError) -> Option<Flash> {
    Some(Flash {
        level: FlashLevel::Error,
        message: err.user_message(),
    })
}

fn pending_email_cookie(email: &str) -> Cookie<'static> {
    Cookie::build((PENDING_EMAIL_COOKIE, email.trim().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn cards(jobs: Vec<JobRow>) -> Vec<JobCard> {
    let now = Utc::now();
    jobs.into_iter().map(|job| JobCard::new(job, now)).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Browsing
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let template = IndexTemplate {
        categories: category_counts(&state.db).await?,
        zones: list_zones(&state.db).await?,
        recent_jobs: cards(recent_jobs(&state.db).await?),
        latest_jobs: cards(latest_open_jobs(&state.db, LATEST_JOBS_SHOWN).await?),
        profile_percentage: user.as_ref().map(|u| u.profile_percentage),
        ctx: PageContext::new(&state.config.site_name, user.as_ref(), flash),
    };
    render(jar, &template)
}

/// GET /jobs
pub async fn job_listing(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(filter): Query<JobFilter>,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let zones = list_zones(&state.db).await?;
    let form = FilterForm::new(&filter, &zones);
    let listing = public_listing(&state, filter).await?;
    let template = JobListingTemplate {
        ctx: PageContext::new(&state.config.site_name, user.as_ref(), flash),
        jobs: listing.jobs,
        form,
        filtered: listing.filtered,
    };
    render(jar, &template)
}

/// GET /jobs/:id
pub async fn job_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let job = find_active_job(&state.db, job_id).await?;
    let has_applied = match &user {
        Some(u) => has_applied(&state.db, u.id, job_id).await?,
        None => false,
    };
    let template = JobDetailTemplate {
        ctx: PageContext::new(&state.config.site_name, user.as_ref(), flash),
        skills: job.skills_required.join(", "),
        deadline: job
            .application_deadline
            .map(|d| d.format("%d %b %Y").to_string())
            .unwrap_or_else(|| "Not specified".to_string()),
        card: JobCard::new(job, Utc::now()),
        has_applied,
    };
    render(jar, &template)
}

/// Screening answers as posted by the apply form; every field arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplyForm {
    pub cover_letter: String,
    pub communication_skills: String,
    pub technical_skills: String,
    pub experience: String,
    pub qualification: String,
    pub joining_availability: String,
    pub commute_distance_km: String,
}

impl From<ApplyForm> for ApplyRequest {
    fn from(form: ApplyForm) -> Self {
        ApplyRequest {
            cover_letter: form.cover_letter.trim().to_string(),
            communication_skills: non_empty(Some(form.communication_skills)),
            technical_skills: non_empty(Some(form.technical_skills)),
            experience: non_empty(Some(form.experience)),
            qualification: non_empty(Some(form.qualification)),
            joining_availability: non_empty(Some(form.joining_availability)),
            commute_distance_km: form.commute_distance_km.trim().parse().ok(),
        }
    }
}

/// POST /jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(job_id): Path<Uuid>,
    Form(form): Form<ApplyForm>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_required(jar));
    };
    let job = find_active_job(&state.db, job_id).await?;
    let req = ApplyRequest::from(form);
    let outcome = submit_application(
        &state.db,
        user.id,
        &user.username,
        &job,
        &req,
        Utc::now().date_naive(),
    )
    .await;

    Ok(match outcome {
        Ok(_) => {
            info!("User {} applied for job {job_id}", user.id);
            redirect_with(
                jar,
                FlashLevel::Success,
                "Your application has been submitted successfully.",
                "/applied-jobs",
            )
        }
        Err(e) => {
            warn!("Application by user {} for job {job_id} refused: {e}", user.id);
            redirect_with(jar, FlashLevel::Error, e.user_message(), &format!("/jobs/{job_id}"))
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Accounts
// ────────────────────────────────────────────────────────────────────────────

/// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/dashboard").into_response());
    }
    let (jar, flash) = take_flash(jar);
    let template = LoginTemplate {
        ctx: PageContext::new(&state.config.site_name, None, flash),
        login: String::new(),
    };
    render(jar, &template)
}

/// POST /login
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
    match service::login(&state, &req).await {
        Ok((user, token)) => {
            let jar = jar.add(session_cookie(token, state.config.cookie_secure));
            Ok(redirect_with(
                jar,
                FlashLevel::Success,
                format!("Welcome back, {}!", user.username),
                "/dashboard",
            ))
        }
        Err(AppError::Unverified) => {
            let jar = if req.login.contains('@') {
                jar.add(pending_email_cookie(&req.login))
            } else {
                jar
            };
            Ok(redirect_with(jar, FlashLevel::Info, UNVERIFIED_MESSAGE, "/verify"))
        }
        Err(e) => {
            let template = LoginTemplate {
                ctx: PageContext::new(&state.config.site_name, None, error_flash(&e)),
                login: req.login,
            };
            render(jar, &template)
        }
    }
}

/// GET /register
pub async fn register_page(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let template = RegisterTemplate {
        ctx: PageContext::new(&state.config.site_name, None, flash),
        username: String::new(),
        email: String::new(),
        phone: String::new(),
    };
    render(jar, &template)
}

/// POST /register
pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<RegisterRequest>,
) -> Result<Response, AppError> {
    match service::register(&state, &req).await {
        Ok(user_id) => {
            info!("Registered user {user_id} from the signup page");
            let jar = jar.add(pending_email_cookie(&req.email));
            Ok(redirect_with(
                jar,
                FlashLevel::Success,
                "Registration successful. Enter the code we sent to your email.",
                "/verify",
            ))
        }
        Err(e) => {
            let template = RegisterTemplate {
                ctx: PageContext::new(&state.config.site_name, None, error_flash(&e)),
                username: req.username,
                email: req.email,
                phone: req.phone.unwrap_or_default(),
            };
            render(jar, &template)
        }
    }
}

/// GET /verify
pub async fn verify_page(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, flash) = take_flash(jar);
    let email = jar
        .get(PENDING_EMAIL_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();
    let template = VerifyTemplate {
        ctx: PageContext::new(&state.config.site_name, None, flash),
        email,
    };
    render(jar, &template)
}

/// POST /verify
pub async fn verify_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<OtpVerifyRequest>,
) -> Result<Response, AppError> {
    match service::verify_otp(&state, req.email.trim(), req.otp.trim()).await {
        Ok((_, token)) => {
            let jar = jar
                .add(session_cookie(token, state.config.cookie_secure))
                .remove(Cookie::build(PENDING_EMAIL_COOKIE).path("/").build());
            Ok(redirect_with(
                jar,
                FlashLevel::Success,
                "Your account has been verified.",
                "/dashboard",
            ))
        }
        Err(e) => {
            let template = VerifyTemplate {
                ctx: PageContext::new(&state.config.site_name, None, error_flash(&e)),
                email: req.email,
            };
            render(jar, &template)
        }
    }
}

/// POST /verify/resend
pub async fn resend_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<OtpRequest>,
) -> Result<Response, AppError> {
    let jar = jar.add(pending_email_cookie(&req.email));
    Ok(match service::request_otp(&state, req.email.trim()).await {
        Ok(()) => redirect_with(
            jar,
            FlashLevel::Info,
            "A new code has been sent to your email.",
            "/verify",
        ),
        Err(e) => redirect_with(jar, FlashLevel::Error, e.user_message(), "/verify"),
    })
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        end_session(&state.db, token).await?;
    }
    let jar = jar.remove(expired_session_cookie());
    Ok(redirect_with(jar, FlashLevel::Success, "You have been logged out.", "/"))
}

// ────────────────────────────────────────────────────────────────────────────
// Job seeker area
// ────────────────────────────────────────────────────────────────────────────

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_required(jar));
    };
    let (jar, flash) = take_flash(jar);
    let counts = applicant_status_counts(&state.db, user.id).await?;
    let (labels, data) = counts.chart();
    let template = DashboardTemplate {
        chart_labels: serde_json::to_string(&labels).map_err(anyhow::Error::from)?,
        chart_data: serde_json::to_string(&data).map_err(anyhow::Error::from)?,
        counts,
        completion: compute_profile_completion(&user),
        latest_jobs: cards(latest_open_jobs(&state.db, LATEST_JOBS_SHOWN).await?),
        ctx: PageContext::new(&state.config.site_name, Some(&user), flash),
    };
    render(jar, &template)
}

/// GET /applied-jobs
pub async fn applied_jobs(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_required(jar));
    };
    let (jar, flash) = take_flash(jar);
    let applications = list_applied_jobs(
        &state.db,
        user.id,
        query.page.as_deref(),
        MY_APPLICATIONS_PAGE_SIZE,
    )
    .await?
    .map(AppliedJobView::from);
    let template = AppliedJobsTemplate {
        counts: applicant_status_counts(&state.db, user.id).await?,
        applications,
        ctx: PageContext::new(&state.config.site_name, Some(&user), flash),
    };
    render(jar, &template)
}

/// POST /applications/:id/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Path(application_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let Some(user) = user else {
        return Ok(login_required(jar));
    };
    Ok(match withdraw_application(&state.db, application_id, user.id).await {
        Ok(()) => {
            info!("User {} withdrew application {application_id}", user.id);
            redirect_with(jar, FlashLevel::Success, "Application withdrawn.", "/applied-jobs")
        }
        Err(e) => redirect_with(jar, FlashLevel::Error, e.user_message(), "/applied-jobs"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_form_blank_fields_become_none() {
        let form = ApplyForm {
            cover_letter: "  I teach physics.  ".into(),
            technical_skills: "Lab work".into(),
            commute_distance_km: "twelve".into(),
            ..Default::default()
        };
        let req = ApplyRequest::from(form);
        assert_eq!(req.cover_letter, "I teach physics.");
        assert_eq!(req.technical_skills.as_deref(), Some("Lab work"));
        assert_eq!(req.communication_skills, None);
        assert_eq!(req.commute_distance_km, None);
    }

    #[test]
    fn test_apply_form_parses_distance() {
        let form = ApplyForm {
            commute_distance_km: " 8 ".into(),
            ..Default::default()
        };
        assert_eq!(ApplyRequest::from(form).commute_distance_km, Some(8));
    }

    #[test]
    fn test_redirect_sets_flash_cookie() {
        let response = redirect_with(CookieJar::new(), FlashLevel::Error, "Nope", "/login");
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        let set_cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(set_cookie.starts_with("omeiat_flash="));
    }
}
