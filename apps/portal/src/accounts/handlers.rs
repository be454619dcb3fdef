use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::completeness::{compute_profile_completion, CompletionReport};
use crate::accounts::profile::{
    apply_profile_update, load_profile, refresh_profile_percentage, replace_educations,
    replace_experiences, replace_languages, replace_skills, save_profile, upsert_address,
    ProfileResponse, ProfileUpdate,
};
use crate::accounts::service::{
    self, LoginRequest, OtpRequest, OtpVerifyRequest, RegisterRequest,
};
use crate::accounts::session::{
    end_session, expired_session_cookie, session_cookie, session_token, CurrentUser,
};
use crate::applications::store::applicant_status_counts;
use crate::errors::AppError;
use crate::jobs::catalog::latest_open_jobs;
use crate::models::application::StatusCounts;
use crate::models::job::JobRow;
use crate::models::user::{Education, Language, Skill, UserAddress, UserRow, WorkExperience};
use crate::state::AppState;
use crate::storage::read_upload;

const DASHBOARD_LATEST_JOBS: i64 = 5;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub user: UserRow,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct SectionResponse {
    pub saved: usize,
    pub profile_percentage: i32,
}

#[derive(Serialize)]
pub struct PictureResponse {
    pub profile_picture: String,
    pub profile_percentage: i32,
}

#[derive(Serialize)]
pub struct UserDashboard {
    pub counts: StatusCounts,
    pub chart_labels: Vec<&'static str>,
    pub chart_data: Vec<i64>,
    pub completion: CompletionReport,
    pub latest_jobs: Vec<JobRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Authentication
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user_id = service::register(&state, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            message: "Registration successful. Enter the code sent to your email.",
        }),
    ))
}

/// POST /api/v1/auth/otp/request
pub async fn handle_request_otp(
    State(state): State<AppState>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    service::request_otp(&state, &req.email).await?;
    Ok(Json(MessageResponse {
        message: "If the account exists, a verification code has been sent.",
    }))
}

/// POST /api/v1/auth/otp/verify
pub async fn handle_verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<OtpVerifyRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let (user, token) = service::verify_otp(&state, &req.email, &req.otp).await?;
    let jar = jar.add(session_cookie(token, state.config.cookie_secure));
    Ok((jar, Json(SessionResponse { token, user })))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let (user, token) = service::login(&state, &req).await?;
    let jar = jar.add(session_cookie(token, state.config.cookie_secure));
    Ok((jar, Json(SessionResponse { token, user })))
}

/// POST /api/v1/auth/logout
/// Also used by institutions; any session token is ended.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), AppError> {
    if let Some(token) = session_token(&headers) {
        end_session(&state.db, token).await?;
    }
    Ok((jar.remove(expired_session_cookie()), StatusCode::NO_CONTENT))
}

// ────────────────────────────────────────────────────────────────────────────
// Own profile
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/me
pub async fn handle_get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(load_profile(&state.db, user).await?))
}

/// PUT /api/v1/me
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>, AppError> {
    apply_profile_update(&mut user, update)?;
    save_profile(&state.db, &mut user).await?;
    info!("User {} updated profile ({}%)", user.id, user.profile_percentage);
    Ok(Json(load_profile(&state.db, user).await?))
}

/// PUT /api/v1/me/address
pub async fn handle_update_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(address): Json<UserAddress>,
) -> Result<Json<UserAddress>, AppError> {
    upsert_address(&state.db, user.id, &address).await?;
    Ok(Json(address))
}

/// PUT /api/v1/me/educations
pub async fn handle_replace_educations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(rows): Json<Vec<Education>>,
) -> Result<Json<SectionResponse>, AppError> {
    let saved = replace_educations(&state.db, user.id, &rows).await?;
    section_saved(&state, user.id, saved).await
}

/// PUT /api/v1/me/experiences
pub async fn handle_replace_experiences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(rows): Json<Vec<WorkExperience>>,
) -> Result<Json<SectionResponse>, AppError> {
    let saved = replace_experiences(&state.db, user.id, &rows).await?;
    section_saved(&state, user.id, saved).await
}

/// PUT /api/v1/me/skills
pub async fn handle_replace_skills(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(rows): Json<Vec<Skill>>,
) -> Result<Json<SectionResponse>, AppError> {
    let saved = replace_skills(&state.db, user.id, &rows).await?;
    section_saved(&state, user.id, saved).await
}

/// PUT /api/v1/me/languages
pub async fn handle_replace_languages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(rows): Json<Vec<Language>>,
) -> Result<Json<SectionResponse>, AppError> {
    let saved = replace_languages(&state.db, user.id, &rows).await?;
    section_saved(&state, user.id, saved).await
}

async fn section_saved(
    state: &AppState,
    user_id: Uuid,
    saved: usize,
) -> Result<Json<SectionResponse>, AppError> {
    let profile_percentage = refresh_profile_percentage(&state.db, user_id).await?;
    Ok(Json(SectionResponse {
        saved,
        profile_percentage,
    }))
}

/// POST /api/v1/me/picture
/// Multipart body with a `picture` file part.
pub async fn handle_upload_picture(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<PictureResponse>, AppError> {
    let media = state.media.as_ref().ok_or_else(|| {
        AppError::Storage("Media storage is not configured".to_string())
    })?;
    let (content_type, body) = read_upload(&mut multipart, "picture").await?;
    let key = media
        .put_image("profile_pictures", user.id, &content_type, body)
        .await?;

    user.profile_picture = Some(key.clone());
    save_profile(&state.db, &mut user).await?;
    Ok(Json(PictureResponse {
        profile_picture: key,
        profile_percentage: user.profile_percentage,
    }))
}

/// GET /api/v1/me/completion
pub async fn handle_completion(CurrentUser(user): CurrentUser) -> Json<CompletionReport> {
    Json(compute_profile_completion(&user))
}

/// GET /api/v1/me/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserDashboard>, AppError> {
    let counts = applicant_status_counts(&state.db, user.id).await?;
    let (chart_labels, chart_data) = counts.chart();
    let latest_jobs = latest_open_jobs(&state.db, DASHBOARD_LATEST_JOBS).await?;
    Ok(Json(UserDashboard {
        counts,
        chart_labels,
        chart_data,
        completion: compute_profile_completion(&user),
        latest_jobs,
    }))
}
