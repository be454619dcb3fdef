use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::session::{session_cookie, CurrentInstitution, CurrentUser};
use crate::errors::AppError;
use crate::institutions::profile::{
    apply_institution_update, institution_dashboard, load_institution_profile,
    save_institution_profile, set_logo, InstitutionDashboard, InstitutionProfile,
    InstitutionProfileUpdate,
};
use crate::institutions::reviews::{review_summary, upsert_review, ReviewRequest, ReviewSummary};
use crate::institutions::service::{self, InstitutionLoginRequest, InstitutionRegisterRequest};
use crate::institutions::store::find_institution_by_id;
use crate::models::institution::{ContactType, InstitutionCategory, InstitutionRow};
use crate::state::AppState;
use crate::storage::read_upload;

#[derive(Serialize)]
pub struct InstitutionRegisterResponse {
    pub institution_id: Uuid,
    pub approval_status: &'static str,
}

#[derive(Serialize)]
pub struct InstitutionSessionResponse {
    pub token: Uuid,
    pub institution: InstitutionRow,
}

#[derive(Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: String,
}

#[derive(Serialize)]
pub struct ChoicesResponse {
    pub categories: Vec<Choice>,
    pub contact_types: Vec<Choice>,
}

#[derive(Serialize)]
pub struct LogoResponse {
    pub logo: String,
}

/// POST /api/v1/institutions/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<InstitutionRegisterRequest>,
) -> Result<(StatusCode, Json<InstitutionRegisterResponse>), AppError> {
    let institution_id = service::register(&state, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(InstitutionRegisterResponse {
            institution_id,
            approval_status: "pending",
        }),
    ))
}

/// POST /api/v1/institutions/login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<InstitutionLoginRequest>,
) -> Result<(CookieJar, Json<InstitutionSessionResponse>), AppError> {
    let (institution, token) = service::login(&state, &req).await?;
    let jar = jar.add(session_cookie(token, state.config.cookie_secure));
    Ok((jar, Json(InstitutionSessionResponse { token, institution })))
}

/// GET /api/v1/institutions/me
pub async fn handle_get_profile(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
) -> Result<Json<InstitutionProfile>, AppError> {
    Ok(Json(load_institution_profile(&state.db, institution).await?))
}

/// PUT /api/v1/institutions/me
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentInstitution(mut institution): CurrentInstitution,
    Json(update): Json<InstitutionProfileUpdate>,
) -> Result<Json<InstitutionProfile>, AppError> {
    apply_institution_update(&mut institution, &update)?;
    save_institution_profile(&state.db, &institution, &update).await?;
    info!("Institution {} updated its profile", institution.id);
    Ok(Json(load_institution_profile(&state.db, institution).await?))
}

/// POST /api/v1/institutions/me/logo
/// Multipart body with a `logo` file part.
pub async fn handle_upload_logo(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
    mut multipart: Multipart,
) -> Result<Json<LogoResponse>, AppError> {
    let media = state.media.as_ref().ok_or_else(|| {
        AppError::Storage("Media storage is not configured".to_string())
    })?;
    let (content_type, body) = read_upload(&mut multipart, "logo").await?;
    let key = media
        .put_image("institution_logos", institution.id, &content_type, body)
        .await?;
    set_logo(&state.db, institution.id, &key).await?;
    Ok(Json(LogoResponse { logo: key }))
}

/// GET /api/v1/institutions/me/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    CurrentInstitution(institution): CurrentInstitution,
) -> Result<Json<InstitutionDashboard>, AppError> {
    Ok(Json(institution_dashboard(&state.db, institution.id).await?))
}

/// GET /api/v1/institutions/choices
pub async fn handle_choices() -> Json<ChoicesResponse> {
    Json(ChoicesResponse {
        categories: InstitutionCategory::ALL
            .iter()
            .map(|c| Choice {
                value: c.as_str(),
                label: title_case(c.as_str()),
            })
            .collect(),
        contact_types: ContactType::ALL
            .iter()
            .map(|c| Choice {
                value: c.as_str(),
                label: title_case(c.as_str()),
            })
            .collect(),
    })
}

/// GET /api/v1/institutions/:id/reviews
pub async fn handle_list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewSummary>, AppError> {
    find_institution_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Institution {id} not found")))?;
    Ok(Json(review_summary(&state.db, id).await?))
}

/// POST /api/v1/institutions/:id/reviews
pub async fn handle_post_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<ReviewSummary>, AppError> {
    find_institution_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Institution {id} not found")))?;
    upsert_review(&state.db, id, user.id, &req).await?;
    Ok(Json(review_summary(&state.db, id).await?))
}

/// `training_center` -> `Training Center`
fn title_case(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("training_center"), "Training Center");
        assert_eq!(title_case("hr"), "Hr");
    }

    #[tokio::test]
    async fn test_choices_cover_every_variant() {
        let Json(choices) = handle_choices().await;
        assert_eq!(choices.categories.len(), InstitutionCategory::ALL.len());
        assert_eq!(choices.contact_types[0].value, "principal");
    }
}
