//! Institution sign-up and login. Institutions authenticate with their own
//! email and password, separately from user accounts.

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::password::{hash_password, validate_new_password, verify_password};
use crate::accounts::session::start_institution_session;
use crate::errors::AppError;
use crate::institutions::store::{
    find_institution_by_email, insert_institution, institution_email_taken, NewInstitution,
};
use crate::models::institution::{ApprovalStatus, InstitutionCategory, InstitutionRow};
use crate::models::non_empty;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InstitutionRegisterRequest {
    pub name: String,
    pub category: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirm: String,
    pub website: Option<String>,
    pub about: Option<String>,
    pub board: Option<String>,
    pub year_established: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct InstitutionLoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(state: &AppState, req: &InstitutionRegisterRequest) -> Result<Uuid, AppError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.phone.trim().is_empty() {
        return Err(AppError::Validation(
            "Name, email and phone are required.".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Enter a valid email address.".to_string()));
    }
    let category: InstitutionCategory = req.category.parse()?;
    validate_new_password(&req.password, &req.password_confirm)?;
    if institution_email_taken(&state.db, email).await? {
        return Err(AppError::Conflict("Email already exists.".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let website = non_empty(req.website.clone());
    let about = non_empty(req.about.clone());
    let board = non_empty(req.board.clone());
    let id = insert_institution(
        &state.db,
        NewInstitution {
            name,
            category,
            email,
            password_hash: &password_hash,
            phone: req.phone.trim(),
            website: website.as_deref(),
            about: about.as_deref(),
            board: board.as_deref(),
            year_established: req.year_established,
        },
    )
    .await?;
    info!("Registered institution {id} (pending approval)");
    Ok(id)
}

/// Pending institutions may log in; rejected ones may not.
pub async fn login(
    state: &AppState,
    req: &InstitutionLoginRequest,
) -> Result<(InstitutionRow, Uuid), AppError> {
    let invalid = || AppError::Validation("Invalid email or password.".to_string());

    let institution = find_institution_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &institution.password_hash) {
        warn!("Failed login for institution {}", institution.id);
        return Err(invalid());
    }
    if institution.approval_status == ApprovalStatus::Rejected.as_str() {
        return Err(AppError::Forbidden(
            "Your institution registration was rejected.".to_string(),
        ));
    }

    let token =
        start_institution_session(&state.db, institution.id, state.config.session_ttl_hours).await?;
    info!("Institution {} logged in", institution.id);
    Ok((institution, token))
}
