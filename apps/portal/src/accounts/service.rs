//! Account flows shared by the JSON API and the HTML pages.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::otp::{check_otp, issue_otp, OtpError, MAX_OTP_ATTEMPTS};
use crate::accounts::password::{hash_password, validate_new_password, verify_password};
use crate::accounts::session::start_user_session;
use crate::accounts::store::{
    email_taken, find_user_by_email, find_user_by_login, insert_user, mark_verified,
    record_failed_otp, store_otp, touch_last_login, username_taken, NewUser,
};
use crate::errors::AppError;
use crate::mail::{self, otp::OtpEmail};
use crate::models::non_empty;
use crate::models::role::RoleName;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or username.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

/// Usernames share the login field with email addresses, so they may not
/// contain `@`.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required.".to_string()));
    }
    if username.contains('@') {
        return Err(AppError::Validation(
            "Username cannot contain '@'.".to_string(),
        ));
    }
    Ok(())
}

/// Creates an unverified job seeker and mails the verification code.
pub async fn register(state: &AppState, req: &RegisterRequest) -> Result<Uuid, AppError> {
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::Validation(
            "Username and email are required.".to_string(),
        ));
    }
    validate_username(username)?;
    if !email.contains('@') {
        return Err(AppError::Validation("Enter a valid email address.".to_string()));
    }
    validate_new_password(&req.password, &req.password_confirm)?;

    if email_taken(&state.db, email).await? {
        return Err(AppError::Conflict("Email already exists.".to_string()));
    }
    if username_taken(&state.db, username).await? {
        return Err(AppError::Conflict("Username already exists.".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let phone = non_empty(req.phone.clone());
    let user_id = insert_user(
        &state.db,
        NewUser {
            username,
            email,
            phone: phone.as_deref(),
            password_hash: &password_hash,
            role: RoleName::JobSeeker,
            verified: false,
        },
    )
    .await?;
    info!("Registered job seeker {user_id}");

    send_otp(state, user_id, username, email).await?;
    Ok(user_id)
}

/// Issues a fresh code for an existing account. Unknown or deleted accounts
/// are silently ignored so the response does not reveal which emails exist.
pub async fn request_otp(state: &AppState, email: &str) -> Result<(), AppError> {
    match find_user_by_email(&state.db, email).await? {
        Some(user) if !user.is_deleted => send_otp(state, user.id, &user.username, &user.email).await,
        _ => {
            warn!("OTP requested for unknown or deleted account");
            Ok(())
        }
    }
}

/// Checks the code; on success the account is verified and a session starts.
pub async fn verify_otp(state: &AppState, email: &str, otp: &str) -> Result<(UserRow, Uuid), AppError> {
    let user = find_user_by_email(&state.db, email)
        .await?
        .filter(|u| !u.is_deleted)
        .ok_or_else(|| AppError::Validation("The verification code is incorrect.".to_string()))?;

    match check_otp(
        user.registration_otp.as_deref(),
        user.otp_expires_at,
        user.otp_attempts,
        otp,
        Utc::now(),
    ) {
        Ok(()) => {}
        Err(OtpError::Mismatch) => {
            let attempts = record_failed_otp(&state.db, user.id, MAX_OTP_ATTEMPTS).await?;
            warn!("Wrong verification code for user {} ({attempts} attempts)", user.id);
            if attempts >= MAX_OTP_ATTEMPTS {
                return Err(OtpError::TooManyAttempts.into());
            }
            return Err(OtpError::Mismatch.into());
        }
        Err(e) => return Err(e.into()),
    }

    mark_verified(&state.db, user.id).await?;
    let token = start_user_session(&state.db, user.id, state.config.session_ttl_hours).await?;
    info!("User {} verified via OTP", user.id);
    Ok((user, token))
}

pub async fn login(state: &AppState, req: &LoginRequest) -> Result<(UserRow, Uuid), AppError> {
    let invalid = || AppError::Validation("Invalid username or password.".to_string());

    let user = find_user_by_login(&state.db, &req.login)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.password, &user.password_hash) {
        warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }
    if user.is_deleted {
        return Err(AppError::Forbidden(
            "Your account has been deactivated.".to_string(),
        ));
    }
    if !user.verified {
        send_otp(state, user.id, &user.username, &user.email).await?;
        return Err(AppError::Unverified);
    }

    touch_last_login(&state.db, user.id).await?;
    let token = start_user_session(&state.db, user.id, state.config.session_ttl_hours).await?;
    info!("User {} logged in", user.id);
    Ok((user, token))
}

async fn send_otp(state: &AppState, user_id: Uuid, name: &str, email: &str) -> Result<(), AppError> {
    let issued = issue_otp(Utc::now(), state.config.otp_ttl_minutes);
    store_otp(&state.db, user_id, &issued.code, issued.expires_at).await?;

    let mail = OtpEmail::new(
        name,
        &issued.code,
        state.config.otp_ttl_minutes,
        &state.config.site_name,
    )
    .to_mail(email)?;
    mail::dispatch(state.mailer.clone(), mail);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_cannot_look_like_an_email() {
        assert!(validate_username("ravi_k").is_ok());
        assert!(matches!(
            validate_username("a@x.io"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_username("   ").is_err());
    }
}
