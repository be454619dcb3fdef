//! Database-backed sessions and the extractors that resolve the caller.
//!
//! The token travels in the `omeiat_session` cookie (pages) or an
//! `Authorization: Bearer` header (API clients).

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::store::find_user_by_id;
use crate::errors::AppError;
use crate::institutions::store::find_institution_by_id;
use crate::models::institution::InstitutionRow;
use crate::models::role::RoleName;
use crate::models::user::UserRow;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "omeiat_session";

#[derive(Debug, Clone)]
pub enum Principal {
    User(UserRow),
    Institution(InstitutionRow),
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: Option<Uuid>,
    institution_id: Option<Uuid>,
}

pub async fn start_user_session(pool: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<Uuid, AppError> {
    insert_session(pool, Some(user_id), None, ttl_hours).await
}

pub async fn start_institution_session(
    pool: &PgPool,
    institution_id: Uuid,
    ttl_hours: i64,
) -> Result<Uuid, AppError> {
    insert_session(pool, None, Some(institution_id), ttl_hours).await
}

async fn insert_session(
    pool: &PgPool,
    user_id: Option<Uuid>,
    institution_id: Option<Uuid>,
    ttl_hours: i64,
) -> Result<Uuid, AppError> {
    let token = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, institution_id, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(token)
    .bind(user_id)
    .bind(institution_id)
    .bind(Utc::now() + Duration::hours(ttl_hours))
    .execute(pool)
    .await?;
    Ok(token)
}

pub async fn end_session(pool: &PgPool, token: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolves a token to its principal. Expired sessions and deleted
/// accounts resolve to `None`.
pub async fn resolve_session(pool: &PgPool, token: Uuid) -> Result<Option<Principal>, AppError> {
    let session: Option<SessionRow> = sqlx::query_as(
        "SELECT user_id, institution_id FROM sessions WHERE token = $1 AND expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    if let Some(user_id) = session.user_id {
        let user = find_user_by_id(pool, user_id).await?;
        return Ok(user.filter(|u| !u.is_deleted).map(Principal::User));
    }
    if let Some(institution_id) = session.institution_id {
        let institution = find_institution_by_id(pool, institution_id).await?;
        return Ok(institution.map(Principal::Institution));
    }
    Ok(None)
}

/// Reads the session token from the bearer header first, then the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<Uuid> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|v| v.trim().parse::<Uuid>().ok());
    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .and_then(|c| c.value().parse::<Uuid>().ok())
    })
}

pub fn session_cookie(token: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

async fn principal_from_parts(parts: &Parts, state: &AppState) -> Result<Principal, AppError> {
    let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
    resolve_session(&state.db, token)
        .await?
        .ok_or(AppError::Unauthorized)
}

// ────────────────────────────────────────────────────────────────────────────
// Extractors
// ────────────────────────────────────────────────────────────────────────────

/// A logged-in user account (job seeker or admin).
pub struct CurrentUser(pub UserRow);

/// A logged-in institution.
pub struct CurrentInstitution(pub InstitutionRow);

/// A logged-in user whose role is `admin`.
pub struct AdminUser(pub UserRow);

/// Either kind of principal; used where both may act (notifications).
pub struct AnyPrincipal(pub Principal);

/// The user account if a valid user session is present; pages use this.
pub struct MaybeUser(pub Option<UserRow>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts, state).await? {
            Principal::User(user) => Ok(CurrentUser(user)),
            Principal::Institution(_) => Err(AppError::Forbidden(
                "This action requires a user account".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentInstitution {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts, state).await? {
            Principal::Institution(institution) => Ok(CurrentInstitution(institution)),
            Principal::User(_) => Err(AppError::Forbidden(
                "This action requires an institution account".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role == RoleName::Admin.as_str() {
            Ok(AdminUser(user))
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AnyPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        principal_from_parts(parts, state).await.map(AnyPrincipal)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        match resolve_session(&state.db, token).await? {
            Some(Principal::User(user)) => Ok(MaybeUser(Some(user))),
            _ => Ok(MaybeUser(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_bearer() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(session_token(&headers), Some(token));
    }

    #[test]
    fn test_token_from_cookie() {
        let token = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={token}")).unwrap(),
        );
        assert_eq!(session_token(&headers), Some(token));
    }

    #[test]
    fn test_malformed_token_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie(Uuid::nil(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
