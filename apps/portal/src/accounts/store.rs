use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::role::RoleName;
use crate::models::user::{UserRow, USER_COLUMNS};

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1");
    Ok(sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE LOWER(u.email) = LOWER($1)"
    );
    Ok(sqlx::query_as::<_, UserRow>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?)
}

/// Login accepts either the email address or the username. An email match
/// outranks a username match.
pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRow>, AppError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id \
         WHERE LOWER(u.email) = LOWER($1) OR u.username = $1 \
         ORDER BY (LOWER(u.email) = LOWER($1)) DESC LIMIT 1"
    );
    Ok(sqlx::query_as::<_, UserRow>(&sql)
        .bind(login.trim())
        .fetch_optional(pool)
        .await?)
}

pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email.trim())
    .fetch_one(pool)
    .await?)
}

pub async fn username_taken(pool: &PgPool, username: &str) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username.trim())
            .fetch_one(pool)
            .await?,
    )
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: RoleName,
    pub verified: bool,
}

pub async fn insert_user(pool: &PgPool, new: NewUser<'_>) -> Result<Uuid, AppError> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, phone, password_hash, role_id, verified)
        VALUES ($1, LOWER($2), $3, $4, (SELECT id FROM roles WHERE name = $5), $6)
        RETURNING id
        "#,
    )
    .bind(new.username.trim())
    .bind(new.email.trim())
    .bind(new.phone)
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .bind(new.verified)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn store_otp(
    pool: &PgPool,
    user_id: Uuid,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET registration_otp = $1, otp_expires_at = $2, otp_attempts = 0 WHERE id = $3")
        .bind(code)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks the account verified and burns the code so it cannot be replayed.
pub async fn mark_verified(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE users SET verified = TRUE, registration_otp = NULL, otp_expires_at = NULL, \
         otp_attempts = 0, last_login = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Counts a wrong guess and burns the code once `max_attempts` is reached.
/// Returns the updated count.
pub async fn record_failed_otp(pool: &PgPool, user_id: Uuid, max_attempts: i32) -> Result<i32, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        UPDATE users
        SET otp_attempts = otp_attempts + 1,
            registration_otp = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE registration_otp END,
            otp_expires_at = CASE WHEN otp_attempts + 1 >= $2 THEN NULL ELSE otp_expires_at END
        WHERE id = $1
        RETURNING otp_attempts
        "#,
    )
    .bind(user_id)
    .bind(max_attempts)
    .fetch_one(pool)
    .await?)
}

pub async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
