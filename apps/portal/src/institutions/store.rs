use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::institution::{ApprovalRow, ApprovalStatus, InstitutionCategory, InstitutionRow};

pub const INSTITUTION_COLUMNS: &str = r#"
    id, name, category, email, password_hash, phone, website, about, year_established,
    board, is_omeiat_member, omeiat_member_since, logo, approval_status, created_at
"#;

pub async fn find_institution_by_id(pool: &PgPool, id: Uuid) -> Result<Option<InstitutionRow>, AppError> {
    let sql = format!("SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE id = $1");
    Ok(sqlx::query_as::<_, InstitutionRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_institution_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<InstitutionRow>, AppError> {
    let sql = format!("SELECT {INSTITUTION_COLUMNS} FROM institutions WHERE LOWER(email) = LOWER($1)");
    Ok(sqlx::query_as::<_, InstitutionRow>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?)
}

pub async fn institution_email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM institutions WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email.trim())
    .fetch_one(pool)
    .await?)
}

pub async fn list_institutions(
    pool: &PgPool,
    status: Option<ApprovalStatus>,
) -> Result<Vec<InstitutionRow>, AppError> {
    let sql = format!(
        "SELECT {INSTITUTION_COLUMNS} FROM institutions \
         WHERE ($1::TEXT IS NULL OR approval_status = $1) ORDER BY created_at DESC"
    );
    Ok(sqlx::query_as::<_, InstitutionRow>(&sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(pool)
        .await?)
}

pub struct NewInstitution<'a> {
    pub name: &'a str,
    pub category: InstitutionCategory,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: &'a str,
    pub website: Option<&'a str>,
    pub about: Option<&'a str>,
    pub board: Option<&'a str>,
    pub year_established: Option<i32>,
}

/// Inserts a pending institution and its first approval row in one transaction.
pub async fn insert_institution(pool: &PgPool, new: NewInstitution<'_>) -> Result<Uuid, AppError> {
    let mut tx = pool.begin().await?;
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO institutions
            (name, category, email, password_hash, phone, website, about, board, year_established)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(new.name)
    .bind(new.category.as_str())
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.phone)
    .bind(new.website)
    .bind(new.about)
    .bind(new.board)
    .bind(new.year_established)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO institution_approvals (institution_id, status) VALUES ($1, $2)")
        .bind(id)
        .bind(ApprovalStatus::Pending.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(id)
}

/// Sets the approval status and records who decided, in one transaction.
/// Sets the approval status and appends the audit row. Runs on the caller's
/// connection so the decision can share a transaction with its notification.
pub async fn record_approval(
    conn: &mut PgConnection,
    institution_id: Uuid,
    status: ApprovalStatus,
    remarks: Option<&str>,
    reviewed_by: Uuid,
) -> Result<ApprovalRow, AppError> {
    let updated = sqlx::query("UPDATE institutions SET approval_status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(institution_id)
        .execute(&mut *conn)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Institution {institution_id} not found")));
    }

    let row: ApprovalRow = sqlx::query_as(
        r#"
        INSERT INTO institution_approvals (institution_id, status, remarks, reviewed_by)
        VALUES ($1, $2, $3, $4)
        RETURNING id, institution_id, status, remarks, reviewed_by, reviewed_at
        "#,
    )
    .bind(institution_id)
    .bind(status.as_str())
    .bind(remarks)
    .bind(reviewed_by)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn approval_history(pool: &PgPool, institution_id: Uuid) -> Result<Vec<ApprovalRow>, AppError> {
    Ok(sqlx::query_as(
        "SELECT id, institution_id, status, remarks, reviewed_by, reviewed_at \
         FROM institution_approvals WHERE institution_id = $1 ORDER BY reviewed_at DESC",
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await?)
}
