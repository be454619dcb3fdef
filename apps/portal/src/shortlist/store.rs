//! Per-job shortlists. Each (job, institution) pair owns at most one
//! shortlist, created the first time a candidate is added.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::models::user::CandidateSummary;
use crate::notifications::store::{notify, Recipient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortlistAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortlistChange {
    pub action: ShortlistAction,
    pub is_shortlisted: bool,
    pub shortlisted_count: i64,
    pub candidate_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkAddOutcome {
    pub added_count: usize,
    pub already_exists_count: usize,
    pub skipped_count: usize,
    pub shortlisted_count: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearOutcome {
    pub cleared_count: i64,
    pub shortlisted_count: i64,
    pub message: String,
}

/// Deduplicates requested ids keeping first-seen order.
pub fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

/// Username of a live user account, or 404.
async fn candidate_name(conn: &mut PgConnection, user_id: Uuid) -> Result<String, AppError> {
    sqlx::query_scalar("SELECT username FROM users WHERE id = $1 AND NOT is_deleted")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Candidate not found".to_string()))
}

async fn find_shortlist_id(
    conn: &mut PgConnection,
    job_id: Uuid,
    institution_id: Uuid,
) -> Result<Option<Uuid>, AppError> {
    Ok(sqlx::query_scalar("SELECT id FROM job_shortlists WHERE job_id = $1 AND institution_id = $2")
        .bind(job_id)
        .bind(institution_id)
        .fetch_optional(conn)
        .await?)
}

async fn ensure_shortlist(
    conn: &mut PgConnection,
    job_id: Uuid,
    institution_id: Uuid,
) -> Result<Uuid, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO job_shortlists (job_id, institution_id) VALUES ($1, $2)
        ON CONFLICT (job_id, institution_id) DO UPDATE SET job_id = EXCLUDED.job_id
        RETURNING id
        "#,
    )
    .bind(job_id)
    .bind(institution_id)
    .fetch_one(conn)
    .await?)
}

async fn contains(conn: &mut PgConnection, shortlist_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM job_shortlist_users WHERE shortlist_id = $1 AND user_id = $2)",
    )
    .bind(shortlist_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?)
}

async fn member_count(conn: &mut PgConnection, shortlist_id: Uuid) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM job_shortlist_users WHERE shortlist_id = $1")
        .bind(shortlist_id)
        .fetch_one(conn)
        .await?)
}

/// Inserts the member and notifies them. Returns false if they were already present.
async fn insert_member(
    conn: &mut PgConnection,
    shortlist_id: Uuid,
    user_id: Uuid,
    job: &JobRow,
) -> Result<bool, AppError> {
    let inserted = sqlx::query(
        "INSERT INTO job_shortlist_users (shortlist_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(shortlist_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?
    .rows_affected()
        > 0;
    if inserted {
        notify(
            &mut *conn,
            Recipient::User(user_id),
            "You have been shortlisted",
            &format!("{} shortlisted you for {}.", job.institution_name, job.title),
        )
        .await?;
    }
    Ok(inserted)
}

async fn delete_member(conn: &mut PgConnection, shortlist_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM job_shortlist_users WHERE shortlist_id = $1 AND user_id = $2")
        .bind(shortlist_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Operations. Callers have already checked that `job` belongs to the institution.
// ────────────────────────────────────────────────────────────────────────────

/// Adds the candidate if absent, removes them if present.
pub async fn toggle(pool: &PgPool, job: &JobRow, user_id: Uuid) -> Result<ShortlistChange, AppError> {
    let mut tx = pool.begin().await?;
    let name = candidate_name(&mut tx, user_id).await?;
    let shortlist_id = ensure_shortlist(&mut tx, job.id, job.posted_by).await?;

    let action = if contains(&mut tx, shortlist_id, user_id).await? {
        delete_member(&mut tx, shortlist_id, user_id).await?;
        ShortlistAction::Removed
    } else {
        insert_member(&mut tx, shortlist_id, user_id, job).await?;
        ShortlistAction::Added
    };
    let shortlisted_count = member_count(&mut tx, shortlist_id).await?;
    tx.commit().await?;

    Ok(change(action, name, shortlisted_count))
}

/// Adds the candidate; adding someone already shortlisted changes nothing.
pub async fn add(pool: &PgPool, job: &JobRow, user_id: Uuid) -> Result<ShortlistChange, AppError> {
    let mut tx = pool.begin().await?;
    let name = candidate_name(&mut tx, user_id).await?;
    let shortlist_id = ensure_shortlist(&mut tx, job.id, job.posted_by).await?;
    insert_member(&mut tx, shortlist_id, user_id, job).await?;
    let shortlisted_count = member_count(&mut tx, shortlist_id).await?;
    tx.commit().await?;

    Ok(change(ShortlistAction::Added, name, shortlisted_count))
}

pub async fn remove(pool: &PgPool, job: &JobRow, user_id: Uuid) -> Result<ShortlistChange, AppError> {
    let mut tx = pool.begin().await?;
    let name = candidate_name(&mut tx, user_id).await?;
    let shortlist_id = find_shortlist_id(&mut tx, job.id, job.posted_by)
        .await?
        .ok_or_else(|| AppError::NotFound("Shortlist not found for this job".to_string()))?;
    if !contains(&mut tx, shortlist_id, user_id).await? {
        return Err(AppError::Validation("Candidate is not in shortlist".to_string()));
    }
    delete_member(&mut tx, shortlist_id, user_id).await?;
    let shortlisted_count = member_count(&mut tx, shortlist_id).await?;
    tx.commit().await?;

    Ok(change(ShortlistAction::Removed, name, shortlisted_count))
}

/// Adds every known candidate in `user_ids`; unknown ids are skipped.
pub async fn bulk_add(pool: &PgPool, job: &JobRow, user_ids: &[Uuid]) -> Result<BulkAddOutcome, AppError> {
    let user_ids = unique_ids(user_ids);
    if user_ids.is_empty() {
        return Err(AppError::Validation("No candidates selected".to_string()));
    }

    let mut tx = pool.begin().await?;
    let shortlist_id = ensure_shortlist(&mut tx, job.id, job.posted_by).await?;
    let mut outcome = BulkAddOutcome::default();
    for user_id in user_ids {
        match candidate_name(&mut tx, user_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                outcome.skipped_count += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
        if insert_member(&mut tx, shortlist_id, user_id, job).await? {
            outcome.added_count += 1;
        } else {
            outcome.already_exists_count += 1;
        }
    }
    outcome.shortlisted_count = member_count(&mut tx, shortlist_id).await?;
    tx.commit().await?;

    outcome.message = format!("Added {} candidates to shortlist", outcome.added_count);
    Ok(outcome)
}

pub async fn clear(pool: &PgPool, job: &JobRow) -> Result<ClearOutcome, AppError> {
    let mut tx = pool.begin().await?;
    let shortlist_id = find_shortlist_id(&mut tx, job.id, job.posted_by)
        .await?
        .ok_or_else(|| AppError::NotFound("Shortlist not found for this job".to_string()))?;
    let cleared_count = sqlx::query("DELETE FROM job_shortlist_users WHERE shortlist_id = $1")
        .bind(shortlist_id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;
    tx.commit().await?;

    Ok(ClearOutcome {
        cleared_count,
        shortlisted_count: 0,
        message: format!("Cleared {cleared_count} candidates from shortlist"),
    })
}

/// Whether the candidate is on the shortlist; 404 when the candidate is unknown.
pub async fn status(pool: &PgPool, job: &JobRow, user_id: Uuid) -> Result<(String, bool), AppError> {
    let name = {
        let mut conn = pool.acquire().await?;
        candidate_name(&mut conn, user_id).await?
    };
    let is_shortlisted = shortlisted_user_ids(pool, job.id, job.posted_by)
        .await?
        .contains(&user_id);
    Ok((name, is_shortlisted))
}

pub async fn shortlist_count(pool: &PgPool, job_id: Uuid, institution_id: Uuid) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        SELECT COUNT(su.user_id)
        FROM job_shortlists s
        JOIN job_shortlist_users su ON su.shortlist_id = s.id
        WHERE s.job_id = $1 AND s.institution_id = $2
        "#,
    )
    .bind(job_id)
    .bind(institution_id)
    .fetch_one(pool)
    .await?)
}

pub async fn shortlisted_user_ids(pool: &PgPool, job_id: Uuid, institution_id: Uuid) -> Result<Vec<Uuid>, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        SELECT su.user_id
        FROM job_shortlists s
        JOIN job_shortlist_users su ON su.shortlist_id = s.id
        WHERE s.job_id = $1 AND s.institution_id = $2
        "#,
    )
    .bind(job_id)
    .bind(institution_id)
    .fetch_all(pool)
    .await?)
}

/// Every (job, user) pair shortlisted by the institution.
pub async fn shortlisted_pairs(pool: &PgPool, institution_id: Uuid) -> Result<Vec<(Uuid, Uuid)>, AppError> {
    Ok(sqlx::query_as(
        r#"
        SELECT s.job_id, su.user_id
        FROM job_shortlists s
        JOIN job_shortlist_users su ON su.shortlist_id = s.id
        WHERE s.institution_id = $1
        "#,
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await?)
}

pub async fn list_candidates(
    pool: &PgPool,
    job_id: Uuid,
    institution_id: Uuid,
) -> Result<Vec<CandidateSummary>, AppError> {
    Ok(sqlx::query_as(
        r#"
        SELECT u.id, u.username, u.email, u.phone, u.qualification,
               u.working_experience_years, u.profile_percentage
        FROM job_shortlists s
        JOIN job_shortlist_users su ON su.shortlist_id = s.id
        JOIN users u ON u.id = su.user_id
        WHERE s.job_id = $1 AND s.institution_id = $2
        ORDER BY su.added_at DESC
        "#,
    )
    .bind(job_id)
    .bind(institution_id)
    .fetch_all(pool)
    .await?)
}

fn change(action: ShortlistAction, candidate_name: String, shortlisted_count: i64) -> ShortlistChange {
    let message = match action {
        ShortlistAction::Added => format!("{candidate_name} added to shortlist"),
        ShortlistAction::Removed => format!("{candidate_name} removed from shortlist"),
    };
    ShortlistChange {
        action,
        is_shortlisted: action == ShortlistAction::Added,
        shortlisted_count,
        candidate_name,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(unique_ids(&[a, b, a, b]), vec![a, b]);
        assert!(unique_ids(&[]).is_empty());
    }

    #[test]
    fn test_change_message_and_flag() {
        let added = change(ShortlistAction::Added, "meena".into(), 3);
        assert!(added.is_shortlisted);
        assert_eq!(added.message, "meena added to shortlist");

        let removed = change(ShortlistAction::Removed, "meena".into(), 2);
        assert!(!removed.is_shortlisted);
        assert_eq!(
            serde_json::to_value(removed.action).unwrap(),
            serde_json::json!("removed")
        );
    }
}
