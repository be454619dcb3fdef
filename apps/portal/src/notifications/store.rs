use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::accounts::session::Principal;
use crate::errors::AppError;
use crate::models::notification::NotificationRow;

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    Institution(Uuid),
}

impl Recipient {
    fn columns(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Recipient::User(id) => (Some(*id), None),
            Recipient::Institution(id) => (None, Some(*id)),
        }
    }
}

impl From<&Principal> for Recipient {
    fn from(principal: &Principal) -> Self {
        match principal {
            Principal::User(user) => Recipient::User(user.id),
            Principal::Institution(institution) => Recipient::Institution(institution.id),
        }
    }
}

/// Accepts a pool or an open transaction so callers can notify atomically.
pub async fn notify<'e>(
    executor: impl PgExecutor<'e>,
    recipient: Recipient,
    title: &str,
    message: &str,
) -> Result<Uuid, AppError> {
    let (user_id, institution_id) = recipient.columns();
    Ok(sqlx::query_scalar(
        "INSERT INTO notifications (user_id, institution_id, title, message) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(user_id)
    .bind(institution_id)
    .bind(title)
    .bind(message)
    .fetch_one(executor)
    .await?)
}

pub async fn list_notifications(pool: &PgPool, recipient: Recipient) -> Result<Vec<NotificationRow>, AppError> {
    let (user_id, institution_id) = recipient.columns();
    Ok(sqlx::query_as(
        r#"
        SELECT id, user_id, institution_id, title, message, is_read, created_at
        FROM notifications
        WHERE user_id IS NOT DISTINCT FROM $1 AND institution_id IS NOT DISTINCT FROM $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(institution_id)
    .fetch_all(pool)
    .await?)
}

/// Marks one notification read. Someone else's notification is reported missing.
pub async fn mark_read(pool: &PgPool, recipient: Recipient, id: Uuid) -> Result<(), AppError> {
    let (user_id, institution_id) = recipient.columns();
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE \
         WHERE id = $1 AND user_id IS NOT DISTINCT FROM $2 AND institution_id IS NOT DISTINCT FROM $3",
    )
    .bind(id)
    .bind(user_id)
    .bind(institution_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(())
}

pub async fn mark_all_read(pool: &PgPool, recipient: Recipient) -> Result<u64, AppError> {
    let (user_id, institution_id) = recipient.columns();
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE \
         WHERE NOT is_read AND user_id IS NOT DISTINCT FROM $1 AND institution_id IS NOT DISTINCT FROM $2",
    )
    .bind(user_id)
    .bind(institution_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_columns_are_exclusive() {
        let id = Uuid::new_v4();
        assert_eq!(Recipient::User(id).columns(), (Some(id), None));
        assert_eq!(Recipient::Institution(id).columns(), (None, Some(id)));
    }
}
