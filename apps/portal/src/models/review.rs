use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
