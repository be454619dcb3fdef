use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::mail::Mailer;
use crate::storage::MediaStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// SMTP when configured, otherwise a mailer that only logs.
    pub mailer: Arc<dyn Mailer>,
    /// Absent when no bucket is configured; uploads then fail with a storage error.
    pub media: Option<MediaStore>,
}
