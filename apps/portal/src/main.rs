mod accounts;
mod admin;
mod applications;
mod config;
mod db;
mod errors;
mod institutions;
mod jobs;
mod mail;
mod models;
mod notifications;
mod pages;
mod pagination;
mod routes;
mod shortlist;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::admin::bootstrap::ensure_admin;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::MediaStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} portal v{}", config.site_name, env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and bring the schema up to date
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    if let Some(admin) = &config.admin {
        ensure_admin(&db, admin).await?;
    }

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!("SMTP mailer configured for {}", smtp.host);
            Arc::new(SmtpMailer::new(smtp.clone(), config.site_name.clone()))
        }
        None => {
            warn!("SMTP_HOST not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    // Initialize S3 / MinIO
    let media = match &config.s3 {
        Some(s3) => {
            let store = MediaStore::connect(s3).await;
            info!("Media store initialized (bucket: {})", s3.bucket);
            Some(store)
        }
        None => {
            warn!("S3_BUCKET not set; picture and logo uploads are disabled");
            None
        }
    };

    let state = AppState {
        db,
        config: config.clone(),
        mailer,
        media,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
