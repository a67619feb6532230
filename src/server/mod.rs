//! HTTP server: shared state, routing, and startup.
//!
//! [`AppState::from_config`] wires the production clients (OpenAI, Google,
//! SMTP) together; tests build an [`AppState`] by hand with fakes and drive
//! [`router`] directly.

pub mod auth;
pub mod extract;
mod routes;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::activity::ActivityLog;
use crate::completion::{ChatProvider, OpenAiChat};
use crate::config::{expand_tilde, LiamConfig};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::ApiError;
use crate::google::drive::{DriveStore, GoogleDrive};
use crate::google::sheets::{Contacts, SheetsContacts};
use crate::google::GoogleAuth;
use crate::mail::{MailSender, SmtpMailer};
use crate::memory::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LiamConfig>,
    pub chat: Arc<dyn ChatProvider>,
    pub embedding: Arc<dyn EmbeddingProvider>,
    pub contacts: Arc<dyn Contacts>,
    pub mailer: Arc<dyn MailSender>,
    pub drive: Arc<dyn DriveStore>,
    pub store: Arc<MemoryStore>,
    pub activity: Arc<ActivityLog>,
}

impl AppState {
    pub fn from_config(config: LiamConfig) -> Result<Self> {
        let google_auth = Arc::new(GoogleAuth::new(&config.google)?);
        if !google_auth.is_configured() {
            tracing::warn!("Google credentials missing; contacts lookup and Drive routes will fail");
        }

        let embedding: Arc<dyn EmbeddingProvider> = Arc::from(embedding::create_provider(&config)?);
        tracing::info!(model = %embedding.model_name(), "embedding provider ready");

        let mailer = SmtpMailer::new(&config.mail)?;
        if !mailer.is_configured() {
            tracing::warn!("SMTP credentials missing; email routes will fail");
        }

        Ok(Self {
            chat: Arc::new(OpenAiChat::new(&config.completion)?),
            embedding,
            contacts: Arc::new(SheetsContacts::new(Arc::clone(&google_auth), &config.google)?),
            mailer: Arc::new(mailer),
            drive: Arc::new(GoogleDrive::new(google_auth, &config.google)?),
            store: Arc::new(MemoryStore::new(&config)),
            activity: Arc::new(ActivityLog::new(config.server.activity_capacity)),
            config: Arc::new(config),
        })
    }

    /// Record a failed relay in the activity log and convert it for the response.
    pub fn failure(&self, route: &str, err: anyhow::Error) -> ApiError {
        self.activity.error(format!("{route}: {err:#}"));
        err.into()
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(routes::health::banner))
        .route("/ping", get(routes::health::ping))
        .route("/health", get(routes::health::health))
        .route("/admin/login", post(routes::admin::login));

    let protected = Router::new()
        .route("/ask-liam", post(routes::relay::ask_liam))
        .route("/prompt", post(routes::relay::prompt))
        .route("/send-email", post(routes::relay::send_email))
        .route("/upload-memory", post(routes::memory::upload_memory))
        .route("/memories", get(routes::memory::list_memories))
        .route("/recall", post(routes::memory::recall))
        .route("/drive/files", get(routes::drive::list_files))
        .route("/drive/upload", post(routes::drive::upload_file))
        .route("/drive/docs", post(routes::drive::create_doc))
        .route("/sync", post(routes::drive::sync))
        .route_layer(from_fn_with_state(state.clone(), auth::require_token));

    let admin = Router::new()
        .route("/admin/logs", get(routes::admin::logs))
        .route("/admin/reindex", post(routes::admin::reindex))
        .route("/admin/reset", post(routes::admin::reset))
        .route_layer(from_fn_with_state(state.clone(), auth::require_admin));

    let mut app = public
        .merge(protected)
        .merge(admin)
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes));

    if let Some(dir) = &state.config.server.dashboard_dir {
        app = app.nest_service("/dashboard", ServeDir::new(expand_tilde(dir)));
    }

    app.with_state(state)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(config: LiamConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    if config.auth.api_token.is_none() {
        tracing::warn!("LIAM_API_TOKEN is not set; protected routes will reject every request");
    }
    if config.auth.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; admin routes are disabled");
    }

    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Liam listening at http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
