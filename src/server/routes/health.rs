use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::server::AppState;

pub async fn banner() -> &'static str {
    "Liam is live with GPT, Gmail, Google Sheets, and Drive integration!"
}

/// Liveness check: always returns 200 to indicate the process is running.
pub async fn ping() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

fn configured(ok: bool) -> &'static str {
    if ok {
        "configured"
    } else {
        "missing"
    }
}

/// Reports which integrations are configured and whether a memory index exists.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    let google = config.google.client_id.is_some()
        && config.google.client_secret.is_some()
        && config.google.refresh_token.is_some();
    let mail = config.mail.username.is_some() && config.mail.password.is_some();
    let index = if state.store.index_path().exists() {
        "present"
    } else {
        "missing"
    };

    Json(json!({
        "status": "ok",
        "checks": {
            "completion": configured(config.completion.api_key.is_some()),
            "google": configured(google),
            "contactsSheet": configured(config.google.sheet_id.is_some()),
            "mail": configured(mail),
            "apiToken": configured(config.auth.api_token.is_some()),
            "memoryIndex": index,
        }
    }))
}
