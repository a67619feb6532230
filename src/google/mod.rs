//! Google Workspace clients: OAuth2 token refresh, Sheets contact lookup, and Drive files.
//!
//! Both [`sheets::SheetsContacts`] and [`drive::GoogleDrive`] share one
//! [`GoogleAuth`], which exchanges the configured refresh token for short-lived
//! access tokens and caches them until shortly before expiry.

pub mod drive;
pub mod sheets;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::GoogleConfig;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

pub struct GoogleAuth {
    client: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleAuth {
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cached: Mutex::new(None),
        })
    }

    /// True when all three OAuth credentials are present.
    pub fn is_configured(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some() && self.refresh_token.is_some()
    }

    /// Return a valid access token, refreshing it if the cached one is stale.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.refresh_token.as_deref(),
        ) else {
            anyhow::bail!(
                "Google credentials are not configured \
                 (GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, GOOGLE_REFRESH_TOKEN)"
            );
        };

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Google token request failed")?;
        let token: TokenResponse = read_json(response, "token refresh").await?;

        tracing::debug!(expires_in = token.expires_in, "refreshed Google access token");

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }
}

pub(crate) fn http_client(config: &GoogleConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build Google HTTP client")
}

/// Append path segments to a base URL, percent-encoding each one.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url =
        reqwest::Url::parse(base).with_context(|| format!("invalid Google API base URL: {base}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Google API base URL cannot be a base: {base}"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Decode a successful JSON response, or turn a non-2xx status into an error with the body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("Google {what} returned HTTP {status}: {text}");
    }
    response
        .json()
        .await
        .with_context(|| format!("failed to decode Google {what} response"))
}
