//! Recipient lookup in the contacts spreadsheet (column A name, column B address).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{api_url, http_client, read_json, GoogleAuth};
use crate::config::GoogleConfig;

/// Resolves a display name to an email address.
#[async_trait]
pub trait Contacts: Send + Sync {
    async fn resolve_email(&self, name: &str) -> Result<Option<String>>;
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsContacts {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    base_url: String,
    sheet_id: Option<String>,
    range: String,
}

impl SheetsContacts {
    pub fn new(auth: Arc<GoogleAuth>, config: &GoogleConfig) -> Result<Self> {
        Ok(Self {
            auth,
            client: http_client(config)?,
            base_url: config.sheets_base_url.clone(),
            sheet_id: config.sheet_id.clone(),
            range: config.contacts_range.clone(),
        })
    }
}

#[async_trait]
impl Contacts for SheetsContacts {
    async fn resolve_email(&self, name: &str) -> Result<Option<String>> {
        let sheet_id = self
            .sheet_id
            .as_deref()
            .context("contacts sheet is not configured (GOOGLE_SHEET_ID)")?;
        let token = self.auth.access_token().await?;
        let url = api_url(
            &self.base_url,
            &["v4", "spreadsheets", sheet_id, "values", self.range.as_str()],
        )?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("contacts sheet request failed")?;
        let range: ValueRange = read_json(response, "sheets values").await?;

        let found = find_email(&range.values, name);
        tracing::debug!(rows = range.values.len(), found = found.is_some(), "contacts lookup");
        Ok(found)
    }
}

/// First row whose first cell matches `name` case-insensitively; returns its second cell.
pub fn find_email(rows: &[Vec<String>], name: &str) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    rows.iter()
        .find(|row| row.first().is_some_and(|cell| cell.trim().to_lowercase() == wanted))
        .and_then(|row| row.get(1))
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
}
