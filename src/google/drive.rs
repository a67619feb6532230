//! Google Drive v3: multipart uploads, Google Doc creation, and folder listings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{api_url, http_client, read_json, GoogleAuth};
use crate::config::GoogleConfig;

pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

/// A file to create in Drive.
#[derive(Debug, Clone)]
pub struct DriveUpload {
    pub name: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Drive-side type to convert into (e.g. [`GOOGLE_DOC_MIME`]).
    pub target_mime_type: Option<String>,
    pub parent: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait DriveStore: Send + Sync {
    async fn upload(&self, upload: DriveUpload) -> Result<DriveFile>;

    async fn list(&self, parent: Option<&str>) -> Result<Vec<DriveFile>>;

    /// Create a Google Doc whose body is `content`.
    async fn create_doc(
        &self,
        title: &str,
        content: &str,
        parent: Option<&str>,
    ) -> Result<DriveFile> {
        self.upload(DriveUpload {
            name: title.to_string(),
            mime_type: "text/plain".into(),
            target_mime_type: Some(GOOGLE_DOC_MIME.into()),
            parent: parent.map(str::to_string),
            bytes: content.as_bytes().to_vec(),
        })
        .await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct GoogleDrive {
    auth: Arc<GoogleAuth>,
    client: reqwest::Client,
    drive_base_url: String,
    upload_base_url: String,
}

impl GoogleDrive {
    pub fn new(auth: Arc<GoogleAuth>, config: &GoogleConfig) -> Result<Self> {
        Ok(Self {
            auth,
            client: http_client(config)?,
            drive_base_url: config.drive_base_url.clone(),
            upload_base_url: config.upload_base_url.clone(),
        })
    }
}

#[async_trait]
impl DriveStore for GoogleDrive {
    async fn upload(&self, upload: DriveUpload) -> Result<DriveFile> {
        let metadata = FileMetadata {
            name: &upload.name,
            mime_type: upload.target_mime_type.as_deref(),
            parents: upload.parent.as_deref().into_iter().collect(),
        };
        let metadata_json = serde_json::to_vec(&metadata)?;
        let boundary = format!("liam-{}", uuid::Uuid::now_v7().simple());
        let body = multipart_related_body(&boundary, &metadata_json, &upload.mime_type, &upload.bytes);

        let token = self.auth.access_token().await?;
        let url = api_url(&self.upload_base_url, &["drive", "v3", "files"])?;
        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .context("Drive upload request failed")?;
        let file: DriveFile = read_json(response, "drive upload").await?;

        tracing::info!(id = %file.id, name = %file.name, bytes = upload.bytes.len(), "uploaded to Drive");
        Ok(file)
    }

    async fn list(&self, parent: Option<&str>) -> Result<Vec<DriveFile>> {
        let query = match parent {
            Some(folder) => format!("{} in parents and trashed = false", quote_query_value(folder)),
            None => "trashed = false".to_string(),
        };
        let fields = format!("files({FILE_FIELDS})");

        let token = self.auth.access_token().await?;
        let url = api_url(&self.drive_base_url, &["drive", "v3", "files"])?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", "modifiedTime desc"),
                ("pageSize", "100"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .context("Drive list request failed")?;
        let list: FileList = read_json(response, "drive list").await?;
        Ok(list.files)
    }
}

/// Quote a value for a Drive `q` expression, escaping backslashes before quotes.
pub fn quote_query_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Build a two-part `multipart/related` body: JSON metadata, then the media bytes.
pub fn multipart_related_body(
    boundary: &str,
    metadata_json: &[u8],
    media_mime: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata_json.len() + media.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(metadata_json);
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {media_mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
