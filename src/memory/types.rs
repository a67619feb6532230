//! Records persisted by the memory store and returned by recall.

use serde::{Deserialize, Serialize};

/// One ingested archive, as kept in the sync log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    /// UUID v7 assigned at ingestion.
    pub id: String,
    /// File name the archive was uploaded with; the duplicate-detection key.
    pub name: String,
    pub agent: String,
    /// Extraction folder name under `memories/`.
    pub folder: String,
    #[serde(default)]
    pub files: usize,
    #[serde(default)]
    pub fragments: usize,
    /// RFC 3339 extraction timestamp.
    pub extracted_at: String,
    #[serde(default)]
    pub drive_file_id: Option<String>,
    #[serde(default)]
    pub synced_at: Option<String>,
}

/// Drive folders belonging to an agent. Values may be `env:VARNAME` references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFolders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unified_folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archives_folder_id: Option<String>,
}

/// A stored fragment and its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub content: String,
    /// `<folder>/<relative path>` of the file the fragment came from.
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecallHit {
    pub score: f32,
    pub text: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub id: String,
    pub name: String,
    pub agent: String,
    pub folder: String,
    pub files: usize,
    pub fragments: usize,
}
