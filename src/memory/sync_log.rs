//! The sync log: agents' Drive folders and every archive ingested so far.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::types::{AgentFolders, ArchiveRecord};
use super::write_atomic;

const ENV_PREFIX: &str = "env:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentFolders>,
    #[serde(default)]
    pub archives: Vec<ArchiveRecord>,
}

impl SyncLog {
    /// Read the log. A missing file is an empty log; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sync log {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse sync log {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }

    /// Whether an archive with this upload name was already ingested.
    pub fn contains(&self, name: &str) -> bool {
        self.archives.iter().any(|a| a.name == name)
    }

    pub fn record(&mut self, record: ArchiveRecord) {
        self.archives.push(record);
    }

    /// Mark an archive as uploaded to Drive. Returns false if the id is unknown.
    pub fn mark_synced(&mut self, id: &str, drive_file_id: &str, at: &str) -> bool {
        match self.archives.iter_mut().find(|a| a.id == id) {
            Some(record) => {
                record.drive_file_id = Some(drive_file_id.to_string());
                record.synced_at = Some(at.to_string());
                true
            }
            None => false,
        }
    }

    pub fn pending_sync(&self) -> impl Iterator<Item = &ArchiveRecord> {
        self.archives.iter().filter(|a| a.synced_at.is_none())
    }

    /// Look up an agent's folders, resolving `env:VARNAME` values through `lookup`.
    pub fn resolve_agent<F>(&self, name: &str, lookup: F) -> Result<AgentFolders>
    where
        F: Fn(&str) -> Option<String>,
    {
        let agent = self
            .agents
            .get(name)
            .with_context(|| format!("agent '{name}' is not configured in the sync log"))?;

        let resolve = |value: &Option<String>| -> Result<Option<String>> {
            match value.as_deref() {
                Some(v) => match v.strip_prefix(ENV_PREFIX) {
                    Some(var) => lookup(var)
                        .filter(|resolved| !resolved.is_empty())
                        .map(Some)
                        .with_context(|| format!("missing environment variable: {var}")),
                    None => Ok(Some(v.to_string())),
                },
                None => Ok(None),
            }
        };

        Ok(AgentFolders {
            unified_folder_id: resolve(&agent.unified_folder_id)?,
            archives_folder_id: resolve(&agent.archives_folder_id)?,
        })
    }
}
