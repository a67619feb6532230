//! Upload ingested archives to each agent's Drive archive folder.

use anyhow::Result;
use serde::Serialize;

use super::types::ArchiveRecord;
use super::MemoryStore;
use crate::google::drive::{DriveStore, DriveUpload};

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub synced: Vec<SyncedArchive>,
    pub failed: Vec<SyncFailure>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedArchive {
    pub id: String,
    pub name: String,
    pub drive_file_id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Upload every archive not yet synced, then mark the successful ones in the sync log.
///
/// Uploads run without the store lock; the log is re-read before marking so
/// concurrent ingests are not lost. One archive failing does not stop the rest.
pub async fn sync_archives<F>(
    store: &MemoryStore,
    drive: &dyn DriveStore,
    env_lookup: F,
) -> Result<SyncReport>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    let log = {
        let _guard = store.lock().await;
        store.load_log()?
    };
    let pending: Vec<ArchiveRecord> = log.pending_sync().cloned().collect();

    let mut report = SyncReport::default();
    for record in pending {
        match upload_one(store, drive, &log, &record, &env_lookup).await {
            Ok(drive_file_id) => report.synced.push(SyncedArchive {
                id: record.id,
                name: record.name,
                drive_file_id,
            }),
            Err(e) => {
                tracing::error!(archive = %record.name, error = %format!("{e:#}"), "archive sync failed");
                report.failed.push(SyncFailure {
                    id: record.id,
                    name: record.name,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    if !report.synced.is_empty() {
        let _guard = store.lock().await;
        let mut log = store.load_log()?;
        let at = chrono::Utc::now().to_rfc3339();
        for synced in &report.synced {
            log.mark_synced(&synced.id, &synced.drive_file_id, &at);
        }
        log.save(store.sync_log_path())?;
    }

    tracing::info!(synced = report.synced.len(), failed = report.failed.len(), "drive sync finished");
    Ok(report)
}

async fn upload_one<F>(
    store: &MemoryStore,
    drive: &dyn DriveStore,
    log: &super::sync_log::SyncLog,
    record: &ArchiveRecord,
    env_lookup: &F,
) -> Result<String>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    let folders = log.resolve_agent(&record.agent, env_lookup)?;
    let Some(parent) = folders.archives_folder_id else {
        anyhow::bail!("agent '{}' has no archivesFolderId", record.agent);
    };

    let path = store.archive_copy_path(&record.id);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("archive copy {} unreadable: {e}", path.display()))?;

    let file = drive
        .upload(DriveUpload {
            name: record.name.clone(),
            mime_type: "application/zip".into(),
            target_mime_type: None,
            parent: Some(parent),
            bytes,
        })
        .await?;
    Ok(file.id)
}
