//! ZIP memory ingestion and similarity recall.
//!
//! Uploaded archives are extracted under `memories/`, split into text
//! fragments, embedded, and appended to a flat JSON vector index. The sync log
//! remembers which archives were ingested so the same file is never extracted
//! twice. [`MemoryStore`] owns the on-disk layout and serialises every
//! read-modify-write of the log and index.

pub mod archive;
pub mod chunk;
pub mod index;
pub mod ingest;
pub mod sync;
pub mod sync_log;
pub mod types;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};

use crate::config::LiamConfig;
use archive::ExtractLimits;
use sync_log::SyncLog;

/// On-disk layout of the memory store plus the writer lock.
pub struct MemoryStore {
    sync_log_path: PathBuf,
    index_path: PathBuf,
    memories_dir: PathBuf,
    archives_dir: PathBuf,
    chunk_chars: usize,
    extract_limits: ExtractLimits,
    max_top_k: usize,
    lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new(config: &LiamConfig) -> Self {
        Self {
            sync_log_path: config.sync_log_path(),
            index_path: config.index_path(),
            memories_dir: config.memories_dir(),
            archives_dir: config.archives_dir(),
            chunk_chars: config.retrieval.chunk_chars.max(1),
            extract_limits: ExtractLimits {
                max_bytes: config.storage.max_extracted_bytes,
                max_entries: config.storage.max_archive_entries,
            },
            max_top_k: config.retrieval.max_top_k.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Hold this while reading-then-writing the sync log or index.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn sync_log_path(&self) -> &Path {
        &self.sync_log_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn memories_dir(&self) -> &Path {
        &self.memories_dir
    }

    pub fn archives_dir(&self) -> &Path {
        &self.archives_dir
    }

    pub fn chunk_chars(&self) -> usize {
        self.chunk_chars
    }

    /// Ceiling applied to every recall.
    pub fn max_top_k(&self) -> usize {
        self.max_top_k
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        self.extract_limits
    }

    pub fn load_log(&self) -> Result<SyncLog> {
        SyncLog::load(&self.sync_log_path)
    }

    /// Stored copy of an ingested archive.
    pub fn archive_copy_path(&self, id: &str) -> PathBuf {
        self.archives_dir.join(format!("{id}.zip"))
    }
}

/// Replace `path` with `bytes` via a temporary sibling and rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(bytes).context("failed to write temp file")?;
    tmp.as_file().sync_all().context("failed to flush temp file")?;
    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
