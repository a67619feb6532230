//! Write path: duplicate check, extraction, fragmenting, embedding, and log update.
//!
//! [`ingest_archive`] is the single entry point for new archives. [`reindex`]
//! rebuilds the whole index from the extraction folders recorded in the sync
//! log, and [`reset`] wipes everything except the agent configuration.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use super::archive;
use super::chunk::{read_text_files, split_fragments};
use super::index::VectorIndex;
use super::types::{ArchiveRecord, IndexEntry, IngestReport};
use super::sync_log::SyncLog;
use super::MemoryStore;
use crate::embedding::EmbeddingProvider;
use crate::error::MemoryError;

const EMBED_BATCH_SIZE: usize = 32;

/// A piece of text awaiting embedding, tagged with where it came from.
struct Fragment {
    source: String,
    text: String,
}

/// Full ingest pipeline for an uploaded archive.
///
/// The store lock is held throughout, so concurrent uploads are applied one at a time.
/// A failure at any step leaves the store as it was: the extraction folder and
/// archive copy are removed and the index is restored.
pub async fn ingest_archive(
    store: &MemoryStore,
    embedder: &dyn EmbeddingProvider,
    zip_path: &Path,
    original_name: &str,
    agent: &str,
) -> Result<IngestReport> {
    let _guard = store.lock().await;

    // 1. Duplicate gate
    let log = store.load_log()?;
    if log.contains(original_name) {
        return Err(MemoryError::DuplicateArchive(original_name.to_string()).into());
    }

    let id = uuid::Uuid::now_v7().to_string();
    let extracted_at = Utc::now();
    let tag = id.rsplit('-').next().unwrap_or(&id);
    let folder = archive::folder_name(original_name, extracted_at, tag);
    let dest = store.memories_dir().join(&folder);
    if dest.exists() {
        anyhow::bail!("extraction folder {} already exists", dest.display());
    }

    tracing::info!(archive = %original_name, folder = %folder, agent = %agent, "ingesting archive");

    // 2. Extract and fragment (blocking file IO)
    let (files, fragments) = {
        let zip_path = zip_path.to_path_buf();
        let target = dest.clone();
        let folder_name = folder.clone();
        let chunk_chars = store.chunk_chars();
        let limits = store.extract_limits();
        tokio::task::spawn_blocking(move || -> Result<(usize, Vec<Fragment>)> {
            let written = archive::extract_zip(&zip_path, &target, limits)?;
            let fragments = fragments_for_folder(&target, &folder_name, &written, chunk_chars)?;
            Ok((written.len(), fragments))
        })
        .await
        .context("extraction task failed")?
        .inspect_err(|_| remove_dir_quietly(&dest))?
    };

    if fragments.is_empty() {
        remove_dir_quietly(&dest);
        return Err(MemoryError::EmptyArchive(original_name.to_string()).into());
    }

    // 3. Embed
    let entries = embed_fragments(embedder, fragments, |_| {})
        .await
        .inspect_err(|_| remove_dir_quietly(&dest))?;
    let fragment_count = entries.len();

    // 4. Keep a copy for Drive sync, append to the index, record in the log
    let commit = Commit {
        zip_path: zip_path.to_path_buf(),
        copy_path: store.archive_copy_path(&id),
        index_path: store.index_path().to_path_buf(),
        log_path: store.sync_log_path().to_path_buf(),
        entries,
        log,
        record: ArchiveRecord {
            id: id.clone(),
            name: original_name.to_string(),
            agent: agent.to_string(),
            folder: folder.clone(),
            files,
            fragments: fragment_count,
            extracted_at: extracted_at.to_rfc3339(),
            drive_file_id: None,
            synced_at: None,
        },
    };
    tokio::task::spawn_blocking(move || commit.apply())
        .await
        .context("index write task failed")
        .and_then(|result| result)
        .inspect_err(|_| remove_dir_quietly(&dest))?;

    tracing::info!(id = %id, files, fragments = fragment_count, "archive ingested");

    Ok(IngestReport {
        id,
        name: original_name.to_string(),
        agent: agent.to_string(),
        folder,
        files,
        fragments: fragment_count,
    })
}

/// The durable half of an ingest: archive copy, index append, and log record.
struct Commit {
    zip_path: PathBuf,
    copy_path: PathBuf,
    index_path: PathBuf,
    log_path: PathBuf,
    entries: Vec<IndexEntry>,
    log: SyncLog,
    record: ArchiveRecord,
}

impl Commit {
    /// Apply all three writes or none of them.
    fn apply(self) -> Result<()> {
        let copy_path = self.copy_path.clone();
        self.write_all()
            .inspect_err(|_| remove_file_quietly(&copy_path))
    }

    fn write_all(mut self) -> Result<()> {
        if let Some(parent) = self.copy_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::copy(&self.zip_path, &self.copy_path).with_context(|| {
            format!("failed to store archive copy at {}", self.copy_path.display())
        })?;

        let index_existed = self.index_path.exists();
        let mut index = VectorIndex::load_or_default(&self.index_path)?;
        let before = index.len();
        index.extend(self.entries);
        index.save(&self.index_path)?;

        self.log.record(self.record);
        if let Err(e) = self.log.save(&self.log_path) {
            index.truncate(before);
            let restored = if index_existed {
                index.save(&self.index_path)
            } else {
                std::fs::remove_file(&self.index_path).map_err(Into::into)
            };
            if let Err(restore_err) = restored {
                tracing::error!(error = %format!("{restore_err:#}"), "failed to roll back memory index");
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Rebuild the index from every folder recorded in the sync log.
///
/// `progress` receives the number of fragments embedded so far. Returns the total
/// fragment count. Folders that no longer exist are skipped with a warning.
pub async fn reindex<F>(
    store: &MemoryStore,
    embedder: &dyn EmbeddingProvider,
    progress: F,
) -> Result<usize>
where
    F: Fn(usize) + Send + Sync,
{
    let _guard = store.lock().await;
    let mut log = store.load_log()?;

    let mut all_fragments = Vec::new();
    let mut per_archive = Vec::with_capacity(log.archives.len());
    for record in &log.archives {
        let dir = store.memories_dir().join(&record.folder);
        if !dir.is_dir() {
            tracing::warn!(folder = %record.folder, "extraction folder missing, skipping");
            per_archive.push((record.files, 0));
            continue;
        }
        let files = archive::list_files(&dir)?;
        let fragments = fragments_for_folder(&dir, &record.folder, &files, store.chunk_chars())?;
        per_archive.push((files.len(), fragments.len()));
        all_fragments.extend(fragments);
    }

    let entries = embed_fragments(embedder, all_fragments, progress).await?;
    let total = entries.len();

    VectorIndex::new(entries).save(store.index_path())?;

    for (record, (files, fragments)) in log.archives.iter_mut().zip(per_archive) {
        record.files = files;
        record.fragments = fragments;
    }
    log.save(store.sync_log_path())?;

    tracing::info!(archives = log.archives.len(), fragments = total, model = %embedder.model_name(), "index rebuilt");
    Ok(total)
}

/// Remove the index, extracted folders, archive copies, and archive records.
///
/// Agent folder configuration in the sync log is kept. Returns the number of
/// archive records removed.
pub async fn reset(store: &MemoryStore) -> Result<usize> {
    let _guard = store.lock().await;
    let mut log = store.load_log()?;
    let removed = log.archives.len();

    if store.index_path().exists() {
        std::fs::remove_file(store.index_path())
            .with_context(|| format!("failed to remove {}", store.index_path().display()))?;
    }
    for dir in [store.memories_dir(), store.archives_dir()] {
        if dir.exists() {
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
    }

    log.archives.clear();
    log.save(store.sync_log_path())?;

    tracing::info!(removed, "memory store reset");
    Ok(removed)
}

fn fragments_for_folder(
    root: &Path,
    folder: &str,
    files: &[PathBuf],
    chunk_chars: usize,
) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();
    for (relative, text) in read_text_files(root, files)? {
        let source = format!("{folder}/{}", relative.to_string_lossy().replace('\\', "/"));
        for piece in split_fragments(&text, chunk_chars) {
            fragments.push(Fragment {
                source: source.clone(),
                text: piece,
            });
        }
    }
    Ok(fragments)
}

async fn embed_fragments<F>(
    embedder: &dyn EmbeddingProvider,
    fragments: Vec<Fragment>,
    progress: F,
) -> Result<Vec<IndexEntry>>
where
    F: Fn(usize) + Send + Sync,
{
    let mut entries = Vec::with_capacity(fragments.len());
    for batch in fragments.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|f| f.text.clone()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .context("embedding batch failed")?;
        anyhow::ensure!(
            vectors.len() == batch.len(),
            "embedding provider returned {} vectors for {} fragments",
            vectors.len(),
            batch.len()
        );

        for (fragment, embedding) in batch.iter().zip(vectors) {
            entries.push(IndexEntry {
                embedding,
                content: fragment.text.clone(),
                source: fragment.source.clone(),
            });
        }
        progress(entries.len());
    }
    Ok(entries)
}

fn remove_dir_quietly(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to clean up extraction folder")
        }
    }
}

fn remove_file_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to clean up archive copy"),
    }
}
