//! ZIP extraction into timestamped memory folders.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::MemoryError;

/// Caps applied while extracting an untrusted archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Total decompressed bytes across all entries.
    pub max_bytes: u64,
    pub max_entries: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_bytes: 512 * 1024 * 1024,
            max_entries: 10_000,
        }
    }
}

/// Extract every file of `zip_path` into the new folder `dest`, returning relative paths of written files.
///
/// `dest` must not exist yet. Entries whose names would escape `dest` are skipped.
/// Exceeding `limits` fails with [`MemoryError::InvalidArchive`].
pub fn extract_zip(zip_path: &Path, dest: &Path, limits: ExtractLimits) -> Result<Vec<PathBuf>> {
    let file = File::open(zip_path)
        .with_context(|| format!("failed to open archive {}", zip_path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| MemoryError::InvalidArchive(e.to_string()))?;
    if archive.len() > limits.max_entries {
        return Err(MemoryError::InvalidArchive(format!(
            "{} entries exceeds the limit of {}",
            archive.len(),
            limits.max_entries
        ))
        .into());
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::create_dir(dest).with_context(|| format!("failed to create {}", dest.display()))?;

    let mut written = Vec::new();
    let mut total: u64 = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| MemoryError::InvalidArchive(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %entry.name(), "skipping zip entry outside extraction folder");
            continue;
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
            continue;
        }

        let remaining = limits.max_bytes.saturating_sub(total);
        let too_large = || {
            MemoryError::InvalidArchive(format!(
                "contents expand beyond {} bytes",
                limits.max_bytes
            ))
        };
        if entry.size() > remaining {
            return Err(too_large().into());
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("failed to create {}", target.display()))?;
        // the declared size can lie, so bound the stream as well
        let copied = std::io::copy(&mut entry.by_ref().take(remaining + 1), &mut out)
            .map_err(|e| MemoryError::InvalidArchive(format!("{}: {e}", relative.display())))?;
        if copied > remaining {
            return Err(too_large().into());
        }
        total += copied;
        written.push(relative);
    }

    tracing::debug!(archive = %zip_path.display(), files = written.len(), bytes = total, "archive extracted");
    Ok(written)
}

/// Folder name for an archive extracted at `at`: `<stem>-<YYYYMMDDTHHMMSSZ>-<tag>`.
///
/// `tag` keeps folders distinct when two uploads sanitize to the same stem in the same second.
pub fn folder_name(original_name: &str, at: DateTime<Utc>, tag: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let sanitized = sanitized.trim_matches('-');
    let stem = if sanitized.is_empty() { "archive" } else { sanitized };

    format!("{stem}-{}-{tag}", at.format("%Y%m%dT%H%M%SZ"))
}

/// All regular files under `root`, relative to it, in sorted order.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }
    out.sort();
    Ok(out)
}
