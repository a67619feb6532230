//! Splitting extracted files into embeddable text fragments.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "json", "csv", "log", "html", "htm", "xml", "yaml", "yml",
];

pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Read the text-like files among `files` (relative to `root`). Invalid UTF-8 is replaced.
pub fn read_text_files(root: &Path, files: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    for relative in files.iter().filter(|p| is_text_file(p)) {
        let path = root.join(relative);
        let bytes =
            std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        out.push((relative.clone(), String::from_utf8_lossy(&bytes).into_owned()));
    }
    Ok(out)
}

/// Pack blank-line separated paragraphs into fragments of at most `max_chars` characters.
///
/// Paragraphs longer than the limit are cut on character boundaries.
pub fn split_fragments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = text.replace("\r\n", "\n");

    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let len = paragraph.chars().count();

        if len > max_chars {
            flush(&mut fragments, &mut current, &mut current_len);
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(max_chars) {
                let piece: String = piece.iter().collect();
                let piece = piece.trim();
                if !piece.is_empty() {
                    fragments.push(piece.to_string());
                }
            }
            continue;
        }

        if current_len > 0 && current_len + 2 + len > max_chars {
            flush(&mut fragments, &mut current, &mut current_len);
        }
        if current_len > 0 {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += len;
    }
    flush(&mut fragments, &mut current, &mut current_len);
    fragments
}

fn flush(fragments: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if !current.is_empty() {
        fragments.push(std::mem::take(current));
    }
    *current_len = 0;
}
