pub mod admin;
pub mod drive;
pub mod health;
pub mod memory;
pub mod relay;

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
