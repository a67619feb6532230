pub mod doctor;
pub mod ingest;
pub mod memories;
pub mod recall;
pub mod reindex;
pub mod reset;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar styled like every other long-running CLI command.
fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {pos}/{len} ({eta})") {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Shorten `text` to at most `max` characters for terminal previews.
fn preview(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
