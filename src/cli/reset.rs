//! CLI `reset` command: delete all ingested memories after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use crate::config::LiamConfig;
use crate::memory::{ingest, MemoryStore};

/// Delete the index, extracted folders, and archive records.
pub async fn reset(config: &LiamConfig, skip_confirm: bool) -> Result<()> {
    let store = MemoryStore::new(config);

    if !skip_confirm {
        println!("WARNING: This will permanently delete ALL ingested archives and the memory index.");
        println!("Data directory: {}", config.data_dir().display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let removed = ingest::reset(&store).await?;

    println!("Removed {removed} archive(s). Memory store reset complete.");
    Ok(())
}
