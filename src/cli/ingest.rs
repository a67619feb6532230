//! CLI `ingest` command: run a local ZIP through the upload pipeline.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::LiamConfig;
use crate::embedding;
use crate::memory::{ingest, MemoryStore};

pub async fn ingest(config: &LiamConfig, zip: &Path, agent: Option<&str>) -> Result<()> {
    let name = zip
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("archive path has no file name")?;
    let agent = agent.unwrap_or(&config.storage.default_agent);

    let store = MemoryStore::new(config);
    let provider = embedding::create_provider(config)?;

    println!("Ingesting {name} for agent '{agent}'...");
    let report = ingest::ingest_archive(&store, provider.as_ref(), zip, &name, agent).await?;

    println!("Ingest complete:");
    println!("  Id:         {}", report.id);
    println!("  Folder:     {}", report.folder);
    println!("  Files:      {}", report.files);
    println!("  Fragments:  {}", report.fragments);
    Ok(())
}
