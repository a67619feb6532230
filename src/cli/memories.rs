use anyhow::Result;

use crate::config::LiamConfig;
use crate::memory::index::VectorIndex;
use crate::memory::MemoryStore;

/// List ingested archives and index totals.
pub fn memories(config: &LiamConfig) -> Result<()> {
    let store = MemoryStore::new(config);
    let log = store.load_log()?;
    let index = VectorIndex::load_or_default(store.index_path())?;

    println!("Memory Archives");
    println!("{}", "=".repeat(40));

    if log.archives.is_empty() {
        println!("  (none ingested yet)");
    }
    for archive in &log.archives {
        let synced = archive.synced_at.as_deref().unwrap_or("not synced");
        println!(
            "  {:<28} {:>4} files {:>6} fragments  [{}]  {}",
            archive.name, archive.files, archive.fragments, archive.agent, synced
        );
        println!("    {}  extracted {}", archive.folder, archive.extracted_at);
    }
    println!();

    println!("Agents:                {}", log.agents.len());
    println!("Indexed fragments:     {}", index.len());
    Ok(())
}
