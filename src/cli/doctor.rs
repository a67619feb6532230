//! CLI `doctor` command: check configuration and the memory store, print a report.

use anyhow::Result;

use crate::config::LiamConfig;
use crate::memory::index::VectorIndex;
use crate::memory::MemoryStore;

pub fn doctor(config: &LiamConfig) -> Result<()> {
    let store = MemoryStore::new(config);

    println!("Liam Health Report");
    println!("==================");
    println!();
    println!("Data directory:    {}", config.data_dir().display());
    println!("Listen address:    {}", config.bind_addr());
    println!();

    println!("Memory store:");
    match store.load_log() {
        Ok(log) => {
            println!("  Sync log:        OK ({} archives, {} agents)", log.archives.len(), log.agents.len());
            let pending = log.pending_sync().count();
            if pending > 0 {
                println!("  Pending sync:    {pending} archive(s)");
            }
            for name in log.agents.keys() {
                if let Err(e) = log.resolve_agent(name, |k| std::env::var(k).ok()) {
                    println!("  Agent '{name}':   ERROR {e}");
                }
            }
        }
        Err(e) => println!("  Sync log:        ERROR {e:#}"),
    }
    match VectorIndex::load(store.index_path()) {
        Ok(index) => {
            let dims = index.entries().first().map(|e| e.embedding.len()).unwrap_or(0);
            println!("  Index:           OK ({} fragments, {dims} dims)", index.len());
        }
        Err(e) => println!("  Index:           {e:#}"),
    }
    println!();

    println!("Integrations:");
    println!("  Embeddings:      {} ({})", config.embedding.provider, config.embedding.model);
    print_set("Completion key", config.completion.api_key.is_some());
    print_set("Google OAuth", config.google.client_id.is_some()
        && config.google.client_secret.is_some()
        && config.google.refresh_token.is_some());
    print_set("Contacts sheet", config.google.sheet_id.is_some());
    print_set("SMTP login", config.mail.username.is_some() && config.mail.password.is_some());
    print_set("API token", config.auth.api_token.is_some());
    print_set("Admin login", config.auth.admin_username.is_some()
        && config.auth.admin_password.is_some()
        && config.auth.jwt_secret.is_some());

    Ok(())
}

fn print_set(label: &str, ok: bool) {
    let status = if ok { "set" } else { "NOT SET" };
    println!("  {:<16} {status}", format!("{label}:"));
}
