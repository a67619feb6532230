use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LiamConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub completion: CompletionConfig,
    pub embedding: EmbeddingConfig,
    pub mail: MailConfig,
    pub google: GoogleConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_upload_bytes: usize,
    /// Directory served under `/dashboard`. Unset disables the dashboard.
    pub dashboard_dir: Option<String>,
    pub activity_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub api_token: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `openai` or `hashed`.
    pub provider: String,
    pub model: String,
    /// Only used by the hashed provider.
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub subject: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_url: String,
    pub sheets_base_url: String,
    pub drive_base_url: String,
    pub upload_base_url: String,
    pub sheet_id: Option<String>,
    pub contacts_range: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub default_agent: String,
    /// Upper bound on the decompressed size of one uploaded archive.
    pub max_extracted_bytes: u64,
    pub max_archive_entries: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub chunk_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            log_level: "info".into(),
            max_upload_bytes: 50 * 1024 * 1024,
            dashboard_dir: None,
            activity_capacity: 200,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            admin_username: None,
            admin_password: None,
            jwt_secret: None,
            jwt_ttl_minutes: 60,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            chat_model: "gpt-4".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "text-embedding-3-small".into(),
            dimensions: 256,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 465,
            starttls: false,
            username: None,
            password: None,
            from: None,
            subject: "Liam's GPT Email Delivery".into(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            token_url: "https://oauth2.googleapis.com/token".into(),
            sheets_base_url: "https://sheets.googleapis.com".into(),
            drive_base_url: "https://www.googleapis.com".into(),
            upload_base_url: "https://www.googleapis.com/upload".into(),
            sheet_id: None,
            contacts_range: "Sheet1!A:B".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_liam_dir().to_string_lossy().into_owned(),
            default_agent: "liam".into(),
            max_extracted_bytes: 512 * 1024 * 1024,
            max_archive_entries: 10_000,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
            chunk_chars: 1000,
        }
    }
}

/// Returns `~/.liam/`, or `./.liam` when no home directory is known.
pub fn default_liam_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".liam")
}

/// Returns the default config file path: `~/.liam/config.toml`
pub fn default_config_path() -> PathBuf {
    default_liam_dir().join("config.toml")
}

impl LiamConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            LiamConfig::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply deployment environment variables on top of file values.
    ///
    /// `lookup` is injected so tests do not have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {val}"))?;
        }
        if let Some(val) = lookup("LIAM_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("LIAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = lookup("LIAM_DATA_DIR") {
            self.storage.data_dir = val;
        }

        let secrets: [(&str, &mut Option<String>); 11] = [
            ("OPENAI_API_KEY", &mut self.completion.api_key),
            ("GOOGLE_CLIENT_ID", &mut self.google.client_id),
            ("GOOGLE_CLIENT_SECRET", &mut self.google.client_secret),
            ("GOOGLE_REFRESH_TOKEN", &mut self.google.refresh_token),
            ("GOOGLE_SHEET_ID", &mut self.google.sheet_id),
            ("GMAIL_USER", &mut self.mail.username),
            ("GMAIL_APP_PASS", &mut self.mail.password),
            ("LIAM_API_TOKEN", &mut self.auth.api_token),
            ("ADMIN_USERNAME", &mut self.auth.admin_username),
            ("ADMIN_PASSWORD", &mut self.auth.admin_password),
            ("JWT_SECRET", &mut self.auth.jwt_secret),
        ];
        for (key, slot) in secrets {
            if let Some(val) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = Some(val);
            }
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn sync_log_path(&self) -> PathBuf {
        self.data_dir().join("sync-log.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir().join("memory-index.json")
    }

    pub fn memories_dir(&self) -> PathBuf {
        self.data_dir().join("memories")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.data_dir().join("archives")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
