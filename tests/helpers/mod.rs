#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use liam::activity::ActivityLog;
use liam::completion::ChatProvider;
use liam::config::LiamConfig;
use liam::embedding::hashed::HashedEmbeddings;
use liam::google::drive::{DriveFile, DriveStore, DriveUpload};
use liam::google::sheets::{find_email, Contacts};
use liam::mail::{MailSender, OutgoingEmail};
use liam::memory::MemoryStore;
use liam::server::AppState;

pub const API_TOKEN: &str = "test-token";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "hunter2";
pub const JWT_SECRET: &str = "jwt-test-secret";

/// Config rooted in `dir`, using offline embeddings and test credentials.
pub fn test_config(dir: &Path) -> LiamConfig {
    let mut config = LiamConfig::default();
    config.storage.data_dir = dir.to_string_lossy().into_owned();
    config.embedding.provider = "hashed".into();
    config.embedding.dimensions = 128;
    config.retrieval.chunk_chars = 200;
    config.auth.api_token = Some(API_TOKEN.into());
    config.auth.admin_username = Some(ADMIN_USER.into());
    config.auth.admin_password = Some(ADMIN_PASS.into());
    config.auth.jwt_secret = Some(JWT_SECRET.into());
    config
}

pub fn test_store(dir: &Path) -> MemoryStore {
    MemoryStore::new(&test_config(dir))
}

pub fn embedder() -> HashedEmbeddings {
    HashedEmbeddings::new(128)
}

/// In-memory ZIP containing `entries` as (name, contents).
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write a ZIP under `dir` and return its path.
pub fn make_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, zip_bytes(entries)).unwrap();
    path
}

/// Chat model that echoes the prompt, or fails when told to.
pub struct FakeChat {
    pub fail: bool,
}

#[async_trait]
impl ChatProvider for FakeChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.fail {
            anyhow::bail!("completion API returned HTTP 500: boom");
        }
        Ok(format!("Reply to: {prompt}"))
    }
}

/// Contacts backed by fixed sheet rows.
pub struct FakeContacts {
    pub rows: Vec<Vec<String>>,
}

impl FakeContacts {
    pub fn with(rows: &[(&str, &str)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|(n, e)| vec![n.to_string(), e.to_string()])
                .collect(),
        }
    }
}

#[async_trait]
impl Contacts for FakeContacts {
    async fn resolve_email(&self, name: &str) -> Result<Option<String>> {
        Ok(find_email(&self.rows, name))
    }
}

/// Mail sender that records every message.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Mail sender whose SMTP server always refuses.
pub struct FailingMailer;

#[async_trait]
impl MailSender for FailingMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<()> {
        anyhow::bail!("SMTP send failed: 535 authentication rejected")
    }
}

/// Drive store that keeps uploads in memory. Uploads into `fail_parent` error.
#[derive(Default)]
pub struct FakeDrive {
    pub uploads: Mutex<Vec<DriveUpload>>,
    pub fail_parent: Option<String>,
}

#[async_trait]
impl DriveStore for FakeDrive {
    async fn upload(&self, upload: DriveUpload) -> Result<DriveFile> {
        if upload.parent.is_some() && upload.parent == self.fail_parent {
            anyhow::bail!("Google drive upload returned HTTP 403: forbidden");
        }
        let mut uploads = self.uploads.lock().unwrap();
        let file = DriveFile {
            id: format!("drive-{}", uploads.len() + 1),
            name: upload.name.clone(),
            mime_type: Some(
                upload
                    .target_mime_type
                    .clone()
                    .unwrap_or_else(|| upload.mime_type.clone()),
            ),
            modified_time: None,
        };
        uploads.push(upload);
        Ok(file)
    }

    async fn list(&self, parent: Option<&str>) -> Result<Vec<DriveFile>> {
        let uploads = self.uploads.lock().unwrap();
        Ok(uploads
            .iter()
            .enumerate()
            .filter(|(_, u)| parent.is_none() || u.parent.as_deref() == parent)
            .map(|(i, u)| DriveFile {
                id: format!("drive-{}", i + 1),
                name: u.name.clone(),
                mime_type: Some(u.mime_type.clone()),
                modified_time: None,
            })
            .collect())
    }
}

/// Handles to the fakes behind a test [`AppState`].
pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub drive: Arc<FakeDrive>,
    pub dir: TempDir,
}

pub fn test_app() -> TestApp {
    test_app_with(|_| {})
}

/// Build an app over a fresh data directory; `tweak` may adjust the config first.
pub fn test_app_with(tweak: impl FnOnce(&mut LiamConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    tweak(&mut config);

    let mailer = Arc::new(RecordingMailer::default());
    let drive = Arc::new(FakeDrive::default());
    let state = AppState {
        chat: Arc::new(FakeChat { fail: false }),
        embedding: Arc::new(embedder()),
        contacts: Arc::new(FakeContacts::with(&[
            ("Alice", "alice@example.com"),
            ("Bob", ""),
        ])),
        mailer: mailer.clone(),
        drive: drive.clone(),
        store: Arc::new(MemoryStore::new(&config)),
        activity: Arc::new(ActivityLog::new(50)),
        config: Arc::new(config),
    };

    TestApp {
        state,
        mailer,
        drive,
        dir,
    }
}
