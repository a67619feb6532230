//! Liam is a small HTTP relay between a chat-completion model, Gmail, Google
//! Sheets/Drive, and a local memory store built from uploaded ZIP archives.
//!
//! # Architecture
//!
//! - **Relay**: prompts go to an OpenAI-compatible chat endpoint; replies can be
//!   emailed to a contact looked up by name in a Google Sheet
//! - **Memory**: uploaded archives are extracted, split into text fragments,
//!   embedded, and kept in a flat JSON vector index for cosine-similarity recall
//! - **Drive**: file uploads, Google Doc creation, and archive sync to per-agent folders
//! - **Transport**: HTTP via axum, gated by an API token; admin routes use a JWT
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`server`]: Router, shared state, authentication middleware, and handlers
//! - [`memory`]: Archive ingestion, the sync log, the vector index, and Drive sync
//! - [`embedding`]: Text-to-vector providers (remote API or local hashing)
//! - [`completion`]: Chat-completion client
//! - [`google`]: OAuth refresh, Sheets contact lookup, and Drive storage
//! - [`mail`]: SMTP delivery
//! - [`activity`]: Recent-events ring buffer exposed to admins
//! - [`error`]: Domain and HTTP error types

pub mod activity;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod google;
pub mod mail;
pub mod memory;
pub mod server;
