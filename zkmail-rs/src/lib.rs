//! zkmail-rs: server side of a zero-knowledge webmail service
//!
//! The server stores only encrypted blobs and public keys: never
//! plaintext messages, never private keys, never passwords. Clients do
//! all encryption and verify everything this server returns.
//!
//! # Core subsystems
//!
//! - **Address grouping**: incoming identities parse into canonical
//!   `name@host` pairs and partition by host ([`address`])
//! - **Authentication gate**: cookie credentials with password-rotation
//!   grace; absent credentials select server-to-server trust ([`auth`])
//! - **Federated key resolution**: local lookup or a bounded concurrent
//!   fan-out to each address's home server, tolerant of partial failure
//!   ([`federation`])
//! - **Delivery routing**: per recipient host, deliver into local inboxes
//!   or queue once per host for outbound transfer ([`routing`])
//!
//! # Modules
//!
//! - [`api`]: HTTP surface (axum)
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`storage`]: SQLite-backed persistence
//! - [`utils`]: validators and MX lookup

pub mod address;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod federation;
pub mod routing;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{MailError, Result};
