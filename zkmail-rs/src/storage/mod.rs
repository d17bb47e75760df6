//! Persistent storage
//!
//! The server is untrusted by design: everything it stores is either a
//! public key or an opaque ciphertext blob. Backed by SQLite via [`sqlite`].

pub mod sqlite;

pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored account. Private key material arrives already encrypted by
/// the client; the server never sees a plaintext private key or password.
#[derive(Debug, Clone)]
pub struct User {
    pub token: String,
    pub password_hash: String,
    pub password_hash_old: String,
    pub public_key: String,
    pub public_hash: String,
    pub cipher_private_key: String,
}

/// A stored message. Subject and body are ciphertext hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub message_id: String,
    pub unix_time: i64,
    pub from: String,
    pub to: String,
    pub cipher_subject: String,
    pub cipher_body: String,
}

/// Box listing row: metadata only, no body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailHeader {
    pub message_id: String,
    pub unix_time: i64,
    pub from: String,
    pub to: String,
    pub cipher_subject: String,
}

/// The mailboxes a message entry can live in. `Outbox` rows are keyed by
/// destination host rather than recipient and are internal to the
/// delivery pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mailbox {
    Inbox,
    Archive,
    Sent,
    Outbox,
}

impl Mailbox {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mailbox::Inbox => "inbox",
            Mailbox::Archive => "archive",
            Mailbox::Sent => "sent",
            Mailbox::Outbox => "outbox",
        }
    }

    /// Boxes a client may read or move messages into. `outbox` is not
    /// client-addressable.
    pub fn from_user_str(s: &str) -> Option<Self> {
        match s {
            "inbox" => Some(Mailbox::Inbox),
            "archive" => Some(Mailbox::Archive),
            "sent" => Some(Mailbox::Sent),
            _ => None,
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mailbox {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Mailbox::Inbox),
            "archive" => Ok(Mailbox::Archive),
            "sent" => Ok(Mailbox::Sent),
            "outbox" => Ok(Mailbox::Outbox),
            _ => Err(()),
        }
    }
}
