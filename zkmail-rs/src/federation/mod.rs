//! Federated public-key resolution
//!
//! Addresses hosted here resolve against local storage; everything else
//! fans out to the address's home server and gathers whatever arrives
//! before a single global deadline. See [`resolver`] for the gather loop
//! and [`client`] for the outbound transport.

pub mod client;
pub mod resolver;

pub use client::HttpFederationClient;
pub use resolver::KeyResolver;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;

/// Path peers expose for batched key lookup.
pub const FEDERATION_LOOKUP_PATH: &str = "/publickeys/";

/// Soft miss: the home server does not know the address.
pub const ERR_UNKNOWN_ADDRESS: &str = "Unknown address";

/// Soft miss: the home server did not answer before the deadline, or its
/// answer was unusable. Distinct from [`ERR_UNKNOWN_ADDRESS`]; the address
/// is unresolved, not absent.
pub const ERR_UNRESOLVED: &str = "Failed to retrieve public key";

/// One lookup outcome: exactly a key or exactly an error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyLookup {
    Key {
        #[serde(rename = "pubKey")]
        pub_key: String,
    },
    Error {
        error: String,
    },
}

impl KeyLookup {
    pub fn key(pub_key: impl Into<String>) -> Self {
        KeyLookup::Key { pub_key: pub_key.into() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        KeyLookup::Error { error: error.into() }
    }
}

/// Result mapping, keyed by canonical address string. Covers every
/// submitted address.
pub type KeyLookupResult = HashMap<String, KeyLookup>;

/// Local key storage collaborator, keyed by public-key hash.
pub trait LocalKeyStore: Send + Sync {
    fn load_pub_key(
        &self,
        public_hash: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Outbound lookup collaborator: one call per remote host per round.
pub trait FederationTransport: Send + Sync {
    fn fetch_keys(
        &self,
        host: &str,
        addresses: &str,
    ) -> impl Future<Output = Result<KeyLookupResult>> + Send;
}
