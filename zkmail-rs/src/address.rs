//! Address parsing and host grouping
//!
//! Addresses are the canonical `name@host` identities used for key lookup
//! and delivery routing. They are constructed only through validated
//! parsing; the rest of the server can rely on their shape.

use crate::error::{MailError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9][a-z0-9._-]*)@([a-z0-9][a-z0-9.-]*[a-z0-9])$").unwrap()
});

/// Local part that is itself a public-key hash (lowercase hex SHA-256).
static HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// A validated `name@host` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    name: String,
    host: String,
}

impl Address {
    /// Parse and validate a single canonical address.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let caps = ADDRESS_RE
            .captures(raw)
            .ok_or_else(|| MailError::MalformedAddress(raw.to_string()))?;

        Ok(Self {
            name: caps[1].to_string(),
            host: caps[2].to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// True when the local part is a bare public-key hash, resolvable by
    /// direct local storage lookup without further federation.
    pub fn is_hash_address(&self) -> bool {
        HASH_RE.is_match(&self.name)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.host)
    }
}

/// Addresses partitioned by host. Order within a host group follows input
/// order; order across hosts is map order.
pub type HostGroups = HashMap<String, Vec<Address>>;

/// Parse a comma-separated address list and group it by host.
///
/// Fails with [`MailError::MalformedAddress`] on the first token that does
/// not parse; no partial grouping is returned.
pub fn group_addrs_by_host(raw: &str) -> Result<HostGroups> {
    let mut groups: HostGroups = HashMap::new();
    for token in raw.split(',') {
        let addr = Address::parse(token)?;
        groups.entry(addr.host.clone()).or_default().push(addr);
    }
    Ok(groups)
}

/// Canonical comma-joined form of one host group, as sent on the wire.
pub fn join_addrs(addrs: &[Address]) -> String {
    addrs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
