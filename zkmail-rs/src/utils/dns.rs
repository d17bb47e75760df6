//! DNS utilities
//!
//! MX resolution for the delivery router. The router only needs the
//! preferred mail-exchange target for a host; see
//! [`crate::routing::MxResolver`] for the seam it is injected through.

use crate::error::{MailError, Result};
use crate::routing::MxResolver;
use tracing::{debug, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// MX resolver backed by real DNS.
pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
}

impl DnsMxResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(
                ResolverConfig::default(),
                ResolverOpts::default(),
            ),
        }
    }
}

impl Default for DnsMxResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MxResolver for DnsMxResolver {
    /// Resolve the preferred (lowest-preference) MX exchange for `host`.
    ///
    /// Lookup failure or an empty record set is an error: the router
    /// aborts the send rather than guess at a delivery target.
    async fn resolve_mx(&self, host: &str) -> Result<String> {
        let lookup = self.resolver.mx_lookup(host).await.map_err(|e| {
            warn!("MX lookup failed for {}: {}", host, e);
            MailError::DnsLookup(format!("{}: {}", host, e))
        })?;

        let mut records: Vec<(u16, String)> = lookup
            .iter()
            .map(|mx| {
                let exchange = mx
                    .exchange()
                    .to_string()
                    .trim_end_matches('.')
                    .to_string();
                (mx.preference(), exchange)
            })
            .collect();

        records.sort_by_key(|(preference, _)| *preference);
        debug!("Found {} MX records for {}", records.len(), host);

        records
            .into_iter()
            .map(|(_, exchange)| exchange)
            .next()
            .ok_or_else(|| MailError::DnsLookup(format!("{}: no MX records", host)))
    }
}
