//! Key resolver: trusted/local mode and client fan-out/gather mode
//!
//! Mode is selected by the caller identity. Peer servers authenticate
//! nothing and may only ask about addresses this server can answer from
//! local storage. End users get the full federated fan-out: one task per
//! remote host, one global deadline over the whole gather, soft per-address
//! failure markers for whatever the deadline did not cover.

use crate::address::{join_addrs, HostGroups};
use crate::auth::CallerIdentity;
use crate::error::{MailError, Result};
use crate::federation::{
    FederationTransport, KeyLookup, KeyLookupResult, LocalKeyStore, ERR_UNKNOWN_ADDRESS,
    ERR_UNRESOLVED,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct KeyResolver<K, T> {
    keys: Arc<K>,
    transport: Arc<T>,
    lookup_timeout: Duration,
}

impl<K, T> KeyResolver<K, T>
where
    K: LocalKeyStore,
    T: FederationTransport + 'static,
{
    pub fn new(keys: Arc<K>, transport: Arc<T>, lookup_timeout: Duration) -> Self {
        Self {
            keys,
            transport,
            lookup_timeout,
        }
    }

    /// Resolve public keys for every address in `groups`.
    ///
    /// The returned map contains an entry for every submitted address,
    /// each either a key or a soft error marker.
    pub async fn resolve(
        &self,
        groups: &HostGroups,
        caller: Option<&CallerIdentity>,
    ) -> Result<KeyLookupResult> {
        match caller {
            None => self.resolve_local(groups).await,
            Some(_) => self.resolve_federated(groups).await,
        }
    }

    /// Trusted/local mode: the caller is a peer server vouching for its
    /// own users, so every address must be locally answerable. A non-hash
    /// address here is a protocol violation and aborts the request with
    /// no entries.
    async fn resolve_local(&self, groups: &HostGroups) -> Result<KeyLookupResult> {
        for addrs in groups.values() {
            for addr in addrs {
                if !addr.is_hash_address() {
                    return Err(MailError::ProtocolViolation(format!(
                        "cannot answer for non-local address {}",
                        addr
                    )));
                }
            }
        }

        let mut results = KeyLookupResult::new();
        for addrs in groups.values() {
            for addr in addrs {
                let entry = match self.keys.load_pub_key(addr.name()).await? {
                    Some(pub_key) => KeyLookup::key(pub_key),
                    None => KeyLookup::error(ERR_UNKNOWN_ADDRESS),
                };
                results.insert(addr.to_string(), entry);
            }
        }
        Ok(results)
    }

    /// Client mode: one concurrent lookup per distinct host, merged under
    /// a single deadline covering the whole gather.
    async fn resolve_federated(&self, groups: &HostGroups) -> Result<KeyLookupResult> {
        let (tx, mut rx) = mpsc::channel::<(String, Result<KeyLookupResult>)>(
            groups.len().max(1),
        );

        for (host, addrs) in groups {
            let transport = Arc::clone(&self.transport);
            let host = host.clone();
            let batch = join_addrs(addrs);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = transport.fetch_keys(&host, &batch).await;
                // Receiver may already have given up on the deadline.
                let _ = tx.send((host, outcome)).await;
            });
        }
        drop(tx);

        let mut results: KeyLookupResult = HashMap::new();
        let mut outstanding = groups.len();

        let deadline = tokio::time::sleep(self.lookup_timeout);
        tokio::pin!(deadline);

        while outstanding > 0 {
            tokio::select! {
                received = rx.recv() => {
                    let Some((host, outcome)) = received else { break };
                    outstanding -= 1;
                    match outcome {
                        Ok(batch) => {
                            debug!("Merged {} key(s) from {}", batch.len(), host);
                            for (addr, entry) in batch {
                                // Each address has exactly one home host;
                                // never overwrite an existing entry.
                                results.entry(addr).or_insert(entry);
                            }
                        }
                        // The whole batch for this host is dropped, no
                        // retry; its addresses pick up the unresolved
                        // marker below.
                        Err(e) => warn!("Key lookup batch from {} dropped: {}", host, e),
                    }
                }
                _ = &mut deadline => {
                    warn!(
                        "Key lookup deadline reached with {} host(s) outstanding",
                        outstanding
                    );
                    break;
                }
            }
        }

        // Coverage: every submitted address gets an entry, resolved or not.
        for addrs in groups.values() {
            for addr in addrs {
                results
                    .entry(addr.to_string())
                    .or_insert_with(|| KeyLookup::error(ERR_UNRESOLVED));
            }
        }

        // Late responses are still consumed so their resources are
        // released, off the response path.
        if outstanding > 0 {
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
        }

        Ok(results)
    }
}
