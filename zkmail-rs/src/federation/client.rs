//! Outbound federation transport
//!
//! POSTs the form-encoded address batch to a peer's lookup endpoint and
//! parses the JSON result map. Any transport, status or parse failure
//! surfaces as an error; the resolver decides what to do with it (drop
//! the batch, no retry).

use crate::error::Result;
use crate::federation::{FederationTransport, KeyLookupResult, FEDERATION_LOOKUP_PATH};
use tracing::debug;

pub struct HttpFederationClient {
    client: reqwest::Client,
    scheme: String,
}

impl HttpFederationClient {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            scheme: scheme.into(),
        }
    }
}

impl FederationTransport for HttpFederationClient {
    async fn fetch_keys(&self, host: &str, addresses: &str) -> Result<KeyLookupResult> {
        let url = format!("{}://{}{}", self.scheme, host, FEDERATION_LOOKUP_PATH);
        debug!("Dispatching key lookup to {}", url);

        let response = self
            .client
            .post(&url)
            .form(&[("addresses", addresses)])
            .send()
            .await?
            .error_for_status()?;

        let parsed = response.json::<KeyLookupResult>().await?;
        Ok(parsed)
    }
}
