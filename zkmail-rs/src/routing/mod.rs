//! Send-time delivery routing
//!
//! Decides per recipient host whether a message lands in local inboxes or
//! is queued once per host for outbound transfer. The actual transfer to
//! remote hosts is downstream of the outbox and out of scope here.

use crate::address::HostGroups;
use crate::error::Result;
use crate::storage::{Email, Mailbox};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// MX-resolution collaborator: the preferred mail-exchange target for a
/// host.
pub trait MxResolver: Send + Sync {
    fn resolve_mx(&self, host: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Message/mailbox persistence collaborator.
pub trait MailboxStore: Send + Sync {
    fn save_message(&self, email: &Email) -> impl Future<Output = Result<()>> + Send;

    fn add_message_to_box(
        &self,
        email: &Email,
        address: &str,
        mailbox: Mailbox,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Where one routed message entry went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Filed into a local recipient's inbox; one per local recipient.
    Local { mailbox: String },
    /// Queued for outbound transfer; exactly one per foreign host no
    /// matter how many recipients share it.
    Remote { host: String },
}

pub struct DeliveryRouter<M, S> {
    mx: Arc<M>,
    store: Arc<S>,
    this_mx_host: String,
}

impl<M, S> DeliveryRouter<M, S>
where
    M: MxResolver,
    S: MailboxStore,
{
    pub fn new(mx: Arc<M>, store: Arc<S>, this_mx_host: impl Into<String>) -> Self {
        Self {
            mx,
            store,
            this_mx_host: this_mx_host.into(),
        }
    }

    /// Persist `email` once, file it into the sender's sent box, then
    /// route each recipient host.
    ///
    /// MX-resolution failure for any host aborts the whole send; there is
    /// no partial-send marker. The persist + per-box filing sequence is
    /// not transactional (at-least-attempted semantics).
    pub async fn route(
        &self,
        email: &Email,
        groups: &HostGroups,
    ) -> Result<Vec<RoutingDecision>> {
        self.store.save_message(email).await?;
        self.store
            .add_message_to_box(email, &email.from, Mailbox::Sent)
            .await?;

        let mut decisions = Vec::new();
        for (host, addrs) in groups {
            let mx_target = self.mx.resolve_mx(host).await?;

            if mx_target == self.this_mx_host {
                debug!("Host {} is local, delivering to {} inbox(es)", host, addrs.len());
                for addr in addrs {
                    let mailbox = addr.to_string();
                    self.store
                        .add_message_to_box(email, &mailbox, Mailbox::Inbox)
                        .await?;
                    decisions.push(RoutingDecision::Local { mailbox });
                }
            } else {
                // One outbox entry per host; recipient fan-out happens at
                // transfer time on the receiving side.
                info!("Queueing {} for transfer to {}", email.message_id, host);
                self.store
                    .add_message_to_box(email, host, Mailbox::Outbox)
                    .await?;
                decisions.push(RoutingDecision::Remote { host: host.clone() });
            }
        }

        Ok(decisions)
    }
}
