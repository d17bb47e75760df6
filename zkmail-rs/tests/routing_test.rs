//! Delivery routing: local vs remote decisions, per-host dedup, MX
//! failure semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use zkmail_rs::address::group_addrs_by_host;
use zkmail_rs::error::{MailError, Result};
use zkmail_rs::routing::{DeliveryRouter, MailboxStore, MxResolver, RoutingDecision};
use zkmail_rs::storage::{Email, Mailbox};

const THIS_MX: &str = "mx.here.io";

struct FakeMx {
    targets: HashMap<String, String>,
}

impl FakeMx {
    fn new(targets: &[(&str, &str)]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|(host, mx)| (host.to_string(), mx.to_string()))
                .collect(),
        }
    }
}

impl MxResolver for FakeMx {
    async fn resolve_mx(&self, host: &str) -> Result<String> {
        self.targets
            .get(host)
            .cloned()
            .ok_or_else(|| MailError::DnsLookup(format!("{}: no MX records", host)))
    }
}

#[derive(Default)]
struct RecordingStore {
    saved: Mutex<Vec<String>>,
    filed: Mutex<Vec<(String, String)>>, // (address, box)
}

impl MailboxStore for RecordingStore {
    async fn save_message(&self, email: &Email) -> Result<()> {
        self.saved.lock().unwrap().push(email.message_id.clone());
        Ok(())
    }

    async fn add_message_to_box(
        &self,
        _email: &Email,
        address: &str,
        mailbox: Mailbox,
    ) -> Result<()> {
        self.filed
            .lock()
            .unwrap()
            .push((address.to_string(), mailbox.as_str().to_string()));
        Ok(())
    }
}

fn email(to: &str) -> Email {
    Email {
        message_id: "msg-1".to_string(),
        unix_time: 1_700_000_000,
        from: "sender@here.io".to_string(),
        to: to.to_string(),
        cipher_subject: "aa".to_string(),
        cipher_body: "bb".to_string(),
    }
}

fn router(mx: FakeMx) -> (DeliveryRouter<FakeMx, RecordingStore>, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::default());
    let router = DeliveryRouter::new(Arc::new(mx), Arc::clone(&store), THIS_MX);
    (router, store)
}

#[tokio::test]
async fn test_local_host_delivers_one_inbox_entry_per_recipient() {
    let (router, store) = router(FakeMx::new(&[("here.io", THIS_MX)]));

    let to = "a@here.io,b@here.io";
    let groups = group_addrs_by_host(to).unwrap();
    let decisions = router.route(&email(to), &groups).await.unwrap();

    assert_eq!(decisions.len(), 2);
    assert!(decisions.contains(&RoutingDecision::Local {
        mailbox: "a@here.io".to_string()
    }));
    assert!(decisions.contains(&RoutingDecision::Local {
        mailbox: "b@here.io".to_string()
    }));

    let filed = store.filed.lock().unwrap();
    let inboxed: Vec<_> = filed.iter().filter(|(_, b)| b == "inbox").collect();
    assert_eq!(inboxed.len(), 2);
}

#[tokio::test]
async fn test_remote_host_queued_once_for_many_recipients() {
    let (router, store) = router(FakeMx::new(&[("far.io", "mx.far.io")]));

    let to = "a@far.io,b@far.io,c@far.io";
    let groups = group_addrs_by_host(to).unwrap();
    let decisions = router.route(&email(to), &groups).await.unwrap();

    assert_eq!(
        decisions,
        vec![RoutingDecision::Remote {
            host: "far.io".to_string()
        }]
    );

    // One outbox row, keyed by host.
    let filed = store.filed.lock().unwrap();
    let outboxed: Vec<_> = filed.iter().filter(|(_, b)| b == "outbox").collect();
    assert_eq!(outboxed, vec![&("far.io".to_string(), "outbox".to_string())]);
}

#[tokio::test]
async fn test_mixed_local_and_remote_hosts() {
    let (router, store) = router(FakeMx::new(&[
        ("here.io", THIS_MX),
        ("far.io", "mx.far.io"),
    ]));

    let to = "a@here.io,b@far.io,c@far.io";
    let groups = group_addrs_by_host(to).unwrap();
    let decisions = router.route(&email(to), &groups).await.unwrap();

    let locals = decisions
        .iter()
        .filter(|d| matches!(d, RoutingDecision::Local { .. }))
        .count();
    let remotes = decisions
        .iter()
        .filter(|d| matches!(d, RoutingDecision::Remote { .. }))
        .count();
    assert_eq!(locals, 1);
    assert_eq!(remotes, 1);

    // Message body persisted exactly once regardless of recipient count.
    assert_eq!(store.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sender_gets_a_sent_copy() {
    let (router, store) = router(FakeMx::new(&[("far.io", "mx.far.io")]));

    let to = "a@far.io";
    let groups = group_addrs_by_host(to).unwrap();
    router.route(&email(to), &groups).await.unwrap();

    let filed = store.filed.lock().unwrap();
    assert!(filed.contains(&("sender@here.io".to_string(), "sent".to_string())));
}

#[tokio::test]
async fn test_mx_failure_aborts_the_send() {
    // No MX entry for the host at all.
    let (router, store) = router(FakeMx::new(&[]));

    let to = "a@nowhere.io";
    let groups = group_addrs_by_host(to).unwrap();
    let err = router.route(&email(to), &groups).await.unwrap_err();
    assert!(matches!(err, MailError::DnsLookup(_)));

    // Not transactional: the message was persisted and filed to sent
    // before routing failed.
    assert_eq!(store.saved.lock().unwrap().len(), 1);
    let filed = store.filed.lock().unwrap();
    assert!(!filed.iter().any(|(_, b)| b == "inbox" || b == "outbox"));
}
