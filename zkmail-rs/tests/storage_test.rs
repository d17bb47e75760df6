//! SQLite store operations against an in-memory database.

use zkmail_rs::auth::UserStore;
use zkmail_rs::error::MailError;
use zkmail_rs::federation::LocalKeyStore;
use zkmail_rs::routing::MailboxStore;
use zkmail_rs::storage::{Email, Mailbox, SqliteStore, User};

fn user(token: &str, hash_fill: char) -> User {
    User {
        token: token.to_string(),
        password_hash: "11".repeat(32),
        password_hash_old: String::new(),
        public_key: format!("PUBKEY-{}", token),
        public_hash: hash_fill.to_string().repeat(64),
        cipher_private_key: "deadbeef".to_string(),
    }
}

fn email(id: &str, from: &str, to: &str, unix_time: i64) -> Email {
    Email {
        message_id: id.to_string(),
        unix_time,
        from: from.to_string(),
        to: to.to_string(),
        cipher_subject: "aa".to_string(),
        cipher_body: "bb".to_string(),
    }
}

#[tokio::test]
async fn test_save_and_load_user() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store.save_user(&user("alice", 'a')).await.unwrap();

    let loaded = store.load_user("alice").await.unwrap().unwrap();
    assert_eq!(loaded.public_key, "PUBKEY-alice");
    assert_eq!(loaded.password_hash_old, "");

    assert!(store.load_user("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_token_conflicts() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store.save_user(&user("alice", 'a')).await.unwrap();

    let err = store.save_user(&user("alice", 'b')).await.unwrap_err();
    assert!(matches!(err, MailError::Conflict(_)));
}

#[tokio::test]
async fn test_load_user_auth() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store.save_user(&user("alice", 'a')).await.unwrap();

    let auth = store.load_user_auth("alice").await.unwrap().unwrap();
    assert_eq!(auth.public_hash, "a".repeat(64));
    assert_eq!(auth.password_hash, "11".repeat(32));
}

#[tokio::test]
async fn test_load_pub_key_by_hash() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store.save_user(&user("alice", 'a')).await.unwrap();

    let key = store.load_pub_key(&"a".repeat(64)).await.unwrap();
    assert_eq!(key.as_deref(), Some("PUBKEY-alice"));
    assert!(store.load_pub_key(&"f".repeat(64)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_contacts_roundtrip() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store.save_user(&user("alice", 'a')).await.unwrap();

    assert!(store.load_contacts("alice").await.unwrap().is_none());

    store.save_contacts("alice", "cafebabe").await.unwrap();
    assert_eq!(
        store.load_contacts("alice").await.unwrap().as_deref(),
        Some("cafebabe")
    );
}

#[tokio::test]
async fn test_box_listing_is_newest_first() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();

    let older = email("msg-1", "x@far.io", "me@here.io", 100);
    let newer = email("msg-2", "x@far.io", "me@here.io", 200);
    store.save_message(&older).await.unwrap();
    store.save_message(&newer).await.unwrap();
    store
        .add_message_to_box(&older, "me@here.io", Mailbox::Inbox)
        .await
        .unwrap();
    store
        .add_message_to_box(&newer, "me@here.io", Mailbox::Inbox)
        .await
        .unwrap();

    let headers = store.load_box("me@here.io", Mailbox::Inbox).await.unwrap();
    assert_eq!(headers.len(), 2);
    assert_eq!(headers[0].message_id, "msg-2");
    assert_eq!(headers[1].message_id, "msg-1");
}

#[tokio::test]
async fn test_move_between_boxes() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();

    let msg = email("msg-1", "x@far.io", "me@here.io", 100);
    store.save_message(&msg).await.unwrap();
    store
        .add_message_to_box(&msg, "me@here.io", Mailbox::Inbox)
        .await
        .unwrap();

    store
        .update_box("me@here.io", "msg-1", Mailbox::Archive)
        .await
        .unwrap();

    assert!(store
        .load_box("me@here.io", Mailbox::Inbox)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .load_box("me@here.io", Mailbox::Archive)
            .await
            .unwrap()
            .len(),
        1
    );

    // Moving a message the address does not own is a miss, not a no-op.
    let err = store
        .update_box("someone@else.io", "msg-1", Mailbox::Archive)
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::NotFound(_)));
}

#[tokio::test]
async fn test_message_ownership_check() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();

    let msg = email("msg-1", "x@far.io", "me@here.io", 100);
    store.save_message(&msg).await.unwrap();
    store
        .add_message_to_box(&msg, "me@here.io", Mailbox::Inbox)
        .await
        .unwrap();

    assert!(store
        .message_belongs_to("msg-1", "me@here.io")
        .await
        .unwrap());
    assert!(!store
        .message_belongs_to("msg-1", "someone@else.io")
        .await
        .unwrap());
}
