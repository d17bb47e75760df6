//! SQLite-backed store
//!
//! One pool, plain `sqlx::query` with binds, tables created on startup.
//! Tests run against `sqlite::memory:`.

use crate::auth::{UserAuth, UserStore};
use crate::error::{MailError, Result};
use crate::federation::LocalKeyStore;
use crate::routing::MailboxStore;
use crate::storage::{Email, EmailHeader, Mailbox, User};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                token TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                password_hash_old TEXT NOT NULL DEFAULT '',
                public_key TEXT NOT NULL,
                public_hash TEXT NOT NULL UNIQUE,
                cipher_private_key TEXT NOT NULL,
                cipher_contacts TEXT
            )
            "#,
        )
        .execute(&db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT PRIMARY KEY,
                unix_time INTEGER NOT NULL,
                from_addr TEXT NOT NULL,
                to_addrs TEXT NOT NULL,
                cipher_subject TEXT NOT NULL,
                cipher_body TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS boxes (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                address TEXT NOT NULL,
                box TEXT NOT NULL,
                unix_time INTEGER NOT NULL,
                UNIQUE(message_id, address)
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }

    /// Create an account. Fails with [`MailError::Conflict`] when the
    /// token is already taken.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                token, password_hash, password_hash_old,
                public_key, public_hash, cipher_private_key
            ) VALUES (?, ?, '', ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&user.token)
        .bind(&user.password_hash)
        .bind(&user.public_key)
        .bind(&user.public_hash)
        .bind(&user.cipher_private_key)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MailError::Conflict("that username is taken".to_string()));
        }

        info!("New user {} {}", user.token, user.public_hash);
        Ok(())
    }

    pub async fn load_user(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, (String, String, String, String, String, String)>(
            r#"
            SELECT token, password_hash, password_hash_old,
                   public_key, public_hash, cipher_private_key
            FROM users WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(
            |(token, password_hash, password_hash_old, public_key, public_hash, cipher_private_key)| User {
                token,
                password_hash,
                password_hash_old,
                public_key,
                public_hash,
                cipher_private_key,
            },
        ))
    }

    pub async fn load_contacts(&self, token: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (Option<String>,)>(
            "SELECT cipher_contacts FROM users WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.and_then(|(contacts,)| contacts))
    }

    pub async fn save_contacts(&self, token: &str, cipher_contacts: &str) -> Result<()> {
        sqlx::query("UPDATE users SET cipher_contacts = ? WHERE token = ?")
            .bind(cipher_contacts)
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn load_message(&self, message_id: &str) -> Result<Option<Email>> {
        let row = sqlx::query_as::<_, (String, i64, String, String, String, String)>(
            r#"
            SELECT message_id, unix_time, from_addr, to_addrs,
                   cipher_subject, cipher_body
            FROM messages WHERE message_id = ?
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(
            |(message_id, unix_time, from, to, cipher_subject, cipher_body)| Email {
                message_id,
                unix_time,
                from,
                to,
                cipher_subject,
                cipher_body,
            },
        ))
    }

    /// Whether `message_id` is filed in a box belonging to `address`.
    pub async fn message_belongs_to(&self, message_id: &str, address: &str) -> Result<bool> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM boxes WHERE message_id = ? AND address = ?",
        )
        .bind(message_id)
        .bind(address)
        .fetch_one(&self.db)
        .await?;

        Ok(row.0 > 0)
    }

    /// Move a message between boxes for one owner address.
    pub async fn update_box(
        &self,
        address: &str,
        message_id: &str,
        mailbox: Mailbox,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE boxes SET box = ? WHERE message_id = ? AND address = ?",
        )
        .bind(mailbox.as_str())
        .bind(message_id)
        .bind(address)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MailError::NotFound(format!(
                "no message {} for {}",
                message_id, address
            )));
        }
        Ok(())
    }

    /// Box listing, newest first.
    pub async fn load_box(&self, address: &str, mailbox: Mailbox) -> Result<Vec<EmailHeader>> {
        let rows = sqlx::query_as::<_, (String, i64, String, String, String)>(
            r#"
            SELECT m.message_id, m.unix_time, m.from_addr, m.to_addrs, m.cipher_subject
            FROM boxes b JOIN messages m ON m.message_id = b.message_id
            WHERE b.address = ? AND b.box = ?
            ORDER BY m.unix_time DESC
            "#,
        )
        .bind(address)
        .bind(mailbox.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(message_id, unix_time, from, to, cipher_subject)| EmailHeader {
                message_id,
                unix_time,
                from,
                to,
                cipher_subject,
            })
            .collect())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

impl UserStore for SqliteStore {
    async fn load_user_auth(&self, token: &str) -> Result<Option<UserAuth>> {
        let row = sqlx::query_as::<_, (String, String, String, String)>(
            r#"
            SELECT token, public_hash, password_hash, password_hash_old
            FROM users WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(token, public_hash, password_hash, password_hash_old)| UserAuth {
            token,
            public_hash,
            password_hash,
            password_hash_old,
        }))
    }
}

impl LocalKeyStore for SqliteStore {
    async fn load_pub_key(&self, public_hash: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT public_key FROM users WHERE public_hash = ?",
        )
        .bind(public_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(public_key,)| public_key))
    }
}

impl MailboxStore for SqliteStore {
    async fn save_message(&self, email: &Email) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                message_id, unix_time, from_addr, to_addrs,
                cipher_subject, cipher_body
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&email.message_id)
        .bind(email.unix_time)
        .bind(&email.from)
        .bind(&email.to)
        .bind(&email.cipher_subject)
        .bind(&email.cipher_body)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn add_message_to_box(
        &self,
        email: &Email,
        address: &str,
        mailbox: Mailbox,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO boxes (id, message_id, address, box, unix_time)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&email.message_id)
        .bind(address)
        .bind(mailbox.as_str())
        .bind(email.unix_time)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
