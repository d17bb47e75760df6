//! Authentication gate
//!
//! Credentials travel as cookies: `token`, `passHash` and, during a
//! password rotation grace window, `passHashOld`. Absent credentials are
//! not an error; they mark the caller as an anonymous peer server and
//! select trusted/local resolution downstream.
//!
//! Lookup misses and hash mismatches are indistinguishable to the caller
//! (anti-enumeration).

use crate::error::Result;
use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};
use std::future::Future;

/// Stored credentials for one account, as the gate needs them.
#[derive(Debug, Clone)]
pub struct UserAuth {
    pub token: String,
    pub public_hash: String,
    pub password_hash: String,
    pub password_hash_old: String,
}

/// User-lookup collaborator.
pub trait UserStore: Send + Sync {
    fn load_user_auth(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<UserAuth>>> + Send;
}

/// Credentials as parsed off the request.
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    pub token: Option<String>,
    pub pass_hash: Option<String>,
    pub pass_hash_old: Option<String>,
}

impl Credentials {
    /// Parse a `Cookie` header value. Unknown cookies are ignored.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        let mut creds = Self::default();
        let Some(header) = header else {
            return creds;
        };
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match name.trim() {
                "token" => creds.token = Some(value),
                "passHash" => creds.pass_hash = Some(value),
                "passHashOld" => creds.pass_hash_old = Some(value),
                _ => {}
            }
        }
        creds
    }
}

/// A resolved caller. Request-scoped; the email address is derived from
/// the serving host, never stored.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub token: String,
    pub public_hash: String,
    pub email_address: String,
}

/// Resolve the caller, if any.
///
/// Returns `Ok(None)` when credentials are missing, unknown, or do not
/// match; storage failures are the only hard errors.
pub async fn authenticate<S: UserStore>(
    store: &S,
    creds: &Credentials,
    request_host: &str,
    service_domain: &str,
) -> Result<Option<CallerIdentity>> {
    let (Some(token), Some(pass_hash)) = (&creds.token, &creds.pass_hash) else {
        return Ok(None);
    };
    let pass_hash_old = creds.pass_hash_old.as_deref().unwrap_or("");

    let Some(user) = store.load_user_auth(token).await? else {
        return Ok(None);
    };

    if !check_password(&user, pass_hash, pass_hash_old) {
        return Ok(None);
    }

    let domain = derive_domain(request_host, service_domain);
    Ok(Some(CallerIdentity {
        email_address: format!("{}@{}", user.public_hash, domain),
        token: user.token,
        public_hash: user.public_hash,
    }))
}

/// Rotation-tolerant password check: the current supplied hash against the
/// stored current hash, or the supplied previous hash against the stored
/// previous hash. An empty supplied value never matches, even when the
/// stored counterpart is also empty.
fn check_password(user: &UserAuth, pass_hash: &str, pass_hash_old: &str) -> bool {
    if !pass_hash.is_empty() && pass_hash == user.password_hash {
        return true;
    }
    if !pass_hash_old.is_empty() && pass_hash_old == user.password_hash_old {
        return true;
    }
    false
}

/// Addressing domain for a request host. The loopback name (bare or with a
/// port) aliases to the configured service domain so local development
/// produces real addresses.
fn derive_domain<'a>(request_host: &'a str, service_domain: &'a str) -> &'a str {
    if request_host == "localhost" || request_host.starts_with("localhost:") {
        service_domain
    } else {
        request_host
    }
}

/// Hash of a posted public key; doubles as the account's address local
/// part. Clients recompute this to verify keys served by an untrusted
/// server.
pub fn compute_public_hash(public_key: &str) -> String {
    let digest = Sha256::digest(public_key.as_bytes());
    HEXLOWER.encode(&digest)
}
