//! API request handlers
//!
//! Thin layer over the core components: parse + validate input, resolve
//! the caller, call into the resolver/router/store, map errors to status
//! codes. Per-address soft failures never become HTTP errors; they ride
//! inside 200 responses.

use axum::{
    extract::{Host, Path, State},
    http::{header::COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::address::group_addrs_by_host;
use crate::auth::{authenticate, compute_public_hash, CallerIdentity, Credentials};
use crate::config::Config;
use crate::error::{MailError, Result};
use crate::federation::{HttpFederationClient, KeyResolver};
use crate::routing::DeliveryRouter;
use crate::storage::{Email, EmailHeader, Mailbox, SqliteStore, User};
use crate::utils::dns::DnsMxResolver;
use crate::utils::validation::{validate_hash, validate_hex, validate_message_id, validate_token};

/// Shared application state
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub resolver: KeyResolver<SqliteStore, HttpFederationClient>,
    pub router: DeliveryRouter<DnsMxResolver, SqliteStore>,
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

impl IntoResponse for MailError {
    fn into_response(self) -> Response {
        let status = match &self {
            MailError::MalformedAddress(_)
            | MailError::InvalidInput(_)
            | MailError::Conflict(_) => StatusCode::BAD_REQUEST,
            MailError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MailError::NotFound(_) => StatusCode::NOT_FOUND,
            MailError::DnsLookup(_) => StatusCode::BAD_GATEWAY,
            MailError::ProtocolViolation(_) => {
                error!("Protocol violation: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => {
                error!("Internal error: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ApiError::new(&self.to_string()))).into_response()
    }
}

/// Resolve the caller from auth cookies, if any are present.
async fn caller_identity(
    state: &AppState,
    headers: &HeaderMap,
    host: &str,
) -> Result<Option<CallerIdentity>> {
    let creds =
        Credentials::from_cookie_header(headers.get(COOKIE).and_then(|v| v.to_str().ok()));
    authenticate(state.store.as_ref(), &creds, host, &state.config.server.domain).await
}

async fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
    host: &str,
) -> Result<CallerIdentity> {
    caller_identity(state, headers, host)
        .await?
        .ok_or_else(|| MailError::Unauthorized("not logged in".to_string()))
}

/// GET /health - liveness plus a storage ping
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_healthy = state.store.health_check().await.is_ok();
    let status = if db_healthy { "healthy" } else { "unhealthy" };
    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "service": "zkmail-rs",
            "version": env!("CARGO_PKG_VERSION"),
            "checks": { "database": if db_healthy { "ok" } else { "failed" } }
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct PublicKeysForm {
    pub addresses: String,
}

/// POST /publickeys - batched public-key lookup
///
/// Without auth cookies this is a trusted server-to-server request and
/// resolves locally only; with them it fans out to each address's home
/// server. Same handler serves the federation endpoint peers POST to.
pub async fn public_keys(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    Form(form): Form<PublicKeysForm>,
) -> Result<impl IntoResponse> {
    let caller = caller_identity(&state, &headers, &host).await?;
    let groups = group_addrs_by_host(&form.addresses)?;
    let result = state.resolver.resolve(&groups, caller.as_ref()).await?;
    Ok(Json(result))
}

/// GET /user/:hash - raw public key by hash
///
/// The server is untrusted; the client re-hashes the returned key to
/// verify it matches the hash it asked for.
pub async fn get_public_key(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse> {
    use crate::federation::LocalKeyStore;

    let hash = validate_hash(&hash)?;
    match state.store.load_pub_key(hash).await? {
        Some(pub_key) => Ok(pub_key),
        None => Err(MailError::NotFound("unknown public key hash".to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserForm {
    pub token: String,
    pub pass_hash: String,
    pub public_key: String,
    pub cipher_private_key: String,
}

/// POST /user - account creation
///
/// Key generation happens on the client; the private key arrives already
/// encrypted. The server derives the public hash itself.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateUserForm>,
) -> Result<impl IntoResponse> {
    let token = validate_token(&form.token)?.to_string();
    let password_hash = validate_hash(&form.pass_hash)?.to_string();
    let cipher_private_key = validate_hex(&form.cipher_private_key)?.to_string();

    if form.public_key.is_empty() {
        return Err(MailError::InvalidInput("missing public key".to_string()));
    }

    let public_hash = compute_public_hash(&form.public_key);
    let user = User {
        token,
        password_hash,
        password_hash_old: String::new(),
        public_key: form.public_key,
        public_hash: public_hash.clone(),
        cipher_private_key,
    };
    state.store.save_user(&user).await?;

    Ok(Json(serde_json::json!({ "publicHash": public_hash })))
}

/// GET /user/me/key - the caller's encrypted private key blob
pub async fn get_private_key(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    match state.store.load_user(&caller.token).await? {
        Some(user) => Ok(user.cipher_private_key),
        None => Err(MailError::NotFound("no such user".to_string())),
    }
}

/// GET /user/me/contacts - encrypted address book, one opaque blob
pub async fn get_contacts(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    match state.store.load_contacts(&caller.token).await? {
        Some(cipher_contacts) => Ok(cipher_contacts),
        None => Err(MailError::NotFound("no contacts stored".to_string())),
    }
}

/// POST /user/me/contacts - replace the whole encrypted address book
///
/// The server cannot update individual entries it cannot read, so the
/// client always posts the full re-encrypted blob.
pub async fn save_contacts(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    let cipher_contacts = validate_hex(&body)?;
    state.store.save_contacts(&caller.token, cipher_contacts).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxSummary {
    pub token: String,
    pub public_hash: String,
    pub email_headers: Vec<EmailHeader>,
}

/// GET /box/:box - metadata listing for one mailbox (no bodies)
pub async fn get_box(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    Path(box_name): Path<String>,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    let mailbox = Mailbox::from_user_str(&box_name).ok_or_else(|| {
        MailError::InvalidInput(format!(
            "unknown box, expected 'inbox', 'sent', etc, got {:?}",
            box_name
        ))
    })?;

    let email_headers = state.store.load_box(&caller.email_address, mailbox).await?;
    Ok(Json(InboxSummary {
        token: caller.token,
        public_hash: caller.public_hash,
        email_headers,
    }))
}

/// GET /email/:id - cipher body of one message
pub async fn get_email(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    let id = validate_message_id(&id)?;

    if !state.store.message_belongs_to(id, &caller.email_address).await? {
        return Err(MailError::NotFound("no such message".to_string()));
    }
    match state.store.load_message(id).await? {
        Some(email) => Ok(email.cipher_body),
        None => Err(MailError::NotFound("no such message".to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct MoveEmailForm {
    #[serde(rename = "box")]
    pub mailbox: String,
}

/// PUT /email/:id - move a message between the caller's boxes
pub async fn move_email(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<MoveEmailForm>,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    let id = validate_message_id(&id)?;
    let mailbox = Mailbox::from_user_str(&form.mailbox)
        .ok_or_else(|| MailError::InvalidInput(format!("unknown box {:?}", form.mailbox)))?;

    state.store.update_box(&caller.email_address, id, mailbox).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailForm {
    pub msg_id: String,
    pub to: String,
    pub cipher_subject: Option<String>,
    pub cipher_body: Option<String>,
    #[cfg(feature = "plaintext-compat")]
    pub subject: Option<String>,
    #[cfg(feature = "plaintext-compat")]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResponse {
    pub message_id: String,
    pub status: String,
}

/// POST /email - compose and route a message
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    headers: HeaderMap,
    Form(form): Form<SendEmailForm>,
) -> Result<impl IntoResponse> {
    let caller = require_auth(&state, &headers, &host).await?;
    let message_id = validate_message_id(&form.msg_id)?.to_string();

    let (cipher_subject, cipher_body) = match (&form.cipher_subject, &form.cipher_body) {
        (Some(subject), Some(body)) => (
            validate_hex(subject)?.to_string(),
            validate_hex(body)?.to_string(),
        ),
        _ => {
            #[cfg(feature = "plaintext-compat")]
            {
                // Transitional unencrypted path.
                (
                    form.subject.clone().unwrap_or_default(),
                    form.body.clone().unwrap_or_default(),
                )
            }
            #[cfg(not(feature = "plaintext-compat"))]
            {
                return Err(MailError::InvalidInput(
                    "cipherSubject and cipherBody are required".to_string(),
                ));
            }
        }
    };

    let groups = group_addrs_by_host(&form.to)?;
    let email = Email {
        message_id: message_id.clone(),
        unix_time: Utc::now().timestamp(),
        from: caller.email_address,
        to: form.to,
        cipher_subject,
        cipher_body,
    };

    state.router.route(&email, &groups).await?;

    Ok(Json(SendEmailResponse {
        message_id,
        status: "routed".to_string(),
    }))
}
