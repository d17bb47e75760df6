//! API Server - HTTP server for the webmail API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::{self, AppState};
use crate::config::Config;
use crate::federation::{HttpFederationClient, KeyResolver};
use crate::routing::DeliveryRouter;
use crate::storage::SqliteStore;
use crate::utils::dns::DnsMxResolver;

pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
}

impl ApiServer {
    /// Wire the core components together from config + storage.
    pub fn new(config: Arc<Config>, store: Arc<SqliteStore>) -> Self {
        let transport = Arc::new(HttpFederationClient::new(config.federation.scheme.clone()));
        let resolver = KeyResolver::new(
            Arc::clone(&store),
            transport,
            Duration::from_secs(config.federation.lookup_timeout_secs),
        );

        let mx = Arc::new(DnsMxResolver::new());
        let router = DeliveryRouter::new(mx, Arc::clone(&store), config.server.mx_host.clone());

        let addr = config.server.listen_addr.clone();
        let state = Arc::new(AppState {
            config,
            store,
            resolver,
            router,
        });

        Self { state, addr }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            // Same handler serves end users and peer servers; the
            // trailing-slash form is the canonical federation endpoint.
            .route("/publickeys", post(handlers::public_keys))
            .route("/publickeys/", post(handlers::public_keys))
            .route("/user", post(handlers::create_user))
            .route("/user/me/key", get(handlers::get_private_key))
            .route(
                "/user/me/contacts",
                get(handlers::get_contacts).post(handlers::save_contacts),
            )
            .route("/user/:hash", get(handlers::get_public_key))
            .route("/box/:box", get(handlers::get_box))
            .route("/email", post(handlers::send_email))
            .route(
                "/email/:id",
                get(handlers::get_email).put(handlers::move_email),
            )
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
