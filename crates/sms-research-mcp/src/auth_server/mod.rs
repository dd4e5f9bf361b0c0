//! Standalone OAuth 2.0 authorization server.
//!
//! Handles client registration, the authorization-code flow with a login
//! page, token issuance, introspection, and revocation. Resource servers
//! validate tokens against `/introspect`; they never see credentials.
//!
//! This is a demo-grade server with in-memory state. It can be swapped for
//! an enterprise authorization server (Auth0, Entra ID, ...) without touching
//! the resource server, which only depends on the introspection contract.

pub mod handlers;
pub mod login;
pub mod store;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AuthServerConfig;
use handlers::AuthServerState;
use store::OAuthStore;

pub use store::{OAuthClient, TokenPair};

/// Create the authorization server router.
#[must_use]
pub fn create_router(config: AuthServerConfig) -> Router {
    let store = OAuthStore::new();

    // Start background cleanup task for expired codes and tokens
    Arc::new(store.clone()).start_cleanup_task();

    let state = Arc::new(AuthServerState { store, config });

    Router::new()
        .route("/.well-known/oauth-authorization-server", get(handlers::handle_metadata))
        .route("/oauth/register", post(handlers::handle_register))
        .route("/oauth/authorize", get(handlers::handle_authorize))
        .route("/login", get(handlers::handle_login_page))
        .route("/login/callback", post(handlers::handle_login_callback))
        .route("/oauth/token", post(handlers::handle_token))
        .route("/oauth/revoke", post(handlers::handle_revoke))
        .route("/introspect", post(handlers::handle_introspect))
        .route("/health", get(handlers::handle_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the authorization server until ctrl-c.
///
/// # Errors
///
/// Returns error if the listener cannot bind or the server fails.
pub async fn run(config: AuthServerConfig) -> anyhow::Result<()> {
    // Bind via ToSocketAddrs so hostnames like "localhost" resolve
    let bind_addr = (config.host.clone(), config.port);
    let issuer = config.issuer_url.clone();
    let demo_username = config.demo_username.clone();

    let router = create_router(config);

    tracing::info!("Authorization server running on {}", issuer);
    tracing::info!(username = %demo_username, "Demo credentials configured");
    tracing::info!("Login page: {}/login", issuer);
    tracing::info!("Health check: {}/health", issuer);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("Authorization server shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("Failed to install CTRL+C handler");
    tracing::info!("Received shutdown signal");
}
