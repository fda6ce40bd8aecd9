//! bexio manual entry poster
//!
//! Single-binary service that:
//! 1. Loads OAuth client configuration (TOML + env)
//! 2. Serves the login redirect and OAuth callback
//! 3. Accepts mapping updates and manual entry submissions
//! 4. Posts entries to the bexio accounting API with token recovery

mod config;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bexio_auth::{AuthEndpoints, Credentials, Session};
use bexio_post::{ApiEndpoints, MappingResolver, PostingClient};

use crate::config::Config;
use crate::routes::AppState;

/// Build the axum router with all routes and shared state.
///
/// Only the submit route carries a concurrency limit of 1: a posting
/// is not cancellable mid-request, so a second submission waits rather
/// than racing the first. Health and auth routes stay responsive while
/// a posting is in flight.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/login", get(routes::login))
        .route("/callback", get(routes::callback))
        .route(
            "/entries",
            post(routes::submit_entry).layer(tower::limit::ConcurrencyLimitLayer::new(1)),
        )
        .route("/mappings/accounts", post(routes::update_account_mappings))
        .route("/mappings/accounts/autoload", post(routes::autoload_accounts))
        .route("/mappings/currencies", post(routes::update_currency_mappings))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting entry-poster");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        client_id = %config.oauth.client_id,
        v3_base = %config.api.v3_base,
        currency_mode = ?config.api.currency_mode,
        "configuration loaded"
    );

    let http = reqwest::Client::new();

    let client_secret = config
        .oauth
        .client_secret
        .take()
        .context("client secret missing after config load")?;

    let session = Arc::new(Session::new(
        Credentials {
            client_id: config.oauth.client_id.clone(),
            client_secret,
            redirect_uri: config.oauth.redirect_uri.clone(),
        },
        AuthEndpoints {
            authorize_url: config.oauth.authorize_url.clone(),
            token_url: config.oauth.token_url.clone(),
        },
        http.clone(),
    ));

    let client = Arc::new(PostingClient::new(
        session.clone(),
        ApiEndpoints {
            v2_base: config.api.v2_base.clone(),
            v3_base: config.api.v3_base.clone(),
        },
        config.api.currency_mode,
        http,
    ));

    let state = AppState {
        session,
        client,
        resolver: Arc::new(Mutex::new(MappingResolver::new())),
    };

    let router = build_router(state);
    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "listening");
    axum::serve(listener, router)
        .await
        .context("server terminated")?;

    Ok(())
}
