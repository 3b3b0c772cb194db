//! HTTP service wiring.
//!
//! Builds the shared state, mounts the routes and runs the listener until
//! ctrl-c. Everything request-scoped lives in `handlers`; everything with
//! domain behavior lives in the pipeline modules.

mod handlers;

use crate::config::{StorageBackend, StudioConfig};
use crate::mail::Mailer;
use crate::store::{self, AssetStore};
use crate::{debug, log};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared service collaborators, cloned into every handler.
///
/// All members are either `Arc`s or internally pooled clients, so a clone
/// per request is cheap and handlers stay free of locks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StudioConfig>,
    pub store: Arc<dyn AssetStore>,
    pub fetcher: reqwest::Client,
    pub mailer: Option<Mailer>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes();

    Router::new()
        .route(
            "/upload",
            post(handlers::upload_assets).get(handlers::list_assets),
        )
        .route("/export", post(handlers::export_mailing))
        .route("/assets/{key}", get(handlers::get_asset))
        .route("/assets/copy", post(handlers::copy_assets))
        .route("/send", post(handlers::send_mail))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bring up the full service and run until ctrl-c.
pub async fn serve(config: Arc<StudioConfig>) -> Result<()> {
    let store = store::from_config(&config.storage).context("Failed to construct asset store")?;
    match config.storage.backend {
        StorageBackend::Local => debug!("store"; "local root {}", config.storage.root.display()),
        StorageBackend::Remote => debug!("store"; "remote gateway {}", config.storage.endpoint),
    }

    let mailer = if config.mail.enabled() {
        let mailer = Mailer::from_config(&config.mail)?;
        log!("mail"; "relay {}:{}", config.mail.host, config.mail.port);
        Some(mailer)
    } else {
        debug!("mail"; "no [mail] host configured, /send disabled");
        None
    };

    let fetcher = reqwest::Client::builder()
        .build()
        .context("Failed to construct HTTP client")?;

    let addr = SocketAddr::new(config.server.interface, config.server.port);
    let app = router(AppState {
        config: Arc::clone(&config),
        store,
        fetcher,
        mailer,
    });

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log!("serve"; "http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Signal registration failed; never trigger shutdown from here.
        std::future::pending::<()>().await;
    }
    log!("serve"; "shutting down");
}

// =============================================================================
// Tests
// =============================================================================
