//! Web layer module
//!
//! HTTP interface of dramashort: the catalog proxy under `/api`, the player
//! page under `/player`, and the embedded front-end for everything else.
//! Handlers stay thin and delegate to [`crate::catalog`] for upstream work.

use anyhow::Result;
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{catalog::CatalogClient, config::Config};

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::{ErrorResponse, handle_error};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config) -> Result<Self> {
        let catalog = CatalogClient::new(config.catalog.clone())?;
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = Self::create_router(AppState::new(config, catalog));
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            // Catalog passthrough
            .route("/api/home", get(handlers::catalog::proxy_home))
            .route("/api/detail/{id}", get(handlers::catalog::proxy_detail))
            .route("/api/video/{id}", get(handlers::catalog::proxy_video))
            // Normalized catalog
            .route("/api/catalog/{source}", get(handlers::catalog::catalog_page))
            .route(
                "/api/catalog/{source}/{id}",
                get(handlers::catalog::catalog_detail),
            )
            .route("/api/{*rest}", get(handlers::catalog::api_not_found))
            .route("/player", get(handlers::player::player_page))
            .route("/", get(handlers::static_assets::index))
            // Catch-all route for static assets - this should be LAST to avoid conflicts
            .fallback(handlers::static_assets::serve_embedded_asset)
            // Middleware (applied in reverse order)
            .layer(CorsLayer::permissive())
            .layer(axum::middleware::from_fn(
                middleware::security_headers_middleware,
            ))
            .layer(axum::middleware::from_fn(
                middleware::request_logging_middleware,
            ))
            .with_state(state)
    }

    /// Serve until SIGINT/SIGTERM
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                tracing::warn!("Failed to install SIGTERM handler, waiting for Ctrl+C only");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: CatalogClient,
    /// Application start time for uptime calculation
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, catalog: CatalogClient) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            start_time: Utc::now(),
        }
    }
}
