//! Application startup and lifecycle management.

use crate::client::{
    HttpRatingBackend, HttpRegionDirectory, RatingBackend, RegionDirectory, StaticRegionDirectory,
};
use crate::config::{RegionSource, UsageConfig};
use crate::error::UsageError;
use crate::handlers;
use crate::services::{HistoryAssembler, InMemoryMonthCache};
use axum::middleware::from_fn;
use axum::{routing::get, Router};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: UsageConfig,
    pub assembler: HistoryAssembler,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the rating backend and region directory
    /// described by `config`.
    pub async fn build(config: UsageConfig) -> Result<Self, AppError> {
        let backend: Arc<dyn RatingBackend> = Arc::new(
            HttpRatingBackend::new(config.rating_client()).map_err(UsageError::from)?,
        );

        let regions: Arc<dyn RegionDirectory> = match &config.regions {
            RegionSource::Identity { url } => Arc::new(
                HttpRegionDirectory::new(
                    url,
                    config.rating.auth_token.clone(),
                    config.rating.request_timeout,
                )
                .map_err(UsageError::from)?,
            ),
            RegionSource::Static(list) => {
                if list.is_empty() {
                    tracing::warn!("No regions configured - live month will be empty");
                }
                Arc::new(StaticRegionDirectory::new(list.clone()))
            }
        };

        let mut assembler = HistoryAssembler::new(backend, regions)
            .with_max_concurrency(config.history.max_concurrent_requests);
        if config.history.cache_enabled {
            assembler = assembler.with_cache(Arc::new(InMemoryMonthCache::new()));
        }

        Self::build_with(config, assembler).await
    }

    /// Build around an already-wired assembler.
    pub async fn build_with(
        config: UsageConfig,
        assembler: HistoryAssembler,
    ) -> Result<Self, AppError> {
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        let state = AppState { config, assembler };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/api/v1/tenants/:tenant_id/cost",
                get(handlers::usage::get_cost),
            )
            .route(
                "/api/v1/tenants/:tenant_id/credits",
                get(handlers::usage::get_credits),
            )
            .layer(from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        tracing::info!("Usage service: HTTP on port {}", http_port);

        Ok(Self {
            http_port,
            listener,
            router,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
