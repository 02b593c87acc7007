//! Application startup and lifecycle management.
//!
//! Builds the provider and resolver from configuration, wires the router,
//! and runs the HTTP server until a shutdown signal arrives.

use crate::config::ChatConfig;
use crate::handlers::{app::health_check, chat::chat, metrics::metrics};
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::ModelProvider;
use crate::services::ModelResolver;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no provider key is configured.
    pub resolver: Option<ModelResolver>,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(resolver: Option<ModelResolver>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            static_dir: static_dir.into(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, AppError> {
        let resolver = match &config.gemini.api_key {
            Some(api_key) => {
                let provider = GeminiProvider::new(GeminiConfig {
                    api_key: api_key.clone(),
                    api_base: config.gemini.api_base.clone(),
                    timeout: Duration::from_secs(config.gemini.request_timeout_secs),
                })
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
                let provider: Arc<dyn ModelProvider> = Arc::new(provider);

                tracing::info!(
                    api_base = %config.gemini.api_base,
                    discovery = config.models.discovery,
                    fallback_models = ?config.models.fallback_models,
                    "Initialized Gemini provider"
                );

                Some(ModelResolver::new(provider, config.models.clone()))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY is not set; /chat will report a configuration error");
                None
            }
        };

        Ok(Self::new(resolver, config.static_files.dir.clone()))
    }
}

pub fn build_router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_dir.join("index.html"));
    let assets = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route_service("/", index)
        .nest_service("/static", assets)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config)?;

        // Port 0 = random port for testing
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            static_dir = %config.static_files.dir.display(),
            "Chat service listening on port {}",
            port
        );

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}
