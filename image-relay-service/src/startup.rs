//! Application startup and lifecycle management.

use crate::config::{ProviderBackend, RelayConfig};
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::mock::MockProvider;
use crate::services::providers::GenerativeProvider;
use crate::services::{LocalStorage, RetentionSweeper, Storage};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::HeaderName,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub provider: Arc<dyn GenerativeProvider>,
    pub storage: Arc<dyn Storage>,
}

/// Response headers browsers may read cross-origin.
const EXPOSED_HEADERS: [&str; 5] = [
    "x-original-filename",
    "x-prompt",
    "x-analysis",
    "content-disposition",
    REQUEST_ID_HEADER,
];

/// Build the HTTP router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/generate-image/", post(handlers::generate_image))
        .route("/generate-image", post(handlers::generate_image))
        .route(
            "/generate-image-with-details/",
            post(handlers::generate_image_with_details),
        )
        .route(
            "/generate-image-with-details",
            post(handlers::generate_image_with_details),
        )
        .route("/analyze-image/", post(handlers::analyze_image))
        .route("/analyze-image", post(handlers::analyze_image))
        .route("/download/:filename", get(handlers::download_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer())
        .with_state(state)
}

/// Open CORS: any origin, method and header, with credentials.
///
/// Wildcards cannot be combined with credentials, so the request's own
/// origin, method and headers are mirrored back instead.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers(EXPOSED_HEADERS.map(HeaderName::from_static))
}

fn build_provider(config: &RelayConfig) -> Result<Arc<dyn GenerativeProvider>, AppError> {
    match config.provider.backend {
        ProviderBackend::Gemini => {
            let provider = GeminiProvider::new(GeminiConfig {
                api_key: config.provider.api_key.clone(),
                api_base: config.provider.api_base.clone(),
                timeout: config.provider.timeout(),
            })
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

            if !provider.is_configured() {
                tracing::warn!("GOOGLE_API_KEY is not set; model calls will be rejected");
            }
            Ok(Arc::new(provider))
        }
        ProviderBackend::Mock => {
            tracing::warn!("Using mock provider; responses are synthetic");
            Ok(Arc::new(MockProvider::echo()))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the provider selected by configuration.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: RelayConfig,
        provider: Arc<dyn GenerativeProvider>,
    ) -> Result<Self, AppError> {
        let output_dir = &config.storage.output_dir;
        let storage: Arc<dyn Storage> =
            Arc::new(LocalStorage::new(output_dir).await.map_err(|e| {
                tracing::error!(
                    "Failed to initialize output directory at {}: {}",
                    output_dir.display(),
                    e
                );
                AppError::InternalError(anyhow::anyhow!(e))
            })?);

        tracing::info!(
            provider = provider.name(),
            generation_model = %config.models.generation_model,
            analysis_model = %config.models.analysis_model,
            output_dir = %output_dir.display(),
            "Initialized image relay"
        );

        let state = AppState {
            config: config.clone(),
            provider,
            storage,
        };

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then stop the retention sweeper.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let stop = CancellationToken::new();

        let retention = &self.state.config.retention;
        if retention.enabled() {
            let sweeper = RetentionSweeper::new(
                self.state.storage.root().to_path_buf(),
                retention.max_age(),
                retention.sweep_interval(),
            );
            tokio::spawn(sweeper.run(stop.clone()));
        } else {
            tracing::info!("Retention disabled; generated images are kept indefinitely");
        }

        let router = build_router(self.state);
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        stop.cancel();

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    }
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
