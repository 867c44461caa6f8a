use image_relay_service::config::RelayConfig;
use image_relay_service::services::init_metrics;
use image_relay_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // OTLP export is opt-in; without an endpoint only JSON logs are written
    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("image-relay-service", "info", otlp_endpoint.as_deref());

    if let Err(e) = init_metrics() {
        tracing::error!("Failed to install metrics recorder: {}", e);
    }

    let config = RelayConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    tracing::info!("Image relay service listening on port {}", app.port());

    app.run_until_stopped().await
}
