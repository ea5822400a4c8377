use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use deepfake_gateway::app_state::AppState;
use deepfake_gateway::config::AppConfig;
use deepfake_gateway::routes;
use deepfake_gateway::services::gateway::PredictionGateway;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let gateway_config = config
        .gateway()
        .expect("Invalid gateway configuration");

    tracing::info!("Initializing deepfake-gateway");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!(
        "predictions_total",
        "Predictions returned, labelled by source (upstream or mock)"
    );
    metrics::describe_counter!(
        "prediction_failures_total",
        "Failed prediction requests, labelled by error kind"
    );
    metrics::describe_histogram!(
        "prediction_processing_seconds",
        "Time spent producing a detection result"
    );

    let gateway = PredictionGateway::new(gateway_config).expect("Failed to initialize gateway");
    match gateway.config().effective_upstream() {
        Some(upstream) => tracing::info!(%upstream, "Forwarding predictions to inference backend"),
        None => tracing::info!("No inference backend configured, serving mock predictions"),
    }

    let state = AppState::new(gateway);

    let app = routes::with_layers(
        routes::router(state).route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        ),
    );

    tracing::info!("Starting deepfake-gateway on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
