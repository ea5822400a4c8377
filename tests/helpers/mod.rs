//! Test helpers: spawn the gateway on an ephemeral port and build uploads.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use deepfake_gateway::app_state::AppState;
use deepfake_gateway::config::GatewayConfig;
use deepfake_gateway::routes;
use deepfake_gateway::services::gateway::PredictionGateway;
use deepfake_gateway::services::mock::MockGenerator;
use reqwest::multipart::{Form, Part};

pub const TEST_SEED: u64 = 2024;

/// Gateway configuration with no artificial delay. Loopback upstreams are
/// allowed so mock servers on 127.0.0.1 are actually contacted.
pub fn fast_config(upstream: Option<&str>) -> GatewayConfig {
    let mut config = GatewayConfig::new(upstream).expect("valid upstream url");
    config.allow_loopback_upstream = true;
    config.mock_delay = Duration::ZERO;
    config.upstream_timeout = Duration::from_secs(10);
    config
}

/// Start the full application and return its base URL.
pub async fn spawn_gateway(config: GatewayConfig) -> String {
    let mock = MockGenerator::seeded(TEST_SEED, config.mock_delay);
    let gateway = PredictionGateway::with_mock(config, mock).expect("gateway");
    spawn_router(routes::app(AppState::new(gateway))).await
}

/// Serve any router on an ephemeral port and return its base URL.
pub async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    format!("http://{addr}")
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

/// Multipart upload as the browser client sends it.
pub fn video_form(file_name: &str, bytes: Vec<u8>, sequence_length: Option<&str>) -> Form {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str("video/mp4")
        .expect("valid mime");

    let form = Form::new().part("upload_video_file", part);
    match sequence_length {
        Some(len) => form.text("sequence_length", len.to_string()),
        None => form,
    }
}
