use std::sync::Arc;

use crate::services::gateway::PredictionGateway;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PredictionGateway>,
}

impl AppState {
    pub fn new(gateway: PredictionGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}
