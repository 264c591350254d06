//! HTTP surface for multi-source quiz generation
//!
//! Enabled with the `api` feature.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::quiz::QuizOrchestrator;

pub mod handlers;
pub mod models;
pub mod server;

/// API server wrapping a shared orchestrator
pub struct ApiServer {
    orchestrator: Arc<QuizOrchestrator>,
    port: u16,
}

impl ApiServer {
    pub fn new(orchestrator: Arc<QuizOrchestrator>, port: u16) -> Self {
        Self { orchestrator, port }
    }

    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.orchestrator, self.port).await
    }
}
