//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use super::{handlers, models::{ErrorResponse, MultiQuizRequest}};
use crate::quiz::QuizOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QuizOrchestrator>,
}

/// Routes with tracing and permissive CORS
pub fn router(orchestrator: Arc<QuizOrchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/quiz/multi", post(multi_quiz_handler))
        .with_state(AppState { orchestrator })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(orchestrator: Arc<QuizOrchestrator>, port: u16) -> Result<()> {
    let app = router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check()))
}

async fn multi_quiz_handler(
    State(state): State<AppState>,
    Json(payload): Json<MultiQuizRequest>,
) -> impl IntoResponse {
    match handlers::create_multi_quiz(&state.orchestrator, payload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            let status = handlers::status_for(&e);
            if status.is_server_error() {
                error!("❌ Quiz batch failed: {}", e);
            }
            (status, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}
