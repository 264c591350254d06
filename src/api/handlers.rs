//! API request handlers

use axum::http::StatusCode;
use tracing::{info, warn};

use super::models::{HealthResponse, MultiQuizRequest};
use crate::error::QuizError;
use crate::quiz::{QuizBatchResult, QuizOrchestrator};

/// Handle health check requests
pub fn health_check() -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Status code a batch error is reported with
pub fn status_for(error: &QuizError) -> StatusCode {
    match error {
        QuizError::Validation(_) | QuizError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handle multi-source quiz requests
pub async fn create_multi_quiz(
    orchestrator: &QuizOrchestrator,
    request: MultiQuizRequest,
) -> Result<QuizBatchResult, QuizError> {
    info!("📥 Quiz request with {} references", request.video_urls.len());
    let outcome = orchestrator.run(request.video_urls).await?;

    for slot in outcome.slots.iter().filter(|slot| slot.failure.is_some()) {
        warn!(
            "⚠️ Source {} ({}) contributed nothing: {}",
            slot.slot + 1,
            slot.reference,
            slot.failure.as_deref().unwrap_or_default()
        );
    }
    Ok(outcome.result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&QuizError::Validation("3 refs".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&QuizError::PersistenceFailure("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_health_check() {
        let health = health_check();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "caption-quiz");
    }
}
