//! API data models

use serde::{Deserialize, Serialize};

use crate::captions::VideoReference;

/// Body of `POST /api/quiz/multi`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiQuizRequest {
    pub video_urls: Vec<VideoReference>,
}

/// Error body returned with every non-2xx status
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}
