use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::QuizQuestion;
use crate::config::OutputConfig;
use crate::error::{QuizError, Result};

/// Write-only durable storage for an assembled question set
#[async_trait]
pub trait QuestionSink: Send + Sync {
    /// Persist the questions and return the logical path reported to callers
    async fn persist(&self, questions: &[QuizQuestion]) -> Result<String>;
}

/// Writes the question list as pretty JSON to a fixed file
pub struct JsonFileSink {
    path: PathBuf,
    public_path: String,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            public_path: public_path.into(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.sink_path.clone(), config.saved_to.clone())
    }
}

#[async_trait]
impl QuestionSink for JsonFileSink {
    async fn persist(&self, questions: &[QuizQuestion]) -> Result<String> {
        let json = serde_json::to_string_pretty(questions)
            .map_err(|e| QuizError::PersistenceFailure(format!("serialize questions: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| QuizError::PersistenceFailure(format!("{}: {}", parent.display(), e)))?;
        }

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| QuizError::PersistenceFailure(format!("{}: {}", self.path.display(), e)))?;

        info!("💾 Saved {} questions to {}", questions.len(), self.path.display());
        Ok(self.public_path.clone())
    }
}
