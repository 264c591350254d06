//! Error types for caption acquisition, segmentation and quiz synthesis

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, QuizError>;

/// Error types surfaced by the library
///
/// Per-source failures (`AcquisitionFailed`, `ParseFailure`, `SynthesisFailure`)
/// are absorbed by the orchestrator and never abort a batch. Only
/// `Validation` and `PersistenceFailure` reach the caller of a batch.
#[derive(thiserror::Error, Debug)]
pub enum QuizError {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Caption acquisition failed for {video_id}: {reason}")]
    AcquisitionFailed { video_id: String, reason: String },

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    #[error("Pipeline exceeded {0}s")]
    PipelineTimeout(u64),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for QuizError {
    fn from(err: serde_json::Error) -> Self {
        QuizError::ParseFailure(err.to_string())
    }
}

impl QuizError {
    /// True for errors that must abort a whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            QuizError::Validation(_) | QuizError::PersistenceFailure(_) | QuizError::Configuration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(QuizError::Validation("wrong length".into()).is_fatal());
        assert!(QuizError::PersistenceFailure("disk full".into()).is_fatal());
        assert!(!QuizError::SynthesisFailure("empty".into()).is_fatal());
        assert!(!QuizError::AcquisitionFailed {
            video_id: "abc".into(),
            reason: "exhausted".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = QuizError::InvalidReference("not a video".into());
        assert_eq!(err.to_string(), "Invalid video reference: not a video");
    }
}
