/// Caption Quiz
///
/// Caption acquisition with a fallback cascade, timestamp-aligned segmentation,
/// multi-source quiz synthesis and retrieval-augmented answers for hosted videos.

pub mod captions;
pub mod config;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod pipeline;
pub mod quiz;
pub mod retrieval;
pub mod segmentation;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::captions::{CaptionCascade, TranscriptDocument, VideoReference};
pub use crate::config::Config;
pub use crate::error::{QuizError, Result};
pub use crate::llm::{ChatCompletion, PromptLanguage, TextCompletion};
pub use crate::metadata::{MetadataService, PageMetadataService, VideoMetadata};
pub use crate::pipeline::{QuizPipeline, Services, TranscriptPipeline};
pub use crate::quiz::{JsonFileSink, QuizBatchResult, QuizOrchestrator, QuizQuestion};
pub use crate::retrieval::{AnswerEngine, LexicalIndex, VideoIndexer};
pub use crate::segmentation::{SegmentAligner, TextSegment};
