//! Retrieval-augmented answers over indexed transcript segments

pub mod answer;
pub mod indexer;
pub mod lexical;

pub use answer::{AnswerEngine, AnswerReport, AnswerReference};
pub use indexer::{store_name, IngestReport, VideoIndexer};
pub use lexical::LexicalIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::segmentation::TextSegment;

/// A segment as stored in a similarity index, with the video context it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedSegment {
    pub segment: TextSegment,
    pub video_title: String,
    pub thumbnail: String,
    pub language: String,
}

impl IndexedSegment {
    /// First 50 characters followed by an ellipsis
    pub fn preview(&self) -> String {
        let preview: String = self.segment.content.chars().take(50).collect();
        format!("{}...", preview)
    }
}

/// Embedding and similarity store contract
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn build(&self, items: Vec<IndexedSegment>, store: &str) -> Result<()>;

    /// Make a previously built store queryable
    async fn load(&self, store: &str) -> Result<()>;

    /// Top `k` matches, diversified over the best `pool` candidates
    async fn query(&self, store: &str, text: &str, k: usize, pool: usize) -> Result<Vec<IndexedSegment>>;
}
