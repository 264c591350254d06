pub mod allocation;
pub mod generator;
pub mod orchestrator;
pub mod parser;
pub mod sink;

pub use allocation::{allocate, Allocation};
pub use generator::{format_srt_timestamp, parse_srt_timestamp, QuizGenerator};
pub use orchestrator::{BatchOutcome, QuizBatchResult, QuizOrchestrator, SlotReport};
pub use parser::{parse_question_blocks, BlockOutcome, ParseReport};
pub use sink::{JsonFileSink, QuestionSink};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One multiple-choice question
///
/// Field names on the wire follow the quiz frontend's JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    #[serde(rename = "question")]
    pub prompt: String,
    /// Option text keyed by label `a`..`d`
    pub options: BTreeMap<String, String>,
    /// Always one of the keys of `options`
    #[serde(rename = "correct_answer")]
    pub correct_label: String,
    /// `HH:MM:SS,mmm` as written by the model
    pub timestamp: String,
    #[serde(rename = "seconds")]
    pub timestamp_seconds: u64,
    #[serde(rename = "youtube_url")]
    pub source_url: String,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn correct_option(&self) -> Option<&str> {
        self.options.get(&self.correct_label).map(String::as_str)
    }
}
