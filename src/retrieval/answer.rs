use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{IndexedSegment, SimilarityIndex};
use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::llm::{PromptLanguage, TextCompletion};
use crate::segmentation::content_hash;

pub const NO_CONTEXT_ANSWER: &str = "No relevant context found in the video.";
pub const MISSING_THINKING: &str = "The model did not provide a separate thinking process.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerReference {
    pub source: String,
    pub thumbnail: String,
    pub chunk_id: String,
    pub timestamp: String,
    pub text: String,
    pub preview: String,
    pub video_title: String,
    pub language: String,
}

impl From<&IndexedSegment> for AnswerReference {
    fn from(item: &IndexedSegment) -> Self {
        Self {
            source: item.segment.source_timestamp_url.clone(),
            thumbnail: item.thumbnail.clone(),
            chunk_id: item.segment.chunk_id(),
            timestamp: item.segment.time_range(),
            text: item.segment.content.clone(),
            preview: item.preview(),
            video_title: if item.video_title.is_empty() {
                "Unknown".to_string()
            } else {
                item.video_title.clone()
            },
            language: item.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub question: String,
    pub expanded_query: String,
    pub thinking_process: String,
    pub answer: String,
    pub references: Vec<AnswerReference>,
    pub context_hash: String,
    /// Answers are always produced in English
    pub language: String,
}

/// Text between `<tag>` and `</tag>`, if both are present
fn tagged<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(text[start..end].trim())
}

/// Split a completion into thinking and answer parts
pub fn split_tagged_answer(completion: &str) -> (String, String) {
    match (tagged(completion, "thinking"), tagged(completion, "answer")) {
        (Some(thinking), Some(answer)) => (thinking.to_string(), answer.to_string()),
        _ => (MISSING_THINKING.to_string(), completion.to_string()),
    }
}

/// Answers questions from a similarity store through the completion service
pub struct AnswerEngine {
    completion: Arc<dyn TextCompletion>,
    index: Arc<dyn SimilarityIndex>,
    top_k: usize,
    diversity_pool: usize,
}

impl AnswerEngine {
    pub fn new(completion: Arc<dyn TextCompletion>, index: Arc<dyn SimilarityIndex>, config: &RetrievalConfig) -> Self {
        Self {
            completion,
            index,
            top_k: config.top_k,
            diversity_pool: config.diversity_pool,
        }
    }

    async fn expand(&self, question: &str, language: PromptLanguage) -> String {
        match self.completion.complete(&language.expansion_prompt(question), language).await {
            Ok(expanded) => expanded.trim().to_string(),
            Err(e) => {
                warn!("⚠️ Query expansion failed, searching with the original question: {}", e);
                question.to_string()
            }
        }
    }

    pub async fn answer(&self, store: &str, question: &str) -> Result<AnswerReport> {
        let language = PromptLanguage::detect(question);
        let expanded_query = self.expand(question, language).await;
        debug!("Expanded query ({}): {}", language.code(), expanded_query);

        self.index.load(store).await?;
        let matches = self
            .index
            .query(store, &expanded_query, self.top_k, self.diversity_pool)
            .await?;

        if matches.is_empty() {
            info!("🔍 No context in {} for: {}", store, question);
            return Ok(AnswerReport {
                question: question.to_string(),
                expanded_query,
                thinking_process: String::new(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                references: Vec::new(),
                context_hash: String::new(),
                language: PromptLanguage::English.code().to_string(),
            });
        }

        let context = matches
            .iter()
            .map(|m| m.segment.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let completion = self
            .completion
            .complete(&PromptLanguage::answer_prompt(question, &context), PromptLanguage::English)
            .await?;
        let (thinking_process, answer) = split_tagged_answer(&completion);

        info!("💬 Answered from {} segments of {}", matches.len(), store);
        Ok(AnswerReport {
            question: question.to_string(),
            expanded_query,
            thinking_process,
            answer,
            references: matches.iter().map(AnswerReference::from).collect(),
            context_hash: content_hash(&context),
            language: PromptLanguage::English.code().to_string(),
        })
    }
}
