//! Service handles shared by every per-video pipeline
//!
//! Clients are built once from configuration and handed to each pipeline by
//! reference; nothing here is global.

use std::sync::Arc;
use tracing::info;

use crate::captions::{BoundedFetcher, CaptionCascade, HttpFetch, TranscriptDocument, VideoReference};
use crate::config::Config;
use crate::error::Result;
use crate::llm::{ChatCompletion, TextCompletion};
use crate::quiz::{QuizGenerator, QuizQuestion};
use crate::segmentation::{SegmentAligner, TextSegment};

/// Reference → ID → cascade → aligned segments
pub struct TranscriptPipeline {
    cascade: CaptionCascade,
    aligner: SegmentAligner,
}

/// A transcript together with its aligned segments
#[derive(Debug, Clone)]
pub struct AlignedTranscript {
    pub document: TranscriptDocument,
    pub segments: Vec<TextSegment>,
}

impl TranscriptPipeline {
    pub fn new(cascade: CaptionCascade, aligner: SegmentAligner) -> Self {
        Self { cascade, aligner }
    }

    pub async fn run(&self, reference: &VideoReference) -> Result<AlignedTranscript> {
        let video_id = reference.video_id()?;
        let document = self.cascade.acquire(&video_id).await.into_result(&video_id)?;
        let segments = self.aligner.align(&document);

        info!(
            "📝 {} → {} entries, {} segments ({})",
            video_id,
            document.entries().len(),
            segments.len(),
            document.language_code()
        );

        Ok(AlignedTranscript { document, segments })
    }
}

/// Full quiz pipeline for one source
pub struct QuizPipeline {
    transcripts: Arc<TranscriptPipeline>,
    generator: QuizGenerator,
}

impl QuizPipeline {
    pub fn new(transcripts: Arc<TranscriptPipeline>, generator: QuizGenerator) -> Self {
        Self { transcripts, generator }
    }

    pub async fn run(&self, reference: &VideoReference) -> Result<(String, Vec<QuizQuestion>)> {
        let aligned = self.transcripts.run(reference).await?;
        let video_id = aligned.document.video_id().to_string();
        let language = crate::llm::PromptLanguage::from_code(aligned.document.language_code());
        let questions = self.generator.generate(&video_id, &aligned.segments, language).await?;
        Ok((video_id, questions))
    }
}

/// Every long-lived client the binary and the HTTP surface need
pub struct Services {
    pub fetcher: Arc<dyn HttpFetch>,
    pub completion: Arc<dyn TextCompletion>,
    pub transcripts: Arc<TranscriptPipeline>,
    pub quiz: Arc<QuizPipeline>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn HttpFetch> = Arc::new(BoundedFetcher::new(&config.captions, &config.fetcher)?);
        let completion: Arc<dyn TextCompletion> = Arc::new(ChatCompletion::from_config(&config.llm)?);
        Ok(Self::with_clients(config, fetcher, completion))
    }

    /// Assemble services around already-built clients
    pub fn with_clients(config: &Config, fetcher: Arc<dyn HttpFetch>, completion: Arc<dyn TextCompletion>) -> Self {
        let cascade = CaptionCascade::with_fetcher(fetcher.clone(), config.captions.languages.clone());
        let transcripts = Arc::new(TranscriptPipeline::new(cascade, SegmentAligner::new(&config.segmentation)));
        let quiz = Arc::new(QuizPipeline::new(
            transcripts.clone(),
            QuizGenerator::new(completion.clone(), config.quiz.questions_per_source),
        ));

        Self {
            fetcher,
            completion,
            transcripts,
            quiz,
        }
    }
}
