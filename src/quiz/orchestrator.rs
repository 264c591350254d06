use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use super::allocation::allocate;
use super::sink::QuestionSink;
use super::QuizQuestion;
use crate::captions::VideoReference;
use crate::config::QuizConfig;
use crate::error::{QuizError, Result};
use crate::pipeline::QuizPipeline;

/// Response body of a multi-source quiz request
#[derive(Debug, Clone, Serialize)]
pub struct QuizBatchResult {
    pub status: bool,
    pub total_questions: usize,
    pub questions: Vec<QuizQuestion>,
    pub saved_to: String,
}

/// What happened to one source
#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub slot: usize,
    pub reference: String,
    pub video_id: Option<String>,
    pub question_count: usize,
    pub failure: Option<String>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub result: QuizBatchResult,
    pub slots: Vec<SlotReport>,
}

struct SlotOutcome {
    report: SlotReport,
    questions: Vec<QuizQuestion>,
}

/// Runs one quiz pipeline per source concurrently and assembles a fixed-size result
pub struct QuizOrchestrator {
    pipeline: Arc<QuizPipeline>,
    sink: Arc<dyn QuestionSink>,
    config: QuizConfig,
    worker_semaphore: Arc<Semaphore>,
}

impl QuizOrchestrator {
    pub fn new(pipeline: Arc<QuizPipeline>, sink: Arc<dyn QuestionSink>, config: QuizConfig) -> Self {
        info!("🔧 Initializing QuizOrchestrator with {} workers", config.source_count);
        Self {
            pipeline,
            sink,
            worker_semaphore: Arc::new(Semaphore::new(config.source_count.max(1))),
            config,
        }
    }

    fn validate(&self, references: &[VideoReference]) -> Result<()> {
        if references.len() != self.config.source_count {
            return Err(QuizError::Validation(format!(
                "expected exactly {} video references, got {}",
                self.config.source_count,
                references.len()
            )));
        }
        if self.config.quotas.len() != self.config.source_count {
            return Err(QuizError::Validation(format!(
                "quota list has {} entries for {} sources",
                self.config.quotas.len(),
                self.config.source_count
            )));
        }
        let quota_sum: usize = self.config.quotas.iter().sum();
        if quota_sum != self.config.target_count {
            return Err(QuizError::Validation(format!(
                "quotas sum to {} but {} questions are required",
                quota_sum, self.config.target_count
            )));
        }
        Ok(())
    }

    fn pipeline_timeout(&self) -> Option<Duration> {
        match self.config.pipeline_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Validate, fan out, allocate by quota and persist
    pub async fn run(&self, references: Vec<VideoReference>) -> Result<BatchOutcome> {
        self.validate(&references)?;
        info!("🚀 Starting quiz batch over {} sources", references.len());

        let mut slots = self.run_slots(references).await;
        slots.sort_by_key(|slot| slot.report.slot);

        let reports: Vec<SlotReport> = slots.iter().map(|s| s.report.clone()).collect();
        let available: usize = reports.iter().map(|r| r.question_count).sum();
        let allocation = allocate(
            slots.into_iter().map(|s| s.questions).collect(),
            &self.config.quotas,
            self.config.target_count,
        );

        info!(
            "📊 Allocated {} of {} available questions ({} within quota, {} from leftovers)",
            allocation.selected.len(),
            available,
            allocation.from_quota,
            allocation.from_leftover
        );

        let saved_to = self.sink.persist(&allocation.selected).await?;

        Ok(BatchOutcome {
            result: QuizBatchResult {
                status: true,
                total_questions: allocation.selected.len(),
                questions: allocation.selected,
                saved_to,
            },
            slots: reports,
        })
    }

    async fn run_slots(&self, references: Vec<VideoReference>) -> Vec<SlotOutcome> {
        let total = references.len();
        let (tx, mut rx) = mpsc::channel(total.max(1));
        let timeout = self.pipeline_timeout();

        for (slot, reference) in references.into_iter().enumerate() {
            let pipeline = Arc::clone(&self.pipeline);
            let semaphore = Arc::clone(&self.worker_semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Worker pool closed: {}", e);
                        return;
                    }
                };

                info!("📹 Processing source {}/{}: {}", slot + 1, total, reference.as_str());
                let outcome = run_slot(&pipeline, slot, reference, timeout).await;

                if let Err(e) = tx.send(outcome).await {
                    error!("Failed to send slot result: {}", e);
                }
            });
        }

        // Close the channel once every task has reported
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        // A task that panicked never reports; its slot contributes nothing
        for slot in 0..total {
            if !outcomes.iter().any(|o: &SlotOutcome| o.report.slot == slot) {
                warn!("❌ Source {} produced no result", slot + 1);
                outcomes.push(SlotOutcome {
                    report: SlotReport {
                        slot,
                        reference: String::new(),
                        video_id: None,
                        question_count: 0,
                        failure: Some("pipeline task aborted".to_string()),
                        elapsed_ms: 0,
                    },
                    questions: Vec::new(),
                });
            }
        }

        outcomes
    }
}

async fn run_slot(
    pipeline: &QuizPipeline,
    slot: usize,
    reference: VideoReference,
    timeout: Option<Duration>,
) -> SlotOutcome {
    let started = Instant::now();
    let work = pipeline.run(&reference);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(QuizError::PipelineTimeout(limit.as_secs())),
        },
        None => work.await,
    };

    let elapsed = started.elapsed();
    let (video_id, questions, failure) = match result {
        Ok((video_id, questions)) => {
            info!(
                "✅ Source {}: {} questions from {} in {:.2}s",
                slot + 1,
                questions.len(),
                video_id,
                elapsed.as_secs_f64()
            );
            (Some(video_id), questions, None)
        }
        Err(e) => {
            warn!("❌ Source {} failed: {} - {}", slot + 1, reference.as_str(), e);
            (reference.video_id().ok(), Vec::new(), Some(e.to_string()))
        }
    };

    SlotOutcome {
        report: SlotReport {
            slot,
            reference: reference.as_str().to_string(),
            video_id,
            question_count: questions.len(),
            failure,
            elapsed_ms: elapsed.as_millis(),
        },
        questions,
    }
}
