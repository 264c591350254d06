use std::sync::Arc;
use tracing::{debug, info, warn};

use super::parser::parse_question_blocks;
use super::QuizQuestion;
use crate::error::{QuizError, Result};
use crate::llm::{PromptLanguage, TextCompletion};
use crate::segmentation::TextSegment;

/// Placeholder the prompt asks the model to use in watch URLs
const VIDEO_ID_PLACEHOLDER: &str = "VIDEO_ID";

/// Format seconds as `HH:MM:SS,mmm`
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Parse `HH:MM:SS,mmm` (a `.` before the milliseconds is accepted too)
pub fn parse_srt_timestamp(text: &str) -> Option<f64> {
    let text = text.trim().trim_matches(|c| c == '[' || c == ']');
    let (clock, millis) = text.split_once([',', '.']).unwrap_or((text, "0"));
    let mut parts = clock.split(':').map(|p| p.trim().parse::<u64>());
    let (hours, minutes, seconds) = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    let millis = millis.trim().parse::<u64>().ok()?;
    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Transcript listing handed to the model, one segment per line
pub fn timestamped_transcript(segments: &[TextSegment]) -> String {
    segments
        .iter()
        .map(|segment| {
            format!(
                "[{} (or {}s)] {}",
                format_srt_timestamp(segment.start_seconds),
                segment.start_seconds as u64,
                segment.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Synthesizes quiz questions for one video through the completion service
pub struct QuizGenerator {
    completion: Arc<dyn TextCompletion>,
    question_count: usize,
}

impl QuizGenerator {
    pub fn new(completion: Arc<dyn TextCompletion>, question_count: usize) -> Self {
        Self {
            completion,
            question_count,
        }
    }

    pub async fn generate(
        &self,
        video_id: &str,
        segments: &[TextSegment],
        language: PromptLanguage,
    ) -> Result<Vec<QuizQuestion>> {
        if segments.is_empty() {
            return Err(QuizError::SynthesisFailure(format!("no transcript segments for {}", video_id)));
        }

        let prompt = language.quiz_prompt(&timestamped_transcript(segments), self.question_count);
        debug!("Quiz prompt for {}: {} chars from {} segments", video_id, prompt.len(), segments.len());

        let completion = self.completion.complete(&prompt, language).await?;
        let report = parse_question_blocks(&completion.replace(VIDEO_ID_PLACEHOLDER, video_id));

        for (index, reason) in report.rejected() {
            warn!("Dropped question block {} for {}: {}", index + 1, video_id, reason);
        }

        let questions = report.into_questions();
        if questions.is_empty() {
            return Err(QuizError::SynthesisFailure(format!(
                "completion for {} contained no usable question blocks",
                video_id
            )));
        }

        info!("🧠 Generated {} questions for {}", questions.len(), video_id);
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{content_hash, timestamp_url};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedCompletion {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextCompletion for CannedCompletion {
        async fn complete(&self, prompt: &str, _language: PromptLanguage) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn segment(content: &str, start: f64) -> TextSegment {
        TextSegment {
            video_id: "k4oWqYT6tjk".into(),
            content: content.into(),
            start_seconds: start,
            end_seconds: start + 5.0,
            sequence_index: 0,
            source_timestamp_url: timestamp_url("k4oWqYT6tjk", start),
            content_hash: content_hash(content),
        }
    }

    #[test]
    fn test_srt_formatting() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(90.5), "00:01:30,500");
        assert_eq!(format_srt_timestamp(3725.042), "01:02:05,042");
        assert!((parse_srt_timestamp("01:02:05,042").unwrap() - 3725.042).abs() < 1e-9);
        assert_eq!(parse_srt_timestamp("[00:01:30.500]"), Some(90.5));
        assert_eq!(parse_srt_timestamp("00:61:00,000"), None);
        assert_eq!(parse_srt_timestamp("nonsense"), None);
    }

    #[test]
    fn test_timestamped_transcript_lines() {
        let listing = timestamped_transcript(&[segment("hello there", 1.5), segment("general", 75.0)]);
        assert_eq!(listing, "[00:00:01,500 (or 1s)] hello there\n[00:01:15,000 (or 75s)] general");
    }

    #[tokio::test]
    async fn test_generate_substitutes_video_id() {
        let completion = Arc::new(CannedCompletion {
            reply: "1. Q?\na) w\nb) x*\nc) y\nd) z\nTimestamp: [00:00:01,500]\nSeconds: 1\n\
                    Watch at: https://youtu.be/VIDEO_ID?t=1s\nExplanation: because"
                .to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = QuizGenerator::new(completion.clone(), 3);

        let questions = generator
            .generate("k4oWqYT6tjk", &[segment("hello there", 1.5)], PromptLanguage::English)
            .await
            .unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].source_url, "https://youtu.be/k4oWqYT6tjk?t=1s");
        let prompts = completion.prompts.lock().unwrap();
        assert!(prompts[0].contains("[00:00:01,500 (or 1s)] hello there"));
        assert!(prompts[0].contains("Please generate 3 high quality"));
    }

    #[tokio::test]
    async fn test_unparseable_completion_is_synthesis_failure() {
        let completion = Arc::new(CannedCompletion {
            reply: "Sorry, I can't help with that.".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let generator = QuizGenerator::new(completion, 6);

        let result = generator
            .generate("abc", &[segment("text", 0.0)], PromptLanguage::English)
            .await;
        assert!(matches!(result, Err(QuizError::SynthesisFailure(_))));

        let result = generator.generate("abc", &[], PromptLanguage::English).await;
        assert!(matches!(result, Err(QuizError::SynthesisFailure(_))));
    }
}
