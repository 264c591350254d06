pub mod splitter;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use crate::captions::{CaptionEntry, TranscriptDocument};
use crate::config::SegmentationConfig;
pub use splitter::RecursiveSplitter;
use splitter::char_len;

/// A bounded slice of cleaned transcript text with its recovered time range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSegment {
    pub video_id: String,
    pub content: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub sequence_index: usize,
    pub source_timestamp_url: String,
    /// First 8 hex digits of the MD5 of `content`
    pub content_hash: String,
}

impl TextSegment {
    pub fn chunk_id(&self) -> String {
        format!("chunk_{}", self.sequence_index)
    }

    /// `"MM:SS - MM:SS"` style range for display
    pub fn time_range(&self) -> String {
        format!("{} - {}", clock(self.start_seconds), clock(self.end_seconds))
    }
}

fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

pub fn timestamp_url(video_id: &str, seconds: f64) -> String {
    format!("https://www.youtube.com/watch?v={}&t={}s", video_id, seconds.max(0.0) as u64)
}

pub fn content_hash(text: &str) -> String {
    let digest = format!("{:x}", md5::compute(text.as_bytes()));
    digest[..8].to_string()
}

fn separator_line() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"^[_\W\s]{5,}$").expect("valid separator regex"))
}

/// Drop decorative separator lines (runs of five or more non-word characters)
pub fn clean_text(text: &str) -> String {
    text.lines()
        .filter(|line| !separator_line().is_match(line.trim()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Character span of one caption entry within the space-joined transcript
struct EntrySpan<'a> {
    entry: &'a CaptionEntry,
    /// Offset one past the entry's last character
    end: usize,
}

fn entry_spans(entries: &[CaptionEntry]) -> Vec<EntrySpan<'_>> {
    let mut offset = 0;
    entries
        .iter()
        .map(|entry| {
            let end = offset + char_len(&entry.text);
            offset = end + 1;
            EntrySpan { entry, end }
        })
        .collect()
}

/// Splits a transcript into segments and recovers a time range for each
#[derive(Debug, Clone)]
pub struct SegmentAligner {
    splitter: RecursiveSplitter,
}

impl SegmentAligner {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            splitter: RecursiveSplitter::new(config.chunk_size, config.chunk_overlap),
        }
    }

    pub fn align(&self, document: &TranscriptDocument) -> Vec<TextSegment> {
        let entries = document.entries();
        let Some(last) = entries.last() else {
            return Vec::new();
        };

        let cleaned = clean_text(&document.full_text());
        let spans = entry_spans(entries);
        let chunks = self.splitter.split(&cleaned);
        let chunk_count = chunks.len();

        let segments: Vec<TextSegment> = chunks
            .into_iter()
            .filter_map(|content| {
                let byte_offset = cleaned.find(content.as_str())?;
                let start_offset = char_len(&cleaned[..byte_offset]);
                let end_offset = start_offset + char_len(&content);
                Some((content, start_offset, end_offset))
            })
            .enumerate()
            .map(|(sequence_index, (content, start_offset, end_offset))| {
                let start_seconds = spans
                    .iter()
                    .find(|span| start_offset <= span.end)
                    .map(|span| span.entry.start)
                    .unwrap_or(last.start);
                let end_seconds = spans
                    .iter()
                    .find(|span| span.end >= end_offset)
                    .map(|span| span.entry.end())
                    .unwrap_or_else(|| last.end())
                    .max(start_seconds);

                TextSegment {
                    video_id: document.video_id().to_string(),
                    source_timestamp_url: timestamp_url(document.video_id(), start_seconds),
                    content_hash: content_hash(&content),
                    content,
                    start_seconds,
                    end_seconds,
                    sequence_index,
                }
            })
            .collect();

        debug!(
            "Aligned {} of {} segments for {} ({} entries)",
            segments.len(),
            chunk_count,
            document.video_id(),
            entries.len()
        );
        segments
    }
}
