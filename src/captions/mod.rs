/// Caption acquisition: identifier extraction, bounded fetching, payload
/// decoding and the fallback cascade that ties them together.

pub mod cascade;
pub mod fetcher;
pub mod parsers;
pub mod primary;
pub mod scrape;
pub mod video_id;

pub use cascade::{AcquisitionOutcome, CascadeState, CaptionCascade};
pub use fetcher::{BoundedFetcher, FetchFailure, FetchRequest, HttpFetch, RetryPolicy, Route};
pub use primary::{CaptionError, CaptionSource, FailureClass, InnertubeCaptionSource};
pub use scrape::PageScraper;
pub use video_id::{extract_video_id, VideoReference};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One timed line of captioning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionEntry {
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl CaptionEntry {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start: start.max(0.0),
            duration: duration.max(0.0),
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// The full ordered caption sequence for one video in one language
///
/// Entries are sorted by start time on construction and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDocument {
    video_id: String,
    language_code: String,
    entries: Vec<CaptionEntry>,
}

impl TranscriptDocument {
    pub fn new(video_id: impl Into<String>, language_code: impl Into<String>, mut entries: Vec<CaptionEntry>) -> Self {
        entries.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            video_id: video_id.into(),
            language_code: language_code.into(),
            entries,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn entries(&self) -> &[CaptionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry texts joined by a single space
    pub fn full_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A caption track advertised by a player response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub name: String,
    pub base_url: String,
    /// Automatically generated (speech recognition) rather than human-authored
    pub is_generated: bool,
}

impl CaptionTrack {
    /// Enumerate caption tracks from a player response JSON value
    ///
    /// Returns `None` when the response carries no caption section at all.
    pub fn from_player_response(player_response: &Value) -> Option<Vec<CaptionTrack>> {
        let tracks = player_response
            .get("captions")?
            .get("playerCaptionsTracklistRenderer")?
            .get("captionTracks")?
            .as_array()?;

        Some(
            tracks
                .iter()
                .filter_map(|track| {
                    let base_url = track.get("baseUrl")?.as_str()?.to_string();
                    let language_code = track.get("languageCode")?.as_str()?.to_string();
                    let name = track
                        .get("name")
                        .and_then(|n| {
                            n.get("simpleText").and_then(Value::as_str).map(str::to_string).or_else(|| {
                                n.get("runs")
                                    .and_then(Value::as_array)
                                    .map(|runs| {
                                        runs.iter()
                                            .filter_map(|r| r.get("text").and_then(Value::as_str))
                                            .collect::<String>()
                                    })
                            })
                        })
                        .unwrap_or_else(|| language_code.clone());
                    let is_generated = track.get("kind").and_then(Value::as_str) == Some("asr");

                    Some(CaptionTrack {
                        language_code,
                        name,
                        base_url,
                        is_generated,
                    })
                })
                .collect(),
        )
    }
}

/// Pick a track by language preference order
///
/// With `prefer_manual`, a human-authored track beats a generated one for the
/// same language; otherwise the first track advertised for that language wins.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String], prefer_manual: bool) -> Option<&'a CaptionTrack> {
    for language in languages {
        let mut candidates = tracks.iter().filter(|t| t.language_code == *language);
        let chosen = if prefer_manual {
            let candidates: Vec<_> = candidates.collect();
            candidates
                .iter()
                .find(|t| !t.is_generated)
                .or_else(|| candidates.first())
                .copied()
        } else {
            candidates.next()
        };
        if chosen.is_some() {
            return chosen;
        }
    }
    None
}
