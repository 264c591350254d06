/// Normalizes free-form video references into canonical 11-character IDs
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

use crate::error::{QuizError, Result};

/// A video reference as accepted on the wire: a bare string or `{"url": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VideoReference {
    Plain(String),
    Wrapped { url: String },
}

impl VideoReference {
    pub fn as_str(&self) -> &str {
        match self {
            VideoReference::Plain(s) => s,
            VideoReference::Wrapped { url } => url,
        }
    }

    pub fn video_id(&self) -> Result<String> {
        extract_video_id(self.as_str())
    }
}

impl From<&str> for VideoReference {
    fn from(value: &str) -> Self {
        VideoReference::Plain(value.to_string())
    }
}

fn id_shape() -> &'static Regex {
    static ID_SHAPE: OnceLock<Regex> = OnceLock::new();
    ID_SHAPE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid id regex"))
}

fn path_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // youtu.be/ID
            r"(?i)^(?:https?://)?youtu\.be/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
            // youtube.com/embed|shorts|live|v/ID
            r"(?i)^(?:https?://)?(?:[a-z]+\.)?youtube(?:-nocookie)?\.com/(?:embed|shorts|live|v)/([A-Za-z0-9_-]{11})(?:[/?&#]|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid reference regex"))
        .collect()
    })
}

/// Watch URLs carry the ID in the `v` query parameter
fn match_watch_query(reference: &str) -> Option<String> {
    let candidate = if reference.contains("://") {
        reference.to_string()
    } else {
        format!("https://{}", reference)
    };
    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.to_lowercase();
    if !(host == "youtube.com" || host.ends_with(".youtube.com")) {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| id_shape().is_match(id))
}

/// Extract the canonical video ID from a URL or bare ID
pub fn extract_video_id(reference: &str) -> Result<String> {
    let reference = reference.trim();

    if let Some(id) = match_watch_query(reference) {
        return Ok(id);
    }

    for pattern in path_patterns() {
        if let Some(captures) = pattern.captures(reference) {
            if let Some(id) = captures.get(1) {
                return Ok(id.as_str().to_string());
            }
        }
    }

    if id_shape().is_match(reference) {
        return Ok(reference.to_string());
    }

    Err(QuizError::InvalidReference(reference.to_string()))
}
