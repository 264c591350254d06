/// Decoders for the two caption payload formats
use scraper::{Html, Selector};
use serde::Deserialize;

use super::CaptionEntry;
use crate::error::{QuizError, Result};

/// Duration assumed when a payload omits one
pub const DEFAULT_DURATION_SECONDS: f64 = 3.0;

#[derive(Debug, Deserialize)]
struct EventList {
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<f64>,
    #[serde(default)]
    segs: Vec<EventSegment>,
}

#[derive(Debug, Deserialize)]
struct EventSegment {
    #[serde(default)]
    utf8: String,
}

/// Decode the JSON event-list format (`{"events": [{"tStartMs", "dDurationMs", "segs": [{"utf8"}]}]}`)
pub fn parse_event_list(payload: &str) -> Result<Vec<CaptionEntry>> {
    let list: EventList = serde_json::from_str(payload)?;

    Ok(list
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let duration = event
                .duration_ms
                .map(|ms| ms / 1000.0)
                .unwrap_or(DEFAULT_DURATION_SECONDS);
            Some(CaptionEntry::new(text, event.start_ms / 1000.0, duration))
        })
        .collect())
}

/// Decode timed-text markup (`<text start=".." dur="..">escaped body</text>`)
pub fn parse_timed_text(payload: &str) -> Result<Vec<CaptionEntry>> {
    let document = Html::parse_fragment(payload);
    let selector = Selector::parse("text").map_err(|e| QuizError::ParseFailure(format!("selector: {:?}", e)))?;

    let mut elements = document.select(&selector).peekable();
    if elements.peek().is_none() {
        return Err(QuizError::ParseFailure("no timed-text elements".to_string()));
    }

    let mut entries = Vec::new();
    for element in elements {
        let Some(start) = element.value().attr("start").and_then(|s| s.trim().parse::<f64>().ok()) else {
            continue;
        };
        let duration = element
            .value()
            .attr("dur")
            .and_then(|d| d.trim().parse::<f64>().ok())
            .unwrap_or(DEFAULT_DURATION_SECONDS);

        let text = unescape_entities(&element.text().collect::<String>());
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        entries.push(CaptionEntry::new(text, start, duration));
    }

    Ok(entries)
}

/// Caption bodies arrive entity-escaped inside already-escaped markup; decode the inner layer
///
/// Only entities are decoded: a literal `<` is re-escaped first so text that
/// looks like a tag after the first pass stays text.
fn unescape_entities(text: &str) -> String {
    if !(text.contains('&') && text.contains(';')) {
        return text.to_string();
    }
    Html::parse_fragment(&text.replace('<', "&lt;")).root_element().text().collect()
}
