use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::fetcher::{FetchRequest, HttpFetch, Route};
use super::primary::{decode_caption_body, tracks_from_player_response, CaptionError};
use super::{select_track, CaptionEntry};

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// Fallback acquisition from the public watch page
pub struct PageScraper {
    fetcher: Arc<dyn HttpFetch>,
}

impl PageScraper {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }

    /// Locate the embedded player response, pick a track by preference order and decode it
    pub async fn scrape(
        &self,
        video_id: &str,
        languages: &[String],
        route: Route,
    ) -> Result<(Vec<CaptionEntry>, String), CaptionError> {
        let page = self
            .fetcher
            .fetch(&FetchRequest::get(Self::watch_url(video_id)), route)
            .await?;

        let player_response = extract_player_response(&page)
            .ok_or_else(|| CaptionError::Malformed("player response not found in page".to_string()))?;
        let tracks = tracks_from_player_response(video_id, &player_response)?;

        let track = select_track(&tracks, languages, false).ok_or_else(|| CaptionError::NotFound {
            video_id: video_id.to_string(),
            languages: languages.to_vec(),
        })?;
        debug!("Scraped {} tracks for {}, using {}", tracks.len(), video_id, track.language_code);

        let body = self
            .fetcher
            .fetch(&FetchRequest::get(event_list_url(&track.base_url)), route)
            .await?;

        let entries = decode_caption_body(&body)?;
        Ok((entries, track.language_code.clone()))
    }
}

/// Ask for the event-list rendition of a track
fn event_list_url(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(mut url) => {
            let pairs: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "fmt")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut().clear().extend_pairs(pairs).append_pair("fmt", "json3");
            url.to_string()
        }
        Err(_) => base_url.to_string(),
    }
}

/// Find the player-response JSON assigned inside a script element
pub fn extract_player_response(page: &str) -> Option<Value> {
    let document = Html::parse_document(page);
    if let Ok(selector) = Selector::parse("script") {
        for script in document.select(&selector) {
            let text: String = script.text().collect();
            if let Some(value) = object_after_marker(&text) {
                return Some(value);
            }
        }
    }
    object_after_marker(page)
}

fn object_after_marker(text: &str) -> Option<Value> {
    let marker = text.find(PLAYER_RESPONSE_MARKER)?;
    let rest = &text[marker + PLAYER_RESPONSE_MARKER.len()..];
    let open = rest.find('{')?;
    let object = balanced_object(&rest[open..])?;
    serde_json::from_str(object).ok()
}

/// The shortest prefix that is a brace-balanced JSON object, honouring string literals
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}
