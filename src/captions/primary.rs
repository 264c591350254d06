use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::fetcher::{is_network_message, FetchFailure, FetchRequest, HttpFetch, Route};
use super::parsers::{parse_event_list, parse_timed_text};
use super::{select_track, CaptionEntry, CaptionTrack};

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";

/// How a failed stage should influence the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Proxy, tunnel, gateway, TLS or connection trouble
    NetworkProxy,
    Other,
}

/// Failures reported by a caption source
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    #[error("no transcript for {video_id} in any of {languages:?}")]
    NotFound { video_id: String, languages: Vec<String> },

    #[error("transcripts are disabled for {0}")]
    Disabled(String),

    #[error("video {video_id} is unplayable: {reason}")]
    Unplayable { video_id: String, reason: String },

    #[error("network error: {0}")]
    Network(FetchFailure),

    #[error("malformed caption payload: {0}")]
    Malformed(String),
}

impl CaptionError {
    pub fn failure_class(&self) -> FailureClass {
        let network = match self {
            CaptionError::Network(failure) => failure.is_network_class(),
            CaptionError::Unplayable { reason, .. } => is_network_message(reason),
            _ => false,
        };
        if network {
            FailureClass::NetworkProxy
        } else {
            FailureClass::Other
        }
    }
}

impl From<FetchFailure> for CaptionError {
    fn from(failure: FetchFailure) -> Self {
        CaptionError::Network(failure)
    }
}

/// Primary caption service contract
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Tracks available for a video
    async fn list(&self, video_id: &str, route: Route) -> Result<Vec<CaptionTrack>, CaptionError>;

    /// Ordered entries of one track
    async fn fetch(&self, video_id: &str, track: &CaptionTrack, route: Route) -> Result<Vec<CaptionEntry>, CaptionError>;

    /// First track matching the preference list (human-authored preferred), fetched
    async fn find_transcript(
        &self,
        video_id: &str,
        languages: &[String],
        route: Route,
    ) -> Result<(Vec<CaptionEntry>, String), CaptionError> {
        let tracks = self.list(video_id, route).await?;
        let track = select_track(&tracks, languages, true).ok_or_else(|| CaptionError::NotFound {
            video_id: video_id.to_string(),
            languages: languages.to_vec(),
        })?;

        debug!(
            "Selected {} track '{}' for {} (generated: {})",
            track.language_code, track.name, video_id, track.is_generated
        );

        let entries = self.fetch(video_id, track, route).await?;
        Ok((entries, track.language_code.clone()))
    }
}

/// Caption source backed by the platform's player API
pub struct InnertubeCaptionSource {
    fetcher: Arc<dyn HttpFetch>,
}

impl InnertubeCaptionSource {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    fn player_request(video_id: &str) -> FetchRequest {
        FetchRequest::post_json(
            PLAYER_ENDPOINT,
            json!({
                "context": {
                    "client": {
                        "clientName": CLIENT_NAME,
                        "clientVersion": CLIENT_VERSION,
                        "hl": "en"
                    }
                },
                "videoId": video_id
            }),
        )
    }
}

/// Check playability and enumerate tracks of a player response
pub(crate) fn tracks_from_player_response(video_id: &str, response: &Value) -> Result<Vec<CaptionTrack>, CaptionError> {
    let playability = response.get("playabilityStatus");
    let status = playability
        .and_then(|p| p.get("status"))
        .and_then(Value::as_str)
        .unwrap_or("OK");

    if status != "OK" {
        let reason = playability
            .and_then(|p| p.get("reason"))
            .and_then(Value::as_str)
            .unwrap_or(status)
            .to_string();
        return Err(CaptionError::Unplayable {
            video_id: video_id.to_string(),
            reason,
        });
    }

    match CaptionTrack::from_player_response(response) {
        Some(tracks) if !tracks.is_empty() => Ok(tracks),
        _ => Err(CaptionError::Disabled(video_id.to_string())),
    }
}

/// Decode a caption body, event-list first, timed-text second
///
/// A track that decodes to no entries is a failure, so the cascade moves on.
pub(crate) fn decode_caption_body(body: &str) -> Result<Vec<CaptionEntry>, CaptionError> {
    let entries = match parse_event_list(body) {
        Ok(entries) => entries,
        Err(event_err) => parse_timed_text(body).map_err(|markup_err| {
            CaptionError::Malformed(format!("event-list: {}; timed-text: {}", event_err, markup_err))
        })?,
    };
    if entries.is_empty() {
        return Err(CaptionError::Malformed("no caption entries".to_string()));
    }
    Ok(entries)
}

#[async_trait]
impl CaptionSource for InnertubeCaptionSource {
    async fn list(&self, video_id: &str, route: Route) -> Result<Vec<CaptionTrack>, CaptionError> {
        let body = self.fetcher.fetch(&Self::player_request(video_id), route).await?;
        let response: Value =
            serde_json::from_str(&body).map_err(|e| CaptionError::Malformed(format!("player response: {}", e)))?;
        tracks_from_player_response(video_id, &response)
    }

    async fn fetch(&self, _video_id: &str, track: &CaptionTrack, route: Route) -> Result<Vec<CaptionEntry>, CaptionError> {
        let url = track.base_url.replace("&fmt=srv3", "");
        let body = self.fetcher.fetch(&FetchRequest::get(url), route).await?;
        if body.trim().is_empty() {
            return Err(CaptionError::Malformed("empty caption body".to_string()));
        }
        decode_caption_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedFetch {
        responses: Mutex<Vec<Result<String, FetchFailure>>>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl ScriptedFetch {
        fn new(responses: Vec<Result<String, FetchFailure>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpFetch for ScriptedFetch {
        async fn fetch(&self, request: &FetchRequest, _route: Route) -> Result<String, FetchFailure> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses.lock().unwrap().remove(0)
        }

        fn has_proxy(&self) -> bool {
            false
        }
    }

    fn player_response() -> String {
        json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://example.test/asr", "languageCode": "en", "kind": "asr"},
                {"baseUrl": "https://example.test/manual&fmt=srv3", "languageCode": "en"}
            ]}}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_find_transcript_prefers_manual_track() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            Ok(player_response()),
            Ok(r#"<transcript><text start="1" dur="2">manual line</text></transcript>"#.to_string()),
        ]));
        let source = InnertubeCaptionSource::new(fetch.clone());

        let (entries, language) = source
            .find_transcript("k4oWqYT6tjk", &["en".to_string()], Route::Direct)
            .await
            .unwrap();

        assert_eq!(language, "en");
        assert_eq!(entries[0].text, "manual line");

        let requests = fetch.requests.lock().unwrap();
        assert!(requests[0].body.is_some());
        assert_eq!(requests[1].url, "https://example.test/manual");
    }

    #[test]
    fn test_unplayable_and_disabled() {
        let unplayable = json!({"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}});
        assert!(matches!(
            tracks_from_player_response("x", &unplayable),
            Err(CaptionError::Unplayable { .. })
        ));

        let no_captions = json!({"playabilityStatus": {"status": "OK"}});
        assert_eq!(
            tracks_from_player_response("x", &no_captions),
            Err(CaptionError::Disabled("x".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_language_is_not_found() {
        let fetch = Arc::new(ScriptedFetch::new(vec![Ok(player_response())]));
        let source = InnertubeCaptionSource::new(fetch);

        let err = source
            .find_transcript("x", &["hi".to_string()], Route::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, CaptionError::NotFound { .. }));
        assert_eq!(err.failure_class(), FailureClass::Other);
    }

    #[test]
    fn test_network_errors_are_proxy_class() {
        let err = CaptionError::from(FetchFailure::Transport("error sending request: tunnel failed".into()));
        assert_eq!(err.failure_class(), FailureClass::NetworkProxy);
        assert_eq!(CaptionError::Disabled("x".into()).failure_class(), FailureClass::Other);
    }

    #[test]
    fn test_decode_falls_back_to_timed_text() {
        let entries = decode_caption_body(r#"<transcript><text start="0" dur="1">a</text></transcript>"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(decode_caption_body("garbage"), Err(CaptionError::Malformed(_))));
    }

    #[test]
    fn test_decode_rejects_track_without_entries() {
        let err = decode_caption_body(r#"{"events":[{"tStartMs":0,"segs":[{"utf8":"\n"}]}]}"#).unwrap_err();
        assert_eq!(err, CaptionError::Malformed("no caption entries".to_string()));
        assert_eq!(err.failure_class(), FailureClass::Other);
        assert!(decode_caption_body("<transcript></transcript>").is_err());
    }
}
