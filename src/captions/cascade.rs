//! Caption acquisition as an explicit state machine
//!
//! ```text
//! PrimaryService(Proxied) --network/proxy + proxy configured--> PrimaryService(Direct)
//! PrimaryService(_)       --otherwise------------------------> ScrapeFallback(first route)
//! ScrapeFallback(Proxied) --network/proxy + proxy configured--> ScrapeFallback(Direct)
//! ScrapeFallback(_)       --otherwise------------------------> Failed
//! ```
//! Without a proxy every stage starts on the direct route, so each strategy runs once.

use std::sync::Arc;
use tracing::{info, warn};

use super::fetcher::{HttpFetch, Route};
use super::primary::{CaptionError, CaptionSource, FailureClass, InnertubeCaptionSource};
use super::scrape::PageScraper;
use super::TranscriptDocument;
use crate::error::QuizError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    PrimaryService(Route),
    ScrapeFallback(Route),
    Failed,
}

impl CascadeState {
    /// Entry state for a cascade
    pub fn initial(proxy_configured: bool) -> Self {
        CascadeState::PrimaryService(first_route(proxy_configured))
    }

    /// Transition taken after the current stage failed with `class`
    pub fn next(self, class: FailureClass, proxy_configured: bool) -> Self {
        let retry_direct = class == FailureClass::NetworkProxy && proxy_configured;
        match self {
            CascadeState::PrimaryService(Route::Proxied) if retry_direct => CascadeState::PrimaryService(Route::Direct),
            CascadeState::PrimaryService(_) => CascadeState::ScrapeFallback(first_route(proxy_configured)),
            CascadeState::ScrapeFallback(Route::Proxied) if retry_direct => CascadeState::ScrapeFallback(Route::Direct),
            CascadeState::ScrapeFallback(_) | CascadeState::Failed => CascadeState::Failed,
        }
    }
}

fn first_route(proxy_configured: bool) -> Route {
    if proxy_configured {
        Route::Proxied
    } else {
        Route::Direct
    }
}

/// Result of a whole cascade run
#[derive(Debug, Clone)]
pub enum AcquisitionOutcome {
    Success(TranscriptDocument),
    Failure(String),
}

impl AcquisitionOutcome {
    pub fn into_result(self, video_id: &str) -> crate::error::Result<TranscriptDocument> {
        match self {
            AcquisitionOutcome::Success(document) => Ok(document),
            AcquisitionOutcome::Failure(reason) => Err(QuizError::AcquisitionFailed {
                video_id: video_id.to_string(),
                reason,
            }),
        }
    }
}

/// Sequences the primary caption service and the page scraper
pub struct CaptionCascade {
    primary: Arc<dyn CaptionSource>,
    scraper: PageScraper,
    languages: Vec<String>,
    proxy_configured: bool,
}

impl CaptionCascade {
    pub fn new(primary: Arc<dyn CaptionSource>, fetcher: Arc<dyn HttpFetch>, languages: Vec<String>) -> Self {
        Self {
            primary,
            proxy_configured: fetcher.has_proxy(),
            scraper: PageScraper::new(fetcher),
            languages,
        }
    }

    /// Cascade using the player API as primary service over the same fetcher
    pub fn with_fetcher(fetcher: Arc<dyn HttpFetch>, languages: Vec<String>) -> Self {
        let primary = Arc::new(InnertubeCaptionSource::new(fetcher.clone()));
        Self::new(primary, fetcher, languages)
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    async fn run_stage(&self, state: CascadeState, video_id: &str) -> Result<TranscriptDocument, CaptionError> {
        let (entries, language) = match state {
            CascadeState::PrimaryService(route) => self.primary.find_transcript(video_id, &self.languages, route).await?,
            CascadeState::ScrapeFallback(route) => self.scraper.scrape(video_id, &self.languages, route).await?,
            CascadeState::Failed => return Err(CaptionError::Malformed("terminal state has no stage".to_string())),
        };
        Ok(TranscriptDocument::new(video_id, language, entries))
    }

    /// Drive the state machine until a stage succeeds or `Failed` is reached
    pub async fn acquire(&self, video_id: &str) -> AcquisitionOutcome {
        let mut state = CascadeState::initial(self.proxy_configured);
        let mut reasons = Vec::new();

        while state != CascadeState::Failed {
            match self.run_stage(state, video_id).await {
                Ok(document) => {
                    info!(
                        "✅ Captions for {} via {:?}: {} entries ({})",
                        video_id,
                        state,
                        document.entries().len(),
                        document.language_code()
                    );
                    return AcquisitionOutcome::Success(document);
                }
                Err(err) => {
                    let class = err.failure_class();
                    let next = state.next(class, self.proxy_configured);
                    warn!("⚠️ {:?} failed for {} ({:?}): {} -> {:?}", state, video_id, class, err, next);
                    reasons.push(format!("{:?}: {}", state, err));
                    state = next;
                }
            }
        }

        AcquisitionOutcome::Failure(reasons.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::fetcher::{FetchFailure, FetchRequest};
    use crate::captions::{CaptionEntry, CaptionTrack};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Primary source failing with scripted errors, repeating the last one
    struct FailingSource {
        errors: Vec<CaptionError>,
        routes: Mutex<Vec<Route>>,
    }

    impl FailingSource {
        fn new(error: CaptionError) -> Arc<Self> {
            Self::sequence(vec![error])
        }

        fn sequence(errors: Vec<CaptionError>) -> Arc<Self> {
            Arc::new(Self {
                errors,
                routes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CaptionSource for FailingSource {
        async fn list(&self, _video_id: &str, route: Route) -> Result<Vec<CaptionTrack>, CaptionError> {
            let mut routes = self.routes.lock().unwrap();
            let index = routes.len().min(self.errors.len() - 1);
            routes.push(route);
            Err(self.errors[index].clone())
        }

        async fn fetch(&self, _: &str, _: &CaptionTrack, _: Route) -> Result<Vec<CaptionEntry>, CaptionError> {
            Err(self.errors[0].clone())
        }
    }

    struct WorkingSource;

    #[async_trait]
    impl CaptionSource for WorkingSource {
        async fn list(&self, _: &str, _: Route) -> Result<Vec<CaptionTrack>, CaptionError> {
            Ok(vec![CaptionTrack {
                language_code: "en".into(),
                name: "English".into(),
                base_url: "https://example.test/en".into(),
                is_generated: false,
            }])
        }

        async fn fetch(&self, _: &str, _: &CaptionTrack, _: Route) -> Result<Vec<CaptionEntry>, CaptionError> {
            Ok(vec![CaptionEntry::new("b", 2.0, 1.0), CaptionEntry::new("a", 0.0, 1.0)])
        }
    }

    /// Fetcher failing every page request, counting attempts per route
    struct CountingFetch {
        proxy: bool,
        failure: FetchFailure,
        max_retries: u32,
        attempts: AtomicU32,
        routes: Mutex<Vec<Route>>,
    }

    impl CountingFetch {
        fn new(proxy: bool, failure: FetchFailure) -> Arc<Self> {
            Arc::new(Self {
                proxy,
                failure,
                max_retries: 2,
                attempts: AtomicU32::new(0),
                routes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpFetch for CountingFetch {
        async fn fetch(&self, _request: &FetchRequest, route: Route) -> Result<String, FetchFailure> {
            self.routes.lock().unwrap().push(route);
            let attempts = if self.failure.is_retryable() { self.max_retries + 1 } else { 1 };
            self.attempts.fetch_add(attempts, Ordering::SeqCst);
            Err(self.failure.clone())
        }

        fn has_proxy(&self) -> bool {
            self.proxy
        }
    }

    /// Player API with an empty primary track; the watch page carries a usable one
    struct EmptyPrimaryPlatform {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpFetch for EmptyPrimaryPlatform {
        async fn fetch(&self, request: &FetchRequest, _route: Route) -> Result<String, FetchFailure> {
            self.urls.lock().unwrap().push(request.url.clone());
            let track = |url: &str| {
                serde_json::json!({
                    "playabilityStatus": {"status": "OK"},
                    "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                        {"baseUrl": url, "languageCode": "en", "name": {"simpleText": "English"}}
                    ]}}
                })
            };
            if request.body.is_some() {
                return Ok(track("https://example.test/primary").to_string());
            }
            if request.url.contains("/watch?") {
                return Ok(format!(
                    "<html><body><script>var ytInitialPlayerResponse = {};</script></body></html>",
                    track("https://example.test/scraped?lang=en")
                ));
            }
            if request.url.contains("/scraped") {
                return Ok(r#"{"events":[{"tStartMs":0,"dDurationMs":1500,"segs":[{"utf8":"from the page"}]}]}"#.to_string());
            }
            Ok(r#"{"events":[]}"#.to_string())
        }

        fn has_proxy(&self) -> bool {
            false
        }
    }

    fn not_found() -> FetchFailure {
        FetchFailure::Status {
            status: 404,
            reason: "Not Found".into(),
            url: "https://example.test".into(),
        }
    }

    fn langs() -> Vec<String> {
        vec!["en".to_string(), "hi".to_string()]
    }

    #[test]
    fn test_transitions_with_proxy() {
        use CascadeState::*;
        let net = FailureClass::NetworkProxy;
        let other = FailureClass::Other;

        assert_eq!(CascadeState::initial(true), PrimaryService(Route::Proxied));
        assert_eq!(PrimaryService(Route::Proxied).next(net, true), PrimaryService(Route::Direct));
        assert_eq!(PrimaryService(Route::Proxied).next(other, true), ScrapeFallback(Route::Proxied));
        assert_eq!(PrimaryService(Route::Direct).next(net, true), ScrapeFallback(Route::Proxied));
        assert_eq!(ScrapeFallback(Route::Proxied).next(net, true), ScrapeFallback(Route::Direct));
        assert_eq!(ScrapeFallback(Route::Proxied).next(other, true), Failed);
        assert_eq!(ScrapeFallback(Route::Direct).next(net, true), Failed);
        assert_eq!(Failed.next(net, true), Failed);
    }

    #[test]
    fn test_transitions_without_proxy() {
        use CascadeState::*;
        let net = FailureClass::NetworkProxy;

        assert_eq!(CascadeState::initial(false), PrimaryService(Route::Direct));
        assert_eq!(PrimaryService(Route::Direct).next(net, false), ScrapeFallback(Route::Direct));
        assert_eq!(ScrapeFallback(Route::Direct).next(net, false), Failed);
    }

    #[tokio::test]
    async fn test_primary_success_stops_cascade() {
        let fetch = CountingFetch::new(true, not_found());
        let cascade = CaptionCascade::new(Arc::new(WorkingSource), fetch.clone(), langs());

        let document = cascade.acquire("abc").await.into_result("abc").unwrap();
        assert_eq!(document.language_code(), "en");
        assert_eq!(document.entries()[0].text, "a");
        assert!(fetch.routes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_proxy_failures_never_make_third_primary_call() {
        let primary = FailingSource::new(CaptionError::Disabled("abc".into()));
        let fetch = CountingFetch::new(true, not_found());
        let cascade = CaptionCascade::new(primary.clone(), fetch.clone(), langs());

        let outcome = cascade.acquire("abc").await;
        assert!(matches!(outcome, AcquisitionOutcome::Failure(_)));

        // Non-proxy failure skips the direct primary attempt entirely
        assert_eq!(*primary.routes.lock().unwrap(), vec![Route::Proxied]);
        // One scrape request on the proxied route, not retried past the fetcher's budget
        assert_eq!(*fetch.routes.lock().unwrap(), vec![Route::Proxied]);
        assert!(fetch.attempts.load(Ordering::SeqCst) <= fetch.max_retries + 1);
    }

    #[tokio::test]
    async fn test_direct_primary_failure_goes_to_scrape() {
        let primary = FailingSource::sequence(vec![
            CaptionError::Network(FetchFailure::Transport("proxy handshake failed".into())),
            CaptionError::Disabled("abc".into()),
        ]);
        let fetch = CountingFetch::new(true, not_found());
        let cascade = CaptionCascade::new(primary.clone(), fetch.clone(), langs());

        assert!(matches!(cascade.acquire("abc").await, AcquisitionOutcome::Failure(_)));
        assert_eq!(*primary.routes.lock().unwrap(), vec![Route::Proxied, Route::Direct]);
        assert_eq!(*fetch.routes.lock().unwrap(), vec![Route::Proxied]);
        assert!(fetch.attempts.load(Ordering::SeqCst) <= fetch.max_retries + 1);
    }

    #[tokio::test]
    async fn test_proxy_failures_walk_every_stage() {
        let tunnel = FetchFailure::Transport("error sending request: tunnel connection failed".into());
        let primary = FailingSource::new(CaptionError::Network(tunnel.clone()));
        let fetch = CountingFetch::new(true, tunnel);
        let cascade = CaptionCascade::new(primary.clone(), fetch.clone(), langs());

        let outcome = cascade.acquire("abc").await;
        let AcquisitionOutcome::Failure(reason) = outcome else {
            panic!("expected failure");
        };
        assert!(reason.contains("ScrapeFallback(Direct)"));

        assert_eq!(*primary.routes.lock().unwrap(), vec![Route::Proxied, Route::Direct]);
        assert_eq!(*fetch.routes.lock().unwrap(), vec![Route::Proxied, Route::Direct]);
    }

    #[tokio::test]
    async fn test_no_proxy_runs_each_strategy_once() {
        let tunnel = FetchFailure::Transport("connection reset".into());
        let primary = FailingSource::new(CaptionError::Network(tunnel.clone()));
        let fetch = CountingFetch::new(false, tunnel);
        let cascade = CaptionCascade::new(primary.clone(), fetch.clone(), langs());

        let err = cascade.acquire("abc").await.into_result("abc").unwrap_err();
        assert!(matches!(err, QuizError::AcquisitionFailed { .. }));
        assert_eq!(*primary.routes.lock().unwrap(), vec![Route::Direct]);
        assert_eq!(*fetch.routes.lock().unwrap(), vec![Route::Direct]);
    }

    #[tokio::test]
    async fn test_empty_primary_track_falls_back_to_scrape() {
        let fetch = Arc::new(EmptyPrimaryPlatform { urls: Mutex::new(Vec::new()) });
        let cascade = CaptionCascade::with_fetcher(fetch.clone(), langs());

        let outcome = cascade.acquire("abc").await;
        let AcquisitionOutcome::Success(document) = outcome else {
            panic!("expected the scrape stage to succeed");
        };
        assert_eq!(document.entries().len(), 1);
        assert_eq!(document.entries()[0].text, "from the page");

        let urls = fetch.urls.lock().unwrap();
        assert!(urls.iter().any(|url| url == "https://example.test/primary"));
        assert!(urls.iter().any(|url| url.contains("/watch?v=abc")));
    }
}
