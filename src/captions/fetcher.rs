use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{CaptionConfig, FetcherConfig};
use crate::error::{QuizError, Result};

/// Network route for a single logical call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    Proxied,
    Direct,
}

/// One logical outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    /// JSON body; `None` means GET
    pub body: Option<serde_json::Value>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Why a logical call produced no body
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("attempt timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status} {reason} from {url}")]
    Status { status: u16, reason: String, url: String },
}

impl FetchFailure {
    /// Transport problems, timeouts, throttling and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::Transport(_) | FetchFailure::Timeout(_) => true,
            FetchFailure::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }

    /// Whether this failure points at the network path rather than the content
    pub fn is_network_class(&self) -> bool {
        match self {
            FetchFailure::Transport(_) | FetchFailure::Timeout(_) => true,
            FetchFailure::Status { .. } => is_network_message(&self.to_string()),
        }
    }
}

impl From<FetchFailure> for QuizError {
    fn from(failure: FetchFailure) -> Self {
        QuizError::TransientNetwork(failure.to_string())
    }
}

const NETWORK_MARKERS: &[&str] = &[
    "proxy",
    "tunnel",
    "gateway",
    "tls",
    "ssl",
    "certificate",
    "handshake",
    "connection refused",
    "connection reset",
    "connection closed",
    "timed out",
    "dns error",
    "error sending request",
];

/// Classify a free-form error message as network/proxy-related
pub fn is_network_message(message: &str) -> bool {
    let message = message.to_lowercase();
    NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Backoff policy applied to every logical call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            attempt_timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Run `operation` with a per-attempt timeout, retrying retryable failures with exponential backoff
///
/// Makes at most `max_retries + 1` attempts. The closure receives the attempt number (0-based).
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> std::result::Result<T, FetchFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, FetchFailure>>,
{
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation(attempt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchFailure::Timeout(policy.attempt_timeout.as_secs())),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(failure) if failure.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(
                    "🔄 {} failed ({}), retry {}/{} in {:?}",
                    label, failure, attempt, policy.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(failure) => {
                debug!("{} gave up after {} attempt(s): {}", label, attempt + 1, failure);
                return Err(failure);
            }
        }
    }
}

/// Retrying HTTP access used by the caption stages
///
/// `Err` is the absent result: callers treat it as a stage failure and never
/// see a panic or an unclassified error.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest, route: Route) -> std::result::Result<String, FetchFailure>;

    /// Whether a proxied route is actually available
    fn has_proxy(&self) -> bool;
}

/// reqwest-backed fetcher holding one direct and an optional proxied client
pub struct BoundedFetcher {
    direct: reqwest::Client,
    proxied: Option<reqwest::Client>,
    policy: RetryPolicy,
}

impl BoundedFetcher {
    pub fn new(captions: &CaptionConfig, fetcher: &FetcherConfig) -> Result<Self> {
        let policy = RetryPolicy::from_config(fetcher);
        let direct = Self::client_builder(captions, &policy)?
            .build()
            .map_err(|e| QuizError::Configuration(format!("http client: {}", e)))?;

        let proxied = match &captions.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.authenticated_url()?)
                    .map_err(|e| QuizError::Configuration(format!("proxy: {}", e)))?;
                Some(
                    Self::client_builder(captions, &policy)?
                        .proxy(proxy)
                        .build()
                        .map_err(|e| QuizError::Configuration(format!("proxied http client: {}", e)))?,
                )
            }
            None => None,
        };

        Ok(Self {
            direct,
            proxied,
            policy,
        })
    }

    fn client_builder(captions: &CaptionConfig, policy: &RetryPolicy) -> Result<reqwest::ClientBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        Ok(reqwest::Client::builder()
            .user_agent(captions.user_agent.clone())
            .default_headers(headers)
            .timeout(policy.attempt_timeout))
    }

    fn client_for(&self, route: Route) -> &reqwest::Client {
        match (route, &self.proxied) {
            (Route::Proxied, Some(client)) => client,
            _ => &self.direct,
        }
    }

    async fn attempt(client: &reqwest::Client, request: &FetchRequest) -> std::result::Result<String, FetchFailure> {
        let builder = match &request.body {
            Some(body) => client.post(&request.url).json(body),
            None => client.get(&request.url),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(format!("{:#}", anyhow::Error::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                url: request.url.clone(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))
    }
}

#[async_trait]
impl HttpFetch for BoundedFetcher {
    async fn fetch(&self, request: &FetchRequest, route: Route) -> std::result::Result<String, FetchFailure> {
        let client = self.client_for(route);
        let label = format!("{:?} fetch of {}", route, request.url);
        retry_with_backoff(&self.policy, &label, |_| Self::attempt(client, request)).await
    }

    fn has_proxy(&self) -> bool {
        self.proxied.is_some()
    }
}
