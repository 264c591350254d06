use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{QuizError, Result};
use crate::llm::{LLMConfig, LLMProvider};

/// Configuration for caption acquisition and quiz synthesis
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Caption language preference and routing
    pub captions: CaptionConfig,

    /// Retry and timeout policy for every outbound call
    pub fetcher: FetcherConfig,

    /// Segment splitting settings
    pub segmentation: SegmentationConfig,

    /// Completion service settings
    pub llm: LLMConfig,

    /// Multi-source quiz settings
    pub quiz: QuizConfig,

    /// Retrieval settings for answer synthesis
    pub retrieval: RetrievalConfig,

    /// Output and persistence settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Language preference list, first match wins
    pub languages: Vec<String>,

    /// Optional proxy used by the proxied cascade stages
    pub proxy: Option<ProxyConfig>,

    /// User agent sent with page and caption requests
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoint, e.g. `http://proxy.example.net:8080`
    pub url: String,

    /// Proxy username (injected, usually from the environment)
    pub username: Option<String>,

    /// Proxy password (injected, usually from the environment)
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Base backoff delay in milliseconds, doubled on each retry
    pub base_delay_ms: u64,

    /// Per-attempt timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Maximum segment size in characters
    pub chunk_size: usize,

    /// Characters carried over between adjacent segments
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Number of sources a batch must contain
    pub source_count: usize,

    /// Questions taken from each source before leftovers are redistributed
    pub quotas: Vec<usize>,

    /// Number of questions in the assembled result
    pub target_count: usize,

    /// Questions requested from the completion service for each source
    pub questions_per_source: usize,

    /// Upper bound for a single pipeline in seconds (0 = no bound)
    pub pipeline_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of matches handed to the completion service
    pub top_k: usize,

    /// Candidate pool size used for result diversification
    pub diversity_pool: usize,

    /// Directory for similarity stores
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the assembled question set is written
    pub sink_path: PathBuf,

    /// Logical path reported back to callers as `saved_to`
    pub saved_to: String,

    /// Log level for the crate's tracing directive
    pub log_level: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string(), "hi".to_string()],
            proxy: None,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            timeout_seconds: 20,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            source_count: 4,
            quotas: vec![2, 3, 2, 3],
            target_count: 10,
            questions_per_source: 6,
            pipeline_timeout_seconds: 180,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            diversity_pool: 25,
            store_dir: PathBuf::from("vectorstores"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink_path: PathBuf::from("transcripts/multi_mcqs.json"),
            saved_to: "/transcripts/multi_mcqs.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Proxy URL with credentials embedded (percent-encoded)
    pub fn authenticated_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| QuizError::Configuration(format!("invalid proxy url {}: {}", self.url, e)))?;

        if let Some(username) = &self.username {
            url.set_username(&urlencoding::encode(username))
                .map_err(|_| QuizError::Configuration("proxy url cannot carry credentials".into()))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(&urlencoding::encode(password)))
                .map_err(|_| QuizError::Configuration("proxy url cannot carry credentials".into()))?;
        }

        Ok(url.to_string())
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = ["caption-quiz.toml", "config/caption-quiz.toml"];

        for path in &config_paths {
            let path = Path::new(path);
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            QuizError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Config = toml::from_str(&config_str).map_err(|e| {
            QuizError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(languages) = std::env::var("CAPTION_QUIZ_LANGUAGES") {
            let parsed: Vec<String> = languages
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.captions.languages = parsed;
            }
        }

        if let Ok(proxy_url) = std::env::var("CAPTION_QUIZ_PROXY_URL") {
            self.captions.proxy = Some(ProxyConfig {
                url: proxy_url,
                username: None,
                password: None,
            });
        }
        if let Some(proxy) = self.captions.proxy.as_mut() {
            if let Ok(username) = std::env::var("CAPTION_QUIZ_PROXY_USERNAME") {
                proxy.username = Some(username);
            }
            if let Ok(password) = std::env::var("CAPTION_QUIZ_PROXY_PASSWORD") {
                proxy.password = Some(password);
            }
        }

        if let Ok(retries) = std::env::var("CAPTION_QUIZ_MAX_RETRIES") {
            self.fetcher.max_retries = retries.parse().unwrap_or(self.fetcher.max_retries);
        }

        if let Ok(timeout) = std::env::var("CAPTION_QUIZ_TIMEOUT") {
            self.fetcher.timeout_seconds = timeout.parse().unwrap_or(self.fetcher.timeout_seconds);
        }

        if let Ok(api_key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            if let Some(provider) = LLMProvider::from_name(&provider) {
                self.llm.provider = provider;
            }
        }

        if let Ok(output_path) = std::env::var("CAPTION_QUIZ_OUTPUT_PATH") {
            self.output.sink_path = PathBuf::from(output_path);
        }

        if let Ok(log_level) = std::env::var("CAPTION_QUIZ_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| QuizError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str).map_err(|e| {
            QuizError::Configuration(format!("failed to write {}: {}", path.display(), e))
        })?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.captions.languages.is_empty() {
            return Err(QuizError::Configuration("at least one caption language is required".into()));
        }

        if let Some(proxy) = &self.captions.proxy {
            proxy.authenticated_url()?;
        }

        if self.segmentation.chunk_size == 0 {
            return Err(QuizError::Configuration("chunk_size must be greater than 0".into()));
        }

        if self.segmentation.chunk_overlap >= self.segmentation.chunk_size {
            return Err(QuizError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.segmentation.chunk_overlap, self.segmentation.chunk_size
            )));
        }

        if self.quiz.source_count == 0 {
            return Err(QuizError::Configuration("source_count must be greater than 0".into()));
        }

        if self.quiz.quotas.len() != self.quiz.source_count {
            return Err(QuizError::Configuration(format!(
                "expected {} quotas, got {}",
                self.quiz.source_count,
                self.quiz.quotas.len()
            )));
        }

        let quota_sum: usize = self.quiz.quotas.iter().sum();
        if quota_sum != self.quiz.target_count {
            return Err(QuizError::Configuration(format!(
                "quotas sum to {} but target_count is {}",
                quota_sum, self.quiz.target_count
            )));
        }

        if self.quiz.questions_per_source == 0 {
            return Err(QuizError::Configuration("questions_per_source must be greater than 0".into()));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Caption Quiz Configuration:\n\
            - Languages: {}\n\
            - Proxy: {}\n\
            - Fetch retries: {} (timeout {}s)\n\
            - Segments: {} chars, {} overlap\n\
            - LLM Provider: {:?} ({})\n\
            - Quotas: {:?} -> {} questions ({} requested per source)\n\
            - Sink: {}",
            self.captions.languages.join(", "),
            if self.captions.proxy.is_some() { "configured" } else { "none" },
            self.fetcher.max_retries,
            self.fetcher.timeout_seconds,
            self.segmentation.chunk_size,
            self.segmentation.chunk_overlap,
            self.llm.provider,
            self.llm.model,
            self.quiz.quotas,
            self.quiz.target_count,
            self.quiz.questions_per_source,
            self.output.sink_path.display()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.config.captions.languages = languages;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.captions.proxy = Some(proxy);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.fetcher.max_retries = max_retries;
        self
    }

    pub fn with_quotas(mut self, quotas: Vec<usize>) -> Self {
        self.config.quiz.source_count = quotas.len();
        self.config.quiz.target_count = quotas.iter().sum();
        self.config.quiz.quotas = quotas;
        self
    }

    pub fn with_segment_size(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.config.segmentation.chunk_size = chunk_size;
        self.config.segmentation.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_sink_path(mut self, path: PathBuf) -> Self {
        self.config.output.sink_path = path;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
