pub mod prompts;
pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::QuizError;
pub use prompts::PromptLanguage;

/// LLM provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    LMStudio,
    Groq,
    OpenAI,
    Gemini,
}

impl LLMProvider {
    /// Parse a provider name as used in environment overrides
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "lmstudio" => Some(LLMProvider::LMStudio),
            "groq" => Some(LLMProvider::Groq),
            "openai" => Some(LLMProvider::OpenAI),
            "gemini" => Some(LLMProvider::Gemini),
            _ => None,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::LMStudio,
            endpoint: Some("http://localhost:1234/v1/chat/completions".to_string()),
            api_key: None,
            model: "local-model".to_string(),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_seconds: 120,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse>;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::LMStudio | LLMProvider::Groq | LLMProvider::OpenAI => {
            Ok(Box::new(providers::OpenAICompatibleProvider::new(config.clone())?))
        }
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
    }
}

/// Text completion service consumed by quiz and answer synthesis
///
/// Output carries no structural guarantee; callers must tolerate missing markers.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, language: PromptLanguage) -> crate::error::Result<String>;
}

/// Completion service backed by a chat provider, prefixing a language-specific system prompt
pub struct ChatCompletion {
    llm: Arc<dyn LLM>,
}

impl ChatCompletion {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Build the service handle once from configuration
    pub fn from_config(config: &LLMConfig) -> crate::error::Result<Self> {
        let llm = create_llm(config).map_err(|e| QuizError::Configuration(e.to_string()))?;
        Ok(Self { llm: Arc::from(llm) })
    }
}

#[async_trait]
impl TextCompletion for ChatCompletion {
    async fn complete(&self, prompt: &str, language: PromptLanguage) -> crate::error::Result<String> {
        let messages = vec![
            ChatMessage::system(language.system_prompt()),
            ChatMessage::user(prompt),
        ];

        let response = self
            .llm
            .chat(messages)
            .await
            .map_err(|e| QuizError::SynthesisFailure(format!("{:?} provider: {}", self.llm.provider_type(), e)))?;

        debug!(
            "Completion received: {} chars, {:?} tokens",
            response.content.len(),
            response.tokens_used
        );

        if response.content.trim().is_empty() {
            return Err(QuizError::SynthesisFailure("empty completion".to_string()));
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLLM {
        reply: String,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LLM for RecordingLLM {
        async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LLMResponse> {
            self.seen.lock().unwrap().extend(messages);
            Ok(LLMResponse {
                content: self.reply.clone(),
                tokens_used: Some(12),
            })
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::LMStudio
        }
    }

    #[test]
    fn test_provider_from_name() {
        assert_eq!(LLMProvider::from_name("Groq"), Some(LLMProvider::Groq));
        assert_eq!(LLMProvider::from_name(" gemini "), Some(LLMProvider::Gemini));
        assert_eq!(LLMProvider::from_name("unknown"), None);
    }

    #[tokio::test]
    async fn test_chat_completion_prefixes_system_prompt() {
        let llm = Arc::new(RecordingLLM {
            reply: "ok".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let completion = ChatCompletion::new(llm.clone());

        let text = completion.complete("question", PromptLanguage::Hindi).await.unwrap();
        assert_eq!(text, "ok");

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, "system");
        assert_eq!(seen[0].content, PromptLanguage::Hindi.system_prompt());
        assert_eq!(seen[1].content, "question");
    }

    #[tokio::test]
    async fn test_empty_completion_is_synthesis_failure() {
        let llm = Arc::new(RecordingLLM {
            reply: "   ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let completion = ChatCompletion::new(llm);

        let result = completion.complete("question", PromptLanguage::English).await;
        assert!(matches!(result, Err(QuizError::SynthesisFailure(_))));
    }
}
