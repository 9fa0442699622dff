//! LLM client wrapper
//!
//! Thin layer over siumai providers. Research components depend on
//! [`ResearchLlm`] rather than a concrete provider, so tests can inject any
//! [`ChatCapability`] implementation.

use crate::{ResearchError, ResearchResult};
use delve_core::LlmConfig;
use siumai::models;
use siumai::prelude::*;
use tracing::{debug, info};

/// System prompt shared by the research components
pub const RESEARCHER_SYSTEM_PROMPT: &str = "You are an expert researcher. \
Treat the user as a highly experienced analyst: be extremely detailed and \
information-dense, value strong arguments over authorities, and flag \
speculation clearly. Accuracy matters more than politeness; mistakes erode \
trust in the research.";

/// Boxed chat backend shared by all research components
pub type ChatClient = Box<dyn ChatCapability + Send + Sync>;

/// Wrapper around a chat-capable LLM client
pub struct ResearchLlm {
    client: ChatClient,
}

impl ResearchLlm {
    /// Wrap an existing chat backend.
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Build a provider-backed client from configuration.
    pub async fn from_config(config: &LlmConfig) -> ResearchResult<Self> {
        let client = build_client(config).await?;
        info!(
            "Initialized LLM client: {} ({})",
            config.provider, config.model
        );
        Ok(Self { client })
    }

    /// Build a client by detecting provider credentials in the environment.
    ///
    /// Checks OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY, and
    /// OLLAMA_BASE_URL in that order.
    pub async fn from_env() -> ResearchResult<Self> {
        let config = detect_provider_config()?;
        info!("Auto-detected LLM provider: {}", config.provider);
        Self::from_config(&config).await
    }

    /// Single-prompt completion.
    pub async fn generate(&self, prompt: &str) -> ResearchResult<String> {
        self.chat(vec![user!(prompt)]).await
    }

    /// Completion with a system prompt.
    pub async fn generate_with_system(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> ResearchResult<String> {
        self.chat(vec![system!(system_prompt), user!(user_prompt)])
            .await
    }

    /// Detect the language of `text`, returning its ISO 639-1 code.
    pub async fn detect_language(&self, text: &str) -> ResearchResult<String> {
        let response = self
            .generate_with_system(
                "You are a language detection expert. Return only the ISO 639-1 language code.",
                &format!(
                    "Detect the language of the following text and return its ISO 639-1 code \
                     (e.g. 'en' for English, 'pl' for Polish, etc.). Only return the code, \
                     nothing else: {}",
                    text
                ),
            )
            .await?;

        let code = response
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_lowercase();
        if code.is_empty() || code.len() > 8 {
            return Err(ResearchError::llm(format!(
                "Language detection returned an unusable code: '{}'",
                response.trim()
            )));
        }
        debug!(language = %code, "Detected language");
        Ok(code)
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> ResearchResult<String> {
        let response = self
            .client
            .chat_with_tools(messages, None)
            .await
            .map_err(|e| ResearchError::llm(format!("LLM request failed: {}", e)))?;

        match response.content_text() {
            Some(text) => Ok(text.to_string()),
            None => Err(ResearchError::llm("LLM returned no text content")),
        }
    }
}

async fn build_client(config: &LlmConfig) -> ResearchResult<ChatClient> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| {
                    ResearchError::config(
                        "OpenAI API key not found. Set OPENAI_API_KEY or llm.api_key in config",
                    )
                })?;

            let mut builder = LlmBuilder::new()
                .openai()
                .api_key(&api_key)
                .model(&config.model)
                .temperature(config.temperature);
            if let Some(max_tokens) = config.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }
            if let Some(base_url) = &config.base_url {
                builder = builder.base_url(base_url);
            }

            let client = builder.build().await.map_err(|e| {
                ResearchError::llm(format!("Failed to create OpenAI client: {}", e))
            })?;
            Ok(Box::new(client))
        }
        "anthropic" => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .ok_or_else(|| {
                    ResearchError::config(
                        "Anthropic API key not found. Set ANTHROPIC_API_KEY or llm.api_key in config",
                    )
                })?;

            let mut builder = LlmBuilder::new()
                .anthropic()
                .api_key(&api_key)
                .model(&config.model)
                .temperature(config.temperature);
            if let Some(max_tokens) = config.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }
            if let Some(base_url) = &config.base_url {
                builder = builder.base_url(base_url);
            }

            let client = builder.build().await.map_err(|e| {
                ResearchError::llm(format!("Failed to create Anthropic client: {}", e))
            })?;
            Ok(Box::new(client))
        }
        "ollama" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());

            let mut builder = LlmBuilder::new()
                .ollama()
                .base_url(&base_url)
                .model(&config.model)
                .temperature(config.temperature);
            if let Some(max_tokens) = config.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            let client = builder.build().await.map_err(|e| {
                ResearchError::llm(format!("Failed to create Ollama client: {}", e))
            })?;
            Ok(Box::new(client))
        }
        "groq" => {
            let api_key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("GROQ_API_KEY").ok())
                .ok_or_else(|| {
                    ResearchError::config(
                        "Groq API key not found. Set GROQ_API_KEY or llm.api_key in config",
                    )
                })?;

            let mut builder = LlmBuilder::new()
                .groq()
                .api_key(&api_key)
                .model(&config.model)
                .temperature(config.temperature);
            if let Some(max_tokens) = config.max_tokens {
                builder = builder.max_tokens(max_tokens);
            }

            let client = builder.build().await.map_err(|e| {
                ResearchError::llm(format!("Failed to create Groq client: {}", e))
            })?;
            Ok(Box::new(client))
        }
        provider => Err(ResearchError::config(format!(
            "Unsupported LLM provider: {}. Use openai, anthropic, ollama, or groq",
            provider
        ))),
    }
}

fn detect_provider_config() -> ResearchResult<LlmConfig> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        return Ok(LlmConfig {
            provider: "openai".to_string(),
            model: models::openai::GPT_4O_MINI.to_string(),
            ..Default::default()
        });
    }
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        return Ok(LlmConfig {
            provider: "anthropic".to_string(),
            model: models::anthropic::CLAUDE_HAIKU_3_5.to_string(),
            ..Default::default()
        });
    }
    if std::env::var("GROQ_API_KEY").is_ok() {
        return Ok(LlmConfig {
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            ..Default::default()
        });
    }
    if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
        return Ok(LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            base_url: Some(base_url),
            ..Default::default()
        });
    }
    Err(ResearchError::config(
        "No LLM provider credentials found. Set OPENAI_API_KEY, ANTHROPIC_API_KEY, \
         GROQ_API_KEY, or OLLAMA_BASE_URL",
    ))
}
