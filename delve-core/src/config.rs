//! Workspace configuration
//!
//! [`DelveConfig`] gathers LLM, search, and orchestration settings. Binaries
//! load it from a TOML file or the environment and validate before use.

use crate::{validation_error, DelveError, DelveResult, ErrorContext};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// LLM provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: openai, anthropic, ollama, or groq
    pub provider: String,
    pub model: String,
    /// Falls back to the provider's environment variable when absent
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// Search provider settings (Firecrawl-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Falls back to FIRECRAWL_API_KEY when absent
    pub api_key: Option<String>,
    pub base_url: String,
    /// Per-search deadline
    pub timeout_ms: u64,
    /// Documents requested per query
    pub max_documents: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.firecrawl.dev".to_string(),
            timeout_ms: 15_000,
            max_documents: 3,
        }
    }
}

/// Orchestration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Recursion levels when the request does not specify one (1..=5)
    pub default_depth: u32,
    /// Parallel branches at the first level when unspecified (1..=10)
    pub default_breadth: u32,
    /// Branch pipelines in flight at once
    pub concurrency: usize,
    /// Upper bound on queries requested from the planner per level
    pub max_queries_per_level: usize,
    /// Learnings extracted per branch
    pub max_learnings: usize,
    /// Per-document character cap before summarization
    pub document_char_limit: usize,
    /// Deadline for one summarization call
    pub summarize_timeout_ms: u64,
    /// Total character budget for learnings handed to report synthesis
    pub report_char_limit: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            default_depth: 3,
            default_breadth: 6,
            concurrency: 2,
            max_queries_per_level: 3,
            max_learnings: 3,
            document_char_limit: 25_000,
            summarize_timeout_ms: 60_000,
            report_char_limit: 150_000,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelveConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
}

impl DelveConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DelveResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DelveError::Config {
            message: format!("Failed to parse config file {}", path.display()),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("from_file")
                .with_metadata("path", &path.display().to_string())
                .with_suggestion("Check the TOML syntax and field names"),
        })
    }

    /// Write configuration to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> DelveResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DelveError::Config {
            message: "Failed to serialize configuration".to_string(),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("save_to_file"),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overlaid with environment variables.
    ///
    /// Recognized: DELVE_LLM_PROVIDER, DELVE_LLM_MODEL, FIRECRAWL_API_KEY,
    /// FIRECRAWL_BASE_URL. Provider API keys for LLMs are resolved at client
    /// build time from their usual variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(provider) = std::env::var("DELVE_LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("DELVE_LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(key) = std::env::var("FIRECRAWL_API_KEY") {
            config.search.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("FIRECRAWL_BASE_URL") {
            config.search.base_url = base;
        }
        config
    }

    /// Reject configurations that cannot drive a research run.
    pub fn validate(&self) -> DelveResult<()> {
        if !(1..=5).contains(&self.research.default_depth) {
            return Err(validation_error!(
                "default_depth must be between 1 and 5",
                "research.default_depth"
            ));
        }
        if !(1..=10).contains(&self.research.default_breadth) {
            return Err(validation_error!(
                "default_breadth must be between 1 and 10",
                "research.default_breadth"
            ));
        }
        if self.research.concurrency == 0 {
            return Err(validation_error!(
                "concurrency must be at least 1",
                "research.concurrency"
            ));
        }
        if self.research.max_queries_per_level == 0 {
            return Err(validation_error!(
                "max_queries_per_level must be at least 1",
                "research.max_queries_per_level"
            ));
        }
        if self.research.max_learnings == 0 {
            return Err(validation_error!(
                "max_learnings must be at least 1",
                "research.max_learnings"
            ));
        }
        if self.research.document_char_limit == 0 || self.research.report_char_limit == 0 {
            return Err(validation_error!(
                "character limits must be positive",
                "research"
            ));
        }
        if self.research.summarize_timeout_ms == 0 || self.search.timeout_ms == 0 {
            return Err(validation_error!("timeouts must be positive", "research"));
        }
        if self.search.max_documents == 0 {
            return Err(validation_error!(
                "max_documents must be at least 1",
                "search.max_documents"
            ));
        }
        if url::Url::parse(&self.search.base_url).is_err() {
            return Err(validation_error!(
                "search base_url is not a valid URL",
                "search.base_url"
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(validation_error!(
                "temperature must be between 0.0 and 2.0",
                "llm.temperature"
            ));
        }
        Ok(())
    }
}
