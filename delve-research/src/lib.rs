//! Delve Research - Recursive deep research orchestration
//!
//! This crate turns a single user query into a tree of search-and-summarize
//! pipelines and folds everything learned into one final Markdown report.
//! It provides:
//!
//! - Clarifying question generation before research starts
//! - LLM-backed query planning with per-level breadth decay
//! - Concurrent search branches with branch-local failure handling
//! - Final report synthesis with a localized sources section
//!
//! ## Architecture
//!
//! This crate sits between the shared foundation and the presentation layer:
//! - **Foundation** (delve-core): data model, configuration, logging, errors
//! - **Engine** (this crate): planner, search, summarizer, orchestrator
//! - **Presentation** (delve-web): HTTP and WebSocket surface

pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod questions;
pub mod reporter;
pub mod search;
pub mod summarizer;

pub use llm::{ChatClient, ResearchLlm};
pub use orchestrator::ResearchOrchestrator;
pub use planner::{LlmQueryPlanner, QueryPlanner};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressKind, ProgressSink};
pub use questions::QuestionGenerator;
pub use reporter::{parse_sources, ReportSynthesizer};
pub use search::{FirecrawlSearch, SearchProvider};
pub use summarizer::{BranchSummary, LlmSummarizer, Summarizer};

use delve_core::logging::performance;
use delve_core::{log_operation_error, log_operation_start, log_operation_success};
use delve_core::{DelveConfig, FinalReport, ResearchState, SearchBudget};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Research-level error type
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Planning error: {message}")]
    Planning { message: String },

    #[error("Search timed out after {timeout_ms}ms")]
    SearchTimeout { timeout_ms: u64 },

    #[error("Search quota exhausted: {message}")]
    QuotaExhausted { message: String },

    #[error("Summarization error: {message}")]
    Summarization { message: String },

    #[error("Not enough questions generated. Expected {expected} but got {actual}")]
    InsufficientQuestions { expected: usize, actual: usize },

    #[error("Search error: {message}")]
    Search { message: String },

    #[error("LLM error: {message}")]
    Llm { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Core error: {0}")]
    Core(#[from] delve_core::DelveError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type ResearchResult<T> = Result<T, ResearchError>;

impl ResearchError {
    /// Create a planning error
    pub fn planning<S: Into<String>>(message: S) -> Self {
        Self::Planning {
            message: message.into(),
        }
    }

    /// Create a quota exhaustion error
    pub fn quota<S: Into<String>>(message: S) -> Self {
        Self::QuotaExhausted {
            message: message.into(),
        }
    }

    /// Create a summarization error
    pub fn summarization<S: Into<String>>(message: S) -> Self {
        Self::Summarization {
            message: message.into(),
        }
    }

    /// Create a search error
    pub fn search<S: Into<String>>(message: S) -> Self {
        Self::Search {
            message: message.into(),
        }
    }

    /// Create an LLM error
    pub fn llm<S: Into<String>>(message: S) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole research run. True exactly for
    /// planning and quota failures; everything else is branch-local.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Planning { .. } | Self::QuotaExhausted { .. }
        )
    }
}

/// Request for one full research run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    /// Topic to research
    pub query: String,
    /// Recursion levels (1..=5)
    pub depth: u32,
    /// Parallel branches at the first level (1..=10)
    pub breadth: u32,
    /// Clarifying questions and the user's answers, free-form text
    pub questions_with_answers: String,
}

impl ResearchRequest {
    pub fn new(
        query: impl Into<String>,
        depth: u32,
        breadth: u32,
        questions_with_answers: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            depth,
            breadth,
            questions_with_answers: questions_with_answers.into(),
        }
    }
}

/// Main deep research service
pub struct DeepResearch {
    /// Level loop over planner, search, and summarizer
    orchestrator: ResearchOrchestrator,
    /// Clarifying question generator
    questions: QuestionGenerator,
    /// Final report writer
    reporter: ReportSynthesizer,
    /// Progress sink shared with every component
    progress: Arc<dyn ProgressSink>,
    /// Validated configuration
    config: DelveConfig,
}

/// Builder for DeepResearch to simplify initialization
pub struct DeepResearchBuilder {
    config: DelveConfig,
    chat_client: Option<ChatClient>,
    search: Option<Arc<dyn SearchProvider>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl DeepResearchBuilder {
    /// Create a new builder with the given configuration
    pub fn new(config: DelveConfig) -> Self {
        Self {
            config,
            chat_client: None,
            search: None,
            progress: None,
        }
    }

    /// Inject a chat client instead of building one from configuration
    pub fn with_chat_client(mut self, client: ChatClient) -> Self {
        self.chat_client = Some(client);
        self
    }

    /// Inject a search provider instead of the Firecrawl default
    pub fn with_search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    /// Inject a progress sink; defaults to discarding events
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Build the DeepResearch service
    pub async fn build(self) -> ResearchResult<DeepResearch> {
        self.config.validate()?;

        // LLM client shared by every component
        let llm = match self.chat_client {
            Some(client) => Arc::new(ResearchLlm::new(client)),
            None => Arc::new(ResearchLlm::from_config(&self.config.llm).await?),
        };

        // Search provider
        let search: Arc<dyn SearchProvider> = match self.search {
            Some(provider) => provider,
            None => Arc::new(FirecrawlSearch::new(self.config.search.clone())?),
        };

        // Progress sink shared by the orchestrator, reporter, and facade
        let progress: Arc<dyn ProgressSink> =
            self.progress.unwrap_or_else(|| Arc::new(NoopProgress));

        let planner: Arc<dyn QueryPlanner> = Arc::new(LlmQueryPlanner::new(Arc::clone(&llm)));
        let summarizer: Arc<dyn Summarizer> = Arc::new(LlmSummarizer::new(
            Arc::clone(&llm),
            self.config.research.clone(),
        ));
        let orchestrator = ResearchOrchestrator::new(
            planner,
            search,
            summarizer,
            Arc::clone(&progress),
            self.config.research.clone(),
        );
        let reporter = ReportSynthesizer::new(
            Arc::clone(&llm),
            self.config.research.clone(),
            Arc::clone(&progress),
        );
        let questions = QuestionGenerator::new(llm);

        Ok(DeepResearch {
            orchestrator,
            questions,
            reporter,
            progress,
            config: self.config,
        })
    }
}

impl DeepResearch {
    /// Create a new deep research service using the builder pattern
    pub async fn new(config: DelveConfig) -> ResearchResult<Self> {
        DeepResearchBuilder::new(config).build().await
    }

    /// Create a builder for more advanced configuration
    pub fn builder(config: DelveConfig) -> DeepResearchBuilder {
        DeepResearchBuilder::new(config)
    }

    pub fn config(&self) -> &DelveConfig {
        &self.config
    }

    /// Generate the clarifying questions a client answers before starting
    /// research. Returns exactly `num_questions` questions or fails.
    pub async fn prepare_questions(
        &self,
        query: &str,
        num_questions: usize,
    ) -> ResearchResult<Vec<String>> {
        log_operation_start!("prepare_questions", num_questions);
        match self.questions.generate(query, num_questions).await {
            Ok(questions) => {
                log_operation_success!("prepare_questions", count = questions.len());
                Ok(questions)
            }
            Err(e) => {
                log_operation_error!("prepare_questions", e);
                Err(e)
            }
        }
    }

    /// Run the full research pipeline and return the final report.
    pub async fn conduct_research(&self, request: ResearchRequest) -> ResearchResult<FinalReport> {
        log_operation_start!(
            "conduct_research",
            depth = request.depth,
            breadth = request.breadth
        );
        match self.run(&request).await {
            Ok(report) => {
                log_operation_success!(
                    "conduct_research",
                    report_chars = report.body.chars().count()
                );
                Ok(report)
            }
            Err(e) => {
                log_operation_error!("conduct_research", e);
                self.progress.notify(ProgressEvent::error(
                    "Error in research process",
                    Some(json!({ "error": e.to_string() })),
                ));
                Err(e)
            }
        }
    }

    async fn run(&self, request: &ResearchRequest) -> ResearchResult<FinalReport> {
        validate_request(request)?;

        self.progress.notify(ProgressEvent::info(
            "Starting comprehensive research...",
            Some(json!({
                "query": request.query,
                "depth": request.depth,
                "breadth": request.breadth,
            })),
        ));

        // The clarifying answers travel with the query through every level
        // and into report synthesis.
        let combined = format!(
            "Initial Query: {}\nFollow-up Questions and Answers:\n{}",
            request.query, request.questions_with_answers
        );

        let budget = SearchBudget::new(request.breadth, request.depth);
        let state = self
            .orchestrator
            .research(&combined, budget, ResearchState::new())
            .await?;

        info!(
            "🔬 Research finished: {} learnings from {} sources",
            state.learnings().len(),
            state.visited_urls().len()
        );
        self.progress.notify(ProgressEvent::info(
            "Generating final report...",
            Some(json!({
                "learningsCount": state.learnings().len(),
                "sourcesCount": state.visited_urls().len(),
            })),
        ));

        let report = performance::measure_async(
            "synthesize_report",
            self.reporter
                .synthesize(&combined, state.learnings(), state.visited_urls()),
        )
        .await?;

        self.progress.notify(ProgressEvent::success(
            "Research completed successfully!",
            None,
        ));
        Ok(report)
    }
}

fn validate_request(request: &ResearchRequest) -> ResearchResult<()> {
    if !(1..=5).contains(&request.depth) {
        return Err(ResearchError::config(format!(
            "Research depth must be between 1 and 5, got {}",
            request.depth
        )));
    }
    if !(1..=10).contains(&request.breadth) {
        return Err(ResearchError::config(format!(
            "Research breadth must be between 1 and 10, got {}",
            request.breadth
        )));
    }
    Ok(())
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{
        DeepResearch, DeepResearchBuilder, ProgressEvent, ProgressKind, ProgressSink,
        ResearchError, ResearchRequest, ResearchResult,
    };
    pub use delve_core::{
        DelveConfig, FinalReport, LevelResult, ResearchQuery, ResearchState, SearchBudget,
    };
}
