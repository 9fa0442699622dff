//! Integration test scaffolding
//!
//! Spins up a real server on a random port around a mocked research service,
//! so endpoint behavior can be pinned without provider credentials.

use delve_core::{DelveConfig, FetchResult};
use delve_research::{
    BroadcastProgress, DeepResearch, ProgressEvent, ResearchResult, SearchProvider,
};
use delve_web::{create_app, AppState, WebConfig};
use std::sync::{Arc, LazyLock};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

// Make sure tracing is initialized at most once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// Mock chat backend routing on distinctive prompt fragments
pub struct MockChatClient {
    /// When set, planning prompts get a malformed reply so runs fail fast
    fail_planning: bool,
}

impl MockChatClient {
    pub fn reliable() -> Self {
        Self {
            fail_planning: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_planning: true,
        }
    }
}

#[async_trait::async_trait]
impl siumai::prelude::ChatCapability for MockChatClient {
    async fn chat_with_tools<'a>(
        &'a self,
        messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatResponse, siumai::prelude::LlmError> {
        // The user prompt is always the last message
        let prompt = messages
            .last()
            .and_then(|m| m.content_text())
            .unwrap_or("");

        let mock_response = if prompt.contains("Detect the language") {
            "en"
        } else if prompt.contains("Translate the word \"Sources\"") {
            "## Sources"
        } else if prompt.contains("generate a list of SERP queries") {
            if self.fail_planning {
                "The service is overloaded, try again later."
            } else {
                r#"[
                    {"query": "first angle", "researchGoal": "Map the basics."},
                    {"query": "second angle", "researchGoal": "Compare implementations."},
                    {"query": "third angle", "researchGoal": "Check adoption numbers."}
                ]"#
            }
        } else if prompt.contains("generate a list of learnings") {
            r#"{
                "learnings": ["Learning one", "Learning two"],
                "followUpQuestions": ["Follow-up one?", "Follow-up two?"]
            }"#
        } else if prompt.contains("follow up questions in the same language") {
            r#"{"questions": ["Q1?", "Q2?", "Q3?"]}"#
        } else if prompt.contains("write a final report") {
            "# Findings\n\nDetailed report body."
        } else {
            "Mock LLM response for testing purposes."
        };

        Ok(siumai::prelude::ChatResponse {
            id: Some("mock-response".to_string()),
            content: siumai::prelude::MessageContent::Text(mock_response.to_string()),
            model: Some("mock-model".to_string()),
            usage: None,
            finish_reason: Some(siumai::prelude::FinishReason::Stop),
            tool_calls: None,
            thinking: None,
            metadata: std::collections::HashMap::new(),
        })
    }

    async fn chat_stream<'a>(
        &'a self,
        _messages: Vec<siumai::prelude::ChatMessage>,
        _tools: Option<Vec<siumai::prelude::Tool>>,
    ) -> Result<siumai::prelude::ChatStream, siumai::prelude::LlmError> {
        Err(siumai::prelude::LlmError::UnsupportedOperation(
            "Streaming not supported in mock".to_string(),
        ))
    }
}

/// Search provider that fabricates one document per query
pub struct StaticSearch;

#[async_trait::async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> ResearchResult<Vec<FetchResult>> {
        let slug = query.replace(' ', "-");
        Ok(vec![FetchResult {
            url: format!("http://{}.example", slug),
            text: format!("document text about {}", query),
        }])
    }
}

/// Running test server instance
pub struct TestApp {
    pub address: String,
    pub ws_address: String,
    pub api_client: reqwest::Client,
    pub state: AppState,
}

impl TestApp {
    /// Health check
    pub async fn get_health(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/api/health", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Generate clarifying questions
    pub async fn post_prepare<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/api/research/prepare", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Start a research run
    pub async fn post_start<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/api/research/start", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Fetch the generated OpenAPI document
    pub async fn get_openapi(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/api-docs/openapi.json", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Start a server whose mocked providers always succeed
pub async fn spawn_app() -> TestApp {
    spawn_app_with_client(MockChatClient::reliable()).await
}

/// Start a server whose mocked LLM breaks query planning
pub async fn spawn_failing_app() -> TestApp {
    spawn_app_with_client(MockChatClient::failing()).await
}

async fn spawn_app_with_client(chat_client: MockChatClient) -> TestApp {
    LazyLock::force(&TRACING);

    let config = WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let the OS choose a free port
        dev_mode: true,
    };

    let (progress_broadcaster, _) = broadcast::channel::<ProgressEvent>(100);
    let application = DeepResearch::builder(DelveConfig::default())
        .with_chat_client(Box::new(chat_client))
        .with_search_provider(Arc::new(StaticSearch))
        .with_progress_sink(Arc::new(BroadcastProgress::new(progress_broadcaster.clone())))
        .build()
        .await
        .expect("Failed to build mocked research service");

    let state = AppState::with_application(config, Arc::new(application), progress_broadcaster);
    let app = create_app(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        ws_address: format!("ws://127.0.0.1:{}", port),
        api_client,
        state,
    }
}
