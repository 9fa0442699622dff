//! Application state shared across handlers and WebSocket connections

use crate::{WebConfig, WebError, WebResult};
use delve_core::DelveConfig;
use delve_research::{BroadcastProgress, DeepResearch, ProgressEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Application state for the web server
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: WebConfig,
    /// Main research application service
    pub application: Arc<DeepResearch>,
    /// Progress broadcaster for research status updates
    pub progress_broadcaster: broadcast::Sender<ProgressEvent>,
}

impl AppState {
    /// Create a new application state
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let research_config = DelveConfig::from_env();

        // Create the progress broadcaster with a buffer of 100 events
        let (progress_broadcaster, _) = broadcast::channel::<ProgressEvent>(100);

        // Create the main research service, reporting progress into the
        // broadcaster so WebSocket clients can follow along
        let application = DeepResearch::builder(research_config)
            .with_progress_sink(Arc::new(BroadcastProgress::new(
                progress_broadcaster.clone(),
            )))
            .build()
            .await
            .map_err(|e| WebError::Config(format!("Failed to create research service: {}", e)))?;

        let state = Self {
            config,
            application: Arc::new(application),
            progress_broadcaster,
        };

        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Create state around an existing research service. The service must
    /// already report progress into `progress_broadcaster` for WebSocket
    /// streaming to see its events.
    pub fn with_application(
        config: WebConfig,
        application: Arc<DeepResearch>,
        progress_broadcaster: broadcast::Sender<ProgressEvent>,
    ) -> Self {
        Self {
            config,
            application,
            progress_broadcaster,
        }
    }

    /// Subscribe to research progress updates
    pub fn subscribe_to_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress_broadcaster.subscribe()
    }
}
