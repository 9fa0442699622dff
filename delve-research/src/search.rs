//! Web search provider
//!
//! [`FirecrawlSearch`] talks to a Firecrawl-compatible search API. Quota
//! responses (402/429) are surfaced as fatal errors because continuing a run
//! after quota exhaustion only burns more budget; everything else that goes
//! wrong here stays local to the requesting branch.

use crate::{ResearchError, ResearchResult};
use async_trait::async_trait;
use delve_core::{FetchResult, SearchConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Source of documents for one search query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Retrieve up to the provider's configured document cap for `query`.
    /// Hits without extractable text are excluded from the result.
    async fn search(&self, query: &str) -> ResearchResult<Vec<FetchResult>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

/// HTTP client for a Firecrawl-compatible search API
pub struct FirecrawlSearch {
    http: reqwest::Client,
    api_key: String,
    config: SearchConfig,
}

impl FirecrawlSearch {
    pub fn new(config: SearchConfig) -> ResearchResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("FIRECRAWL_API_KEY").ok())
            .ok_or_else(|| {
                ResearchError::config(
                    "Firecrawl API key not found. Set FIRECRAWL_API_KEY or search.api_key in config",
                )
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ResearchError::search(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            config,
        })
    }
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    async fn search(&self, query: &str) -> ResearchResult<Vec<FetchResult>> {
        let endpoint = format!("{}/v1/search", self.config.base_url.trim_end_matches('/'));
        let request = SearchRequest {
            query,
            limit: self.config.max_documents,
            timeout: self.config.timeout_ms,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown"],
            },
        };

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, self.config.timeout_ms))?;

        let status = response.status();
        if status == reqwest::StatusCode::PAYMENT_REQUIRED
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(ResearchError::quota(format!(
                "Search provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(ResearchError::search(format!(
                "Search request failed with status {}",
                status
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::search(format!("Invalid search response: {}", e)))?;

        let documents = collect_documents(body.data);
        debug!(query, count = documents.len(), "Search returned documents");
        Ok(documents)
    }
}

fn classify_transport_error(error: reqwest::Error, timeout_ms: u64) -> ResearchError {
    if error.is_timeout() {
        ResearchError::SearchTimeout { timeout_ms }
    } else {
        ResearchError::search(format!("Search request failed: {}", error))
    }
}

/// Keep only hits with both a URL and non-empty extracted text.
fn collect_documents(hits: Vec<SearchHit>) -> Vec<FetchResult> {
    hits.into_iter()
        .filter_map(|hit| match (hit.url, hit.markdown) {
            (Some(url), Some(text)) if !text.trim().is_empty() => {
                Some(FetchResult { url, text })
            }
            _ => None,
        })
        .collect()
}
