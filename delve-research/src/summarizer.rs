//! Learning extraction
//!
//! Distills a batch of fetched documents into concise learnings plus
//! candidate follow-up questions. Failures here are branch-local: the
//! orchestrator degrades the branch instead of aborting the run.

use crate::llm::{ResearchLlm, RESEARCHER_SYSTEM_PROMPT};
use crate::{ResearchError, ResearchResult};
use async_trait::async_trait;
use delve_core::async_utils::with_timeout;
use delve_core::{FetchResult, ResearchConfig, ResearchQuery};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Output of one summarization call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchSummary {
    pub learnings: Vec<String>,
    /// Candidate questions for deeper research. Informational only: the
    /// orchestrator does not feed them back into planning.
    pub follow_up_questions: Vec<String>,
}

/// Extracts learnings from fetched documents.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `documents` for `query`, returning at most `max_learnings`
    /// learnings and `max_follow_ups` follow-up questions.
    async fn summarize(
        &self,
        query: &ResearchQuery,
        documents: Vec<FetchResult>,
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> ResearchResult<BranchSummary>;
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    #[serde(default)]
    learnings: Vec<String>,
    #[serde(default, rename = "followUpQuestions")]
    follow_up_questions: Vec<String>,
}

/// LLM-backed summarizer
pub struct LlmSummarizer {
    llm: Arc<ResearchLlm>,
    config: ResearchConfig,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<ResearchLlm>, config: ResearchConfig) -> Self {
        Self { llm, config }
    }

    fn build_prompt(
        query: &ResearchQuery,
        contents: &[String],
        max_learnings: usize,
        max_follow_ups: usize,
        language: &str,
    ) -> String {
        let wrapped = contents
            .iter()
            .map(|content| format!("<content>\n{}\n</content>", content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Given the following contents from a SERP search for the query \
             <query>{}</query>, generate a list of learnings in the same language as the query \
             ({language}) from the contents. Return a maximum of {max_learnings} learnings, but \
             feel free to return less if the contents are clear. Make sure each learning is \
             unique and not similar to each other. The learnings should be concise and to the \
             point, as detailed and information dense as possible. Make sure to include any \
             entities like people, places, companies, products, things, etc in the learnings, as \
             well as any exact metrics, numbers, or dates. The learnings will be used to research \
             the topic further. Respond with a JSON object with a \"learnings\" field and a \
             \"followUpQuestions\" field (a list of follow-up questions to research the topic \
             further, max of {max_follow_ups}), nothing else.\n\n\
             <contents>{wrapped}</contents>",
            query.text
        )
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        query: &ResearchQuery,
        documents: Vec<FetchResult>,
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> ResearchResult<BranchSummary> {
        if documents.is_empty() {
            return Ok(BranchSummary::default());
        }

        let language = self
            .llm
            .detect_language(&query.text)
            .await
            .map_err(|e| ResearchError::summarization(format!("Language detection failed: {}", e)))?;

        let contents: Vec<String> = documents
            .iter()
            .map(|d| truncate_chars(&d.text, self.config.document_char_limit))
            .collect();
        let prompt = Self::build_prompt(query, &contents, max_learnings, max_follow_ups, &language);

        let response = match with_timeout(
            self.llm.generate_with_system(RESEARCHER_SYSTEM_PROMPT, &prompt),
            self.config.summarize_timeout_ms,
            "summarize",
        )
        .await
        {
            Ok(result) => result.map_err(|e| {
                ResearchError::summarization(format!("Extraction request failed: {}", e))
            })?,
            Err(timeout) => {
                return Err(ResearchError::summarization(timeout.to_string()));
            }
        };

        let payload = parse_summary(&response)?;
        let mut learnings = payload.learnings;
        learnings.truncate(max_learnings);
        let mut follow_up_questions = payload.follow_up_questions;
        follow_up_questions.truncate(max_follow_ups);

        debug!(
            query = %query.text,
            learnings = learnings.len(),
            follow_ups = follow_up_questions.len(),
            "Summarized documents"
        );
        Ok(BranchSummary {
            learnings,
            follow_up_questions,
        })
    }
}

/// Extract the JSON object payload from an LLM response.
fn parse_summary(response: &str) -> ResearchResult<SummaryPayload> {
    let (start, end) = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ResearchError::summarization(
                "Extraction response contained no JSON object",
            ))
        }
    };
    serde_json::from_str(&response[start..=end]).map_err(|e| {
        ResearchError::summarization(format!("Failed to parse extraction response: {}", e))
    })
}

/// Hard character cap; not sentence-aware.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_object() {
        let response = r#"Sure:
```json
{"learnings": ["a", "b"], "followUpQuestions": ["q1"]}
```"#;
        let payload = parse_summary(response).unwrap();
        assert_eq!(payload.learnings, ["a", "b"]);
        assert_eq!(payload.follow_up_questions, ["q1"]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let payload = parse_summary(r#"{"learnings": ["only"]}"#).unwrap();
        assert_eq!(payload.learnings, ["only"]);
        assert!(payload.follow_up_questions.is_empty());
    }

    #[test]
    fn garbage_is_a_summarization_error() {
        let err = parse_summary("no object").unwrap_err();
        assert!(matches!(err, ResearchError::Summarization { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
    }
}
