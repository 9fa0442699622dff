//! Query planning
//!
//! Turns a research topic plus prior learnings into the next round of search
//! queries. The planner owns the "at most `max_queries`, pairwise distinct"
//! guarantee; callers fan out over its output as-is.

use crate::llm::{ResearchLlm, RESEARCHER_SYSTEM_PROMPT};
use crate::{ResearchError, ResearchResult};
use async_trait::async_trait;
use delve_core::ResearchQuery;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Produces the next round of search queries for a topic.
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Plan at most `max_queries` pairwise-distinct queries, biased toward
    /// closing gaps implied by `prior_learnings` when present.
    async fn plan(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> ResearchResult<Vec<ResearchQuery>>;
}

#[derive(Debug, Deserialize)]
struct PlannedQuery {
    query: String,
    #[serde(default, rename = "researchGoal")]
    research_goal: String,
}

/// LLM-backed planner
pub struct LlmQueryPlanner {
    llm: Arc<ResearchLlm>,
}

impl LlmQueryPlanner {
    pub fn new(llm: Arc<ResearchLlm>) -> Self {
        Self { llm }
    }

    fn build_prompt(
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
        language: &str,
    ) -> String {
        let mut prompt = format!(
            "Given the following prompt from the user, generate a list of SERP queries in the \
             same language as the query ({language}) to research the topic. Return a maximum of \
             {max_queries} queries, but feel free to return less if the original prompt is clear. \
             Make sure each query is unique and not similar to each other. Respond with a JSON \
             array of objects with the fields \"query\" and \"researchGoal\", where the goal \
             first talks about what the research behind the query is meant to accomplish, then \
             goes deeper into how to advance the research once the results are found, mentioning \
             additional research directions: <prompt>{topic}</prompt>"
        );
        if !prior_learnings.is_empty() {
            prompt.push_str(&format!(
                "\n\nHere are some learnings from previous research, use them to generate more \
                 specific queries: {}",
                prior_learnings.join("\n")
            ));
        }
        prompt
    }
}

#[async_trait]
impl QueryPlanner for LlmQueryPlanner {
    async fn plan(
        &self,
        topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> ResearchResult<Vec<ResearchQuery>> {
        let language = self
            .llm
            .detect_language(topic)
            .await
            .map_err(|e| ResearchError::planning(format!("Language detection failed: {}", e)))?;

        let prompt = Self::build_prompt(topic, prior_learnings, max_queries, &language);
        let response = self
            .llm
            .generate_with_system(RESEARCHER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ResearchError::planning(format!("Planner request failed: {}", e)))?;

        let planned = parse_queries(&response)?;

        let mut queries: Vec<ResearchQuery> = Vec::new();
        for item in planned {
            if queries.iter().any(|q| q.text == item.query) {
                continue;
            }
            queries.push(ResearchQuery::new(item.query, item.research_goal));
            if queries.len() == max_queries {
                break;
            }
        }

        if queries.is_empty() {
            return Err(ResearchError::planning("Planner returned no queries"));
        }
        debug!(
            count = queries.len(),
            max_queries, "Planned search queries"
        );
        Ok(queries)
    }
}

/// Extract the JSON array payload from an LLM response.
fn parse_queries(response: &str) -> ResearchResult<Vec<PlannedQuery>> {
    let (start, end) = match (response.find('['), response.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ResearchError::planning(
                "Planner response contained no JSON array",
            ))
        }
    };
    serde_json::from_str(&response[start..=end])
        .map_err(|e| ResearchError::planning(format!("Failed to parse planner response: {}", e)))
}
