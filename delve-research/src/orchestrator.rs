//! Recursive research orchestration
//!
//! Runs the level loop: plan queries for the current breadth, fan out one
//! search-and-summarize pipeline per query, union the branch results into the
//! shared state, then descend with halved breadth until the depth budget is
//! spent. Soft branch failures degrade to empty contributions; planning and
//! quota failures abort the whole run.

use crate::planner::QueryPlanner;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::search::SearchProvider;
use crate::summarizer::Summarizer;
use crate::ResearchResult;
use delve_core::{LevelResult, ResearchConfig, ResearchQuery, ResearchState, SearchBudget};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Drives one research run over injected providers.
///
/// Only this task mutates the accumulator; branches hand back private
/// [`LevelResult`]s that are merged in plan order once the level finishes.
pub struct ResearchOrchestrator {
    planner: Arc<dyn QueryPlanner>,
    search: Arc<dyn SearchProvider>,
    summarizer: Arc<dyn Summarizer>,
    progress: Arc<dyn ProgressSink>,
    config: ResearchConfig,
}

impl ResearchOrchestrator {
    pub fn new(
        planner: Arc<dyn QueryPlanner>,
        search: Arc<dyn SearchProvider>,
        summarizer: Arc<dyn Summarizer>,
        progress: Arc<dyn ProgressSink>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            planner,
            search,
            summarizer,
            progress,
            config,
        }
    }

    /// Research `query` within `budget`, folding everything learned into
    /// `state`. The returned state is a superset of the input state.
    pub async fn research(
        &self,
        query: &str,
        budget: SearchBudget,
        state: ResearchState,
    ) -> ResearchResult<ResearchState> {
        let mut state = state;
        let mut budget = budget;
        loop {
            if budget.is_exhausted() {
                self.progress
                    .notify(ProgressEvent::success("Maximum depth reached", None));
                return Ok(state);
            }
            self.run_level(query, budget, &mut state).await?;
            if budget.depth == 1 {
                return Ok(state);
            }
            budget = budget.next_level();
        }
    }

    async fn run_level(
        &self,
        query: &str,
        budget: SearchBudget,
        state: &mut ResearchState,
    ) -> ResearchResult<()> {
        self.progress.notify(ProgressEvent::info(
            format!("Starting research at depth {}...", budget.depth),
            Some(json!({
                "query": query,
                "currentLearnings": state.learnings().len(),
            })),
        ));

        let max_queries = (budget.breadth as usize).min(self.config.max_queries_per_level);
        let queries = self
            .planner
            .plan(query, state.learnings(), max_queries)
            .await?;
        self.progress.notify(ProgressEvent::info(
            "Generated SERP queries",
            Some(json!({
                "count": queries.len(),
                "queries": queries
                    .iter()
                    .map(|q| json!({ "query": q.text, "goal": first_sentence(&q.goal) }))
                    .collect::<Vec<_>>(),
            })),
        ));

        let max_follow_ups = (budget.breadth as usize + 1) / 2;
        let mut slots: Vec<Option<LevelResult>> = vec![None; queries.len()];
        {
            let branch_futures: Vec<_> = queries
                .iter()
                .enumerate()
                .map(|(index, planned)| {
                    async move { (index, self.run_branch(planned, max_follow_ups).await) }
                })
                .collect();
            let mut branches =
                stream::iter(branch_futures).buffer_unordered(self.config.concurrency);

            // A fatal branch error drops the stream here, cancelling
            // in-flight siblings before anything is committed for the level.
            while let Some((index, outcome)) = branches.next().await {
                slots[index] = Some(outcome?);
            }
        }
        for result in slots.into_iter().flatten() {
            state.absorb(result);
        }

        debug!(
            depth = budget.depth,
            learnings = state.learnings().len(),
            urls = state.visited_urls().len(),
            "Research level complete"
        );
        Ok(())
    }

    async fn run_branch(
        &self,
        planned: &ResearchQuery,
        max_follow_ups: usize,
    ) -> ResearchResult<LevelResult> {
        self.progress.notify(ProgressEvent::info(
            "Processing query",
            Some(json!({ "query": planned.text })),
        ));
        match self.process_branch(planned, max_follow_ups).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(query = %planned.text, error = %e, "Branch degraded to empty result");
                self.progress.notify(ProgressEvent::error(
                    "Error processing query",
                    Some(json!({ "query": planned.text, "error": e.to_string() })),
                ));
                Ok(LevelResult::default())
            }
        }
    }

    async fn process_branch(
        &self,
        planned: &ResearchQuery,
        max_follow_ups: usize,
    ) -> ResearchResult<LevelResult> {
        let documents = self.search.search(&planned.text).await?;
        let urls: Vec<String> = documents.iter().map(|d| d.url.clone()).collect();
        let summary = self
            .summarizer
            .summarize(
                planned,
                documents,
                self.config.max_learnings,
                max_follow_ups,
            )
            .await?;
        // Follow-up questions are not fed back; the next level replans from
        // the accumulated learnings.
        Ok(LevelResult {
            learnings: summary.learnings,
            urls,
        })
    }
}

/// First sentence of a research goal, or the whole goal when it has none.
fn first_sentence(goal: &str) -> &str {
    match goal.split('.').next() {
        Some(first) if !first.is_empty() => first,
        _ => goal,
    }
}
