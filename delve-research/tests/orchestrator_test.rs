//! Orchestrator behavior tests with scripted providers
//!
//! Every provider is a deterministic fake, so these tests pin down the level
//! loop semantics: budget decay, merge order, branch degradation, and hard
//! aborts.

use async_trait::async_trait;
use delve_core::{
    FetchResult, ResearchConfig, ResearchQuery, ResearchState, SearchBudget,
};
use delve_research::{
    BranchSummary, ProgressEvent, ProgressKind, ProgressSink, QueryPlanner, ResearchError,
    ResearchOrchestrator, ResearchResult, SearchProvider, Summarizer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Returns scripted query lists level by level and records what it was asked.
struct ScriptedPlanner {
    levels: Mutex<Vec<Vec<ResearchQuery>>>,
    asked_max_queries: Mutex<Vec<usize>>,
    prior_learning_counts: Mutex<Vec<usize>>,
}

impl ScriptedPlanner {
    fn new(levels: Vec<Vec<ResearchQuery>>) -> Arc<Self> {
        Arc::new(Self {
            levels: Mutex::new(levels),
            asked_max_queries: Mutex::new(Vec::new()),
            prior_learning_counts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl QueryPlanner for ScriptedPlanner {
    async fn plan(
        &self,
        _topic: &str,
        prior_learnings: &[String],
        max_queries: usize,
    ) -> ResearchResult<Vec<ResearchQuery>> {
        self.asked_max_queries.lock().unwrap().push(max_queries);
        self.prior_learning_counts
            .lock()
            .unwrap()
            .push(prior_learnings.len());
        let mut levels = self.levels.lock().unwrap();
        if levels.is_empty() {
            return Err(ResearchError::planning("Planner script exhausted"));
        }
        Ok(levels.remove(0))
    }
}

#[derive(Clone)]
enum SearchScript {
    Hits(Vec<FetchResult>),
    Timeout,
    Quota,
}

struct ScriptedSearch {
    scripts: HashMap<String, SearchScript>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    fn new(scripts: Vec<(&str, SearchScript)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .into_iter()
                .map(|(query, script)| (query.to_string(), script))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> ResearchResult<Vec<FetchResult>> {
        self.calls.lock().unwrap().push(query.to_string());
        match self.scripts.get(query) {
            Some(SearchScript::Hits(hits)) => Ok(hits.clone()),
            Some(SearchScript::Timeout) => {
                Err(ResearchError::SearchTimeout { timeout_ms: 15_000 })
            }
            Some(SearchScript::Quota) => {
                Err(ResearchError::quota("Search provider returned 429"))
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Turns each document into the learning "{query}: {url}".
#[derive(Default)]
struct EchoSummarizer {
    fail_on: Option<String>,
    calls: Mutex<usize>,
}

impl EchoSummarizer {
    fn failing_on(query: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(query.to_string()),
            calls: Mutex::new(0),
        })
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(
        &self,
        query: &ResearchQuery,
        documents: Vec<FetchResult>,
        max_learnings: usize,
        _max_follow_ups: usize,
    ) -> ResearchResult<BranchSummary> {
        *self.calls.lock().unwrap() += 1;
        if self.fail_on.as_deref() == Some(query.text.as_str()) {
            return Err(ResearchError::summarization("Extraction failed"));
        }
        let mut learnings: Vec<String> = documents
            .iter()
            .map(|d| format!("{}: {}", query.text, d.url))
            .collect();
        learnings.truncate(max_learnings);
        Ok(BranchSummary {
            learnings,
            follow_up_questions: Vec::new(),
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    fn error_messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == ProgressKind::Error)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn notify(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn doc(url: &str) -> FetchResult {
    FetchResult {
        url: url.to_string(),
        text: format!("content for {}", url),
    }
}

fn build_orchestrator(
    planner: Arc<ScriptedPlanner>,
    search: Arc<ScriptedSearch>,
    summarizer: Arc<EchoSummarizer>,
    sink: Arc<RecordingSink>,
) -> ResearchOrchestrator {
    ResearchOrchestrator::new(planner, search, summarizer, sink, ResearchConfig::default())
}

#[tokio::test]
async fn depth_zero_returns_state_unchanged_without_provider_calls() {
    let planner = ScriptedPlanner::new(vec![]);
    let search = ScriptedSearch::new(vec![]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let mut seeded = ResearchState::new();
    seeded.add_learning("prior learning");
    seeded.add_url("http://prior.example");

    let orchestrator = build_orchestrator(
        planner.clone(),
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let result = orchestrator
        .research("topic", SearchBudget::new(4, 0), seeded.clone())
        .await
        .unwrap();

    assert_eq!(result, seeded);
    assert!(planner.asked_max_queries.lock().unwrap().is_empty());
    assert_eq!(search.call_count(), 0);
    assert_eq!(summarizer.call_count(), 0);
    assert_eq!(sink.messages(), ["Maximum depth reached"]);
}

#[tokio::test]
async fn two_level_run_merges_in_plan_order_and_dedupes_urls() {
    let planner = ScriptedPlanner::new(vec![
        vec![
            ResearchQuery::new("q1", "Goal one. Then go deeper."),
            ResearchQuery::new("q2", "Goal two."),
            ResearchQuery::new("q3", "Goal three."),
        ],
        vec![
            ResearchQuery::new("q4", "Goal four."),
            ResearchQuery::new("q5", "Goal five."),
        ],
    ]);
    let search = ScriptedSearch::new(vec![
        ("q1", SearchScript::Hits(vec![doc("http://u1.example")])),
        ("q2", SearchScript::Hits(vec![doc("http://u2.example")])),
        ("q3", SearchScript::Hits(vec![doc("http://u3.example")])),
        // q4 revisits q1's source; the URL must not be recorded twice
        ("q4", SearchScript::Hits(vec![doc("http://u1.example")])),
        ("q5", SearchScript::Hits(vec![doc("http://u5.example")])),
    ]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner.clone(),
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let result = orchestrator
        .research("topic", SearchBudget::new(4, 2), ResearchState::new())
        .await
        .unwrap();

    // Level one asks min(4, 3), level two asks min(max(2, ceil(4/2)), 3).
    assert_eq!(planner.asked_max_queries.lock().unwrap().as_slice(), [3, 2]);
    // The second plan sees everything learned at the first level.
    assert_eq!(
        planner.prior_learning_counts.lock().unwrap().as_slice(),
        [0, 3]
    );

    assert_eq!(
        result.learnings(),
        [
            "q1: http://u1.example",
            "q2: http://u2.example",
            "q3: http://u3.example",
            "q4: http://u1.example",
            "q5: http://u5.example",
        ]
    );
    assert_eq!(
        result.visited_urls(),
        [
            "http://u1.example",
            "http://u2.example",
            "http://u3.example",
            "http://u5.example",
        ]
    );
    assert_eq!(search.call_count(), 5);
}

#[tokio::test]
async fn planner_output_is_run_as_is_even_past_the_requested_cap() {
    // The planner owns its output contract. When it misbehaves and returns
    // three queries for a request of two, all three branches still run.
    let planner = ScriptedPlanner::new(vec![vec![
        ResearchQuery::new("q1", "Goal one."),
        ResearchQuery::new("q2", "Goal two."),
        ResearchQuery::new("q3", "Goal three."),
    ]]);
    let search = ScriptedSearch::new(vec![
        ("q1", SearchScript::Hits(vec![doc("http://u1.example")])),
        ("q2", SearchScript::Hits(vec![doc("http://u2.example")])),
        ("q3", SearchScript::Hits(vec![doc("http://u3.example")])),
    ]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner.clone(),
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let result = orchestrator
        .research("topic", SearchBudget::new(2, 1), ResearchState::new())
        .await
        .unwrap();

    assert_eq!(planner.asked_max_queries.lock().unwrap().as_slice(), [2]);
    assert_eq!(search.call_count(), 3);
    assert_eq!(result.learnings().len(), 3);
}

#[tokio::test]
async fn soft_failures_degrade_only_their_own_branch() {
    let planner = ScriptedPlanner::new(vec![vec![
        ResearchQuery::new("q1", "Times out."),
        ResearchQuery::new("q2", "Succeeds."),
        ResearchQuery::new("q3", "Fails to summarize."),
    ]]);
    let search = ScriptedSearch::new(vec![
        ("q1", SearchScript::Timeout),
        ("q2", SearchScript::Hits(vec![doc("http://u2.example")])),
        ("q3", SearchScript::Hits(vec![doc("http://u3.example")])),
    ]);
    let summarizer = EchoSummarizer::failing_on("q3");
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner.clone(),
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let result = orchestrator
        .research("topic", SearchBudget::new(3, 1), ResearchState::new())
        .await
        .unwrap();

    assert_eq!(result.learnings(), ["q2: http://u2.example"]);
    assert_eq!(result.visited_urls(), ["http://u2.example"]);
    assert_eq!(
        sink.error_messages(),
        ["Error processing query", "Error processing query"]
    );
}

#[tokio::test]
async fn quota_exhaustion_aborts_the_whole_run() {
    let planner = ScriptedPlanner::new(vec![vec![
        ResearchQuery::new("q1", "Succeeds."),
        ResearchQuery::new("q2", "Hits the quota."),
        ResearchQuery::new("q3", "Never matters."),
    ]]);
    let search = ScriptedSearch::new(vec![
        ("q1", SearchScript::Hits(vec![doc("http://u1.example")])),
        ("q2", SearchScript::Quota),
        ("q3", SearchScript::Hits(vec![doc("http://u3.example")])),
    ]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner.clone(),
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let err = orchestrator
        .research("topic", SearchBudget::new(3, 2), ResearchState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::QuotaExhausted { .. }));
    assert!(err.is_fatal());
    // The run never reached its natural end.
    assert!(!sink.messages().contains(&"Maximum depth reached".to_string()));
    // Only the first level was planned before the abort.
    assert_eq!(planner.asked_max_queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn planning_failure_fails_the_call() {
    let planner = ScriptedPlanner::new(vec![]);
    let search = ScriptedSearch::new(vec![]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner,
        search.clone(),
        summarizer.clone(),
        sink.clone(),
    );
    let err = orchestrator
        .research("topic", SearchBudget::new(4, 2), ResearchState::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::Planning { .. }));
    assert_eq!(search.call_count(), 0);
}

#[tokio::test]
async fn returned_state_is_a_superset_of_the_seeded_state() {
    let planner = ScriptedPlanner::new(vec![vec![ResearchQuery::new("q1", "Goal.")]]);
    let search = ScriptedSearch::new(vec![(
        "q1",
        SearchScript::Hits(vec![doc("http://u1.example")]),
    )]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let mut seeded = ResearchState::new();
    seeded.add_learning("prior learning");
    seeded.add_url("http://prior.example");

    let orchestrator = build_orchestrator(
        planner,
        search,
        summarizer,
        sink,
    );
    let result = orchestrator
        .research("topic", SearchBudget::new(2, 1), seeded.clone())
        .await
        .unwrap();

    assert!(result.is_superset_of(&seeded));
    assert_eq!(
        result.learnings(),
        ["prior learning", "q1: http://u1.example"]
    );
    assert_eq!(
        result.visited_urls(),
        ["http://prior.example", "http://u1.example"]
    );
}

#[tokio::test]
async fn breadth_decays_across_three_levels() {
    let planner = ScriptedPlanner::new(vec![
        vec![ResearchQuery::new("q1", "Goal.")],
        vec![ResearchQuery::new("q2", "Goal.")],
        vec![ResearchQuery::new("q3", "Goal.")],
    ]);
    let search = ScriptedSearch::new(vec![
        ("q1", SearchScript::Hits(vec![doc("http://u1.example")])),
        ("q2", SearchScript::Hits(vec![doc("http://u2.example")])),
        ("q3", SearchScript::Hits(vec![doc("http://u3.example")])),
    ]);
    let summarizer = Arc::new(EchoSummarizer::default());
    let sink = Arc::new(RecordingSink::default());

    let orchestrator = build_orchestrator(
        planner.clone(),
        search,
        summarizer,
        sink.clone(),
    );
    orchestrator
        .research("topic", SearchBudget::new(6, 3), ResearchState::new())
        .await
        .unwrap();

    // Breadth runs 6 -> 3 -> 2, capped at 3 queries per level.
    assert_eq!(
        planner.asked_max_queries.lock().unwrap().as_slice(),
        [3, 3, 2]
    );
    let messages = sink.messages();
    assert!(messages.contains(&"Starting research at depth 3...".to_string()));
    assert!(messages.contains(&"Starting research at depth 1...".to_string()));
    assert!(!messages.contains(&"Maximum depth reached".to_string()));
}
