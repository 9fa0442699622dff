//! Data model for the recursive research pipeline

use serde::{Deserialize, Serialize};

/// One planned search query with its attached research goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// Query text handed to the search provider
    pub text: String,
    /// Free-form research goal attached at planning time.
    /// Never parsed, carried only for observability.
    pub goal: String,
}

impl ResearchQuery {
    pub fn new(text: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            goal: goal.into(),
        }
    }
}

/// Accumulator threaded through every recursion level.
///
/// Both collections behave as insertion-ordered sets: membership is exact
/// string equality, duplicates are silently absorbed, and entries are never
/// removed within a research run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchState {
    learnings: Vec<String>,
    visited_urls: Vec<String>,
}

impl ResearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a learning; returns false when it was already present.
    pub fn add_learning(&mut self, learning: impl Into<String>) -> bool {
        let learning = learning.into();
        if self.learnings.contains(&learning) {
            return false;
        }
        self.learnings.push(learning);
        true
    }

    /// Insert a URL; returns false when it was already present.
    pub fn add_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.visited_urls.contains(&url) {
            return false;
        }
        self.visited_urls.push(url);
        true
    }

    /// Union one branch's contribution into the accumulator.
    pub fn absorb(&mut self, level: LevelResult) {
        for learning in level.learnings {
            self.add_learning(learning);
        }
        for url in level.urls {
            self.add_url(url);
        }
    }

    /// Union another state into this one.
    pub fn merge(&mut self, other: ResearchState) {
        for learning in other.learnings {
            self.add_learning(learning);
        }
        for url in other.visited_urls {
            self.add_url(url);
        }
    }

    pub fn learnings(&self) -> &[String] {
        &self.learnings
    }

    pub fn visited_urls(&self) -> &[String] {
        &self.visited_urls
    }

    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.visited_urls.is_empty()
    }

    /// Whether this state contains everything `other` contains.
    pub fn is_superset_of(&self, other: &ResearchState) -> bool {
        other.learnings.iter().all(|l| self.learnings.contains(l))
            && other
                .visited_urls
                .iter()
                .all(|u| self.visited_urls.contains(u))
    }
}

/// Breadth/depth budget for one recursion level.
///
/// Budgets are consumed, not mutated: each level derives a fresh value via
/// [`SearchBudget::next_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// Number of parallel query branches at this level
    pub breadth: u32,
    /// Remaining recursion levels
    pub depth: u32,
}

impl SearchBudget {
    pub fn new(breadth: u32, depth: u32) -> Self {
        Self { breadth, depth }
    }

    /// Budget for the level below: depth decrements by one, breadth is
    /// halved (rounding up) with a floor of 2.
    pub fn next_level(self) -> Self {
        Self {
            breadth: ((self.breadth + 1) / 2).max(2),
            depth: self.depth.saturating_sub(1),
        }
    }

    pub fn is_exhausted(self) -> bool {
        self.depth == 0
    }
}

/// One document retrieved for one search query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub text: String,
}

/// Contribution of one branch at one recursion level, folded into
/// [`ResearchState`] by the orchestrating task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    pub learnings: Vec<String>,
    pub urls: Vec<String>,
}

/// Synthesized report plus its appended sources section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub body: String,
}
