//! Research endpoint types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request for clarifying questions before a research run
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResearchRequest {
    #[schema(example = "How does artificial intelligence affect the job market?")]
    pub query: String,
    /// Number of questions to generate, 1 to 10 (defaults to 3)
    #[schema(example = 3)]
    pub num_questions: Option<usize>,
}

/// Clarifying questions for the client to answer
#[derive(Debug, Serialize, ToSchema)]
pub struct PrepareResearchResponse {
    pub questions: Vec<String>,
}

/// Request for a full research run
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartResearchRequest {
    #[schema(example = "How does artificial intelligence affect the job market?")]
    pub query: String,
    /// Recursion depth, 1 to 5 (defaults to the configured depth)
    #[schema(example = 3)]
    pub depth: Option<u32>,
    /// Parallel branches at the first level, 1 to 10 (defaults to the
    /// configured breadth)
    #[schema(example = 6)]
    pub breadth: Option<u32>,
    /// The clarifying questions together with the user's answers
    #[schema(
        example = "Q1: Which sectors are most at risk?\nA1: Mainly transportation and administration..."
    )]
    pub questions_with_answers: String,
}

/// Final research report
#[derive(Debug, Serialize, ToSchema)]
pub struct StartResearchResponse {
    /// Markdown report ending in a localized sources section
    pub report: String,
}
