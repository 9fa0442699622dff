//! Research endpoint handlers

use super::types::{
    PrepareResearchRequest, PrepareResearchResponse, StartResearchRequest, StartResearchResponse,
};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Json as JsonExtractor};
use delve_research::{ResearchError, ResearchRequest};
use tracing::{error, info, warn};

/// Generate clarifying questions
#[utoipa::path(
    post,
    path = "/api/research/prepare",
    tag = "Research",
    summary = "Prepare a research run",
    description = "Generate clarifying questions for a research topic. The client answers \
                   them and sends both back when starting the run.",
    request_body = PrepareResearchRequest,
    responses(
        (status = 200, description = "Questions generated successfully", body = PrepareResearchResponse),
        (status = 400, description = "Requested count out of range or not enough questions generated"),
        (status = 500, description = "Question generation failed")
    )
)]
pub async fn prepare_research(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<PrepareResearchRequest>,
) -> Result<Json<PrepareResearchResponse>, StatusCode> {
    let num_questions = request.num_questions.unwrap_or(3);
    if !(1..=10).contains(&num_questions) {
        warn!(
            "Rejecting prepare request: numQuestions {} out of range",
            num_questions
        );
        return Err(StatusCode::BAD_REQUEST);
    }

    info!("Preparing research questions for query: {}", request.query);

    match state
        .application
        .prepare_questions(&request.query, num_questions)
        .await
    {
        Ok(questions) => Ok(Json(PrepareResearchResponse { questions })),
        Err(ResearchError::InsufficientQuestions { expected, actual }) => {
            warn!(
                "Question generation came up short: expected {}, got {}",
                expected, actual
            );
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            error!("Failed to prepare research questions: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Run the full research pipeline
#[utoipa::path(
    post,
    path = "/api/research/start",
    tag = "Research",
    summary = "Start a research run",
    description = "Run recursive research on a topic and return the final report. Progress \
                   events stream over the /ws/progress WebSocket while the run is active.",
    request_body = StartResearchRequest,
    responses(
        (status = 200, description = "Research completed successfully", body = StartResearchResponse),
        (status = 400, description = "Depth or breadth out of range"),
        (status = 500, description = "Research run failed")
    )
)]
pub async fn start_research(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<StartResearchRequest>,
) -> Result<Json<StartResearchResponse>, StatusCode> {
    let research_config = &state.application.config().research;
    let depth = request.depth.unwrap_or(research_config.default_depth);
    let breadth = request.breadth.unwrap_or(research_config.default_breadth);

    if !(1..=5).contains(&depth) {
        warn!("Rejecting research request: depth {} out of range", depth);
        return Err(StatusCode::BAD_REQUEST);
    }
    if !(1..=10).contains(&breadth) {
        warn!(
            "Rejecting research request: breadth {} out of range",
            breadth
        );
        return Err(StatusCode::BAD_REQUEST);
    }

    info!(
        "Starting research for query: {} (depth {}, breadth {})",
        request.query, depth, breadth
    );

    let research_request = ResearchRequest::new(
        request.query,
        depth,
        breadth,
        request.questions_with_answers,
    );

    match state.application.conduct_research(research_request).await {
        Ok(report) => Ok(Json(StartResearchResponse {
            report: report.body,
        })),
        Err(e) => {
            // Provider failures must not leak response bodies to the client
            error!("Research run failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
