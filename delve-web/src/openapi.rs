//! OpenAPI specification for the Delve web server
//!
//! This module defines the complete OpenAPI specification for the Delve API.

use utoipa::OpenApi;

use crate::handlers::{
    HealthResponse, PrepareResearchRequest, PrepareResearchResponse, StartResearchRequest,
    StartResearchResponse,
};

/// Main OpenAPI specification for the Delve web server
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deep Research API",
        version = "0.1.0",
        description = "API for conducting in-depth research using AI"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Health endpoints
        crate::handlers::health_check,

        // Research endpoints
        crate::handlers::prepare_research,
        crate::handlers::start_research,
    ),
    components(
        schemas(
            HealthResponse,
            PrepareResearchRequest,
            PrepareResearchResponse,
            StartResearchRequest,
            StartResearchResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Research", description = "Deep research operations"),
    )
)]
pub struct ApiDoc;

/// Get the OpenAPI specification as JSON
pub fn get_openapi_json() -> String {
    ApiDoc::openapi().to_pretty_json().unwrap()
}
