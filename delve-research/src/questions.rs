//! Clarifying question generation
//!
//! Produces the follow-up questions a client answers before research starts.
//! The question/answer pairs sharpen the research direction; they are
//! combined with the original query by the facade.

use crate::llm::{ResearchLlm, RESEARCHER_SYSTEM_PROMPT};
use crate::{ResearchError, ResearchResult};
use std::sync::Arc;
use tracing::debug;

/// LLM-backed generator for clarifying questions
pub struct QuestionGenerator {
    llm: Arc<ResearchLlm>,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<ResearchLlm>) -> Self {
        Self { llm }
    }

    /// Generate exactly `num_questions` clarifying questions for `query`,
    /// in the query's language. Fewer questions than requested is an error.
    pub async fn generate(&self, query: &str, num_questions: usize) -> ResearchResult<Vec<String>> {
        let language = self
            .llm
            .detect_language(query)
            .await
            .map_err(|e| ResearchError::llm(format!("Language detection failed: {}", e)))?;

        let prompt = format!(
            "Given the following query from the user, generate EXACTLY {num_questions} follow up \
             questions in the same language as the query ({language}). The questions must be \
             unique, specific, and directly related to the main query. Each question should \
             explore a different aspect of the topic. Respond with a JSON object with a \
             \"questions\" field containing an array of strings, nothing else: \
             <query>{query}</query>"
        );
        let response = self
            .llm
            .generate_with_system(RESEARCHER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ResearchError::llm(format!("Question generation failed: {}", e)))?;

        let mut questions = parse_questions(&response)?;
        questions.truncate(num_questions);
        if questions.len() < num_questions {
            return Err(ResearchError::InsufficientQuestions {
                expected: num_questions,
                actual: questions.len(),
            });
        }

        debug!(count = questions.len(), "Generated clarifying questions");
        Ok(questions)
    }
}

#[derive(serde::Deserialize)]
struct QuestionPayload {
    #[serde(default)]
    questions: Vec<String>,
}

fn parse_questions(response: &str) -> ResearchResult<Vec<String>> {
    let (start, end) = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ResearchError::llm(
                "Question response contained no JSON object",
            ))
        }
    };
    let payload: QuestionPayload = serde_json::from_str(&response[start..=end])
        .map_err(|e| ResearchError::llm(format!("Failed to parse question response: {}", e)))?;
    Ok(payload
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect())
}
