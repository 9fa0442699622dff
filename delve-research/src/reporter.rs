//! Final report synthesis
//!
//! Turns the accumulated learnings into a Markdown report and appends a
//! localized sources section listing every visited URL.

use crate::llm::{ResearchLlm, RESEARCHER_SYSTEM_PROMPT};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::summarizer::truncate_chars;
use crate::{ResearchError, ResearchResult};
use delve_core::{FinalReport, ResearchConfig};
use serde_json::json;
use std::sync::Arc;

/// LLM-backed report writer
pub struct ReportSynthesizer {
    llm: Arc<ResearchLlm>,
    config: ResearchConfig,
    progress: Arc<dyn ProgressSink>,
}

impl ReportSynthesizer {
    pub fn new(
        llm: Arc<ResearchLlm>,
        config: ResearchConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            llm,
            config,
            progress,
        }
    }

    /// Write the final report for `topic` from `learnings`, then append the
    /// sources section built from `urls`.
    pub async fn synthesize(
        &self,
        topic: &str,
        learnings: &[String],
        urls: &[String],
    ) -> ResearchResult<FinalReport> {
        self.progress.notify(ProgressEvent::info(
            "Starting final report generation...",
            Some(json!({
                "learningsCount": learnings.len(),
                "urlsCount": urls.len(),
            })),
        ));

        let language = self
            .llm
            .detect_language(topic)
            .await
            .map_err(|e| ResearchError::llm(format!("Language detection failed: {}", e)))?;
        self.progress.notify(ProgressEvent::info(
            "Detected report language",
            Some(json!({ "language": language })),
        ));

        let learnings_block = truncate_chars(
            &learnings
                .iter()
                .map(|l| format!("<learning>\n{}\n</learning>", l))
                .collect::<Vec<_>>()
                .join("\n"),
            self.config.report_char_limit,
        );
        self.progress.notify(ProgressEvent::info(
            "Generating report content...",
            Some(json!({
                "promptLength": topic.chars().count(),
                "learningsLength": learnings_block.chars().count(),
            })),
        ));
        let prompt = format!(
            "Given the following prompt from the user, write a final report in the same language \
             as the query ({language}) on the topic using the learnings from research. Make it \
             as detailed as possible, aim for 3 or more pages, include ALL the learnings from \
             research. Respond with the report in Markdown, nothing else:\n\n\
             <prompt>{topic}</prompt>\n\n\
             Here are all the learnings from previous research:\n\n\
             <learnings>\n{learnings_block}\n</learnings>"
        );

        let body = self
            .llm
            .generate_with_system(RESEARCHER_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ResearchError::llm(format!("Report generation failed: {}", e)))?;

        self.progress.notify(ProgressEvent::info(
            "Adding sources section...",
            Some(json!({
                "reportLength": body.chars().count(),
                "sourcesCount": urls.len(),
            })),
        ));
        let heading = self.localized_sources_heading(&language).await?;
        let report = append_sources(body.trim(), &heading, urls);

        self.progress.notify(ProgressEvent::success(
            "Final report has been generated",
            Some(json!({
                "finalLength": report.chars().count(),
                "sectionsCount": report.matches('#').count(),
                "sourcesCount": urls.len(),
            })),
        ));
        Ok(FinalReport { body: report })
    }

    /// Localized "## Sources" heading for the report language.
    async fn localized_sources_heading(&self, language: &str) -> ResearchResult<String> {
        let prompt = format!(
            "Translate the word \"Sources\" into the language with ISO code: {language}. \
             Return only the translated word with markdown h2 formatting (##), nothing else."
        );
        let heading = self
            .llm
            .generate_with_system(
                "You are a translator. Return only the translated word, nothing else.",
                &prompt,
            )
            .await
            .map_err(|e| ResearchError::llm(format!("Heading translation failed: {}", e)))?;
        let heading = heading.trim().to_string();
        if heading.starts_with("##") {
            Ok(heading)
        } else {
            Ok(format!("## {}", heading))
        }
    }
}

fn append_sources(body: &str, heading: &str, urls: &[String]) -> String {
    let bullets = urls
        .iter()
        .map(|url| format!("- {}", url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{body}\n\n{heading}\n\n{bullets}")
}

/// Recover the source URLs from a finished report. Reads the trailing bullet
/// list, so it works regardless of the localized heading text.
pub fn parse_sources(report: &str) -> Vec<String> {
    let mut urls: Vec<String> = report
        .lines()
        .rev()
        .skip_while(|line| line.trim().is_empty())
        .take_while(|line| line.starts_with("- "))
        .filter_map(|line| line.strip_prefix("- "))
        .map(|url| url.to_string())
        .collect();
    urls.reverse();
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_round_trip_in_order() {
        let urls = vec![
            "https://first.example".to_string(),
            "https://second.example".to_string(),
        ];
        let report = append_sources("# Report\n\nBody text.", "## Sources", &urls);
        assert_eq!(parse_sources(&report), urls);
    }

    #[test]
    fn empty_urls_parse_to_empty() {
        let report = append_sources("# Report", "## Quellen", &[]);
        assert!(parse_sources(&report).is_empty());
    }

    #[test]
    fn trailing_newlines_are_tolerated() {
        let urls = vec!["https://only.example".to_string()];
        let report = format!("{}\n\n", append_sources("Body", "## Sources", &urls));
        assert_eq!(parse_sources(&report), urls);
    }
}
