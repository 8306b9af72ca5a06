//! Template summarizer — a fixed-format narrative, no model involved.

use async_trait::async_trait;
use webpilot_application::ports::summarizer::{RunSummarizer, SummarizerError, SummaryRequest};

/// [`RunSummarizer`] that renders the outcome as one short paragraph.
#[derive(Default)]
pub struct TemplateSummarizer;

impl TemplateSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RunSummarizer for TemplateSummarizer {
    async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizerError> {
        let done = request
            .step_summaries
            .iter()
            .filter(|line| line.ends_with(" [done]"))
            .count();
        let mut summary = format!(
            "\"{}\" finished with status {}: {} of {} steps done ({}% complete).",
            request.goal,
            request.status,
            done,
            request.step_summaries.len(),
            request.completion_percentage
        );
        if !request.extracted_data.is_null()
            && request.extracted_data != serde_json::json!({})
        {
            summary.push_str(" Data was extracted along the way.");
        }
        if !request.errors.is_empty() {
            summary.push_str(&format!(" Problems: {}.", request.errors.join("; ")));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_summary_counts_done_steps_and_lists_problems() {
        let request = SummaryRequest {
            goal: "Find cheap wireless headphones".to_string(),
            status: "partial".to_string(),
            completion_percentage: 67,
            step_summaries: vec![
                "1. Open the search page [done]".to_string(),
                "2. Search for wireless headphones [done]".to_string(),
                "3. Extract the first result [not done]".to_string(),
            ],
            extracted_data: json!({}),
            errors: vec!["step 3: element vanished".to_string()],
        };

        let summary = TemplateSummarizer::new().summarize(request).await.unwrap();
        assert!(summary.contains("2 of 3 steps done"));
        assert!(summary.contains("67% complete"));
        assert!(summary.contains("element vanished"));
        assert!(!summary.contains("Data was extracted"));
    }

    #[tokio::test]
    async fn test_summary_mentions_extracted_data() {
        let request = SummaryRequest {
            goal: "Read the price".to_string(),
            status: "success".to_string(),
            completion_percentage: 100,
            step_summaries: vec!["1. Read the price [done]".to_string()],
            extracted_data: json!({"price": "$29.99"}),
            errors: Vec::new(),
        };

        let summary = TemplateSummarizer::new().summarize(request).await.unwrap();
        assert!(summary.contains("1 of 1 steps done"));
        assert!(summary.contains("Data was extracted"));
    }
}
