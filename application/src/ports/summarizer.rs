//! Run summary port
//!
//! Optional narrative summary of a finished run. Failures here never
//! affect the workflow result; the engine falls back to no summary.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during summarization
#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error("Summary request failed: {0}")]
    RequestFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Everything worth summarizing about a finished run.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub goal: String,
    pub status: String,
    pub completion_percentage: u8,
    pub step_summaries: Vec<String>,
    pub extracted_data: serde_json::Value,
    pub errors: Vec<String>,
}

/// Summarizer for finished runs
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait RunSummarizer: Send + Sync {
    /// Produce a short narrative of what the run accomplished
    async fn summarize(&self, request: SummaryRequest) -> Result<String, SummarizerError>;
}
