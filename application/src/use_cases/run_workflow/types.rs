//! Type definitions for the RunWorkflow use case.

use crate::ports::browser::BrowserError;
use crate::ports::planner::PlannerError;
use serde::Serialize;
use thiserror::Error;
use webpilot_domain::{DomainError, PageUrl, WorkflowId};

/// Errors that can abort a workflow run.
///
/// These are the fatal cases only: everything recoverable (task failures,
/// replans, telemetry faults) is absorbed into the [`WorkflowResult`]
/// instead of surfacing here. Callers inspect `result.status`, not a catch
/// block, for partial failure.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Planner returned an empty strategy")]
    EmptyStrategy,

    #[error("Planning failed: {0}")]
    PlanningFailed(#[from] PlannerError),

    #[error("Browser error: {0}")]
    BrowserFailed(#[from] BrowserError),

    #[error("Domain invariant violated: {0}")]
    Domain(#[from] DomainError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl WorkflowError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled)
    }
}

/// Input for the RunWorkflow use case
#[derive(Debug, Clone)]
pub struct RunWorkflowInput {
    /// The user's goal in natural language
    pub goal: String,
    /// Where the browser session starts
    pub start_url: PageUrl,
}

impl RunWorkflowInput {
    pub fn new(goal: impl Into<String>, start_url: PageUrl) -> Self {
        Self {
            goal: goal.into(),
            start_url,
        }
    }
}

/// Final status of a run, graded rather than binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every step succeeded
    Success,
    /// At least half of the steps succeeded
    Partial,
    /// Under half, but enough succeeded to be worth returning
    Degraded,
    /// Nothing useful happened
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Degraded => "degraded",
            RunStatus::Failure => "failure",
        }
    }

    /// Grades a finished run.
    ///
    /// Full completion is success; at least half the steps is partial; under
    /// half but with two or more successes is degraded. Only a run with
    /// almost nothing to show for itself is a failure.
    pub fn determine(completion_percentage: u8, successful_steps: usize) -> Self {
        if completion_percentage >= 100 {
            RunStatus::Success
        } else if completion_percentage >= 50 {
            RunStatus::Partial
        } else if successful_steps >= 2 {
            RunStatus::Degraded
        } else {
            RunStatus::Failure
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the per-step outcome table.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub order: u32,
    pub description: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Output from the RunWorkflow use case
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub workflow_id: WorkflowId,
    pub goal: String,
    pub status: RunStatus,
    /// Successful steps over planned steps, 0..=100
    pub completion_percentage: u8,
    /// Everything extracted during the run, deep-merged
    pub extracted_data: serde_json::Value,
    /// Terminal errors only; transient retries do not appear here
    pub errors: Vec<String>,
    pub steps: Vec<StepSummary>,
    pub replans: u32,
    pub duration_ms: u64,
    /// The run stopped at the configured completion floor
    pub early_exit: bool,
    /// Narrative from the summarizer, when one is configured
    pub summary: Option<String>,
}

impl WorkflowResult {
    /// `true` when the run is worth treating as accomplished: full success
    /// or a partial that cleared the 50% floor.
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Success | RunStatus::Partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_grading() {
        assert_eq!(RunStatus::determine(100, 4), RunStatus::Success);
        assert_eq!(RunStatus::determine(50, 2), RunStatus::Partial);
        assert_eq!(RunStatus::determine(66, 2), RunStatus::Partial);
        assert_eq!(RunStatus::determine(40, 2), RunStatus::Degraded);
        assert_eq!(RunStatus::determine(25, 1), RunStatus::Failure);
        assert_eq!(RunStatus::determine(0, 0), RunStatus::Failure);
    }

    #[test]
    fn test_cancelled_detection() {
        assert!(WorkflowError::Cancelled.is_cancelled());
        assert!(!WorkflowError::EmptyStrategy.is_cancelled());
    }
}
