//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Confidence must be between 0 and 100, got {0}")]
    InvalidConfidence(u32),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Viewport dimensions must be non-zero, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("Variable name must not be empty")]
    EmptyVariableName,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("A plan must contain at least one step")]
    EmptyPlan,

    #[error("Plan steps must be contiguous starting at 1: expected order {expected}, found {found}")]
    NonContiguousSteps { expected: u32, found: u32 },

    #[error("Workflow is not running")]
    WorkflowNotRunning,

    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::InvalidTransition {
            from: "completed".to_string(),
            to: "running".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid status transition from completed to running"
        );
    }

    #[test]
    fn test_empty_plan_display() {
        assert_eq!(
            DomainError::EmptyPlan.to_string(),
            "A plan must contain at least one step"
        );
    }
}
