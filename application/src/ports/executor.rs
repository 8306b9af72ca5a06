//! Task execution port
//!
//! Defines the interface for carrying out one concrete browser task.
//! The engine assembles the full perception context (screenshots, DOM
//! summary, memories, interpolated variables) before each call; the
//! adapter decides how to act on it.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use webpilot_domain::{Evidence, Task};

/// Errors that can occur during task execution
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Execution request failed: {0}")]
    RequestFailed(String),

    #[error("Action not supported: {0}")]
    UnsupportedAction(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Everything an executor needs to act on one task.
///
/// `variables` carries the raw (secret-revealing) values because the
/// executor is the component that ultimately types them into the page.
/// Everything that gets logged or prompted elsewhere uses the redacted
/// `{{name}}` placeholders instead.
#[derive(Debug, Clone)]
pub struct TaskExecutionRequest {
    pub task: Task,
    /// Screenshot without overlays, when perception captured one
    pub pristine_screenshot: Option<String>,
    /// Screenshot with interactive elements highlighted and indexed
    pub highlighted_screenshot: Option<String>,
    /// Text summary of the interactive DOM
    pub dom_summary: String,
    /// Prior learnings rendered as prompt text
    pub memory_prompt: String,
    /// Variable name -> raw value
    pub variables: HashMap<String, String>,
}

/// What happened when the executor acted.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOutcome {
    pub success: bool,
    pub extracted_data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub evidence: Vec<Evidence>,
    pub duration_ms: u64,
}

impl ExecutorOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn success_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            extracted_data: Some(data),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Executor for concrete browser tasks
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Perform the requested task and report what happened
    async fn execute(&self, request: TaskExecutionRequest) -> Result<ExecutorOutcome, ExecutorError>;
}
