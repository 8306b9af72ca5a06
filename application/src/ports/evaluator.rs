//! Step evaluation port
//!
//! After a step's tasks have run, the evaluator judges whether the step
//! actually achieved what it set out to do, based on the before/after
//! page states.

use async_trait::async_trait;
use thiserror::Error;
use webpilot_domain::{Confidence, PageState};

/// Errors that can occur during evaluation
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Evaluation request failed: {0}")]
    RequestFailed(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Context for judging one completed step.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub goal: String,
    pub step_description: String,
    pub before: Option<PageState>,
    pub after: Option<PageState>,
    /// Data the executor extracted during the step, if any
    pub extracted_data: Option<serde_json::Value>,
    /// Errors the step's tasks hit along the way
    pub task_errors: Vec<String>,
}

/// The evaluator's verdict on a step.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub passed: bool,
    pub confidence: Confidence,
    pub reason: String,
}

impl Evaluation {
    pub fn passed(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            confidence: Confidence::default(),
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            confidence: Confidence::default(),
            reason: reason.into(),
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Evaluator for completed steps
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait StepEvaluator: Send + Sync {
    /// Judge whether the step achieved its intent
    async fn evaluate(&self, request: EvaluationRequest) -> Result<Evaluation, EvaluatorError>;
}
