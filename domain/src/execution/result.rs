//! Immutable execution records.
//!
//! Once recorded, a result is never mutated. Retries produce new results
//! with a higher `retry_attempt`, so the full history of an unreliable task
//! stays visible.

use crate::workflow::value_objects::{Confidence, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of proof the executor captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Screenshot,
    Element,
    Text,
    Html,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &str {
        match self {
            EvidenceKind::Screenshot => "screenshot",
            EvidenceKind::Element => "element",
            EvidenceKind::Text => "text",
            EvidenceKind::Html => "html",
        }
    }
}

/// A captured artifact supporting an execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    /// Reference or inline payload, depending on kind
    pub data: String,
    pub confidence: Option<Confidence>,
}

impl Evidence {
    pub fn new(kind: EvidenceKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// The outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    /// Data extracted during the attempt, if any
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn success(duration_ms: u64) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            duration_ms,
        }
    }

    pub fn success_with_data(data: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Immutable record of one task attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub outcome: TaskOutcome,
    pub evidence: Vec<Evidence>,
    /// 0 for the first attempt
    pub retry_attempt: u32,
    /// Free-form note from the executor ("clicked the second match")
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn new(task_id: TaskId, outcome: TaskOutcome, retry_attempt: u32) -> Self {
        Self {
            task_id,
            outcome,
            evidence: Vec::new(),
            retry_attempt,
            note: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.success
    }
}
