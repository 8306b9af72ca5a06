//! Domain events.
//!
//! Entities record events into internal buffers as they change; the
//! orchestration layer drains every buffer exactly once per run and
//! batch-publishes the union. Events are facts, never commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of event kinds the engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEventKind {
    WorkflowStarted,
    WorkflowCompleted,
    WorkflowFailed,
    PlanCreated,
    PlanReplaced,
    StepStarted,
    StepCompleted,
    StepFailed,
    TaskCreated,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskRetried,
    TaskTimedOut,
    SessionStarted,
    SessionEnded,
    PageNavigation,
    ElementInteraction,
    DataExtraction,
    ExecutionError,
}

impl DomainEventKind {
    /// Flat `category:event` name used by listeners and exports.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEventKind::WorkflowStarted => "workflow:started",
            DomainEventKind::WorkflowCompleted => "workflow:completed",
            DomainEventKind::WorkflowFailed => "workflow:failed",
            DomainEventKind::PlanCreated => "plan:created",
            DomainEventKind::PlanReplaced => "plan:replaced",
            DomainEventKind::StepStarted => "step:started",
            DomainEventKind::StepCompleted => "step:completed",
            DomainEventKind::StepFailed => "step:failed",
            DomainEventKind::TaskCreated => "task:created",
            DomainEventKind::TaskStarted => "task:started",
            DomainEventKind::TaskCompleted => "task:completed",
            DomainEventKind::TaskFailed => "task:failed",
            DomainEventKind::TaskRetried => "task:retried",
            DomainEventKind::TaskTimedOut => "task:timed_out",
            DomainEventKind::SessionStarted => "session:started",
            DomainEventKind::SessionEnded => "session:ended",
            DomainEventKind::PageNavigation => "execution:page_navigation",
            DomainEventKind::ElementInteraction => "execution:element_interaction",
            DomainEventKind::DataExtraction => "execution:data_extraction",
            DomainEventKind::ExecutionError => "execution:error",
        }
    }

    /// The part before the colon in [`name`](Self::name).
    pub fn category(&self) -> &'static str {
        match self {
            DomainEventKind::WorkflowStarted
            | DomainEventKind::WorkflowCompleted
            | DomainEventKind::WorkflowFailed => "workflow",
            DomainEventKind::PlanCreated | DomainEventKind::PlanReplaced => "plan",
            DomainEventKind::StepStarted
            | DomainEventKind::StepCompleted
            | DomainEventKind::StepFailed => "step",
            DomainEventKind::TaskCreated
            | DomainEventKind::TaskStarted
            | DomainEventKind::TaskCompleted
            | DomainEventKind::TaskFailed
            | DomainEventKind::TaskRetried
            | DomainEventKind::TaskTimedOut => "task",
            DomainEventKind::SessionStarted | DomainEventKind::SessionEnded => "session",
            DomainEventKind::PageNavigation
            | DomainEventKind::ElementInteraction
            | DomainEventKind::DataExtraction
            | DomainEventKind::ExecutionError => "execution",
        }
    }
}

impl std::fmt::Display for DomainEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An immutable record of something that happened to an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub kind: DomainEventKind,
    /// Per-entity monotonic sequence number, starting at 1.
    pub version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(
        aggregate_id: impl Into<String>,
        kind: DomainEventKind,
        version: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            aggregate_id: aggregate_id.into(),
            kind,
            version,
            occurred_at: Utc::now(),
            payload,
        }
    }
}
