//! Workflow domain entities
//!
//! Entities own their lifecycle: status transitions are monotonic and
//! guarded (a completed workflow cannot restart), and every transition
//! records a [`DomainEvent`] into the entity's buffer. Buffers are drained
//! exactly once per run by the orchestration layer via `take_events()`.

use super::value_objects::{
    Confidence, ElementSelector, PageUrl, PlanId, Priority, RetryPolicy, SessionId, StepId,
    StrategicIntent, TaskId, TaskIntent, Timeout, Viewport, WorkflowId,
};
use super::variables::VariableVault;
use crate::core::error::DomainError;
use crate::event::{DomainEvent, DomainEventKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created but not yet started
    #[default]
    Pending,
    /// Control loop is executing
    Running,
    /// Finished, result determined
    Completed,
    /// Aborted by a fatal error
    Failed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Running => "running",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

/// Status of a strategic step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

/// Status of a concrete browser task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be dequeued
    #[default]
    Pending,
    /// Currently executing in the browser
    Running,
    /// Failed at least once, waiting for the next attempt
    Retrying,
    /// Succeeded
    Completed,
    /// Failed with retries exhausted
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// A concrete browser action scheduled for execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,
    /// Step this task belongs to
    pub step_id: StepId,
    /// Concrete action to perform
    pub intent: TaskIntent,
    /// Human-readable description of what this task does
    pub description: String,
    /// Element the action targets (if any)
    pub target: Option<ElementSelector>,
    /// Text input, may contain `{{variable}}` placeholders
    pub input_value: Option<String>,
    /// Destination for navigate tasks
    pub url: Option<PageUrl>,
    /// Dequeue priority
    pub priority: Priority,
    /// Maximum retry attempts after the first failure
    pub max_retries: u32,
    /// Attempts consumed so far
    pub retry_count: u32,
    /// Per-attempt timeout
    pub timeout: Timeout,
    /// Current status
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
    #[serde(skip, default)]
    version: u32,
}

impl Task {
    pub fn new(
        step_id: StepId,
        intent: TaskIntent,
        description: impl Into<String>,
    ) -> Self {
        let mut task = Self {
            id: TaskId::generate(),
            step_id,
            intent,
            description: description.into(),
            target: None,
            input_value: None,
            url: None,
            priority: Priority::default(),
            max_retries: RetryPolicy::default().max_retries,
            retry_count: 0,
            timeout: Timeout::default(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            events: Vec::new(),
            version: 0,
        };
        task.record(
            DomainEventKind::TaskCreated,
            json!({
                "intent": task.intent.as_str(),
                "description": task.description,
            }),
        );
        task
    }

    pub fn with_target(mut self, target: ElementSelector) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_input(mut self, value: impl Into<String>) -> Self {
        self.input_value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: PageUrl) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Transitions to Running. Valid from Pending or Retrying.
    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Retrying => {
                self.status = TaskStatus::Running;
                self.record(
                    DomainEventKind::TaskStarted,
                    json!({ "attempt": self.retry_count + 1 }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, TaskStatus::Running)),
        }
    }

    /// Marks the task successfully completed.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Completed;
                self.record(DomainEventKind::TaskCompleted, json!({}));
                Ok(())
            }
            from => Err(self.invalid_transition(from, TaskStatus::Completed)),
        }
    }

    /// Terminal failure. Only valid once retries are exhausted.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.status = TaskStatus::Failed;
                self.record(
                    DomainEventKind::TaskFailed,
                    json!({
                        "reason": reason.into(),
                        "retry_count": self.retry_count,
                    }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, TaskStatus::Failed)),
        }
    }

    /// `true` while another attempt is allowed.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Consumes one retry: Running → Retrying, increments the counter.
    pub fn record_retry(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        match self.status {
            TaskStatus::Running => {
                self.retry_count += 1;
                self.status = TaskStatus::Retrying;
                self.record(
                    DomainEventKind::TaskRetried,
                    json!({
                        "retry_count": self.retry_count,
                        "reason": reason.into(),
                    }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, TaskStatus::Retrying)),
        }
    }

    /// Records that the current attempt hit its timeout. Does not change
    /// status; the caller decides between retry and terminal failure.
    pub fn mark_timed_out(&mut self) {
        self.record(
            DomainEventKind::TaskTimedOut,
            json!({ "timeout_ms": self.timeout.as_millis() }),
        );
    }

    /// Drains buffered events. Each event leaves the buffer exactly once.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.version += 1;
        self.events
            .push(DomainEvent::new(self.id.as_str(), kind, self.version, payload));
    }

    fn invalid_transition(&self, from: TaskStatus, to: TaskStatus) -> DomainError {
        DomainError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

/// A strategic step: one planner-level unit of progress toward the goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    /// 1-based position within the plan
    pub order: u32,
    /// What this step is supposed to achieve
    pub description: String,
    /// Planner-level intent
    pub intent: StrategicIntent,
    /// What the page should look like afterwards (planner's words)
    pub expected_outcome: Option<String>,
    /// Planner confidence in this step
    pub confidence: Confidence,
    /// Concrete tasks realizing the step
    pub tasks: Vec<Task>,
    pub status: StepStatus,
    /// Why the step failed, when it did
    pub failure_reason: Option<String>,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
    #[serde(skip, default)]
    version: u32,
}

impl Step {
    pub fn new(order: u32, description: impl Into<String>, intent: StrategicIntent) -> Self {
        Self {
            id: StepId::generate(),
            order,
            description: description.into(),
            intent,
            expected_outcome: None,
            confidence: Confidence::default(),
            tasks: Vec::new(),
            status: StepStatus::Pending,
            failure_reason: None,
            events: Vec::new(),
            version: 0,
        }
    }

    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = Some(outcome.into());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            StepStatus::Pending => {
                self.status = StepStatus::Running;
                self.record(
                    DomainEventKind::StepStarted,
                    json!({ "order": self.order, "description": self.description }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, StepStatus::Running)),
        }
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            StepStatus::Running => {
                self.status = StepStatus::Completed;
                self.record(DomainEventKind::StepCompleted, json!({ "order": self.order }));
                Ok(())
            }
            from => Err(self.invalid_transition(from, StepStatus::Completed)),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        match self.status {
            StepStatus::Running => {
                let reason = reason.into();
                self.status = StepStatus::Failed;
                self.failure_reason = Some(reason.clone());
                self.record(
                    DomainEventKind::StepFailed,
                    json!({ "order": self.order, "reason": reason }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, StepStatus::Failed)),
        }
    }

    /// `true` when every task finished and none failed terminally.
    pub fn all_tasks_succeeded(&self) -> bool {
        !self.tasks.is_empty()
            && self.tasks.iter().all(|t| t.status == TaskStatus::Completed)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.version += 1;
        self.events
            .push(DomainEvent::new(self.id.as_str(), kind, self.version, payload));
    }

    fn invalid_transition(&self, from: StepStatus, to: StepStatus) -> DomainError {
        DomainError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

/// An ordered set of steps produced by one planning pass.
///
/// A workflow replaces its plan on replan; `revision` counts planning passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub workflow_id: WorkflowId,
    pub steps: Vec<Step>,
    /// 1 for the initial plan, incremented on every replan
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self {
            id: PlanId::generate(),
            workflow_id,
            steps: Vec::new(),
            revision: 1,
            created_at: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn add_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// A valid plan has at least one step, ordered contiguously from 1.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.steps.is_empty() {
            return Err(DomainError::EmptyPlan);
        }
        for (idx, step) in self.steps.iter().enumerate() {
            let expected = idx as u32 + 1;
            if step.order != expected {
                return Err(DomainError::NonContiguousSteps {
                    expected,
                    found: step.order,
                });
            }
        }
        Ok(())
    }

    /// Next step that has not run yet, in plan order.
    pub fn next_pending_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Pending)
    }

    pub fn step_mut(&mut self, id: &StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| &s.id == id)
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// (terminal steps, total steps)
    pub fn progress(&self) -> (usize, usize) {
        let done = self.steps.iter().filter(|s| s.status.is_terminal()).count();
        (done, self.steps.len())
    }
}

/// The aggregate root: one goal-driven run against one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    /// The user's goal in natural language
    pub goal: String,
    /// Where the browser starts
    pub start_url: PageUrl,
    /// Run variables; secrets stay redacted outside the vault
    #[serde(skip, default)]
    pub variables: VariableVault,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
    #[serde(skip, default)]
    version: u32,
}

impl Workflow {
    pub fn new(goal: impl Into<String>, start_url: PageUrl) -> Self {
        Self {
            id: WorkflowId::generate(),
            goal: goal.into(),
            start_url,
            variables: VariableVault::new(),
            status: WorkflowStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            events: Vec::new(),
            version: 0,
        }
    }

    pub fn with_variables(mut self, variables: VariableVault) -> Self {
        self.variables = variables;
        self
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            WorkflowStatus::Pending => {
                self.status = WorkflowStatus::Running;
                self.started_at = Some(Utc::now());
                self.record(
                    DomainEventKind::WorkflowStarted,
                    json!({ "goal": self.goal, "start_url": self.start_url.as_str() }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, WorkflowStatus::Running)),
        }
    }

    pub fn complete(&mut self, completion_percentage: u8) -> Result<(), DomainError> {
        match self.status {
            WorkflowStatus::Running => {
                self.status = WorkflowStatus::Completed;
                self.ended_at = Some(Utc::now());
                self.record(
                    DomainEventKind::WorkflowCompleted,
                    json!({ "completion_percentage": completion_percentage }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, WorkflowStatus::Completed)),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        match self.status {
            WorkflowStatus::Running => {
                self.status = WorkflowStatus::Failed;
                self.ended_at = Some(Utc::now());
                self.record(
                    DomainEventKind::WorkflowFailed,
                    json!({ "reason": reason.into() }),
                );
                Ok(())
            }
            from => Err(self.invalid_transition(from, WorkflowStatus::Failed)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == WorkflowStatus::Running
    }

    /// Records a plan-level event against this aggregate. Used by the
    /// aggregate when plans are created or replaced.
    pub fn record_plan_event(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.record(kind, payload);
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.version += 1;
        self.events
            .push(DomainEvent::new(self.id.as_str(), kind, self.version, payload));
    }

    fn invalid_transition(&self, from: WorkflowStatus, to: WorkflowStatus) -> DomainError {
        DomainError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

/// One browser session backing a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub workflow_id: WorkflowId,
    pub headless: bool,
    pub viewport: Viewport,
    pub default_timeout: Timeout,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
    #[serde(skip, default)]
    version: u32,
}

impl Session {
    pub fn new(workflow_id: WorkflowId, headless: bool, viewport: Viewport) -> Self {
        let mut session = Self {
            id: SessionId::generate(),
            workflow_id,
            headless,
            viewport,
            default_timeout: Timeout::default(),
            started_at: Utc::now(),
            ended_at: None,
            events: Vec::new(),
            version: 0,
        };
        session.record(
            DomainEventKind::SessionStarted,
            json!({ "headless": headless, "viewport": viewport.to_string() }),
        );
        session
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Ends the session. Idempotent.
    pub fn end(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
            self.record(DomainEventKind::SessionEnded, json!({}));
        }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.version += 1;
        self.events
            .push(DomainEvent::new(self.id.as_str(), kind, self.version, payload));
    }
}
