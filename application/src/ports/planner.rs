//! Strategic planning port
//!
//! Defines the interface for turning a goal into an ordered strategy.
//! Implementations (adapters) live in the infrastructure layer; the
//! reference adapter scripts strategies for dry runs, a production
//! adapter would prompt a model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use webpilot_domain::{Confidence, PageState, Priority, StrategicIntent, TaskIntent};

/// Errors that can occur during planning operations
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Planning request failed: {0}")]
    RequestFailed(String),

    #[error("Strategy could not be parsed: {0}")]
    InvalidStrategy(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// A concrete action the planner proposes inside a step.
///
/// Intent is optional on purpose: planners may describe an action without
/// committing to a concrete verb, in which case the step's strategic intent
/// (or the configured fallback) decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub description: String,
    #[serde(default)]
    pub intent: Option<TaskIntent>,
    /// Selector expression in `css:`/`xpath:`/`index:` form
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub input_value: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl PlannedTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            intent: None,
            target: None,
            input_value: None,
            url: None,
            priority: Priority::default(),
        }
    }

    pub fn with_intent(mut self, intent: TaskIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_input(mut self, value: impl Into<String>) -> Self {
        self.input_value = Some(value.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// One strategic step of a proposed strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicStep {
    pub description: String,
    pub intent: StrategicIntent,
    pub confidence: Confidence,
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

impl StrategicStep {
    pub fn new(description: impl Into<String>, intent: StrategicIntent) -> Self {
        Self {
            description: description.into(),
            intent,
            confidence: Confidence::default(),
            tasks: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_task(mut self, task: PlannedTask) -> Self {
        self.tasks.push(task);
        self
    }
}

/// An ordered strategy as the planner proposes it, before it becomes a
/// validated domain plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub objective: String,
    pub steps: Vec<StrategicStep>,
}

impl Strategy {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: StrategicStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Context handed to the planner for the initial strategy.
#[derive(Debug, Clone)]
pub struct PlanningRequest {
    pub goal: String,
    pub current_state: Option<PageState>,
    /// Prior learnings for this site and goal, pre-rendered as prompt text
    pub memory_prompt: String,
    /// Names of available variables (values never leave the vault here)
    pub variable_names: Vec<String>,
}

/// Context handed to the planner when the current plan must be replaced.
#[derive(Debug, Clone)]
pub struct ReplanRequest {
    pub goal: String,
    pub failed_step: Option<String>,
    pub failure_reason: Option<String>,
    pub current_state: Option<PageState>,
    /// Descriptions of steps already done; the planner must not repeat them
    pub completed_steps: Vec<String>,
    pub memory_prompt: String,
}

impl ReplanRequest {
    /// Renders the replan context as prompt text: what failed, where the
    /// page stands, and an explicit do-not-repeat list.
    pub fn as_prompt(&self) -> String {
        let mut prompt = format!("Goal: {}\n", self.goal);
        if let Some(step) = &self.failed_step {
            prompt.push_str(&format!("Failed step: {}\n", step));
        }
        if let Some(reason) = &self.failure_reason {
            prompt.push_str(&format!("Failure reason: {}\n", reason));
        }
        if let Some(state) = &self.current_state {
            prompt.push_str(&format!("Current page: {}\n", state.summary()));
            if !state.available_actions.is_empty() {
                prompt.push_str(&format!(
                    "Available actions: {}\n",
                    state.available_actions.join(", ")
                ));
            }
        }
        if !self.completed_steps.is_empty() {
            prompt.push_str("Already completed (do NOT repeat these):\n");
            for step in &self.completed_steps {
                prompt.push_str(&format!("- {}\n", step));
            }
        }
        prompt.push_str(&self.memory_prompt);
        prompt
    }
}

/// Planner for strategy creation and revision
///
/// This port defines how the engine obtains strategies. Implementations
/// (adapters) live in the infrastructure layer.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Create the initial strategy for a goal
    async fn create_strategy(&self, request: PlanningRequest) -> Result<Strategy, PlannerError>;

    /// Revise the strategy after a failure or a significant page change
    async fn revise_strategy(&self, request: ReplanRequest) -> Result<Strategy, PlannerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replan_prompt_lists_completed_steps() {
        let request = ReplanRequest {
            goal: "buy a cable".to_string(),
            failed_step: Some("open checkout".to_string()),
            failure_reason: Some("button not found".to_string()),
            current_state: None,
            completed_steps: vec!["search for cable".to_string(), "open product".to_string()],
            memory_prompt: String::new(),
        };

        let prompt = request.as_prompt();
        assert!(prompt.contains("Failed step: open checkout"));
        assert!(prompt.contains("do NOT repeat"));
        assert!(prompt.contains("- search for cable"));
        assert!(prompt.contains("- open product"));
    }

    #[test]
    fn test_strategy_builder() {
        let strategy = Strategy::new("find the docs").with_step(
            StrategicStep::new("search", StrategicIntent::Search)
                .with_task(PlannedTask::new("type query").with_intent(TaskIntent::Type)),
        );

        assert!(!strategy.is_empty());
        assert_eq!(strategy.steps[0].tasks.len(), 1);
    }
}
