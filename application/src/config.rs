//! Engine configuration — control loop parameters.
//!
//! [`EngineConfig`] groups the static parameters that control the run loop
//! in [`RunWorkflowUseCase`](crate::use_cases::run_workflow::RunWorkflowUseCase).
//! These are application-layer concerns, not domain policy; the file-level
//! configuration model lives in the infrastructure layer and converts into
//! this type.

use serde::{Deserialize, Serialize};
use webpilot_domain::{TaskIntent, Variable, Viewport};

/// Which model an adapter should use for each engine role.
///
/// Free-form names; adapters interpret them. Planning and error analysis
/// default to the stronger tier, everything else to the fast tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRoles {
    pub planner: String,
    pub executor: String,
    pub evaluator: String,
    pub error_handler: String,
    pub summarizer: String,
}

impl Default for ModelRoles {
    fn default() -> Self {
        Self {
            planner: "large".to_string(),
            executor: "fast".to_string(),
            evaluator: "fast".to_string(),
            error_handler: "large".to_string(),
            summarizer: "fast".to_string(),
        }
    }
}

/// Run loop control parameters.
///
/// Controls retries, timeouts, replanning budgets, early exit, and the
/// browser session shape. Used by RunWorkflowUseCase and its helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum retries per task before it fails terminally.
    pub max_retries: u32,
    /// Per-task execution timeout in milliseconds.
    pub task_timeout_ms: u64,
    /// Whole-run timeout in milliseconds; callers enforce it through the
    /// cancellation token, the engine honors cancellation.
    pub workflow_timeout_ms: u64,
    /// Whether failures and page drift may trigger a replan.
    pub enable_replanning: bool,
    /// Whether the run may stop early once the completion floor is reached.
    pub allow_early_exit: bool,
    /// Completion percentage required before an early exit (0..=100).
    pub min_acceptable_completion: u8,
    /// Steps that must succeed before an early exit, matched by step id,
    /// `step-{order}`, or case-insensitive substring of the description.
    pub critical_steps: Vec<String>,
    /// Replans allowed for any single step.
    pub max_replans_per_step: u32,
    /// Replans allowed across the whole run.
    pub max_total_replans: u32,
    /// Concrete intent used when a strategic intent has no mapping.
    pub unknown_intent_fallback: TaskIntent,
    /// Run the browser without a visible window.
    pub headless: bool,
    pub viewport: Viewport,
    /// Variables available for interpolation, secrets included.
    pub variables: Vec<Variable>,
    pub models: ModelRoles,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            task_timeout_ms: 30_000,
            workflow_timeout_ms: 300_000,
            enable_replanning: true,
            allow_early_exit: false,
            min_acceptable_completion: 60,
            critical_steps: Vec::new(),
            max_replans_per_step: 2,
            max_total_replans: 5,
            unknown_intent_fallback: TaskIntent::Click,
            headless: true,
            viewport: Viewport::default(),
            variables: Vec::new(),
            models: ModelRoles::default(),
        }
    }
}

impl EngineConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_task_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.task_timeout_ms = timeout_ms;
        self
    }

    pub fn with_replanning(mut self, enabled: bool) -> Self {
        self.enable_replanning = enabled;
        self
    }

    pub fn with_early_exit(mut self, enabled: bool) -> Self {
        self.allow_early_exit = enabled;
        self
    }

    pub fn with_min_acceptable_completion(mut self, percentage: u8) -> Self {
        self.min_acceptable_completion = percentage.min(100);
        self
    }

    pub fn with_critical_steps(mut self, steps: Vec<String>) -> Self {
        self.critical_steps = steps;
        self
    }

    pub fn with_replan_budget(mut self, per_step: u32, total: u32) -> Self {
        self.max_replans_per_step = per_step;
        self.max_total_replans = total;
        self
    }

    pub fn with_unknown_intent_fallback(mut self, intent: TaskIntent) -> Self {
        self.unknown_intent_fallback = intent;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.task_timeout_ms, 30_000);
        assert_eq!(config.workflow_timeout_ms, 300_000);
        assert!(config.enable_replanning);
        assert!(!config.allow_early_exit);
        assert_eq!(config.min_acceptable_completion, 60);
        assert!(config.critical_steps.is_empty());
        assert_eq!(config.max_replans_per_step, 2);
        assert_eq!(config.max_total_replans, 5);
        assert_eq!(config.unknown_intent_fallback, TaskIntent::Click);
        assert!(config.headless);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_max_retries(5)
            .with_replanning(false)
            .with_early_exit(true)
            .with_min_acceptable_completion(80)
            .with_replan_budget(1, 3);

        assert_eq!(config.max_retries, 5);
        assert!(!config.enable_replanning);
        assert!(config.allow_early_exit);
        assert_eq!(config.min_acceptable_completion, 80);
        assert_eq!(config.max_replans_per_step, 1);
        assert_eq!(config.max_total_replans, 3);
    }

    #[test]
    fn test_completion_floor_is_capped() {
        let config = EngineConfig::default().with_min_acceptable_completion(250);
        assert_eq!(config.min_acceptable_completion, 100);
    }

    #[test]
    fn test_default_model_roles() {
        let roles = ModelRoles::default();
        assert_eq!(roles.planner, "large");
        assert_eq!(roles.executor, "fast");
    }
}
