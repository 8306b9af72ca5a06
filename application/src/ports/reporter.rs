//! Run progress port.
//!
//! [`AgentReporter`] is an **output port** that the presentation layer
//! implements to narrate a run to the user. The engine never writes to
//! stdout directly; everything user-facing goes through this trait.
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

/// Progress reporter for workflow execution.
pub trait AgentReporter: Send + Sync {
    /// Free-form progress line
    fn info(&self, _message: &str) {}

    /// Something succeeded
    fn success(&self, _message: &str) {}

    /// Something failed
    fn failure(&self, _message: &str) {}

    /// Something is off but the run continues
    fn warning(&self, _message: &str) {}

    /// A long operation started (spinner-worthy)
    fn loading(&self, _message: &str) {}

    /// Low-level detail, shown only in verbose UIs
    fn log(&self, _message: &str) {}

    // ==================== Lifecycle Callbacks ====================

    /// Called when the workflow starts
    fn on_workflow_started(&self, _goal: &str, _url: &str) {}

    /// Called when a strategy has been turned into a plan
    fn on_plan_created(&self, _step_count: usize, _revision: u32) {}

    /// Called when a step begins
    fn on_step_started(&self, _order: u32, _total: usize, _description: &str) {}

    /// Called when a step finishes (success or failure)
    fn on_step_finished(&self, _order: u32, _success: bool) {}

    /// Called when a task begins execution
    fn on_task_started(&self, _description: &str) {}

    /// Called when a task is retried after a failure
    fn on_task_retry(&self, _description: &str, _attempt: u32, _max_retries: u32) {}

    /// Called when the engine decides to replan
    fn on_replan(&self, _reason: &str, _total_replans: u32) {}

    /// Called when the workflow finishes, before the result is returned
    fn on_workflow_finished(&self, _status: &str, _completion_percentage: u8) {}
}

/// No-op reporter for headless or embedded use
pub struct NullReporter;

impl AgentReporter for NullReporter {}
