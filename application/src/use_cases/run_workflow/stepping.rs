//! Step execution methods for the RunWorkflow use case.
//!
//! Drains one step's tasks off the queue and walks each through the
//! attempt ladder: perceive, execute under a timeout, evaluate, then
//! complete or retry. The plan's copy of every task is authoritative for
//! status and events; the queue's clone only decides ordering and is
//! discarded once the next task is identified.

use super::RunWorkflowUseCase;
use super::types::WorkflowError;
use crate::memory::MemoryService;
use crate::ports::browser::Browser;
use crate::ports::evaluator::{EvaluationRequest, StepEvaluator};
use crate::ports::executor::{ExecutorOutcome, TaskExecutionRequest, TaskExecutor};
use crate::ports::perception::DomService;
use crate::ports::planner::Planner;
use crate::ports::reporter::AgentReporter;
use crate::state::StateManager;
use crate::use_cases::shared::check_cancelled;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use webpilot_domain::{
    DomainError, ExecutionAggregate, ExecutionResult, MemoryContext, PageState, StepId, Task,
    TaskId, TaskOutcome, TaskQueue, WorkflowAggregate,
};

/// How one step ended. Failures here are recoverable: the run loop
/// decides whether to replan, not whether to abort.
pub(super) enum StepOutcome {
    /// Every task finished and the step is marked complete
    Completed,
    /// A task exhausted its retries; the step is marked failed
    Failed { reason: String },
    /// A successful task changed the page so much that the step's
    /// remaining tasks no longer fit it; the step is left in flight
    Drifted,
}

/// Mutable run state threaded through step execution.
///
/// Bundled so the borrow story stays one `&mut` wide instead of six.
pub(super) struct RunState<D: DomService> {
    pub aggregate: WorkflowAggregate,
    pub queue: TaskQueue,
    pub execution: ExecutionAggregate,
    pub state_manager: StateManager<D>,
    pub memory: MemoryService,
    pub memory_context: MemoryContext,
}

impl<P, X, E, B, D> RunWorkflowUseCase<P, X, E, B, D>
where
    P: Planner + 'static,
    X: TaskExecutor + 'static,
    E: StepEvaluator + 'static,
    B: Browser + 'static,
    D: DomService + 'static,
{
    /// Runs every task of one step, in dependency order.
    ///
    /// A task failure consumes retries first; only when they are exhausted
    /// does the step fail, and even then this returns `Ok(Failed)` rather
    /// than an error. Cancellation is the exception: it propagates as
    /// [`WorkflowError::Cancelled`] so the loop can unwind immediately.
    pub(super) async fn run_step(
        &self,
        step_id: &StepId,
        run: &mut RunState<D>,
        reporter: &dyn AgentReporter,
    ) -> Result<StepOutcome, WorkflowError> {
        let goal = run.aggregate.workflow().goal.clone();
        let (step_order, step_description) = {
            let step = run.aggregate.step_mut(step_id)?;
            (step.order, step.description.clone())
        };
        // The page as it stood when the step began; evaluation compares
        // every attempt against this baseline.
        let before_state = run.state_manager.current_state().cloned();

        while let Some(next) = run.queue.dequeue_for_step(step_id) {
            let task_id = next.id;

            if let Some(reason) = self
                .run_task_attempts(
                    step_id,
                    &task_id,
                    &goal,
                    &step_description,
                    before_state.as_ref(),
                    run,
                    reporter,
                )
                .await?
            {
                let step = run.aggregate.step_mut(step_id)?;
                step.fail(&reason)?;
                reporter.on_step_finished(step_order, false);
                return Ok(StepOutcome::Failed { reason });
            }

            // Drift check after each task: if the page moved significantly,
            // the rest of this step was planned against a page that no
            // longer exists. When this was the step's last task, let the
            // step complete and leave drift handling to the run loop.
            if self.config.enable_replanning
                && run.state_manager.has_state_changed()
                && self.step_has_pending_tasks(step_id, run)
            {
                debug!(step = step_order, "page drifted mid-step");
                return Ok(StepOutcome::Drifted);
            }
        }

        let step = run.aggregate.step_mut(step_id)?;
        step.complete()?;
        run.execution.context_mut().record_step_completed();
        run.state_manager.checkpoint(format!("step-{step_order}"));
        reporter.on_step_finished(step_order, true);
        debug!(step = step_order, "step completed");
        Ok(StepOutcome::Completed)
    }

    /// Runs one task until it completes or its retries run out.
    ///
    /// Returns `Ok(None)` on success, `Ok(Some(reason))` when the task
    /// failed terminally.
    #[allow(clippy::too_many_arguments)]
    async fn run_task_attempts(
        &self,
        step_id: &StepId,
        task_id: &TaskId,
        goal: &str,
        step_description: &str,
        before_state: Option<&PageState>,
        run: &mut RunState<D>,
        reporter: &dyn AgentReporter,
    ) -> Result<Option<String>, WorkflowError> {
        loop {
            check_cancelled(&self.cancellation_token)?;

            let task = {
                let step = run.aggregate.step_mut(step_id)?;
                let task = step
                    .task_mut(task_id)
                    .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))?;
                task.start()?;
                task.clone()
            };

            reporter.on_task_started(&task.description);
            if let Some(health) = &self.health {
                health.record_task_started(&run.aggregate.workflow().id, task_id);
            }

            let request = self.build_execution_request(&task, run);
            let timeout = Duration::from_millis(task.timeout.as_millis());
            let started = Instant::now();

            let mut outcome = match tokio::time::timeout(timeout, self.executor.execute(request))
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(task = %task_id, "executor failed: {e}");
                    ExecutorOutcome::failure(e.to_string())
                }
                Err(_) => {
                    // A timed-out task is handled exactly like a failed one,
                    // after leaving its own mark in the event stream.
                    let step = run.aggregate.step_mut(step_id)?;
                    if let Some(task) = step.task_mut(task_id) {
                        task.mark_timed_out();
                    }
                    ExecutorOutcome::failure(format!(
                        "timed out after {}ms",
                        task.timeout.as_millis()
                    ))
                }
            };
            let duration_ms = if outcome.duration_ms > 0 {
                outcome.duration_ms
            } else {
                started.elapsed().as_millis() as u64
            };

            // Observe what the action changed. Extraction already carries
            // its payload, so a fresh perceive would only add latency.
            if outcome.extracted_data.is_none()
                && let Err(e) = run.state_manager.capture_state().await
            {
                warn!("post-task perception failed: {e}");
            }
            if let Some(state) = run.state_manager.current_state() {
                run.execution.context_mut().update_url(state.url.clone());
                run.execution.context_mut().update_state(state.clone());
            }

            // A second opinion on "success": the executor judges its own
            // action, the evaluator judges the page.
            if outcome.success {
                self.apply_verdict(&mut outcome, goal, step_description, before_state, run)
                    .await;
            }

            let success = outcome.success;
            let error_text = outcome
                .error
                .clone()
                .unwrap_or_else(|| "task failed without a reason".to_string());
            self.record_attempt(&task, outcome, duration_ms, run);

            if success {
                {
                    let step = run.aggregate.step_mut(step_id)?;
                    let task = step
                        .task_mut(task_id)
                        .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))?;
                    task.complete()?;
                }
                run.queue.mark_completed(task_id);
                if let Some(health) = &self.health {
                    health.record_task_finished(&run.aggregate.workflow().id, true);
                }
                run.memory
                    .learn_from_success(&run.memory_context, &task.description)
                    .await;
                return Ok(None);
            }

            if let Some(health) = &self.health {
                health.record_task_finished(&run.aggregate.workflow().id, false);
            }
            run.memory
                .learn_from_failure(&run.memory_context, &task.description, &error_text, None)
                .await;

            let step = run.aggregate.step_mut(step_id)?;
            let task = step
                .task_mut(task_id)
                .ok_or_else(|| DomainError::TaskNotFound(task_id.to_string()))?;
            if task.can_retry() {
                task.record_retry(&error_text)?;
                let attempt = task.retry_count;
                let max_retries = task.max_retries;
                let description = task.description.clone();
                reporter.on_task_retry(&description, attempt, max_retries);
                debug!(task = %task_id, attempt, "retrying task");
                continue;
            }

            task.fail(&error_text)?;
            run.queue.mark_failed(task_id, &error_text);
            return Ok(Some(error_text));
        }
    }

    fn step_has_pending_tasks(&self, step_id: &StepId, run: &RunState<D>) -> bool {
        run.queue
            .ready_tasks()
            .iter()
            .any(|task| &task.step_id == step_id)
            || run
                .queue
                .blocked_tasks()
                .iter()
                .any(|(task, _)| &task.step_id == step_id)
    }

    /// Assembles the full perception context for one attempt.
    ///
    /// This is where `{{name}}` placeholders in the task's input resolve
    /// to raw values: the request goes straight to the one component
    /// allowed to type them into the page. Everything else in the system
    /// (plan, events, logs, prompts) keeps the redacted placeholders.
    fn build_execution_request(&self, task: &Task, run: &RunState<D>) -> TaskExecutionRequest {
        let snapshot = run.state_manager.last_snapshot();
        let vault = &run.aggregate.workflow().variables;
        let variables: HashMap<String, String> = vault
            .iter()
            .map(|variable| (variable.name().to_string(), variable.dangerous_value().to_string()))
            .collect();

        let mut task = task.clone();
        if let Some(input) = task.input_value.take() {
            task.input_value = Some(vault.interpolate_dangerously(&input));
        }

        TaskExecutionRequest {
            task,
            pristine_screenshot: snapshot.and_then(|s| s.pristine_screenshot.clone()),
            highlighted_screenshot: snapshot.and_then(|s| s.highlighted_screenshot.clone()),
            dom_summary: snapshot.map(|s| s.dom_summary()).unwrap_or_default(),
            memory_prompt: run.memory.memory_prompt(&run.memory_context),
            variables,
        }
    }

    /// Lets the evaluator overturn an executor-reported success.
    ///
    /// The evaluator's port being down is not a verdict: on error the
    /// executor's own judgement stands.
    async fn apply_verdict(
        &self,
        outcome: &mut ExecutorOutcome,
        goal: &str,
        step_description: &str,
        before_state: Option<&PageState>,
        run: &RunState<D>,
    ) {
        let request = EvaluationRequest {
            goal: goal.to_string(),
            step_description: step_description.to_string(),
            before: before_state.cloned(),
            after: run.state_manager.current_state().cloned(),
            extracted_data: outcome.extracted_data.clone(),
            task_errors: outcome.error.iter().cloned().collect(),
        };
        match self.evaluator.evaluate(request).await {
            Ok(evaluation) => {
                if !evaluation.passed {
                    debug!(reason = %evaluation.reason, "evaluator overturned success");
                    outcome.success = false;
                    outcome.error = Some(format!("evaluator: {}", evaluation.reason));
                }
            }
            Err(e) => {
                warn!("evaluation failed, trusting executor verdict: {e}");
            }
        }
    }

    /// Books the attempt into the execution aggregate and merges any
    /// extracted payload into the run's accumulated data.
    fn record_attempt(
        &self,
        task: &Task,
        outcome: ExecutorOutcome,
        duration_ms: u64,
        run: &mut RunState<D>,
    ) {
        let task_outcome = if outcome.success {
            match &outcome.extracted_data {
                Some(data) => TaskOutcome::success_with_data(data.clone(), duration_ms),
                None => TaskOutcome::success(duration_ms),
            }
        } else {
            TaskOutcome::failure(
                outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "task failed without a reason".to_string()),
                duration_ms,
            )
        };

        let mut result = ExecutionResult::new(task.id.clone(), task_outcome, task.retry_count);
        for evidence in outcome.evidence {
            result = result.with_evidence(evidence);
        }
        run.execution.record_execution(task.intent, result);

        if outcome.success
            && let Some(data) = &outcome.extracted_data
        {
            run.state_manager.merge_extracted_data(data);
        }
    }
}
