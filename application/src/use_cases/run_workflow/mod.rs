//! Run Workflow use case
//!
//! The engine's control loop: turns one natural-language goal into a
//! plan→act→evaluate→adapt cycle against a live browser session.
//!
//! | Phase            | What happens                                        |
//! |------------------|-----------------------------------------------------|
//! | 1. Initializing  | Workflow/Session entities, browser launch, warm-up  |
//! | 2. Planning      | perceive page, invoke planner, build + enqueue plan |
//! | 3. ExecutingStep | run each step's tasks with retries and evaluation   |
//! | 4. Replanning    | failure or page drift: revise plan, keep going      |
//! | 5. Finalizing    | grade the run, flush events, tear everything down   |
//!
//! Only initialization problems abort the run: an invalid configuration, a
//! browser that will not launch, or a planner that cannot produce a single
//! step. Everything after that folds into the graded [`WorkflowResult`] —
//! callers inspect `status` and `errors`, not a catch block. Teardown
//! (browser close, queue clear, event flush) runs on every exit path.

mod planning;
mod stepping;
mod types;

pub use types::{RunStatus, RunWorkflowInput, StepSummary, WorkflowError, WorkflowResult};

use crate::config::EngineConfig;
use crate::events::{RecoveryAction, WorkflowEventBus, WorkflowHealthMonitor, WorkflowSaga};
use crate::memory::MemoryService;
use crate::ports::browser::Browser;
use crate::ports::evaluator::StepEvaluator;
use crate::ports::executor::TaskExecutor;
use crate::ports::perception::DomService;
use crate::ports::planner::{Planner, PlanningRequest, ReplanRequest};
use crate::ports::reporter::{AgentReporter, NullReporter};
use crate::ports::repositories::{MemoryRepository, PlanRepository, WorkflowRepository};
use crate::ports::summarizer::{RunSummarizer, SummaryRequest};
use crate::state::StateManager;
use crate::use_cases::shared::check_cancelled;
use std::sync::Arc;
use std::time::Instant;
use stepping::{RunState, StepOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webpilot_domain::{
    ExecutionAggregate, ExecutionContext, MemoryContext, Session, Step, StepId, StepStatus,
    TaskQueue, VariableVault, Workflow, WorkflowAggregate,
};

/// Use case for running one workflow end to end
pub struct RunWorkflowUseCase<
    P: Planner + 'static,
    X: TaskExecutor + 'static,
    E: StepEvaluator + 'static,
    B: Browser + 'static,
    D: DomService + 'static,
> {
    pub(super) planner: Arc<P>,
    pub(super) executor: Arc<X>,
    pub(super) evaluator: Arc<E>,
    pub(super) browser: Arc<B>,
    pub(super) dom: Arc<D>,
    pub(super) config: EngineConfig,
    pub(super) bus: Arc<WorkflowEventBus>,
    pub(super) summarizer: Option<Arc<dyn RunSummarizer>>,
    pub(super) workflow_repository: Option<Arc<dyn WorkflowRepository>>,
    pub(super) plan_repository: Option<Arc<dyn PlanRepository>>,
    pub(super) memory_repository: Option<Arc<dyn MemoryRepository>>,
    pub(super) health: Option<Arc<WorkflowHealthMonitor>>,
    pub(super) saga: Option<Arc<WorkflowSaga>>,
    pub(super) cancellation_token: Option<CancellationToken>,
}

impl<P, X, E, B, D> Clone for RunWorkflowUseCase<P, X, E, B, D>
where
    P: Planner + 'static,
    X: TaskExecutor + 'static,
    E: StepEvaluator + 'static,
    B: Browser + 'static,
    D: DomService + 'static,
{
    fn clone(&self) -> Self {
        Self {
            planner: self.planner.clone(),
            executor: self.executor.clone(),
            evaluator: self.evaluator.clone(),
            browser: self.browser.clone(),
            dom: self.dom.clone(),
            config: self.config.clone(),
            bus: self.bus.clone(),
            summarizer: self.summarizer.clone(),
            workflow_repository: self.workflow_repository.clone(),
            plan_repository: self.plan_repository.clone(),
            memory_repository: self.memory_repository.clone(),
            health: self.health.clone(),
            saga: self.saga.clone(),
            cancellation_token: self.cancellation_token.clone(),
        }
    }
}

/// Terminal tasks are evicted from the queue on this enqueue cadence.
const CLEANUP_EVERY_ENQUEUES: u64 = 50;

/// Why the execution loop stopped handing out steps.
enum LoopExit {
    /// No pending steps remain
    Exhausted,
    /// The completion floor was reached with all critical steps done
    EarlyExit,
}

impl<P, X, E, B, D> RunWorkflowUseCase<P, X, E, B, D>
where
    P: Planner + 'static,
    X: TaskExecutor + 'static,
    E: StepEvaluator + 'static,
    B: Browser + 'static,
    D: DomService + 'static,
{
    pub fn new(
        planner: Arc<P>,
        executor: Arc<X>,
        evaluator: Arc<E>,
        browser: Arc<B>,
        dom: Arc<D>,
    ) -> Self {
        Self {
            planner,
            executor,
            evaluator,
            browser,
            dom,
            config: EngineConfig::default(),
            bus: Arc::new(WorkflowEventBus::new()),
            summarizer: None,
            workflow_repository: None,
            plan_repository: None,
            memory_repository: None,
            health: None,
            saga: None,
            cancellation_token: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default (handler-less) event bus with a prepared one
    pub fn with_event_bus(mut self, bus: Arc<WorkflowEventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn RunSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_workflow_repository(mut self, repository: Arc<dyn WorkflowRepository>) -> Self {
        self.workflow_repository = Some(repository);
        self
    }

    pub fn with_plan_repository(mut self, repository: Arc<dyn PlanRepository>) -> Self {
        self.plan_repository = Some(repository);
        self
    }

    /// Back cross-run learnings with durable storage
    pub fn with_memory_repository(mut self, repository: Arc<dyn MemoryRepository>) -> Self {
        self.memory_repository = Some(repository);
        self
    }

    pub fn with_health_monitor(mut self, health: Arc<WorkflowHealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_saga(mut self, saga: Arc<WorkflowSaga>) -> Self {
        self.saga = Some(saga);
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute the workflow without progress reporting
    pub async fn execute(&self, input: RunWorkflowInput) -> Result<WorkflowResult, WorkflowError> {
        self.execute_with_reporter(input, &NullReporter).await
    }

    /// Execute the workflow with progress callbacks
    pub async fn execute_with_reporter(
        &self,
        input: RunWorkflowInput,
        reporter: &dyn AgentReporter,
    ) -> Result<WorkflowResult, WorkflowError> {
        // Check for cancellation before touching anything
        check_cancelled(&self.cancellation_token)?;
        self.validate_config()?;

        info!("Starting workflow for goal: {}", input.goal);
        let started = Instant::now();

        // ==================== Phase 1: Initializing ====================
        let mut vault = VariableVault::new();
        for variable in &self.config.variables {
            vault.insert(variable.clone());
        }
        let workflow = Workflow::new(&input.goal, input.start_url.clone()).with_variables(vault);
        let workflow_id = workflow.id.clone();
        let session = Session::new(workflow_id.clone(), self.config.headless, self.config.viewport);

        // The browser is the last fatal hurdle; if it will not launch
        // there is nothing to tear down yet.
        self.browser.launch(&input.start_url).await?;

        let mut aggregate = WorkflowAggregate::new(workflow);
        aggregate.workflow_mut().start()?;
        reporter.on_workflow_started(&input.goal, input.start_url.as_str());

        if let Some(repository) = &self.workflow_repository
            && let Err(e) = repository.save(aggregate.workflow()).await
        {
            warn!("workflow save failed: {e}");
        }
        if let Some(health) = &self.health {
            health.register(&workflow_id);
        }

        let mut memory = match &self.memory_repository {
            Some(repository) => MemoryService::new().with_repository(repository.clone()),
            None => MemoryService::new(),
        };
        memory.warm_up().await;

        let memory_context = MemoryContext::new(input.start_url.hostname(), &input.goal);
        let mut execution = ExecutionAggregate::new(ExecutionContext::new(
            workflow_id.clone(),
            self.config.viewport,
        ));
        execution.context_mut().update_url(input.start_url.as_str());

        let mut run = RunState {
            aggregate,
            queue: TaskQueue::new(),
            execution,
            state_manager: StateManager::new(self.dom.clone()),
            memory,
            memory_context,
        };

        let outcome = self.run_phases(&input, &mut run, reporter).await;
        self.finalize(run, session, outcome, started, reporter).await
    }

    fn validate_config(&self) -> Result<(), WorkflowError> {
        if self.config.task_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "task timeout must be positive".to_string(),
            ));
        }
        if self.config.workflow_timeout_ms == 0 {
            return Err(WorkflowError::InvalidConfig(
                "workflow timeout must be positive".to_string(),
            ));
        }
        if self.config.min_acceptable_completion > 100 {
            return Err(WorkflowError::InvalidConfig(
                "completion floor cannot exceed 100".to_string(),
            ));
        }
        if self.config.models.planner.trim().is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "planner model must be configured".to_string(),
            ));
        }
        if self.config.models.executor.trim().is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "executor model must be configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Planning phase plus the ExecutingStep ⇄ Replanning loop.
    ///
    /// Fatal errors and cancellation surface as `Err`; every graded ending
    /// comes back as a [`LoopExit`]. Teardown is the caller's job so this
    /// can return early freely.
    async fn run_phases(
        &self,
        input: &RunWorkflowInput,
        run: &mut RunState<D>,
        reporter: &dyn AgentReporter,
    ) -> Result<LoopExit, WorkflowError> {
        // ==================== Phase 2: Planning ====================
        reporter.loading("Studying the page");
        if let Err(e) = run.state_manager.capture_state().await {
            warn!("initial perception failed, planning without page context: {e}");
        }

        let request = PlanningRequest {
            goal: input.goal.clone(),
            current_state: run.state_manager.current_state().cloned(),
            memory_prompt: run.memory.memory_prompt(&run.memory_context),
            variable_names: run
                .aggregate
                .workflow()
                .variables
                .iter()
                .map(|variable| variable.name().to_string())
                .collect(),
        };
        let strategy = self.planner.create_strategy(request).await?;
        if strategy.is_empty() {
            return Err(WorkflowError::EmptyStrategy);
        }
        info!(
            steps = strategy.steps.len(),
            "strategy created: {}", strategy.objective
        );

        let plan = self.build_plan(run.aggregate.workflow().id.clone(), &strategy, reporter);
        run.aggregate.set_plan(plan)?;
        if let Some(plan) = run.aggregate.plan() {
            self.enqueue_plan(plan, &mut run.queue);
            reporter.on_plan_created(plan.steps.len(), plan.revision);
        }
        if let Some(repository) = &self.plan_repository
            && let Some(plan) = run.aggregate.plan()
            && let Err(e) = repository.save(plan).await
        {
            warn!("plan save failed: {e}");
        }

        // ============ Phase 3/4: ExecutingStep ⇄ Replanning ============
        // Replans without a completed step in between count against the
        // per-step budget; the counter resets whenever a step lands.
        let mut replans_since_progress: u32 = 0;
        // Watermark of total enqueues at the last queue cleanup.
        let mut cleanup_watermark: u64 = 0;
        // A step resumed after a declined drift-replan; skip begin/report.
        let mut resume: Option<StepId> = None;

        loop {
            check_cancelled(&self.cancellation_token)?;

            let enqueued = run.queue.stats().total_enqueued;
            if enqueued - cleanup_watermark >= CLEANUP_EVERY_ENQUEUES {
                cleanup_watermark = enqueued;
                let evicted = run.queue.cleanup_completed();
                if evicted > 0 {
                    debug!(evicted, "queue hygiene");
                }
            }

            let (step_id, fresh) = match resume.take() {
                Some(id) => (id, false),
                None => match run.aggregate.begin_next_step()? {
                    Some(id) => (id, true),
                    None => return Ok(LoopExit::Exhausted),
                },
            };

            if fresh {
                let total = run.aggregate.total_steps();
                if let Some(step) = find_step(&run.aggregate, &step_id) {
                    reporter.on_step_started(step.order, total, &step.description);
                }
            }

            match self.run_step(&step_id, run, reporter).await? {
                StepOutcome::Completed => {
                    replans_since_progress = 0;

                    if self.should_exit_early(run) {
                        info!(
                            completion = run.aggregate.completion_percentage(),
                            "completion floor reached, exiting early"
                        );
                        reporter.success("Completion floor reached, stopping early");
                        return Ok(LoopExit::EarlyExit);
                    }

                    if self.config.enable_replanning && run.state_manager.has_state_changed() {
                        self.try_replan(
                            run,
                            None,
                            Some("page changed significantly".to_string()),
                            &mut replans_since_progress,
                            reporter,
                        )
                        .await?;
                    }
                }
                StepOutcome::Failed { reason } => {
                    reporter.failure(&format!("Step failed: {reason}"));

                    if let Some(health) = &self.health
                        && health.is_stuck(&run.aggregate.workflow().id)
                    {
                        let workflow_id = run.aggregate.workflow().id.clone();
                        let attempts = health.recovery_attempts(&workflow_id);
                        match WorkflowHealthMonitor::recommend(attempts) {
                            RecoveryAction::Replan | RecoveryAction::AlternativeApproach => {
                                health.record_recovery_attempt(&workflow_id);
                            }
                            RecoveryAction::EscalateToHuman => {
                                health.record_recovery_attempt(&workflow_id);
                                reporter.warning(
                                    "Workflow appears stuck; a human should review progress",
                                );
                            }
                            RecoveryAction::Abort => {
                                warn!("workflow stuck beyond recovery, abandoning remaining steps");
                                reporter.failure("Workflow stuck beyond recovery, stopping");
                                return Ok(LoopExit::Exhausted);
                            }
                        }
                    }

                    let failed_step =
                        find_step(&run.aggregate, &step_id).map(|step| step.description.clone());
                    // Declined replans are fine here: the loop simply moves
                    // on to the next pending step of the current plan.
                    self.try_replan(
                        run,
                        failed_step,
                        Some(reason),
                        &mut replans_since_progress,
                        reporter,
                    )
                    .await?;
                }
                StepOutcome::Drifted => {
                    let replanned = self
                        .try_replan(
                            run,
                            None,
                            Some("page changed significantly mid-step".to_string()),
                            &mut replans_since_progress,
                            reporter,
                        )
                        .await?;
                    if !replanned {
                        // Budget spent: push on with the plan we have
                        resume = Some(step_id);
                    }
                }
            }
        }
    }

    /// Revises the plan if the budgets allow it.
    ///
    /// Returns whether a new plan is in place. A planner that fails or
    /// returns an empty revision is not fatal at this point — the current
    /// plan keeps going, unlike initial planning.
    async fn try_replan(
        &self,
        run: &mut RunState<D>,
        failed_step: Option<String>,
        failure_reason: Option<String>,
        replans_since_progress: &mut u32,
        reporter: &dyn AgentReporter,
    ) -> Result<bool, WorkflowError> {
        if !self.config.enable_replanning {
            return Ok(false);
        }
        let total_replans = run.aggregate.replan_count();
        if total_replans >= self.config.max_total_replans {
            warn!(total_replans, "total replan budget exhausted");
            reporter.warning("Replan budget exhausted; continuing with the current plan");
            return Ok(false);
        }
        if *replans_since_progress >= self.config.max_replans_per_step {
            warn!(
                since_progress = *replans_since_progress,
                "per-step replan budget exhausted"
            );
            reporter.warning("Replanned too often without progress; continuing with current plan");
            return Ok(false);
        }
        check_cancelled(&self.cancellation_token)?;

        let reason_text = failure_reason
            .clone()
            .unwrap_or_else(|| "plan no longer matches the page".to_string());
        reporter.loading("Revising the plan");

        let request = ReplanRequest {
            goal: run.aggregate.workflow().goal.clone(),
            failed_step,
            failure_reason,
            current_state: run.state_manager.current_state().cloned(),
            completed_steps: run.aggregate.completed_step_descriptions(),
            memory_prompt: run.memory.memory_prompt(&run.memory_context),
        };
        let strategy = match self.planner.revise_strategy(request).await {
            Ok(strategy) if !strategy.is_empty() => strategy,
            Ok(_) => {
                warn!("planner returned an empty revision, keeping current plan");
                return Ok(false);
            }
            Err(e) => {
                warn!("replanning failed, keeping current plan: {e}");
                return Ok(false);
            }
        };

        let plan = self.build_plan(run.aggregate.workflow().id.clone(), &strategy, reporter);
        run.aggregate.replace_plan(plan)?;
        *replans_since_progress += 1;
        run.execution.context_mut().record_replan();

        run.queue.clear();
        if let Some(plan) = run.aggregate.plan() {
            self.enqueue_plan(plan, &mut run.queue);
        }
        // Revision tasks arrive with fresh planner priorities; reorder the
        // backlog so they surface in priority order
        run.queue.optimize_for_high_priority();
        if let Some(repository) = &self.plan_repository
            && let Some(plan) = run.aggregate.plan()
            && let Err(e) = repository.save(plan).await
        {
            warn!("plan save failed: {e}");
        }

        let replans = run.aggregate.replan_count();
        reporter.on_replan(&reason_text, replans);
        if let Some(plan) = run.aggregate.plan() {
            reporter.on_plan_created(plan.steps.len(), plan.revision);
        }
        info!(replans, "plan revised");
        Ok(true)
    }

    fn should_exit_early(&self, run: &RunState<D>) -> bool {
        if !self.config.allow_early_exit {
            return false;
        }
        if run.aggregate.completion_percentage() < self.config.min_acceptable_completion {
            return false;
        }
        self.config
            .critical_steps
            .iter()
            .all(|name| critical_step_satisfied(&run.aggregate, name))
    }

    /// Grades the run, flushes telemetry, and releases every resource.
    ///
    /// Runs on every exit path — graded endings and fatal aborts alike —
    /// so the browser, queue, and monitors never leak. Telemetry faults in
    /// here are logged and swallowed; they must not mask the real outcome.
    async fn finalize(
        &self,
        mut run: RunState<D>,
        mut session: Session,
        outcome: Result<LoopExit, WorkflowError>,
        started: Instant,
        reporter: &dyn AgentReporter,
    ) -> Result<WorkflowResult, WorkflowError> {
        let workflow_id = run.aggregate.workflow().id.clone();
        let goal = run.aggregate.workflow().goal.clone();
        let completion = run.aggregate.completion_percentage();
        let successes = run.aggregate.successful_steps();
        let status = RunStatus::determine(completion, successes);
        let steps = step_summaries(&run.aggregate);
        let errors: Vec<String> = steps
            .iter()
            .filter_map(|row| {
                row.error
                    .as_ref()
                    .map(|reason| format!("step {}: {reason}", row.order))
            })
            .collect();

        let transition = match &outcome {
            Ok(_) if status == RunStatus::Failure => {
                let reason = errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "no steps completed".to_string());
                run.aggregate.workflow_mut().fail(reason)
            }
            Ok(_) => run.aggregate.workflow_mut().complete(completion),
            Err(e) => run.aggregate.workflow_mut().fail(e.to_string()),
        };
        if let Err(e) = transition {
            warn!("terminal workflow transition rejected: {e}");
        }

        // A fatal abort has nothing worth narrating
        let summary = if let (Ok(_), Some(summarizer)) = (&outcome, &self.summarizer) {
            let request = SummaryRequest {
                goal: goal.clone(),
                status: status.to_string(),
                completion_percentage: completion,
                step_summaries: steps
                    .iter()
                    .map(|row| {
                        let mark = if row.succeeded { "done" } else { "not done" };
                        format!("{}. {} [{mark}]", row.order, row.description)
                    })
                    .collect(),
                extracted_data: run.state_manager.extracted_data().clone(),
                errors: errors.clone(),
            };
            match summarizer.summarize(request).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("summarizer failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        // One batch flush: every entity's buffered events leave exactly once
        session.end();
        let mut events = run.aggregate.drain_all_events();
        events.extend(run.execution.take_events());
        events.extend(session.take_events());
        debug!(count = events.len(), "flushing domain events");
        self.bus.publish_batch(&events).await;

        for event in run.queue.drain_events() {
            debug!(?event, "queue event");
        }
        for event in run.state_manager.drain_events() {
            debug!(?event, "state event");
        }

        if let Some(repository) = &self.workflow_repository
            && let Err(e) = repository.update(run.aggregate.workflow()).await
        {
            warn!("workflow update failed: {e}");
        }

        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        run.queue.clear();

        if let Some(health) = &self.health {
            health.deregister(&workflow_id);
        }
        if let Some(saga) = &self.saga
            && saga.saga_for_workflow(workflow_id.as_str()).is_some()
        {
            saga.mark_compensated(workflow_id.as_str());
        }

        match outcome {
            Ok(exit) => {
                reporter.on_workflow_finished(status.as_str(), completion);
                info!(status = %status, completion, "workflow finished");
                Ok(WorkflowResult {
                    workflow_id,
                    goal,
                    status,
                    completion_percentage: completion,
                    extracted_data: run.state_manager.extracted_data().clone(),
                    errors,
                    steps,
                    replans: run.aggregate.replan_count(),
                    duration_ms: started.elapsed().as_millis() as u64,
                    early_exit: matches!(exit, LoopExit::EarlyExit),
                    summary,
                })
            }
            Err(e) => {
                reporter.failure(&format!("Workflow aborted: {e}"));
                Err(e)
            }
        }
    }
}

fn find_step<'a>(aggregate: &'a WorkflowAggregate, step_id: &StepId) -> Option<&'a Step> {
    aggregate
        .plan()
        .and_then(|plan| plan.steps.iter().find(|step| &step.id == step_id))
}

/// A critical step is satisfied when a completed step matches it by id, by
/// `step-{order}`, or by case-insensitive description substring. Steps
/// carried over from replaced plans keep only their descriptions, so they
/// match on description alone.
fn critical_step_satisfied(aggregate: &WorkflowAggregate, name: &str) -> bool {
    let needle = name.to_lowercase();
    let in_current_plan = aggregate.plan().is_some_and(|plan| {
        plan.steps.iter().any(|step| {
            step.status == StepStatus::Completed
                && (step.id.as_str() == name
                    || format!("step-{}", step.order) == name
                    || step.description.to_lowercase().contains(&needle))
        })
    });
    in_current_plan
        || aggregate
            .carried_completed()
            .iter()
            .any(|description| description.to_lowercase().contains(&needle))
}

/// Per-step outcome rows: carried completions first, then the current plan.
fn step_summaries(aggregate: &WorkflowAggregate) -> Vec<StepSummary> {
    let mut rows = Vec::new();
    let carried = aggregate.carried_completed().len() as u32;
    for (index, description) in aggregate.carried_completed().iter().enumerate() {
        rows.push(StepSummary {
            order: index as u32 + 1,
            description: description.clone(),
            succeeded: true,
            error: None,
        });
    }
    if let Some(plan) = aggregate.plan() {
        for step in &plan.steps {
            rows.push(StepSummary {
                order: carried + step.order,
                description: step.description.clone(),
                succeeded: step.status == StepStatus::Completed,
                error: step.failure_reason.clone(),
            });
        }
    }
    rows
}
