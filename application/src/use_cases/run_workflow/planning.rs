//! Planning-related methods for the RunWorkflow use case.
//!
//! Turns a planner [`Strategy`] into validated domain entities and loads
//! the task queue. The planner speaks in strategic intents and loose
//! selector expressions; everything concrete (task intents, selectors,
//! retries, timeouts) is decided here.

use super::RunWorkflowUseCase;
use crate::ports::browser::Browser;
use crate::ports::evaluator::StepEvaluator;
use crate::ports::executor::TaskExecutor;
use crate::ports::perception::DomService;
use crate::ports::planner::{PlannedTask, Planner, Strategy};
use crate::ports::reporter::AgentReporter;
use tracing::warn;
use webpilot_domain::{
    ElementSelector, PageUrl, Plan, Step, Task, TaskId, TaskIntent, TaskQueue, Timeout,
    WorkflowId,
};

/// Parses a planner selector expression (`css:`, `xpath:`, `index:`).
///
/// Bare expressions are treated as CSS, the planner's dominant dialect.
pub(super) fn selector_from_expression(raw: &str) -> ElementSelector {
    if let Some(css) = raw.strip_prefix("css:") {
        ElementSelector::css(css)
    } else if let Some(xpath) = raw.strip_prefix("xpath:") {
        ElementSelector::xpath(xpath)
    } else if let Some(index) = raw.strip_prefix("index:") {
        match index.trim().parse::<u32>() {
            Ok(i) => ElementSelector::index(i),
            Err(_) => {
                warn!(expression = raw, "unparseable index selector, keeping as css");
                ElementSelector::css(raw)
            }
        }
    } else {
        ElementSelector::css(raw)
    }
}

impl<P, X, E, B, D> RunWorkflowUseCase<P, X, E, B, D>
where
    P: Planner + 'static,
    X: TaskExecutor + 'static,
    E: StepEvaluator + 'static,
    B: Browser + 'static,
    D: DomService + 'static,
{
    /// Converts a strategy into a validated plan.
    ///
    /// Every strategic step becomes a [`Step`]; planned tasks without a
    /// concrete intent fall back to the step's strategic intent, then to
    /// the configured default (with a warning). A step the planner left
    /// without tasks gets one synthesized from the step itself, so every
    /// step is executable.
    pub(super) fn build_plan(
        &self,
        workflow_id: WorkflowId,
        strategy: &Strategy,
        reporter: &dyn AgentReporter,
    ) -> Plan {
        let mut plan = Plan::new(workflow_id);

        for (index, strategic) in strategy.steps.iter().enumerate() {
            let order = index as u32 + 1;
            let mut step = Step::new(order, &strategic.description, strategic.intent.clone())
                .with_confidence(strategic.confidence);

            if strategic.tasks.is_empty() {
                let synthesized = PlannedTask::new(&strategic.description);
                let task = self.build_task(&step, &synthesized, reporter);
                step.add_task(task);
            } else {
                for planned in &strategic.tasks {
                    let task = self.build_task(&step, planned, reporter);
                    step.add_task(task);
                }
            }

            plan.add_step(step);
        }

        plan
    }

    fn build_task(
        &self,
        step: &Step,
        planned: &PlannedTask,
        reporter: &dyn AgentReporter,
    ) -> Task {
        let intent = self.resolve_intent(step, planned, reporter);

        let mut task = Task::new(step.id.clone(), intent, &planned.description)
            .with_priority(planned.priority)
            .with_max_retries(self.config.max_retries);
        if let Ok(timeout) = Timeout::from_millis(self.config.task_timeout_ms) {
            task = task.with_timeout(timeout);
        }
        if let Some(raw) = &planned.target {
            task = task.with_target(selector_from_expression(raw));
        }
        if let Some(value) = &planned.input_value {
            task = task.with_input(value.clone());
        }
        if let Some(raw) = &planned.url {
            match PageUrl::parse(raw) {
                Ok(url) => task = task.with_url(url),
                Err(e) => {
                    warn!(url = raw, "dropping invalid task url: {e}");
                    reporter.warning(&format!("Ignoring invalid URL in plan: {raw}"));
                }
            }
        }
        task
    }

    /// Concrete intent for a planned task: explicit intent, then the step's
    /// strategic mapping, then the configured fallback (warned, not silent).
    fn resolve_intent(
        &self,
        step: &Step,
        planned: &PlannedTask,
        reporter: &dyn AgentReporter,
    ) -> TaskIntent {
        if let Some(intent) = planned.intent {
            return intent;
        }
        match step.intent.to_task_intent() {
            Some(intent) => intent,
            None => {
                let fallback = self.config.unknown_intent_fallback;
                warn!(
                    intent = step.intent.as_str(),
                    fallback = fallback.as_str(),
                    "unknown strategic intent, using configured fallback"
                );
                reporter.warning(&format!(
                    "Unknown intent '{}', falling back to '{}'",
                    step.intent, fallback
                ));
                fallback
            }
        }
    }

    /// Loads the plan's pending tasks into the queue.
    ///
    /// Tasks within a step are chained sequentially: each depends on its
    /// predecessor, so the queue's ready set always reflects step-internal
    /// order. Steps themselves are sequenced by the run loop, not the queue.
    pub(super) fn enqueue_plan(&self, plan: &Plan, queue: &mut TaskQueue) {
        for step in &plan.steps {
            let mut previous: Option<TaskId> = None;
            for task in &step.tasks {
                if task.status.is_terminal() {
                    continue;
                }
                let dependencies: Vec<TaskId> = previous.iter().cloned().collect();
                previous = Some(task.id.clone());
                queue.enqueue(task.clone(), &dependencies);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_expressions() {
        assert_eq!(
            selector_from_expression("css:#submit"),
            ElementSelector::css("#submit")
        );
        assert_eq!(
            selector_from_expression("xpath://button[1]"),
            ElementSelector::xpath("//button[1]")
        );
        assert_eq!(selector_from_expression("index:4"), ElementSelector::index(4));
        // Bare and malformed expressions fall back to CSS
        assert_eq!(
            selector_from_expression("button.primary"),
            ElementSelector::css("button.primary")
        );
        assert_eq!(
            selector_from_expression("index:abc"),
            ElementSelector::css("index:abc")
        );
    }
}
