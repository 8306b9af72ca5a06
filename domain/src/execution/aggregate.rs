//! Execution aggregate: the append-only history of what actually happened
//! in the browser, plus the live context it happened in.

use super::context::ExecutionContext;
use super::result::ExecutionResult;
use crate::event::{DomainEvent, DomainEventKind};
use crate::workflow::value_objects::{TaskId, TaskIntent};
use serde_json::json;

/// Owns the [`ExecutionContext`] and every [`ExecutionResult`] of the run.
///
/// Results are append-only; recording one updates the context counters and
/// emits the matching execution events (navigation, interaction, extraction,
/// error) against the workflow aggregate id.
#[derive(Debug)]
pub struct ExecutionAggregate {
    context: ExecutionContext,
    results: Vec<ExecutionResult>,
    events: Vec<DomainEvent>,
    version: u32,
}

impl ExecutionAggregate {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            results: Vec::new(),
            events: Vec::new(),
            version: 0,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    /// Appends a result and derives the execution events from it.
    pub fn record_execution(&mut self, intent: TaskIntent, result: ExecutionResult) {
        self.context.tasks_executed += 1;

        if result.is_success() {
            if intent == TaskIntent::Navigate {
                self.record(
                    DomainEventKind::PageNavigation,
                    json!({
                        "task_id": result.task_id.as_str(),
                        "url": self.context.current_url,
                    }),
                );
            }
            if intent.interacts_with_element() {
                self.record(
                    DomainEventKind::ElementInteraction,
                    json!({
                        "task_id": result.task_id.as_str(),
                        "intent": intent.as_str(),
                    }),
                );
            }
            if result.outcome.data.is_some() {
                self.record(
                    DomainEventKind::DataExtraction,
                    json!({ "task_id": result.task_id.as_str() }),
                );
            }
        } else {
            self.record(
                DomainEventKind::ExecutionError,
                json!({
                    "task_id": result.task_id.as_str(),
                    "error": result.outcome.error,
                    "attempt": result.retry_attempt + 1,
                }),
            );
        }

        self.results.push(result);
    }

    pub fn results_for_task(&self, task_id: &TaskId) -> Vec<&ExecutionResult> {
        self.results
            .iter()
            .filter(|r| &r.task_id == task_id)
            .collect()
    }

    /// Every distinct error message seen so far, in order of occurrence.
    pub fn error_messages(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for result in &self.results {
            if let Some(error) = &result.outcome.error {
                if !seen.contains(error) {
                    seen.push(error.clone());
                }
            }
        }
        seen
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, kind: DomainEventKind, payload: serde_json::Value) {
        self.version += 1;
        self.events.push(DomainEvent::new(
            self.context.workflow_id.as_str(),
            kind,
            self.version,
            payload,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::result::TaskOutcome;
    use crate::workflow::value_objects::{Viewport, WorkflowId};
    use serde_json::json;

    fn aggregate() -> ExecutionAggregate {
        ExecutionAggregate::new(ExecutionContext::new(
            WorkflowId::generate(),
            Viewport::default(),
        ))
    }

    #[test]
    fn test_record_execution_updates_counters() {
        let mut agg = aggregate();
        let task_id = TaskId::generate();

        agg.record_execution(
            TaskIntent::Click,
            ExecutionResult::new(task_id.clone(), TaskOutcome::success(50), 0),
        );
        agg.record_execution(
            TaskIntent::Click,
            ExecutionResult::new(task_id.clone(), TaskOutcome::failure("detached", 80), 1),
        );

        assert_eq!(agg.context().tasks_executed, 2);
        assert_eq!(agg.success_count(), 1);
        assert_eq!(agg.failure_count(), 1);
        assert_eq!(agg.results_for_task(&task_id).len(), 2);
    }

    #[test]
    fn test_events_derived_from_outcome() {
        let mut agg = aggregate();
        agg.context_mut().update_url("https://example.com/next");

        agg.record_execution(
            TaskIntent::Navigate,
            ExecutionResult::new(TaskId::generate(), TaskOutcome::success(200), 0),
        );
        agg.record_execution(
            TaskIntent::Extract,
            ExecutionResult::new(
                TaskId::generate(),
                TaskOutcome::success_with_data(json!({"price": 10}), 40),
                0,
            ),
        );
        agg.record_execution(
            TaskIntent::Fill,
            ExecutionResult::new(TaskId::generate(), TaskOutcome::failure("no input", 20), 0),
        );

        let kinds: Vec<_> = agg.take_events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DomainEventKind::PageNavigation,
                DomainEventKind::DataExtraction,
                DomainEventKind::ExecutionError,
            ]
        );
    }

    #[test]
    fn test_error_messages_deduplicated() {
        let mut agg = aggregate();
        for _ in 0..2 {
            agg.record_execution(
                TaskIntent::Click,
                ExecutionResult::new(TaskId::generate(), TaskOutcome::failure("timeout", 10), 0),
            );
        }
        agg.record_execution(
            TaskIntent::Click,
            ExecutionResult::new(TaskId::generate(), TaskOutcome::failure("detached", 10), 0),
        );

        assert_eq!(agg.error_messages(), vec!["timeout", "detached"]);
    }
}
