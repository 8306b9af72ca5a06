//! Built-in event handlers.
//!
//! Handlers keep their state behind mutexes so they can be shared with the
//! bus as `Arc<dyn EventHandler>` and still be inspected after the run.

use crate::events::bus::{EventHandler, HandlerResult};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use webpilot_domain::{DomainEvent, DomainEventKind};

/// Entries the logging handler keeps before dropping the oldest.
const LOG_RING_DEFAULT: usize = 1000;

// ==================== Metrics ====================

/// Copyable snapshot of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub workflows_started: u64,
    pub workflows_completed: u64,
    pub workflows_failed: u64,
    pub steps_completed: u64,
    pub steps_failed: u64,
    pub tasks_started: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_retried: u64,
    pub replans: u64,
}

impl MetricsSnapshot {
    /// Completed tasks over finished tasks; 1.0 when nothing finished yet.
    pub fn task_success_rate(&self) -> f64 {
        let finished = self.tasks_completed + self.tasks_failed;
        if finished == 0 {
            return 1.0;
        }
        self.tasks_completed as f64 / finished as f64
    }
}

/// Counts lifecycle events.
#[derive(Default)]
pub struct MetricsHandler {
    counters: Mutex<MetricsSnapshot>,
}

impl MetricsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.counters.lock().unwrap()
    }
}

impl EventHandler for MetricsHandler {
    fn name(&self) -> &str {
        "metrics"
    }

    fn handle(&self, event: &DomainEvent) -> HandlerResult {
        let mut counters = self.counters.lock().unwrap();
        match event.kind {
            DomainEventKind::WorkflowStarted => counters.workflows_started += 1,
            DomainEventKind::WorkflowCompleted => counters.workflows_completed += 1,
            DomainEventKind::WorkflowFailed => counters.workflows_failed += 1,
            DomainEventKind::StepCompleted => counters.steps_completed += 1,
            DomainEventKind::StepFailed => counters.steps_failed += 1,
            DomainEventKind::TaskStarted => counters.tasks_started += 1,
            DomainEventKind::TaskCompleted => counters.tasks_completed += 1,
            DomainEventKind::TaskFailed => counters.tasks_failed += 1,
            DomainEventKind::TaskRetried => counters.tasks_retried += 1,
            DomainEventKind::PlanReplaced => counters.replans += 1,
            _ => {}
        }
        Ok(())
    }
}

// ==================== Structured log ====================

/// One captured event, ready for export.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventLogEntry {
    pub name: String,
    pub aggregate_id: String,
    pub version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Bounded ring of structured event records.
pub struct LoggingHandler {
    entries: Mutex<VecDeque<EventLogEntry>>,
    capacity: usize,
}

impl LoggingHandler {
    pub fn new() -> Self {
        Self::with_capacity(LOG_RING_DEFAULT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<EventLogEntry> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn entries_for_aggregate(&self, aggregate_id: &str) -> Vec<EventLogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    pub fn entries_named(&self, name: &str) -> Vec<EventLogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.name == name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for LoggingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for LoggingHandler {
    fn name(&self) -> &str {
        "logging"
    }

    fn handle(&self, event: &DomainEvent) -> HandlerResult {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(EventLogEntry {
            name: event.kind.name().to_string(),
            aggregate_id: event.aggregate_id.clone(),
            version: event.version,
            occurred_at: event.occurred_at,
            payload: event.payload.clone(),
        });
        Ok(())
    }
}

// ==================== Task failure accounting ====================

/// Failure record for one task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFailureRecord {
    pub failures: u32,
    pub retries: u32,
    pub last_error: Option<String>,
}

/// Tracks failures and retries per task id.
#[derive(Default)]
pub struct TaskFailureHandler {
    records: Mutex<HashMap<String, TaskFailureRecord>>,
}

impl TaskFailureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_for(&self, task_id: &str) -> Option<TaskFailureRecord> {
        self.records.lock().unwrap().get(task_id).cloned()
    }

    pub fn total_failures(&self) -> u32 {
        self.records
            .lock()
            .unwrap()
            .values()
            .map(|record| record.failures)
            .sum()
    }
}

impl EventHandler for TaskFailureHandler {
    fn name(&self) -> &str {
        "task-failure"
    }

    fn handle(&self, event: &DomainEvent) -> HandlerResult {
        match event.kind {
            DomainEventKind::TaskFailed | DomainEventKind::TaskRetried => {
                let task_id = event.aggregate_id.clone();
                let error = event
                    .payload
                    .get("reason")
                    .or_else(|| event.payload.get("error"))
                    .and_then(|value| value.as_str())
                    .map(String::from);

                let mut records = self.records.lock().unwrap();
                let record = records.entry(task_id).or_default();
                if event.kind == DomainEventKind::TaskRetried {
                    record.retries += 1;
                } else {
                    record.failures += 1;
                }
                if error.is_some() {
                    record.last_error = error;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: DomainEventKind, aggregate: &str, payload: serde_json::Value) -> DomainEvent {
        DomainEvent::new(aggregate, kind, 1, payload)
    }

    #[test]
    fn test_metrics_counts_and_success_rate() {
        let handler = MetricsHandler::new();
        for kind in [
            DomainEventKind::WorkflowStarted,
            DomainEventKind::TaskStarted,
            DomainEventKind::TaskCompleted,
            DomainEventKind::TaskStarted,
            DomainEventKind::TaskFailed,
            DomainEventKind::TaskStarted,
            DomainEventKind::TaskCompleted,
            DomainEventKind::PlanReplaced,
        ] {
            handler.handle(&event(kind, "wf-1", json!({}))).unwrap();
        }

        let snapshot = handler.snapshot();
        assert_eq!(snapshot.workflows_started, 1);
        assert_eq!(snapshot.tasks_started, 3);
        assert_eq!(snapshot.tasks_completed, 2);
        assert_eq!(snapshot.tasks_failed, 1);
        assert_eq!(snapshot.replans, 1);
        assert!((snapshot.task_success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_without_finished_tasks() {
        assert_eq!(MetricsSnapshot::default().task_success_rate(), 1.0);
    }

    #[test]
    fn test_logging_ring_is_bounded() {
        let handler = LoggingHandler::with_capacity(3);
        for n in 0..5 {
            handler
                .handle(&event(
                    DomainEventKind::TaskCompleted,
                    &format!("task-{n}"),
                    json!({}),
                ))
                .unwrap();
        }

        assert_eq!(handler.len(), 3);
        // Oldest two were dropped
        assert!(handler.entries_for_aggregate("task-0").is_empty());
        assert_eq!(handler.entries_for_aggregate("task-4").len(), 1);
    }

    #[test]
    fn test_logging_filters() {
        let handler = LoggingHandler::new();
        handler
            .handle(&event(DomainEventKind::TaskCompleted, "task-1", json!({})))
            .unwrap();
        handler
            .handle(&event(DomainEventKind::TaskFailed, "task-2", json!({})))
            .unwrap();

        assert_eq!(handler.entries_named("task:failed").len(), 1);
        assert_eq!(handler.entries_for_aggregate("task-1").len(), 1);
    }

    #[test]
    fn test_task_failure_accounting() {
        let handler = TaskFailureHandler::new();
        handler
            .handle(&event(
                DomainEventKind::TaskRetried,
                "task-1",
                json!({"reason": "selector missing"}),
            ))
            .unwrap();
        handler
            .handle(&event(
                DomainEventKind::TaskFailed,
                "task-1",
                json!({"reason": "gave up"}),
            ))
            .unwrap();

        let record = handler.record_for("task-1").unwrap();
        assert_eq!(record.retries, 1);
        assert_eq!(record.failures, 1);
        assert_eq!(record.last_error.as_deref(), Some("gave up"));
        assert_eq!(handler.total_failures(), 1);
    }
}
