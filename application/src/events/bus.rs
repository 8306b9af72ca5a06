//! Workflow event bus.
//!
//! Fans domain events out to registered handlers and to legacy flat-name
//! listeners, then mirrors batches into the event store. Handler failures
//! are isolated: one failing handler never stops the others, and a store
//! failure never reaches the workflow path.

use crate::ports::event_store::EventStore;
use std::sync::Arc;
use tracing::warn;
use webpilot_domain::{DomainEvent, DomainEventKind};

/// Outcome of one handler invocation.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A named consumer of domain events.
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, event: &DomainEvent) -> HandlerResult;
}

type Listener = Arc<dyn Fn(&str, &serde_json::Value) + Send + Sync>;

/// Flat names an event publishes under, for legacy listeners.
///
/// Terminal outcomes additionally fan out to a shared `:finished` name so
/// listeners can watch "done, either way" with one subscription.
pub fn legacy_names(kind: DomainEventKind) -> Vec<&'static str> {
    let mut names = vec![kind.name()];
    match kind {
        DomainEventKind::WorkflowCompleted | DomainEventKind::WorkflowFailed => {
            names.push("workflow:finished");
        }
        DomainEventKind::StepCompleted | DomainEventKind::StepFailed => {
            names.push("step:finished");
        }
        DomainEventKind::TaskCompleted
        | DomainEventKind::TaskFailed
        | DomainEventKind::TaskTimedOut => {
            names.push("task:finished");
        }
        _ => {}
    }
    names
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(category) = pattern.strip_suffix(":*") {
        return name.strip_prefix(category).is_some_and(|rest| rest.starts_with(':'));
    }
    pattern == name
}

/// Synchronous fan-out of domain events.
pub struct WorkflowEventBus {
    handlers: Vec<Arc<dyn EventHandler>>,
    listeners: Vec<(String, Listener)>,
    store: Option<Arc<dyn EventStore>>,
}

impl WorkflowEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            listeners: Vec::new(),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Subscribes a flat-name listener. Patterns: exact (`task:failed`),
    /// category wildcard (`task:*`), or `*` for everything.
    pub fn subscribe<F>(&mut self, pattern: impl Into<String>, listener: F)
    where
        F: Fn(&str, &serde_json::Value) + Send + Sync + 'static,
    {
        self.listeners.push((pattern.into(), Arc::new(listener)));
    }

    /// Delivers one event to every handler and matching listener.
    pub fn publish(&self, event: &DomainEvent) {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(event) {
                warn!(handler = handler.name(), "event handler failed: {e}");
            }
        }
        for name in legacy_names(event.kind) {
            for (pattern, listener) in &self.listeners {
                if pattern_matches(pattern, name) {
                    listener(name, &event.payload);
                }
            }
        }
    }

    /// Publishes every event, then appends the batch to the store.
    /// Store failures are logged, never propagated.
    pub async fn publish_batch(&self, events: &[DomainEvent]) {
        for event in events {
            self.publish(event);
        }
        if let Some(store) = &self.store
            && let Err(e) = store.append_batch(events).await
        {
            warn!(count = events.len(), "event store append failed: {e}");
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for WorkflowEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        seen: AtomicUsize,
    }

    impl EventHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        fn handle(&self, _event: &DomainEvent) -> HandlerResult {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    impl EventHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        fn handle(&self, _event: &DomainEvent) -> HandlerResult {
            Err("always broken".into())
        }
    }

    fn event(kind: DomainEventKind) -> DomainEvent {
        DomainEvent::new("wf-1", kind, 1, json!({"k": "v"}))
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let counting = Arc::new(CountingHandler {
            seen: AtomicUsize::new(0),
        });
        let mut bus = WorkflowEventBus::new();
        bus.register_handler(Arc::new(FailingHandler));
        bus.register_handler(counting.clone());

        bus.publish(&event(DomainEventKind::TaskCompleted));

        assert_eq!(counting.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_patterns() {
        let mut bus = WorkflowEventBus::new();
        let names: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = names.clone();
        bus.subscribe("task:*", move |name, _payload| {
            sink.lock().unwrap().push(name.to_string());
        });
        let sink = names.clone();
        bus.subscribe("workflow:finished", move |name, _payload| {
            sink.lock().unwrap().push(name.to_string());
        });

        bus.publish(&event(DomainEventKind::TaskFailed));
        bus.publish(&event(DomainEventKind::WorkflowCompleted));
        bus.publish(&event(DomainEventKind::PlanCreated));

        let seen = names.lock().unwrap().clone();
        // task:failed fans to both task:failed and task:finished
        assert_eq!(seen, vec!["task:failed", "task:finished", "workflow:finished"]);
    }

    #[test]
    fn test_terminal_events_fan_to_finished() {
        assert!(legacy_names(DomainEventKind::TaskFailed).contains(&"task:finished"));
        assert!(legacy_names(DomainEventKind::WorkflowFailed).contains(&"workflow:finished"));
        assert_eq!(legacy_names(DomainEventKind::PlanCreated), vec!["plan:created"]);
    }

    #[test]
    fn test_category_wildcard_requires_colon() {
        assert!(pattern_matches("task:*", "task:failed"));
        assert!(!pattern_matches("task:*", "taskforce:assemble"));
        assert!(pattern_matches("*", "anything:at_all"));
    }
}
