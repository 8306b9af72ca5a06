//! Dependency-aware task queue.
//!
//! The queue holds every task of the in-flight plan and only exposes tasks
//! whose declared dependencies have completed. The dependency graph lives
//! here as an adjacency map from task id to its unmet dependencies; tasks
//! themselves stay plain data and carry no back-pointers.
//!
//! A task whose dependency fails (or never arrives) stays blocked forever.
//! That is diagnosable through [`TaskQueue::blocked_tasks`], not fatal:
//! the rest of the ready work keeps flowing.

use crate::workflow::entities::{Task, TaskStatus};
use crate::workflow::value_objects::{StepId, TaskId};
use std::collections::{HashMap, HashSet};

/// Observable queue mutations, buffered for the orchestrator to relay.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    TaskEnqueued { task_id: TaskId },
    TaskBlocked { task_id: TaskId, waiting_on: usize },
    TaskDequeued { task_id: TaskId },
    TaskCompleted { task_id: TaskId, unblocked: usize },
    TaskFailed { task_id: TaskId, error: String },
    QueueOptimized { moved: usize },
    CleanupRun { evicted: usize },
}

impl QueueEvent {
    /// Flat event name matching the engine's `category:event` convention.
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::TaskEnqueued { .. } => "task:enqueued",
            QueueEvent::TaskBlocked { .. } => "task:blocked",
            QueueEvent::TaskDequeued { .. } => "task:dequeued",
            QueueEvent::TaskCompleted { .. } => "task:completed",
            QueueEvent::TaskFailed { .. } => "task:failed",
            QueueEvent::QueueOptimized { .. } => "queue:optimized",
            QueueEvent::CleanupRun { .. } => "queue:cleanup",
        }
    }
}

/// Counters describing the queue's current shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub ready: usize,
    pub blocked: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_enqueued: u64,
}

#[derive(Debug)]
struct QueueEntry {
    task: Task,
    /// Monotonic insertion number, the stable tie-break within a priority.
    insertion: u64,
}

/// Priority-biased scheduler over a task dependency graph.
#[derive(Debug, Default)]
pub struct TaskQueue {
    entries: Vec<QueueEntry>,
    /// task id -> dependency ids not yet completed
    unmet: HashMap<TaskId, HashSet<TaskId>>,
    completed: HashSet<TaskId>,
    failed: HashMap<TaskId, String>,
    events: Vec<QueueEvent>,
    insertion_counter: u64,
    total_enqueued: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task with its dependency ids.
    ///
    /// Dependencies already completed are satisfied immediately; the rest
    /// block the task until [`mark_completed`](Self::mark_completed) clears
    /// them. Depending on an id that never completes leaves the task
    /// permanently blocked.
    pub fn enqueue(&mut self, task: Task, dependencies: &[TaskId]) {
        let task_id = task.id.clone();
        let waiting: HashSet<TaskId> = dependencies
            .iter()
            .filter(|dep| !self.completed.contains(*dep))
            .cloned()
            .collect();

        self.events.push(QueueEvent::TaskEnqueued {
            task_id: task_id.clone(),
        });
        if !waiting.is_empty() {
            self.events.push(QueueEvent::TaskBlocked {
                task_id: task_id.clone(),
                waiting_on: waiting.len(),
            });
        }

        self.unmet.insert(task_id, waiting);
        self.insertion_counter += 1;
        self.total_enqueued += 1;
        self.entries.push(QueueEntry {
            task,
            insertion: self.insertion_counter,
        });
    }

    fn is_ready(&self, entry: &QueueEntry) -> bool {
        entry.task.status == TaskStatus::Pending
            && self
                .unmet
                .get(&entry.task.id)
                .map(|deps| deps.is_empty())
                .unwrap_or(true)
    }

    /// Tasks whose dependencies are all satisfied, ordered by priority
    /// (high first) then insertion order.
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let mut ready: Vec<&QueueEntry> = self
            .entries
            .iter()
            .filter(|entry| self.is_ready(entry))
            .collect();
        ready.sort_by_key(|entry| (entry.task.priority.rank(), entry.insertion));
        ready.into_iter().map(|entry| &entry.task).collect()
    }

    /// Tasks waiting on at least one unmet dependency, with the ids they
    /// are waiting for. Diagnostic surface for stuck plans.
    pub fn blocked_tasks(&self) -> Vec<(&Task, Vec<TaskId>)> {
        self.entries
            .iter()
            .filter(|entry| entry.task.status == TaskStatus::Pending)
            .filter_map(|entry| {
                let deps = self.unmet.get(&entry.task.id)?;
                if deps.is_empty() {
                    return None;
                }
                let mut waiting: Vec<TaskId> = deps.iter().cloned().collect();
                waiting.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                Some((&entry.task, waiting))
            })
            .collect()
    }

    /// Removes and returns the highest-priority ready task.
    pub fn dequeue(&mut self) -> Option<Task> {
        let next_id = self.ready_tasks().first().map(|task| task.id.clone())?;
        let position = self
            .entries
            .iter()
            .position(|entry| entry.task.id == next_id)?;
        let entry = self.entries.remove(position);
        self.events.push(QueueEvent::TaskDequeued {
            task_id: entry.task.id.clone(),
        });
        Some(entry.task)
    }

    /// Like [`dequeue`](Self::dequeue), restricted to one step's tasks.
    ///
    /// Steps run one at a time, so ready tasks of later steps must not jump
    /// the line just because their dependencies are trivially satisfied.
    pub fn dequeue_for_step(&mut self, step_id: &StepId) -> Option<Task> {
        let next_id = self
            .ready_tasks()
            .iter()
            .find(|task| &task.step_id == step_id)
            .map(|task| task.id.clone())?;
        let position = self
            .entries
            .iter()
            .position(|entry| entry.task.id == next_id)?;
        let entry = self.entries.remove(position);
        self.events.push(QueueEvent::TaskDequeued {
            task_id: entry.task.id.clone(),
        });
        Some(entry.task)
    }

    /// Records a completion and unblocks every task that was waiting on it.
    pub fn mark_completed(&mut self, task_id: &TaskId) {
        self.completed.insert(task_id.clone());
        self.unmet.remove(task_id);

        let mut unblocked = 0;
        for deps in self.unmet.values_mut() {
            if deps.remove(task_id) && deps.is_empty() {
                unblocked += 1;
            }
        }
        self.events.push(QueueEvent::TaskCompleted {
            task_id: task_id.clone(),
            unblocked,
        });
    }

    /// Records a terminal failure. Dependents stay blocked: a failed
    /// dependency never satisfies anyone.
    pub fn mark_failed(&mut self, task_id: &TaskId, error: impl Into<String>) {
        let error = error.into();
        self.failed.insert(task_id.clone(), error.clone());
        self.unmet.remove(task_id);
        self.events.push(QueueEvent::TaskFailed {
            task_id: task_id.clone(),
            error,
        });
    }

    /// Moves high-priority ready tasks ahead of lower-priority ones without
    /// touching blocked tasks or dependency order. A local re-sort; ties
    /// keep their insertion order.
    pub fn optimize_for_high_priority(&mut self) {
        let ready_ids: HashSet<TaskId> = self
            .entries
            .iter()
            .filter(|entry| self.is_ready(entry))
            .map(|entry| entry.task.id.clone())
            .collect();

        let before: Vec<TaskId> = self.entries.iter().map(|e| e.task.id.clone()).collect();
        self.entries.sort_by_key(|entry| {
            if ready_ids.contains(&entry.task.id) {
                (entry.task.priority.rank(), entry.insertion)
            } else {
                // Blocked entries keep their relative placement at the back
                (u8::MAX, entry.insertion)
            }
        });
        let moved = self
            .entries
            .iter()
            .zip(before.iter())
            .filter(|(entry, old)| &entry.task.id != *old)
            .count();

        self.events.push(QueueEvent::QueueOptimized { moved });
    }

    /// Evicts completed/failed bookkeeping to bound memory on long runs.
    /// Returns the number of records evicted.
    pub fn cleanup_completed(&mut self) -> usize {
        let evicted = self.completed.len() + self.failed.len();
        self.completed.clear();
        self.failed.clear();
        self.entries
            .retain(|entry| !entry.task.status.is_terminal());
        self.events.push(QueueEvent::CleanupRun { evicted });
        evicted
    }

    pub fn failure_reason(&self, task_id: &TaskId) -> Option<&str> {
        self.failed.get(task_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            ready: self.ready_tasks().len(),
            blocked: self.blocked_tasks().len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
            total_enqueued: self.total_enqueued,
        }
    }

    /// Drains buffered queue events. Each event leaves exactly once.
    pub fn drain_events(&mut self) -> Vec<QueueEvent> {
        std::mem::take(&mut self.events)
    }

    /// Removes everything: entries, graph, bookkeeping, events.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.unmet.clear();
        self.completed.clear();
        self.failed.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::value_objects::{Priority, StepId, TaskIntent};

    fn task(description: &str, priority: Priority) -> Task {
        Task::new(StepId::generate(), TaskIntent::Click, description).with_priority(priority)
    }

    #[test]
    fn test_task_with_deps_is_blocked_until_completion() {
        let mut queue = TaskQueue::new();
        let first = task("open menu", Priority::Medium);
        let first_id = first.id.clone();
        let second = task("pick entry", Priority::Medium);
        let second_id = second.id.clone();

        queue.enqueue(first, &[]);
        queue.enqueue(second, &[first_id.clone()]);

        let ready: Vec<&TaskId> = queue.ready_tasks().iter().map(|t| &t.id).collect();
        assert_eq!(ready, vec![&first_id]);
        assert_eq!(queue.blocked_tasks().len(), 1);

        queue.mark_completed(&first_id);

        let ready: Vec<&TaskId> = queue.ready_tasks().iter().map(|t| &t.id).collect();
        assert!(ready.contains(&&second_id));
        assert!(queue.blocked_tasks().is_empty());
    }

    #[test]
    fn test_task_never_ready_before_all_deps_complete() {
        let mut queue = TaskQueue::new();
        let a = task("a", Priority::Medium);
        let b = task("b", Priority::Medium);
        let c = task("c", Priority::High);
        let (a_id, b_id, c_id) = (a.id.clone(), b.id.clone(), c.id.clone());

        queue.enqueue(a, &[]);
        queue.enqueue(b, &[]);
        queue.enqueue(c, &[a_id.clone(), b_id.clone()]);

        queue.mark_completed(&a_id);
        assert!(
            !queue.ready_tasks().iter().any(|t| t.id == c_id),
            "task must stay blocked while one dependency is open"
        );

        queue.mark_completed(&b_id);
        assert!(queue.ready_tasks().iter().any(|t| t.id == c_id));
    }

    #[test]
    fn test_ready_order_priority_then_insertion() {
        let mut queue = TaskQueue::new();
        let low = task("low", Priority::Low);
        let medium_1 = task("medium first", Priority::Medium);
        let medium_2 = task("medium second", Priority::Medium);
        let high = task("high", Priority::High);

        queue.enqueue(low, &[]);
        queue.enqueue(medium_1, &[]);
        queue.enqueue(medium_2, &[]);
        queue.enqueue(high, &[]);

        let order: Vec<&str> = queue
            .ready_tasks()
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(order, vec!["high", "medium first", "medium second", "low"]);
    }

    #[test]
    fn test_dequeue_removes_highest_priority() {
        let mut queue = TaskQueue::new();
        queue.enqueue(task("background", Priority::Low), &[]);
        queue.enqueue(task("urgent", Priority::High), &[]);

        let first = queue.dequeue().unwrap();
        assert_eq!(first.description, "urgent");
        let second = queue.dequeue().unwrap();
        assert_eq!(second.description, "background");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_dequeue_for_step_skips_other_steps() {
        let mut queue = TaskQueue::new();
        let current_step = StepId::generate();
        let later_step = StepId::generate();

        // The later step's task is ready and higher priority, but must not
        // jump ahead of the step currently executing.
        queue.enqueue(
            Task::new(later_step, TaskIntent::Click, "later").with_priority(Priority::High),
            &[],
        );
        queue.enqueue(
            Task::new(current_step.clone(), TaskIntent::Click, "current"),
            &[],
        );

        let next = queue.dequeue_for_step(&current_step).unwrap();
        assert_eq!(next.description, "current");
        assert!(queue.dequeue_for_step(&current_step).is_none());
    }

    #[test]
    fn test_dependency_already_completed_is_satisfied() {
        let mut queue = TaskQueue::new();
        let first = task("first", Priority::Medium);
        let first_id = first.id.clone();
        queue.enqueue(first, &[]);
        queue.mark_completed(&first_id);

        let late = task("late arrival", Priority::Medium);
        queue.enqueue(late, &[first_id]);
        assert_eq!(queue.ready_tasks().len(), 1);
    }

    #[test]
    fn test_failed_dependency_leaves_dependent_blocked() {
        let mut queue = TaskQueue::new();
        let doomed = task("doomed", Priority::Medium);
        let doomed_id = doomed.id.clone();
        let dependent = task("dependent", Priority::Medium);
        let dependent_id = dependent.id.clone();

        queue.enqueue(doomed, &[]);
        queue.enqueue(dependent, &[doomed_id.clone()]);
        queue.mark_failed(&doomed_id, "selector matched nothing");

        assert!(!queue.ready_tasks().iter().any(|t| t.id == dependent_id));
        let blocked = queue.blocked_tasks();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].1, vec![doomed_id.clone()]);
        assert_eq!(
            queue.failure_reason(&doomed_id),
            Some("selector matched nothing")
        );
    }

    #[test]
    fn test_optimize_moves_high_priority_forward() {
        let mut queue = TaskQueue::new();
        queue.enqueue(task("low early", Priority::Low), &[]);
        queue.enqueue(task("high late", Priority::High), &[]);
        queue.drain_events();

        queue.optimize_for_high_priority();

        assert_eq!(queue.entries[0].task.description, "high late");
        let events = queue.drain_events();
        assert!(matches!(events[0], QueueEvent::QueueOptimized { moved: 2 }));
    }

    #[test]
    fn test_cleanup_evicts_bookkeeping() {
        let mut queue = TaskQueue::new();
        let a = task("a", Priority::Medium);
        let a_id = a.id.clone();
        queue.enqueue(a, &[]);
        queue.dequeue().unwrap();
        queue.mark_completed(&a_id);

        assert_eq!(queue.stats().completed, 1);
        let evicted = queue.cleanup_completed();
        assert_eq!(evicted, 1);
        assert_eq!(queue.stats().completed, 0);
        // Totals survive cleanup
        assert_eq!(queue.stats().total_enqueued, 1);
    }

    #[test]
    fn test_events_cover_every_mutation() {
        let mut queue = TaskQueue::new();
        let first = task("first", Priority::Medium);
        let first_id = first.id.clone();
        let second = task("second", Priority::Medium);

        queue.enqueue(first, &[]);
        queue.enqueue(second, &[first_id.clone()]);
        queue.dequeue();
        queue.mark_completed(&first_id);
        queue.cleanup_completed();

        let names: Vec<&str> = queue.drain_events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "task:enqueued",
                "task:enqueued",
                "task:blocked",
                "task:dequeued",
                "task:completed",
                "queue:cleanup",
            ]
        );
        assert!(queue.drain_events().is_empty());
    }

    #[test]
    fn test_unblocked_count_reported_on_completion() {
        let mut queue = TaskQueue::new();
        let root = task("root", Priority::Medium);
        let root_id = root.id.clone();
        queue.enqueue(root, &[]);
        queue.enqueue(task("child 1", Priority::Medium), &[root_id.clone()]);
        queue.enqueue(task("child 2", Priority::Medium), &[root_id.clone()]);
        queue.drain_events();

        queue.mark_completed(&root_id);
        let events = queue.drain_events();
        assert!(matches!(
            events[0],
            QueueEvent::TaskCompleted { unblocked: 2, .. }
        ));
    }
}
