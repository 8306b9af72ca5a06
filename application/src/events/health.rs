//! Stuck-workflow detection.
//!
//! The monitor watches activity per workflow and periodically assesses
//! whether a run has stalled: nothing happened for too long, a single task
//! is hanging, or almost everything fails. Assessments only recommend a
//! recovery action; acting on it stays with the orchestration loop.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webpilot_domain::{TaskId, WorkflowId};

/// Thresholds for calling a workflow stuck.
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// No activity at all for longer than this
    pub inactivity_limit: Duration,
    /// One task running longer than this
    pub task_limit: Duration,
    /// Failure rate above this is suspicious...
    pub failure_rate_threshold: f64,
    /// ...once at least this many tasks finished
    pub min_tasks_for_rate: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            inactivity_limit: Duration::minutes(5),
            task_limit: Duration::minutes(2),
            failure_rate_threshold: 0.8,
            min_tasks_for_rate: 3,
        }
    }
}

/// What the loop should try next, by escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Replan,
    AlternativeApproach,
    EscalateToHuman,
    Abort,
}

/// Why a workflow was judged stuck.
#[derive(Debug, Clone, PartialEq)]
pub enum StuckReason {
    Inactive { idle_secs: i64 },
    TaskRunningTooLong { task_id: TaskId, running_secs: i64 },
    HighFailureRate { rate: f64, finished: u32 },
}

/// One stuck verdict with its recommended way out.
#[derive(Debug, Clone)]
pub struct StuckAssessment {
    pub workflow_id: WorkflowId,
    pub reasons: Vec<StuckReason>,
    pub recommended: RecoveryAction,
}

#[derive(Debug, Clone)]
struct WorkflowHealth {
    last_activity: DateTime<Utc>,
    current_task: Option<(TaskId, DateTime<Utc>)>,
    tasks_completed: u32,
    tasks_failed: u32,
    recovery_attempts: u32,
    stuck: bool,
}

impl WorkflowHealth {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            current_task: None,
            tasks_completed: 0,
            tasks_failed: 0,
            recovery_attempts: 0,
            stuck: false,
        }
    }

    fn finished(&self) -> u32 {
        self.tasks_completed + self.tasks_failed
    }

    fn failure_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            return 0.0;
        }
        self.tasks_failed as f64 / finished as f64
    }
}

/// Registry of in-flight workflows and their liveness.
#[derive(Default)]
pub struct WorkflowHealthMonitor {
    thresholds: HealthThresholds,
    registry: Mutex<HashMap<WorkflowId, WorkflowHealth>>,
}

impl WorkflowHealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: HealthThresholds) -> Self {
        Self {
            thresholds,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, workflow_id: &WorkflowId) {
        self.registry
            .lock()
            .unwrap()
            .insert(workflow_id.clone(), WorkflowHealth::new(Utc::now()));
    }

    pub fn deregister(&self, workflow_id: &WorkflowId) {
        self.registry.lock().unwrap().remove(workflow_id);
    }

    pub fn record_activity(&self, workflow_id: &WorkflowId) {
        if let Some(health) = self.registry.lock().unwrap().get_mut(workflow_id) {
            health.last_activity = Utc::now();
        }
    }

    pub fn record_task_started(&self, workflow_id: &WorkflowId, task_id: &TaskId) {
        if let Some(health) = self.registry.lock().unwrap().get_mut(workflow_id) {
            let now = Utc::now();
            health.last_activity = now;
            health.current_task = Some((task_id.clone(), now));
        }
    }

    pub fn record_task_finished(&self, workflow_id: &WorkflowId, success: bool) {
        if let Some(health) = self.registry.lock().unwrap().get_mut(workflow_id) {
            health.last_activity = Utc::now();
            health.current_task = None;
            if success {
                health.tasks_completed += 1;
            } else {
                health.tasks_failed += 1;
            }
        }
    }

    /// Marks that the loop acted on a recommendation. Clears the stuck
    /// flag; the attempt counter keeps growing so the ladder escalates.
    pub fn record_recovery_attempt(&self, workflow_id: &WorkflowId) {
        if let Some(health) = self.registry.lock().unwrap().get_mut(workflow_id) {
            health.recovery_attempts += 1;
            health.stuck = false;
            health.last_activity = Utc::now();
        }
    }

    pub fn recovery_attempts(&self, workflow_id: &WorkflowId) -> u32 {
        self.registry
            .lock()
            .unwrap()
            .get(workflow_id)
            .map(|health| health.recovery_attempts)
            .unwrap_or(0)
    }

    /// Whether the most recent check flagged this workflow as stuck.
    pub fn is_stuck(&self, workflow_id: &WorkflowId) -> bool {
        self.registry
            .lock()
            .unwrap()
            .get(workflow_id)
            .map(|health| health.stuck)
            .unwrap_or(false)
    }

    /// Escalation ladder over past recovery attempts.
    pub fn recommend(attempts: u32) -> RecoveryAction {
        match attempts {
            0 => RecoveryAction::Replan,
            1 => RecoveryAction::AlternativeApproach,
            2 => RecoveryAction::EscalateToHuman,
            _ => RecoveryAction::Abort,
        }
    }

    /// Assesses every registered workflow against the thresholds.
    ///
    /// Takes `now` explicitly so tests can stage arbitrary clocks. Marks
    /// newly-stuck workflows and skips ones already flagged.
    pub fn run_checks(&self, now: DateTime<Utc>) -> Vec<StuckAssessment> {
        let mut registry = self.registry.lock().unwrap();
        let mut assessments = Vec::new();

        for (workflow_id, health) in registry.iter_mut() {
            if health.stuck {
                continue;
            }
            let mut reasons = Vec::new();

            let idle = now - health.last_activity;
            if idle > self.thresholds.inactivity_limit {
                reasons.push(StuckReason::Inactive {
                    idle_secs: idle.num_seconds(),
                });
            }
            if let Some((task_id, started)) = &health.current_task {
                let running = now - *started;
                if running > self.thresholds.task_limit {
                    reasons.push(StuckReason::TaskRunningTooLong {
                        task_id: task_id.clone(),
                        running_secs: running.num_seconds(),
                    });
                }
            }
            let rate = health.failure_rate();
            if health.finished() >= self.thresholds.min_tasks_for_rate
                && rate > self.thresholds.failure_rate_threshold
            {
                reasons.push(StuckReason::HighFailureRate {
                    rate,
                    finished: health.finished(),
                });
            }

            if !reasons.is_empty() {
                health.stuck = true;
                assessments.push(StuckAssessment {
                    workflow_id: workflow_id.clone(),
                    reasons,
                    recommended: Self::recommend(health.recovery_attempts),
                });
            }
        }
        assessments
    }

    /// Background check loop; assessments are logged and left in place for
    /// the orchestrator to pick up through [`run_checks`](Self::run_checks)
    /// results. Stops when the token fires.
    pub fn spawn(
        self: Arc<Self>,
        interval: std::time::Duration,
        cancellation: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => {
                        info!("health monitor stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        for assessment in self.run_checks(Utc::now()) {
                            warn!(
                                workflow_id = %assessment.workflow_id,
                                recommended = ?assessment.recommended,
                                "workflow appears stuck: {:?}",
                                assessment.reasons
                            );
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> WorkflowHealthMonitor {
        WorkflowHealthMonitor::new()
    }

    #[test]
    fn test_fresh_workflow_is_healthy() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);

        assert!(monitor.run_checks(Utc::now()).is_empty());
    }

    #[test]
    fn test_inactivity_marks_stuck_once() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);

        let later = Utc::now() + Duration::minutes(6);
        let assessments = monitor.run_checks(later);
        assert_eq!(assessments.len(), 1);
        assert!(matches!(
            assessments[0].reasons[0],
            StuckReason::Inactive { .. }
        ));
        assert_eq!(assessments[0].recommended, RecoveryAction::Replan);

        // Already flagged: second sweep stays quiet
        assert!(monitor.run_checks(later + Duration::minutes(1)).is_empty());
    }

    #[test]
    fn test_long_running_task_detected() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);
        monitor.record_task_started(&id, &TaskId::generate());

        let later = Utc::now() + Duration::minutes(3);
        let assessments = monitor.run_checks(later);
        assert!(assessments[0]
            .reasons
            .iter()
            .any(|reason| matches!(reason, StuckReason::TaskRunningTooLong { .. })));
    }

    #[test]
    fn test_failure_rate_needs_enough_samples() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);

        // 2 failures out of 2: rate 1.0 but below the sample floor
        monitor.record_task_finished(&id, false);
        monitor.record_task_finished(&id, false);
        assert!(monitor.run_checks(Utc::now()).is_empty());

        // Third failure crosses the floor
        monitor.record_task_finished(&id, false);
        let assessments = monitor.run_checks(Utc::now());
        assert!(matches!(
            assessments[0].reasons[0],
            StuckReason::HighFailureRate { .. }
        ));
    }

    #[test]
    fn test_escalation_ladder() {
        assert_eq!(WorkflowHealthMonitor::recommend(0), RecoveryAction::Replan);
        assert_eq!(
            WorkflowHealthMonitor::recommend(1),
            RecoveryAction::AlternativeApproach
        );
        assert_eq!(
            WorkflowHealthMonitor::recommend(2),
            RecoveryAction::EscalateToHuman
        );
        assert_eq!(WorkflowHealthMonitor::recommend(3), RecoveryAction::Abort);
        assert_eq!(WorkflowHealthMonitor::recommend(9), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_clears_stuck_but_keeps_attempts() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);

        let later = Utc::now() + Duration::minutes(6);
        assert_eq!(monitor.run_checks(later).len(), 1);

        monitor.record_recovery_attempt(&id);
        assert_eq!(monitor.recovery_attempts(&id), 1);

        // Goes stale again: next recommendation escalates
        let much_later = later + Duration::minutes(10);
        let assessments = monitor.run_checks(much_later);
        assert_eq!(assessments.len(), 1);
        assert_eq!(
            assessments[0].recommended,
            RecoveryAction::AlternativeApproach
        );
    }

    #[test]
    fn test_deregister_stops_tracking() {
        let monitor = monitor();
        let id = WorkflowId::generate();
        monitor.register(&id);
        monitor.deregister(&id);

        assert!(monitor.run_checks(Utc::now() + Duration::hours(1)).is_empty());
    }
}
