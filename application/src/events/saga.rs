//! Failure compensation tracking.
//!
//! When steps or whole workflows fail, cleanup obligations accrue: the
//! browser session must be released, tasks depending on the failure are
//! void, and data extracted so far must be preserved. The saga records
//! those obligations per workflow as an audit trail; the orchestration
//! loop performs the actual cleanup during finalization and marks the
//! saga compensated.

use crate::events::bus::{EventHandler, HandlerResult};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use webpilot_domain::{DomainEvent, DomainEventKind};

/// Cleanup obligations a failure creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationAction {
    ReleaseSession,
    VoidDependentTasks,
    PreserveExtractedData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    /// Obligations recorded, cleanup pending
    Compensating,
    /// Cleanup confirmed done
    Compensated,
}

/// Compensation record for one workflow.
#[derive(Debug, Clone)]
pub struct SagaRecord {
    pub workflow_id: String,
    pub state: SagaState,
    /// Event names that opened or extended this saga
    pub triggered_by: Vec<String>,
    pub pending_actions: Vec<CompensationAction>,
    pub opened_at: DateTime<Utc>,
    pub compensated_at: Option<DateTime<Utc>>,
}

/// Aggregate saga counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SagaStats {
    pub total: usize,
    pub compensating: usize,
    pub compensated: usize,
}

/// Watches failure events and keeps compensation ledgers.
#[derive(Default)]
pub struct WorkflowSaga {
    sagas: Mutex<HashMap<String, SagaRecord>>,
}

impl WorkflowSaga {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obligations a given failure kind creates.
    fn actions_for(kind: DomainEventKind) -> Vec<CompensationAction> {
        match kind {
            // Whole run failed: everything must be cleaned up
            DomainEventKind::WorkflowFailed => vec![
                CompensationAction::ReleaseSession,
                CompensationAction::VoidDependentTasks,
                CompensationAction::PreserveExtractedData,
            ],
            DomainEventKind::StepFailed => vec![
                CompensationAction::VoidDependentTasks,
                CompensationAction::PreserveExtractedData,
            ],
            DomainEventKind::TaskFailed => vec![CompensationAction::VoidDependentTasks],
            _ => Vec::new(),
        }
    }

    pub fn saga_for_workflow(&self, workflow_id: &str) -> Option<SagaRecord> {
        self.sagas.lock().unwrap().get(workflow_id).cloned()
    }

    /// Confirms cleanup ran for this workflow.
    pub fn mark_compensated(&self, workflow_id: &str) {
        if let Some(record) = self.sagas.lock().unwrap().get_mut(workflow_id) {
            record.state = SagaState::Compensated;
            record.pending_actions.clear();
            record.compensated_at = Some(Utc::now());
        }
    }

    pub fn stats(&self) -> SagaStats {
        let sagas = self.sagas.lock().unwrap();
        let compensated = sagas
            .values()
            .filter(|record| record.state == SagaState::Compensated)
            .count();
        SagaStats {
            total: sagas.len(),
            compensating: sagas.len() - compensated,
            compensated,
        }
    }
}

impl EventHandler for WorkflowSaga {
    fn name(&self) -> &str {
        "saga"
    }

    fn handle(&self, event: &DomainEvent) -> HandlerResult {
        let actions = Self::actions_for(event.kind);
        if actions.is_empty() {
            return Ok(());
        }
        // Step and task events carry the owning workflow in the payload;
        // workflow events are keyed by their own aggregate id.
        let workflow_id = event
            .payload
            .get("workflow_id")
            .and_then(|value| value.as_str())
            .unwrap_or(&event.aggregate_id)
            .to_string();

        let mut sagas = self.sagas.lock().unwrap();
        let record = sagas.entry(workflow_id.clone()).or_insert_with(|| SagaRecord {
            workflow_id,
            state: SagaState::Compensating,
            triggered_by: Vec::new(),
            pending_actions: Vec::new(),
            opened_at: Utc::now(),
            compensated_at: None,
        });
        record.state = SagaState::Compensating;
        record.compensated_at = None;
        record.triggered_by.push(event.kind.name().to_string());
        for action in actions {
            if !record.pending_actions.contains(&action) {
                record.pending_actions.push(action);
            }
        }
        Ok(())
    }
}
