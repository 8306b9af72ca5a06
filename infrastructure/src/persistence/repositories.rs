//! In-memory repository adapters
//!
//! Process-local persistence behind mutex-guarded maps. Enough for a CLI
//! run and for tests; a durable backend would implement the same ports.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use webpilot_application::ports::repositories::{
    MemoryRepository, PlanRepository, RepositoryError, WorkflowRepository,
};
use webpilot_domain::{MemoryEntry, Plan, Workflow, WorkflowId};

fn guard<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
}

// ==================== Workflows ====================

/// Keeps workflow aggregates keyed by id.
#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Mutex<HashMap<WorkflowId, Workflow>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workflows.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let mut workflows = guard(&self.workflows)?;
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), RepositoryError> {
        let mut workflows = guard(&self.workflows)?;
        if !workflows.contains_key(&workflow.id) {
            return Err(RepositoryError::NotFound(workflow.id.to_string()));
        }
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        let workflows = guard(&self.workflows)?;
        Ok(workflows.get(id).cloned())
    }
}

// ==================== Plans ====================

/// Keeps every plan revision per workflow, in the order they were saved.
#[derive(Default)]
pub struct InMemoryPlanRepository {
    plans: Mutex<HashMap<WorkflowId, Vec<Plan>>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn save(&self, plan: &Plan) -> Result<(), RepositoryError> {
        let mut plans = guard(&self.plans)?;
        plans
            .entry(plan.workflow_id.clone())
            .or_default()
            .push(plan.clone());
        Ok(())
    }

    async fn find_by_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<Plan>, RepositoryError> {
        let plans = guard(&self.plans)?;
        Ok(plans.get(workflow_id).cloned().unwrap_or_default())
    }
}

// ==================== Memory ====================

/// Keeps learned lessons keyed by their memory-context string.
#[derive(Default)]
pub struct InMemoryMemoryRepository {
    entries: Mutex<HashMap<String, Vec<MemoryEntry>>>,
}

impl InMemoryMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn save(&self, key: &str, entry: &MemoryEntry) -> Result<(), RepositoryError> {
        let mut entries = guard(&self.entries)?;
        entries
            .entry(key.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> Result<Vec<MemoryEntry>, RepositoryError> {
        let entries = guard(&self.entries)?;
        Ok(entries.get(key).cloned().unwrap_or_default())
    }

    async fn load_all(&self) -> Result<Vec<(String, Vec<MemoryEntry>)>, RepositoryError> {
        let entries = guard(&self.entries)?;
        Ok(entries
            .iter()
            .map(|(key, list)| (key.clone(), list.clone()))
            .collect())
    }

    async fn remove_key(&self, key: &str) -> Result<usize, RepositoryError> {
        let mut entries = guard(&self.entries)?;
        Ok(entries.remove(key).map(|list| list.len()).unwrap_or(0))
    }
}
