//! Persistence ports
//!
//! Repositories are strictly best-effort from the engine's point of view:
//! the control loop logs their failures and keeps running. A browser run
//! must never die because a save did.

use async_trait::async_trait;
use thiserror::Error;
use webpilot_domain::{MemoryEntry, Plan, Workflow, WorkflowId};

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence for workflow aggregates
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn save(&self, workflow: &Workflow) -> Result<(), RepositoryError>;

    async fn update(&self, workflow: &Workflow) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError>;
}

/// Persistence for plans, including replaced revisions
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn save(&self, plan: &Plan) -> Result<(), RepositoryError>;

    /// All plan revisions recorded for a workflow, oldest first
    async fn find_by_workflow(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Vec<Plan>, RepositoryError>;
}

/// Persistence for site-scoped learnings.
///
/// Keys are the `hostname:goal-slug:section` strings produced by
/// [`webpilot_domain::MemoryContext::key`].
#[async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn save(&self, key: &str, entry: &MemoryEntry) -> Result<(), RepositoryError>;

    async fn find_by_key(&self, key: &str) -> Result<Vec<MemoryEntry>, RepositoryError>;

    /// All stored keys with their entries, for service warm-up
    async fn load_all(&self) -> Result<Vec<(String, Vec<MemoryEntry>)>, RepositoryError>;

    /// Remove a whole key; returns how many entries were dropped
    async fn remove_key(&self, key: &str) -> Result<usize, RepositoryError>;
}
