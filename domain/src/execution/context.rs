//! Mutable execution context: everything the engine knows about the live
//! browser while a workflow runs.

use crate::state::PageState;
use crate::workflow::value_objects::{Viewport, WorkflowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of browser-held storage, refreshed after navigations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserStorage {
    pub cookies: HashMap<String, String>,
    pub local_storage: HashMap<String, String>,
    pub session_storage: HashMap<String, String>,
}

/// Live view of the run: where the browser is, what the page looks like,
/// and how much work has been done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub workflow_id: WorkflowId,
    pub viewport: Viewport,
    pub current_url: Option<String>,
    pub current_state: Option<PageState>,
    pub storage: BrowserStorage,
    pub tasks_executed: u32,
    pub steps_completed: u32,
    pub replans: u32,
}

impl ExecutionContext {
    pub fn new(workflow_id: WorkflowId, viewport: Viewport) -> Self {
        Self {
            workflow_id,
            viewport,
            current_url: None,
            current_state: None,
            storage: BrowserStorage::default(),
            tasks_executed: 0,
            steps_completed: 0,
            replans: 0,
        }
    }

    pub fn update_url(&mut self, url: impl Into<String>) {
        self.current_url = Some(url.into());
    }

    pub fn update_state(&mut self, state: PageState) {
        self.current_url = Some(state.url.clone());
        self.current_state = Some(state);
    }

    pub fn update_storage(&mut self, storage: BrowserStorage) {
        self.storage = storage;
    }

    pub fn record_step_completed(&mut self) {
        self.steps_completed += 1;
    }

    pub fn record_replan(&mut self) {
        self.replans += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_state_tracks_url() {
        let mut ctx = ExecutionContext::new(WorkflowId::generate(), Viewport::default());
        assert!(ctx.current_url.is_none());

        ctx.update_state(PageState::new("https://example.com/results", "Results"));
        assert_eq!(ctx.current_url.as_deref(), Some("https://example.com/results"));
        assert!(ctx.current_state.is_some());
    }

    #[test]
    fn test_counters() {
        let mut ctx = ExecutionContext::new(WorkflowId::generate(), Viewport::default());
        ctx.record_step_completed();
        ctx.record_replan();
        assert_eq!(ctx.steps_completed, 1);
        assert_eq!(ctx.replans, 1);
    }
}
