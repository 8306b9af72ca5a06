//! Page state tracking across a run.
//!
//! The manager owns the current/previous snapshot pair, a bounded history,
//! named checkpoints, and the accumulated extraction payload. Change
//! detection itself is domain policy; this type just feeds it.

use crate::ports::perception::{DomService, PageSnapshot, PerceptionError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;
use webpilot_domain::state::{StateDiffPolicy, merge_extracted};
use webpilot_domain::PageState;

/// Snapshots kept in history before the oldest is dropped.
const HISTORY_LIMIT: usize = 50;

/// Observable state-tracking moments, buffered for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    StateCaptured { url: String },
    CheckpointCreated { name: String },
    DataExtracted { keys: Vec<String> },
}

/// Tracks what the page looked like throughout the run.
pub struct StateManager<D: DomService> {
    dom: Arc<D>,
    policy: StateDiffPolicy,
    current: Option<PageState>,
    previous: Option<PageState>,
    /// Raw perception output backing the current state; carries the
    /// screenshots and element list executors need.
    last_snapshot: Option<PageSnapshot>,
    history: VecDeque<PageState>,
    checkpoints: HashMap<String, PageState>,
    extracted: serde_json::Value,
    events: Vec<StateEvent>,
}

impl<D: DomService> StateManager<D> {
    pub fn new(dom: Arc<D>) -> Self {
        Self {
            dom,
            policy: StateDiffPolicy::default(),
            current: None,
            previous: None,
            last_snapshot: None,
            history: VecDeque::new(),
            checkpoints: HashMap::new(),
            extracted: serde_json::Value::Object(serde_json::Map::new()),
            events: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: StateDiffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Perceives the page and makes the snapshot current.
    ///
    /// The outgoing current snapshot becomes previous; history keeps the
    /// last [`HISTORY_LIMIT`] snapshots.
    pub async fn capture_state(&mut self) -> Result<&PageState, PerceptionError> {
        let snapshot = self.dom.perceive().await?;
        let state = snapshot.to_page_state();
        debug!(url = %state.url, "captured page state");

        self.events.push(StateEvent::StateCaptured {
            url: state.url.clone(),
        });
        self.previous = self.current.take();
        self.last_snapshot = Some(snapshot);
        self.history.push_back(state.clone());
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
        Ok(self.current.insert(state))
    }

    /// Whether the last capture differs meaningfully from the one before.
    ///
    /// The first capture of a run is never a change.
    pub fn has_state_changed(&self) -> bool {
        match (&self.previous, &self.current) {
            (Some(previous), Some(current)) => {
                self.policy.has_significant_change(previous, current)
            }
            _ => false,
        }
    }

    /// Names the current snapshot for later reference. No-op (returning
    /// `false`) when nothing has been captured yet.
    pub fn checkpoint(&mut self, name: impl Into<String>) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        let name = name.into();
        self.checkpoints.insert(name.clone(), current.clone());
        self.events.push(StateEvent::CheckpointCreated { name });
        true
    }

    /// Deep-merges newly extracted data into the run's accumulated payload.
    pub fn merge_extracted_data(&mut self, data: &serde_json::Value) {
        merge_extracted(&mut self.extracted, data);
        if let serde_json::Value::Object(map) = data {
            self.events.push(StateEvent::DataExtracted {
                keys: map.keys().cloned().collect(),
            });
        }
    }

    pub fn current_state(&self) -> Option<&PageState> {
        self.current.as_ref()
    }

    pub fn previous_state(&self) -> Option<&PageState> {
        self.previous.as_ref()
    }

    pub fn last_snapshot(&self) -> Option<&PageSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn checkpoint_named(&self, name: &str) -> Option<&PageState> {
        self.checkpoints.get(name)
    }

    pub fn extracted_data(&self) -> &serde_json::Value {
        &self.extracted
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drains buffered state events. Each event leaves exactly once.
    pub fn drain_events(&mut self) -> Vec<StateEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::perception::PageSnapshot;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// DomService returning queued snapshots, repeating the last one.
    struct QueuedDom {
        snapshots: Mutex<Vec<PageSnapshot>>,
    }

    impl QueuedDom {
        fn new(snapshots: Vec<PageSnapshot>) -> Self {
            Self {
                snapshots: Mutex::new(snapshots),
            }
        }
    }

    #[async_trait]
    impl DomService for QueuedDom {
        async fn perceive(&self) -> Result<PageSnapshot, PerceptionError> {
            let mut queue = self.snapshots.lock().unwrap();
            if queue.len() > 1 {
                Ok(queue.remove(0))
            } else {
                queue
                    .first()
                    .cloned()
                    .ok_or_else(|| PerceptionError::CaptureFailed("queue empty".to_string()))
            }
        }
    }

    fn snapshot(url: &str, sections: &[&str]) -> PageSnapshot {
        PageSnapshot {
            url: url.to_string(),
            title: "Page".to_string(),
            visible_sections: sections.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_capture_is_not_a_change() {
        let dom = Arc::new(QueuedDom::new(vec![snapshot("https://a.example", &["nav"])]));
        let mut manager = StateManager::new(dom);

        manager.capture_state().await.unwrap();
        assert!(!manager.has_state_changed());
    }

    #[tokio::test]
    async fn test_url_change_detected_across_captures() {
        let dom = Arc::new(QueuedDom::new(vec![
            snapshot("https://a.example", &["nav"]),
            snapshot("https://b.example", &["nav"]),
        ]));
        let mut manager = StateManager::new(dom);

        manager.capture_state().await.unwrap();
        manager.capture_state().await.unwrap();
        assert!(manager.has_state_changed());
        assert_eq!(
            manager.previous_state().unwrap().url,
            "https://a.example"
        );
    }

    #[tokio::test]
    async fn test_checkpoint_requires_a_capture() {
        let dom = Arc::new(QueuedDom::new(vec![snapshot("https://a.example", &[])]));
        let mut manager = StateManager::new(dom);

        assert!(!manager.checkpoint("before"));
        manager.capture_state().await.unwrap();
        assert!(manager.checkpoint("after"));
        assert!(manager.checkpoint_named("after").is_some());
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let dom = Arc::new(QueuedDom::new(vec![snapshot("https://a.example", &[])]));
        let mut manager = StateManager::new(dom);

        for _ in 0..(HISTORY_LIMIT + 7) {
            manager.capture_state().await.unwrap();
        }
        assert_eq!(manager.history_len(), HISTORY_LIMIT);
    }

    #[tokio::test]
    async fn test_merge_and_events() {
        let dom = Arc::new(QueuedDom::new(vec![snapshot("https://a.example", &[])]));
        let mut manager = StateManager::new(dom);

        manager.capture_state().await.unwrap();
        manager.merge_extracted_data(&json!({"price": 10}));
        manager.merge_extracted_data(&json!({"price": 12, "stock": "in"}));

        assert_eq!(manager.extracted_data()["price"], 12);
        assert_eq!(manager.extracted_data()["stock"], "in");

        let events = manager.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], StateEvent::StateCaptured { .. }));
        assert!(manager.drain_events().is_empty());
    }
}
