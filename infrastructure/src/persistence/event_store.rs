//! Append-only in-memory event store
//!
//! Holds the full event history of the process in append order. Queries
//! clone matching events out so callers never hold the lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use webpilot_application::ports::event_store::{
    EventStore, EventStoreError, EventStoreStats, Pagination,
};
use webpilot_domain::{DomainEvent, DomainEventKind};

#[derive(Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<MutexGuard<'_, Vec<DomainEvent>>, EventStoreError> {
        self.events
            .lock()
            .map_err(|_| EventStoreError::QueryFailed("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<MutexGuard<'_, Vec<DomainEvent>>, EventStoreError> {
        self.events
            .lock()
            .map_err(|_| EventStoreError::AppendFailed("lock poisoned".to_string()))
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError> {
        self.write()?.push(event.clone());
        Ok(())
    }

    async fn append_batch(&self, batch: &[DomainEvent]) -> Result<(), EventStoreError> {
        self.write()?.extend_from_slice(batch);
        Ok(())
    }

    async fn events_for_aggregate(
        &self,
        aggregate_id: &str,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let matched: Vec<DomainEvent> = self
            .read()?
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        Ok(page.apply(matched))
    }

    async fn events_by_kind(
        &self,
        kind: DomainEventKind,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let matched: Vec<DomainEvent> = self
            .read()?
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        Ok(page.apply(matched))
    }

    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let matched: Vec<DomainEvent> = self
            .read()?
            .iter()
            .filter(|e| e.occurred_at >= from && e.occurred_at <= to)
            .cloned()
            .collect();
        Ok(page.apply(matched))
    }

    async fn stats(&self) -> Result<EventStoreStats, EventStoreError> {
        let events = self.read()?;
        let mut events_by_kind: HashMap<String, usize> = HashMap::new();
        let mut aggregates: HashSet<&str> = HashSet::new();
        for event in events.iter() {
            *events_by_kind
                .entry(event.kind.name().to_string())
                .or_insert(0) += 1;
            aggregates.insert(event.aggregate_id.as_str());
        }
        Ok(EventStoreStats {
            total_events: events.len(),
            events_by_kind,
            aggregate_count: aggregates.len(),
        })
    }

    async fn clear(&self) -> Result<(), EventStoreError> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(aggregate: &str, kind: DomainEventKind, version: u32) -> DomainEvent {
        DomainEvent::new(aggregate, kind, version, json!({}))
    }

    #[tokio::test]
    async fn test_append_and_query_by_aggregate() {
        let store = InMemoryEventStore::new();
        store
            .append(&event("wf-1", DomainEventKind::WorkflowStarted, 1))
            .await
            .unwrap();
        store
            .append_batch(&[
                event("wf-1", DomainEventKind::TaskCompleted, 2),
                event("wf-2", DomainEventKind::WorkflowStarted, 1),
            ])
            .await
            .unwrap();

        let events = store
            .events_for_aggregate("wf-1", Pagination::all())
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[1].version, 2);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_query_by_kind_with_pagination() {
        let store = InMemoryEventStore::new();
        for version in 1..=5 {
            store
                .append(&event("wf-1", DomainEventKind::TaskCompleted, version))
                .await
                .unwrap();
        }
        store
            .append(&event("wf-1", DomainEventKind::TaskFailed, 6))
            .await
            .unwrap();

        let page = store
            .events_by_kind(DomainEventKind::TaskCompleted, Pagination::page(1, 2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].version, 2);
        assert_eq!(page[1].version, 3);
    }

    #[tokio::test]
    async fn test_query_by_time_window() {
        let store = InMemoryEventStore::new();
        store
            .append(&event("wf-1", DomainEventKind::WorkflowStarted, 1))
            .await
            .unwrap();

        let hour = chrono::Duration::hours(1);
        let now = Utc::now();

        let hits = store
            .events_between(now - hour, now + hour, Pagination::all())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .events_between(now + hour, now + hour + hour, Pagination::all())
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_stats_count_kinds_and_aggregates() {
        let store = InMemoryEventStore::new();
        store
            .append_batch(&[
                event("wf-1", DomainEventKind::WorkflowStarted, 1),
                event("wf-1", DomainEventKind::TaskCompleted, 2),
                event("wf-1", DomainEventKind::TaskCompleted, 3),
                event("wf-2", DomainEventKind::WorkflowStarted, 1),
            ])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.aggregate_count, 2);
        assert_eq!(stats.events_by_kind["workflow:started"], 2);
        assert_eq!(stats.events_by_kind["task:completed"], 2);
    }

    #[tokio::test]
    async fn test_clear_empties_the_store() {
        let store = InMemoryEventStore::new();
        store
            .append(&event("wf-1", DomainEventKind::WorkflowStarted, 1))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert!(store.is_empty());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, EventStoreStats::default());
    }
}
