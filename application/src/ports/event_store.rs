//! Event store port
//!
//! Append-only storage for domain events. Appends on the workflow path are
//! fire-and-forget: the bus logs store failures and continues, a run never
//! fails because its audit trail could not be written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use webpilot_domain::{DomainEvent, DomainEventKind};

/// Errors that can occur during event store operations
#[derive(Error, Debug)]
pub enum EventStoreError {
    #[error("Append failed: {0}")]
    AppendFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Offset/limit window for event queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub offset: usize,
    /// `None` means no limit
    pub limit: Option<usize>,
}

impl Pagination {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Applies the window to an already-filtered event list.
    pub fn apply(&self, events: Vec<DomainEvent>) -> Vec<DomainEvent> {
        let iter = events.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Aggregated shape of the store's contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStoreStats {
    pub total_events: usize,
    pub events_by_kind: HashMap<String, usize>,
    pub aggregate_count: usize,
}

/// Append-only domain event storage
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError>;

    async fn append_batch(&self, events: &[DomainEvent]) -> Result<(), EventStoreError>;

    async fn events_for_aggregate(
        &self,
        aggregate_id: &str,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError>;

    async fn events_by_kind(
        &self,
        kind: DomainEventKind,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError>;

    async fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Pagination,
    ) -> Result<Vec<DomainEvent>, EventStoreError>;

    async fn stats(&self) -> Result<EventStoreStats, EventStoreError>;

    async fn clear(&self) -> Result<(), EventStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(n: u32) -> DomainEvent {
        DomainEvent::new(
            format!("wf-{n}"),
            DomainEventKind::TaskCompleted,
            n,
            json!({}),
        )
    }

    #[test]
    fn test_pagination_window() {
        let events: Vec<DomainEvent> = (0..10).map(event).collect();

        let all = Pagination::all().apply(events.clone());
        assert_eq!(all.len(), 10);

        let page = Pagination::page(3, 4).apply(events);
        assert_eq!(page.len(), 4);
        assert_eq!(page[0].aggregate_id, "wf-3");
    }

    #[test]
    fn test_pagination_past_end_is_empty() {
        let events: Vec<DomainEvent> = (0..3).map(event).collect();
        assert!(Pagination::page(5, 10).apply(events).is_empty());
    }
}
