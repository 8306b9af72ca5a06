//! Persistence adapters
//!
//! In-memory implementations of the application's repository and event
//! store ports.

mod event_store;
mod repositories;

pub use event_store::InMemoryEventStore;
pub use repositories::{InMemoryMemoryRepository, InMemoryPlanRepository, InMemoryWorkflowRepository};
