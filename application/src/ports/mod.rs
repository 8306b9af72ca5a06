//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod browser;
pub mod evaluator;
pub mod event_store;
pub mod executor;
pub mod perception;
pub mod planner;
pub mod reporter;
pub mod repositories;
pub mod summarizer;
