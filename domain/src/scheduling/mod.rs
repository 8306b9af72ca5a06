//! Task scheduling module
//!
//! Dependency-aware queueing of concrete browser tasks.

pub mod task_queue;

pub use task_queue::{QueueEvent, QueueStats, TaskQueue};
