//! Domain layer for webpilot
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Plan / Act / Evaluate / Adapt
//!
//! A run is a loop over a strategic [`workflow::Plan`]:
//!
//! - **Plan**: a model turns the goal into ordered strategic steps
//! - **Act**: each step becomes concrete browser [`workflow::Task`]s,
//!   scheduled through the dependency-aware [`scheduling::TaskQueue`]
//! - **Evaluate**: after each step the page state and step outcome are judged
//! - **Adapt**: on drift or failure the remainder of the plan is replaced
//!
//! ## Events
//!
//! Every entity buffers [`event::DomainEvent`]s as it changes; the
//! orchestration layer drains each buffer exactly once and publishes the
//! union at the end of the run.

pub mod core;
pub mod event;
pub mod execution;
pub mod memory;
pub mod scheduling;
pub mod state;
pub mod workflow;

// Re-export commonly used types
pub use crate::core::error::DomainError;
pub use event::{DomainEvent, DomainEventKind};
pub use execution::{
    BrowserStorage, Evidence, EvidenceKind, ExecutionAggregate, ExecutionContext, ExecutionResult,
    TaskOutcome,
};
pub use memory::{MemoryContext, MemoryEntry};
pub use scheduling::{QueueEvent, QueueStats, TaskQueue};
pub use state::{PageState, StateDiffPolicy};
pub use workflow::{
    Confidence, ElementSelector, PageUrl, Plan, PlanId, Priority, RetryPolicy, Session, SessionId,
    Step, StepId, StepStatus, StrategicIntent, Task, TaskId, TaskIntent, TaskStatus, Timeout,
    Variable, VariableVault, Viewport, Workflow, WorkflowAggregate, WorkflowId, WorkflowStatus,
};
