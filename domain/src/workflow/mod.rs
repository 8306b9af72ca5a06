//! Workflow domain module
//!
//! Contains the workflow aggregate, plans, steps, tasks, sessions and the
//! value objects they are built from.

pub mod aggregate;
pub mod entities;
pub mod value_objects;
pub mod variables;

pub use aggregate::WorkflowAggregate;
pub use entities::{Plan, Session, Step, StepStatus, Task, TaskStatus, Workflow, WorkflowStatus};
pub use value_objects::{
    Confidence, ElementSelector, PageUrl, PlanId, Priority, RetryPolicy, SessionId, StepId,
    StrategicIntent, TaskId, TaskIntent, Timeout, Viewport, WorkflowId,
};
pub use variables::{Variable, VariableVault};
