//! Application layer for webpilot
//!
//! This crate contains the run loop use case, port definitions, the event
//! bus and its built-in handlers, cross-run memory, and page-state
//! tracking. It depends only on the domain layer.

pub mod config;
pub mod events;
pub mod memory;
pub mod ports;
pub mod state;
pub mod use_cases;

// Re-export commonly used types
pub use config::{EngineConfig, ModelRoles};
pub use events::{
    EventHandler, HandlerResult, LoggingHandler, MetricsHandler, MetricsSnapshot,
    RecoveryAction, TaskFailureHandler, WorkflowEventBus, WorkflowHealthMonitor, WorkflowSaga,
};
pub use memory::MemoryService;
pub use ports::{
    browser::{Browser, BrowserError},
    evaluator::{Evaluation, StepEvaluator},
    event_store::{EventStore, EventStoreStats, Pagination},
    executor::{ExecutorOutcome, TaskExecutor},
    perception::{DomService, PageSnapshot},
    planner::{PlannedTask, Planner, Strategy, StrategicStep},
    reporter::{AgentReporter, NullReporter},
    repositories::{MemoryRepository, PlanRepository, WorkflowRepository},
    summarizer::RunSummarizer,
};
pub use state::{StateManager, StateEvent};
pub use use_cases::run_workflow::{
    RunStatus, RunWorkflowInput, RunWorkflowUseCase, StepSummary, WorkflowError, WorkflowResult,
};
