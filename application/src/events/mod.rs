//! Event fan-out, built-in handlers, health monitoring, compensation.

pub mod bus;
pub mod handlers;
pub mod health;
pub mod saga;

pub use bus::{EventHandler, HandlerResult, WorkflowEventBus};
pub use handlers::{
    EventLogEntry, LoggingHandler, MetricsHandler, MetricsSnapshot, TaskFailureHandler,
};
pub use health::{
    HealthThresholds, RecoveryAction, StuckAssessment, StuckReason, WorkflowHealthMonitor,
};
pub use saga::{CompensationAction, SagaRecord, SagaState, SagaStats, WorkflowSaga};
