//! Infrastructure layer for webpilot
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: configuration file loading, in-memory persistence,
//! event logging to files, and the scripted reference adapters used for
//! dry runs.

pub mod config;
pub mod logging;
pub mod persistence;
pub mod scripted;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::{EventLogExporter, JsonlEventSink};
pub use persistence::{
    InMemoryEventStore, InMemoryMemoryRepository, InMemoryPlanRepository,
    InMemoryWorkflowRepository,
};
pub use scripted::{
    Scenario, ScenarioError, ScriptedEvaluator, ScriptedExecutor, ScriptedPlanner, StaticBrowser,
    StaticDomService, TemplateSummarizer,
};
