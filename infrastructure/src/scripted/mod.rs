//! Scripted reference adapters.
//!
//! A complete, deterministic adapter set for dry runs and tests: strategies
//! and task outcomes come from a [`Scenario`] file (or a built-in template),
//! the browser never leaves the process, and perception serves canned page
//! snapshots. Model- and browser-backed adapters plug into the same ports.

mod browser;
mod dom;
mod evaluator;
mod executor;
mod planner;
mod scenario;
mod summarizer;

pub use browser::StaticBrowser;
pub use dom::StaticDomService;
pub use evaluator::ScriptedEvaluator;
pub use executor::ScriptedExecutor;
pub use planner::ScriptedPlanner;
pub use scenario::{Scenario, ScenarioError, ScenarioRevision, ScenarioStep, ScenarioTask};
pub use summarizer::TemplateSummarizer;
